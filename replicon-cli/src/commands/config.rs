//! Config command implementation.

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use replicon_core::HandlerConfig;
use serde_json::Value;

use crate::Cli;
use crate::output::JsonFormatter;

const REDACTED: &str = "<redacted>";

/// Arguments for config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config actions.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration with secrets redacted.
    Show,
    /// Print the default config file path.
    Path,
    /// Write a template config file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Runs the config command.
pub fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => {
            let config = super::load_config(cli)?;
            let shown = redacted(&config)?;
            println!("{}", JsonFormatter::new(cli.pretty).format(&shown)?);
        }
        ConfigAction::Path => {
            println!("{}", HandlerConfig::default_path().display());
        }
        ConfigAction::Init { force } => {
            let path = cli.config.clone().unwrap_or_else(HandlerConfig::default_path);
            if path.exists() && !force {
                bail!("{} already exists; pass --force to overwrite", path.display());
            }
            template()
                .save_to(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

/// Serializes `config` with credential values replaced.
pub fn redacted(config: &HandlerConfig) -> Result<Value> {
    let mut value = serde_json::to_value(config)?;
    if let Some(fields) = value.as_object_mut() {
        for key in ["password", "authentication_token"] {
            if let Some(secret) = fields.get_mut(key) {
                *secret = Value::String(REDACTED.to_string());
            }
        }
    }
    Ok(value)
}

fn template() -> HandlerConfig {
    HandlerConfig::new("YourCompanyKey").with_token("your-api-token")
}
