// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Replicon CLI - call Replicon Gen3 Web Services from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Resolve the tenant route
//! replicon --company-key Acme --token $TOKEN resolve
//!
//! # Print a Web Service URL
//! replicon url web-service UserService1.svc GetAllUsers
//!
//! # Call an operation
//! replicon call UserService1.svc GetUser2 --payload '{"userUri": "urn:..."}'
//!
//! # Run a batch with four calls in flight
//! replicon batch TimesheetService1.svc GetTimesheet --payloads-file ids.json --concurrency 4
//! ```

mod commands;
mod output;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{batch, call, config, resolve, url};

// ============================================================================
// CLI Definition
// ============================================================================

/// Replicon CLI - tenant resolution and Web Service calls.
#[derive(Parser)]
#[command(name = "replicon")]
#[command(about = "Replicon Gen3 Web Services client")]
#[command(long_about = r#"
Resolves a Replicon tenant and calls its Web Services.

Settings come from a JSON config file (see `replicon config path`);
command-line flags override the file.

Examples:
  replicon resolve                                  # Show the tenant route
  replicon url analytics                            # Analytics endpoint
  replicon call UserService1.svc GetAllUsers        # Single call
  replicon batch SVC OP --payloads-file p.json      # Concurrent batch
"#)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to the per-user config path).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Company key of the tenant.
    #[arg(long, short = 'k', global = true)]
    pub company_key: Option<String>,

    /// API token; takes precedence over username/password.
    #[arg(long, global = true, env = "REPLICON_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Tenant user name for basic auth.
    #[arg(long, global = true, requires = "password")]
    pub username: Option<String>,

    /// Tenant password for basic auth.
    #[arg(long, global = true, env = "REPLICON_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Known swimlane; skips tenant discovery.
    #[arg(long, global = true)]
    pub swimlane: Option<String>,

    /// Write debug logs to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Quiet mode (errors only).
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the tenant and print its route.
    #[command(visible_alias = "r")]
    Resolve,

    /// Print an endpoint URL.
    Url(url::UrlArgs),

    /// Call one Web Service operation.
    #[command(visible_alias = "c")]
    Call(call::CallArgs),

    /// Send many payloads to one operation.
    #[command(visible_alias = "b")]
    Batch(batch::BatchArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// Any failure.
    Error = 1,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("replicon=debug,info")
    } else {
        EnvFilter::new("replicon=warn")
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(EnvFilter::new("replicon=debug")),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .with(file_layer)
        .init();

    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(ExitCode::Error as i32);
    }
    std::process::exit(ExitCode::Success as i32);
}

async fn run(cli: &Cli) -> Result<()> {
    // `config` works without a usable configuration.
    if let Commands::Config(args) = &cli.command {
        setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;
        return config::run(args, cli);
    }

    let settings = commands::load_config(cli)?;
    setup_logging(cli.verbose, cli.quiet, settings.log_file.as_deref())?;
    let handler = commands::build_handler(settings)?;

    match &cli.command {
        Commands::Resolve => resolve::run(&handler, cli).await,
        Commands::Url(args) => url::run(args, &handler).await,
        Commands::Call(args) => call::run(args, &handler, cli).await,
        Commands::Batch(args) => batch::run(args, &handler, cli).await,
        Commands::Config(_) => Ok(()),
    }
}
