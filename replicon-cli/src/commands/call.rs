//! Call command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use replicon_core::HttpMethod;
use replicon_fetch::RepliconHandler;
use serde_json::{Value, json};
use tracing::debug;

use crate::Cli;
use crate::output::JsonFormatter;

/// Arguments for the call command.
#[derive(Args)]
pub struct CallArgs {
    /// Service name, e.g. `UserService1.svc`.
    pub service: String,

    /// Operation name, e.g. `GetAllUsers`.
    pub operation: String,

    /// Inline JSON payload.
    #[arg(long, conflicts_with = "payload_file")]
    pub payload: Option<String>,

    /// File holding the JSON payload.
    #[arg(long)]
    pub payload_file: Option<PathBuf>,

    /// HTTP verb; defaults to the configured method.
    #[arg(long, short)]
    pub method: Option<HttpMethod>,

    /// Call the source host instead of the application host.
    #[arg(long)]
    pub source: bool,
}

impl CallArgs {
    /// Returns the payload, `{}` when none was given.
    pub fn payload(&self) -> Result<Value> {
        match (&self.payload, &self.payload_file) {
            (Some(inline), _) => serde_json::from_str(inline).context("--payload is not valid JSON"),
            (None, Some(path)) => super::read_json(path),
            (None, None) => Ok(json!({})),
        }
    }
}

/// Runs the call command.
///
/// The response is printed whatever its status; a non-2xx status still
/// fails the command.
pub async fn run(args: &CallArgs, handler: &RepliconHandler, cli: &Cli) -> Result<()> {
    let payload = args.payload()?;
    let url = super::operation_url(handler, &args.service, &args.operation, args.source).await?;
    let method = args.method.unwrap_or(handler.config().method);
    debug!(%url, %method, "Calling operation");

    let response = handler.call_with_method(&url, payload, method).await?;
    println!("{}", JsonFormatter::new(cli.pretty).format_response(&response)?);

    if !response.is_success() {
        bail!("{} returned HTTP {}", args.operation, response.status);
    }
    Ok(())
}
