//! Batch command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use replicon_fetch::RepliconHandler;
use serde_json::Value;
use tracing::info;

use crate::Cli;
use crate::output::JsonFormatter;

/// Default number of calls in flight.
const DEFAULT_CONCURRENCY: usize = 4;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Service name, e.g. `TimesheetService1.svc`.
    pub service: String,

    /// Operation name, e.g. `GetTimesheetDetails`.
    pub operation: String,

    /// File holding a JSON array of payloads.
    #[arg(long)]
    pub payloads_file: PathBuf,

    /// Maximum calls in flight.
    #[arg(long, short = 'n', default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Send one payload at a time.
    #[arg(long, conflicts_with = "concurrency")]
    pub sequential: bool,

    /// Call the source host instead of the application host.
    #[arg(long)]
    pub source: bool,
}

/// Parses the payload list.
pub fn parse_payloads(document: Value) -> Result<Vec<Value>> {
    match document {
        Value::Array(payloads) => Ok(payloads),
        other => anyhow::bail!("expected a JSON array of payloads, found {}", kind(&other)),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Runs the batch command.
pub async fn run(args: &BatchArgs, handler: &RepliconHandler, cli: &Cli) -> Result<()> {
    let payloads = parse_payloads(super::read_json(&args.payloads_file)?)
        .with_context(|| format!("invalid payloads file {}", args.payloads_file.display()))?;
    let url = super::operation_url(handler, &args.service, &args.operation, args.source).await?;

    info!(%url, entries = payloads.len(), sequential = args.sequential, "Starting batch");
    let responses = if args.sequential {
        handler.sequential_batch(&url, payloads).await?
    } else {
        handler.concurrent_batch(&url, payloads, args.concurrency).await?
    };

    println!("{}", JsonFormatter::new(cli.pretty).format_batch(&responses)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_payloads() {
        let payloads = parse_payloads(json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(payloads.len(), 2);

        assert!(parse_payloads(json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_parse_payloads_rejects_non_array() {
        let err = parse_payloads(json!({"id": 1})).unwrap_err();
        assert!(err.to_string().contains("an object"));
    }
}
