//! Resolve command implementation.

use anyhow::Result;
use replicon_fetch::RepliconHandler;

use crate::Cli;
use crate::output::JsonFormatter;

/// Runs the resolve command.
pub async fn run(handler: &RepliconHandler, cli: &Cli) -> Result<()> {
    let route = handler.resolve().await?;
    println!("{}", JsonFormatter::new(cli.pretty).format(route)?);
    Ok(())
}
