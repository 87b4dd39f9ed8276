//! URL command implementation.

use anyhow::Result;
use clap::{Args, Subcommand};
use replicon_fetch::RepliconHandler;

/// Arguments for the url command.
#[derive(Args)]
pub struct UrlArgs {
    #[command(subcommand)]
    pub target: UrlTarget,
}

/// Endpoint to print.
#[derive(Subcommand)]
pub enum UrlTarget {
    /// A Web Service operation.
    WebService {
        /// Service name, e.g. `UserService1.svc`.
        service: String,
        /// Operation name, e.g. `GetAllUsers`.
        operation: String,
        /// Use the source host instead of the application host.
        #[arg(long)]
        source: bool,
    },
    /// The analytics endpoint.
    Analytics,
    /// The audit-log endpoint.
    AuditLog,
    /// The Polaris GraphQL endpoint.
    Graphql,
}

/// Runs the url command.
pub async fn run(args: &UrlArgs, handler: &RepliconHandler) -> Result<()> {
    let url = match &args.target {
        UrlTarget::WebService {
            service,
            operation,
            source,
        } => super::operation_url(handler, service, operation, *source).await?,
        UrlTarget::Analytics => {
            handler.resolve().await?;
            handler.analytics_url()?
        }
        UrlTarget::AuditLog => {
            handler.resolve().await?;
            handler.audit_log_url()?
        }
        UrlTarget::Graphql => {
            handler.resolve().await?;
            handler.polaris_graphql_url()?
        }
    };

    println!("{url}");
    Ok(())
}
