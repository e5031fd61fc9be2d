mod commands;
mod display;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use gstrecon_core::audit::AuditFilter;
use gstrecon_core::filter::RecordFilter;
use gstrecon_core::nav::{Page, shell_header};
use gstrecon_core::vendor::VendorFilter;
use gstrecon_core::{AuditStatus, RecordStatus, RiskLevel, Severity};
use gstrecon_sync::http::DEFAULT_BASE_URL;
use gstrecon_sync::{ApiClient, ClientConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gstrecon", version, about = "GST reconciliation console")]
struct Cli {
    /// Base URL of the reconciliation API.
    #[arg(long, env = "GST_API_URL", default_value = DEFAULT_BASE_URL, global = true)]
    api_url: String,

    /// Request timeout in seconds; 0 waits indefinitely.
    #[arg(long, env = "GST_API_TIMEOUT_SECS", default_value_t = 30, global = true)]
    timeout_secs: u64,

    /// Collapse the navigation sidebar to a breadcrumb.
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summary figures and charts.
    Dashboard,
    /// Mismatch records, filtered client-side.
    Reconciliation {
        /// Substring of invoice number, supplier GSTIN, or supplier name.
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        risk: Option<RiskLevel>,
        #[arg(long)]
        status: Option<RecordStatus>,
        /// Write the filtered rows as CSV (default: reconciliation_<date>.csv).
        #[arg(long, num_args = 0..=1, value_name = "PATH")]
        export: Option<Option<PathBuf>>,
    },
    /// Render the taxpayer/invoice graph to SVG.
    Graph {
        #[arg(long, default_value = "graph.svg")]
        out: PathBuf,
    },
    /// Vendor compliance table, riskiest first.
    Vendors {
        #[arg(long)]
        risk: Option<RiskLevel>,
        /// Only vendors scoring at or below this.
        #[arg(long)]
        max_score: Option<u8>,
    },
    /// Audit trail findings.
    Audit {
        #[command(subcommand)]
        command: AuditCommand,
    },
    /// Upload a GSTR CSV for ingestion.
    Upload {
        file: PathBuf,
        /// Wait for the delayed audit-trail refresh and print it.
        #[arg(long)]
        wait: bool,
    },
    /// Trigger the backend reconciliation job.
    Reconcile,
    /// Check that the backend is up.
    Health,
}

#[derive(Subcommand)]
enum AuditCommand {
    /// List entries, filtered server-side.
    List {
        #[arg(long)]
        severity: Option<Severity>,
        #[arg(long)]
        status: Option<AuditStatus>,
        /// Show full cards instead of a table.
        #[arg(long)]
        cards: bool,
    },
    /// Set the status of every entry for an invoice.
    SetStatus {
        inv_no: String,
        /// flagged, reviewed, or cleared.
        status: AuditStatus,
    },
}

impl Command {
    fn page(&self) -> Option<Page> {
        match self {
            Self::Dashboard => Some(Page::Dashboard),
            Self::Reconciliation { .. } => Some(Page::Reconciliation),
            Self::Graph { .. } => Some(Page::GraphView),
            Self::Vendors { .. } => Some(Page::VendorRisk),
            Self::Audit { .. } | Self::Upload { .. } | Self::Reconcile => Some(Page::AuditTrail),
            Self::Health => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("gstrecon v{}", env!("CARGO_PKG_VERSION"));

    let client = Arc::new(ApiClient::new(ClientConfig {
        base_url: cli.api_url.clone(),
        timeout: (cli.timeout_secs > 0).then(|| Duration::from_secs(cli.timeout_secs)),
    })?);

    if let Some(page) = cli.command.page() {
        println!("{}", shell_header(page, cli.compact));
    }

    match cli.command {
        Command::Dashboard => commands::dashboard(client).await,
        Command::Reconciliation {
            search,
            risk,
            status,
            export,
        } => {
            let filter = RecordFilter {
                search,
                risk,
                status,
            };
            commands::reconciliation(client, filter, export).await
        }
        Command::Graph { out } => commands::graph(client, out).await,
        Command::Vendors { risk, max_score } => commands::vendors(VendorFilter { risk, max_score }),
        Command::Audit { command } => match command {
            AuditCommand::List {
                severity,
                status,
                cards,
            } => commands::audit_list(client, AuditFilter { severity, status }, cards).await,
            AuditCommand::SetStatus { inv_no, status } => {
                commands::audit_set_status(client, &inv_no, status).await
            }
        },
        Command::Upload { file, wait } => commands::upload(client, &file, wait).await,
        Command::Reconcile => commands::reconcile(client).await,
        Command::Health => commands::health(client).await,
    }
}
