//! Page handlers: each fetches through its controller and renders the
//! result, or the page's error panel when the fetch failed.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use gstrecon_core::audit::{AuditFilter, status_counts};
use gstrecon_core::dashboard::DashboardSummary;
use gstrecon_core::export::{export_file_name, write_csv};
use gstrecon_core::filter::RecordFilter;
use gstrecon_core::graph::{EMPTY_PLACEHOLDER, GraphView, LinkKind, RenderOptions};
use gstrecon_core::schema::{audit_to_batch, records_to_batch, vendors_to_batch};
use gstrecon_core::upload::{REFRESH_DELAY, missing_columns, validate_upload};
use gstrecon_core::vendor::{VendorFilter, sample_vendors};
use gstrecon_core::{AuditStatus, Vendor};
use gstrecon_sync::{ApiClient, AuditTrailPage, GraphPage, ReconciliationPage, UploadController};
use tracing::{info, warn};

use crate::display::{
    print_audit_card, print_bar_chart, print_dashboard, print_error_panel, print_notice,
    print_table,
};

pub async fn dashboard(client: Arc<ApiClient>) -> anyhow::Result<()> {
    let recon = ReconciliationPage::new(Arc::clone(&client));
    let audit = AuditTrailPage::new(client);
    futures::join!(recon.refresh(), audit.refresh());

    if let Some(message) = recon.state.error() {
        print_error_panel(&message, "gstrecon dashboard");
        return Ok(());
    }
    // Audit entries only feed one figure; show the rest without them.
    if let Some(message) = audit.state.error() {
        warn!(%message, "audit trail unavailable for dashboard");
    }

    let records = recon.state.data().unwrap_or_default();
    let entries = audit.state.data().unwrap_or_default();
    let summary = DashboardSummary::from_records(&records, &entries);
    print_dashboard(&summary, summary.resolution_rate(&records));

    let vendors = sample_vendors();
    let riskiest: Vec<&Vendor> = VendorFilter::default().apply(&vendors).into_iter().take(3).collect();
    let series: Vec<(String, f64)> = riskiest
        .iter()
        .map(|v| (v.name.clone(), f64::from(v.compliance_score)))
        .collect();
    print_bar_chart("Lowest compliance scores", &series, |v| format!("{v:.0}/100"));
    Ok(())
}

pub async fn reconciliation(
    client: Arc<ApiClient>,
    filter: RecordFilter,
    export: Option<Option<PathBuf>>,
) -> anyhow::Result<()> {
    let page = ReconciliationPage::new(client);
    page.refresh().await;
    if let Some(message) = page.state.error() {
        print_error_panel(&message, "gstrecon reconciliation");
        return Ok(());
    }

    let records = page.state.data().unwrap_or_default();
    let filtered = filter.apply(&records);
    print_table(&records_to_batch(&filtered)?)?;
    println!("{} of {} records", filtered.len(), records.len());

    if let Some(path) = export {
        let path =
            path.unwrap_or_else(|| PathBuf::from(export_file_name(chrono::Local::now().date_naive())));
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        let mut out = BufWriter::new(file);
        let rows = write_csv(&mut out, filtered.iter().copied())?;
        out.flush()?;
        info!(rows, path = %path.display(), "exported reconciliation CSV");
        println!("Exported {rows} rows to {}", path.display());
    }
    Ok(())
}

pub async fn graph(client: Arc<ApiClient>, out: PathBuf) -> anyhow::Result<()> {
    let page = GraphPage::new(client);
    page.refresh().await;
    if let Some(message) = page.state.error() {
        print_error_panel(&message, "gstrecon graph");
        return Ok(());
    }

    match page.view(&RenderOptions::default()) {
        None | Some(GraphView::Empty) => println!("{EMPTY_PLACEHOLDER}"),
        Some(GraphView::Canvas(svg)) => {
            std::fs::write(&out, svg).with_context(|| format!("writing {}", out.display()))?;
            let graph = page.state.data().unwrap_or_default();
            let mismatches = graph
                .links
                .iter()
                .filter(|l| LinkKind::from_color(&l.color) == LinkKind::Mismatch)
                .count();
            println!(
                "Wrote graph with {} taxpayers and {} invoices ({} mismatched) to {}",
                graph.nodes.len(),
                graph.links.len(),
                mismatches,
                out.display()
            );
        }
    }
    Ok(())
}

pub fn vendors(filter: VendorFilter) -> anyhow::Result<()> {
    let vendors = sample_vendors();
    let rows = filter.apply(&vendors);
    print_table(&vendors_to_batch(&rows)?)?;
    println!("{} of {} vendors", rows.len(), vendors.len());
    Ok(())
}

pub async fn audit_list(
    client: Arc<ApiClient>,
    filter: AuditFilter,
    cards: bool,
) -> anyhow::Result<()> {
    let page = AuditTrailPage::new(client);
    page.load(filter).await;
    if let Some(message) = page.state.error() {
        print_error_panel(&message, "gstrecon audit list");
        return Ok(());
    }

    let entries = page.state.data().unwrap_or_default();
    if cards {
        for entry in &entries {
            print_audit_card(entry);
        }
    } else {
        print_table(&audit_to_batch(&entries)?)?;
    }
    let counts = status_counts(&entries)
        .map(|(status, n)| format!("{n} {status}"))
        .join(", ");
    println!("{} entries: {counts}", entries.len());
    Ok(())
}

pub async fn audit_set_status(
    client: Arc<ApiClient>,
    inv_no: &str,
    status: AuditStatus,
) -> anyhow::Result<()> {
    let page = AuditTrailPage::new(client);
    page.refresh().await;
    // The listing only feeds the local view; the PATCH goes out regardless.
    if let Some(message) = page.state.error() {
        warn!(%message, "audit trail unavailable; sending status update anyway");
    }

    let notice = page.set_status(inv_no, status).await;
    print_notice(&notice);

    let matching: Vec<_> = page
        .state
        .data()
        .unwrap_or_default()
        .into_iter()
        .filter(|e| e.inv_no == inv_no)
        .collect();
    if matching.is_empty() {
        println!("No local audit entries for {inv_no}.");
    } else {
        print_table(&audit_to_batch(&matching)?)?;
    }
    Ok(())
}

pub async fn upload(client: Arc<ApiClient>, file: &Path, wait: bool) -> anyhow::Result<()> {
    if validate_upload(file).is_ok() {
        preflight_header(file);
    }

    let audit = AuditTrailPage::new(Arc::clone(&client));
    let uploads = UploadController::new(client, audit.clone());
    let outcome = uploads.upload(file).await;
    print_notice(&outcome.notice);

    let Some(refresh) = outcome.refresh else {
        return Ok(());
    };
    if !wait {
        println!(
            "Reconciliation is running in the background; run `gstrecon audit list` in a few seconds."
        );
        return Ok(());
    }

    println!("Refreshing audit trail in {}s...", REFRESH_DELAY.as_secs());
    refresh.await?;
    if let Some(message) = audit.state.error() {
        print_error_panel(&message, "gstrecon audit list");
    } else {
        let entries = audit.state.data().unwrap_or_default();
        print_table(&audit_to_batch(&entries)?)?;
    }
    Ok(())
}

/// Warn about required columns missing from the header. The backend stays
/// the authority, so the upload goes ahead regardless.
fn preflight_header(file: &Path) {
    let header = File::open(file)
        .ok()
        .and_then(|f| BufReader::new(f).lines().next())
        .and_then(Result::ok);
    match header {
        Some(line) => {
            let missing = missing_columns(&line);
            if !missing.is_empty() {
                warn!(file = %file.display(), ?missing, "CSV header lacks required columns");
            }
        }
        None => warn!(file = %file.display(), "could not read CSV header"),
    }
}

pub async fn reconcile(client: Arc<ApiClient>) -> anyhow::Result<()> {
    let uploads = UploadController::new(Arc::clone(&client), AuditTrailPage::new(client));
    print_notice(&uploads.reconcile().await);
    Ok(())
}

pub async fn health(client: Arc<ApiClient>) -> anyhow::Result<()> {
    match client.health().await {
        Ok(h) => println!(
            "{} ({}): {}",
            client.base_url(),
            h.version.as_deref().unwrap_or("unknown version"),
            h.status
        ),
        Err(err) => print_error_panel(&err.user_message("backend status"), "gstrecon health"),
    }
    Ok(())
}
