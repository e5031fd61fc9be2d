//! Terminal rendering: tables, audit cards, bar charts, error panels, and
//! notices.

use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use gstrecon_core::audit::format_path;
use gstrecon_core::dashboard::{DashboardSummary, format_inr};
use gstrecon_core::{AuditEntry, Notice, NoticeKind};

const BAR_WIDTH: usize = 32;
const LABEL_WIDTH: usize = 26;

// ── Tables ──

pub fn print_table(batch: &RecordBatch) -> anyhow::Result<()> {
    if batch.num_rows() == 0 {
        println!("(no rows)");
        return Ok(());
    }
    println!("{}", pretty_format_batches(std::slice::from_ref(batch))?);
    Ok(())
}

// ── Audit cards ──

/// Print one audit entry as a vertical card.
pub fn print_audit_card(entry: &AuditEntry) {
    println!("=== {} · {} ===", entry.id, entry.inv_no);
    if !entry.mismatch_type.is_empty() {
        println!("{}", entry.mismatch_type);
    }
    println!();

    print_section(
        "Finding",
        &[
            ("severity", entry.severity.to_string()),
            ("status", entry.status.to_string()),
            ("supplier_gstin", entry.supplier_gstin.clone()),
            ("buyer_gstin", entry.buyer_gstin.clone()),
            ("amount", amount_or_empty(entry.amount)),
            ("period", entry.period.clone()),
        ],
    );
    print_text("Description", &entry.description);
    print_text("Root cause", &entry.root_cause);
    if !entry.traversal_path.is_empty() {
        println!("Traversal path ({} steps)", entry.traversal_path.len());
        println!("  {}", format_path(&entry.traversal_path));
        println!();
    }
}

fn amount_or_empty(amount: f64) -> String {
    if amount == 0.0 {
        String::new()
    } else {
        format_inr(amount)
    }
}

fn print_section(header: &str, rows: &[(&str, String)]) {
    if rows.iter().all(|(_, v)| v.is_empty()) {
        return;
    }
    println!("{header}");
    for (name, value) in rows {
        if value.is_empty() {
            continue;
        }
        println!("  {:<LABEL_WIDTH$} {}", name, value);
    }
    println!();
}

fn print_text(header: &str, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    println!("{header}");
    println!("  {}", text.trim());
    println!();
}

// ── Dashboard ──

pub fn print_dashboard(summary: &DashboardSummary, resolution_rate: f64) {
    println!("Overview");
    println!("  {:<LABEL_WIDTH$} {}", "total mismatches", summary.total_mismatches);
    println!("  {:<LABEL_WIDTH$} {}", "ITC at risk", format_inr(summary.itc_at_risk));
    println!("  {:<LABEL_WIDTH$} {}", "high risk", summary.high_risk);
    println!("  {:<LABEL_WIDTH$} {}", "unresolved", summary.unresolved);
    println!("  {:<LABEL_WIDTH$} {}", "flagged audit entries", summary.flagged_audits);
    println!(
        "  {:<LABEL_WIDTH$} {:.0}%",
        "resolution rate",
        resolution_rate * 100.0
    );
    println!();

    let by_type: Vec<(String, f64)> = summary
        .by_type
        .iter()
        .map(|(k, v)| (k.clone(), *v as f64))
        .collect();
    print_bar_chart("Mismatches by type", &by_type, |v| format!("{v:.0}"));

    let by_risk: Vec<(String, f64)> = summary
        .by_risk
        .iter()
        .map(|(k, v)| (k.to_string(), *v as f64))
        .collect();
    print_bar_chart("Mismatches by risk", &by_risk, |v| format!("{v:.0}"));

    let by_period: Vec<(String, f64)> = summary
        .by_period
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    print_bar_chart("Mismatched amount by period", &by_period, format_inr);
}

/// Horizontal bar chart scaled to the largest value.
pub fn print_bar_chart(title: &str, series: &[(String, f64)], fmt: impl Fn(f64) -> String) {
    if series.is_empty() {
        return;
    }
    println!("{title}");
    for (label, value) in series {
        println!("  {:<LABEL_WIDTH$} {} {}", label, bar(*value, series), fmt(*value));
    }
    println!();
}

fn bar(value: f64, series: &[(String, f64)]) -> String {
    let max = series.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    let len = if max > 0.0 {
        ((value / max) * BAR_WIDTH as f64).round() as usize
    } else {
        0
    };
    format!("{:<BAR_WIDTH$}", "█".repeat(len))
}

// ── Errors & notices ──

/// Inline error panel with a retry hint, shown when a page fails to load.
pub fn print_error_panel(message: &str, retry: &str) {
    println!("┌─ Error");
    println!("│ {message}");
    println!("│ Retry: {retry}");
    println!("└─");
}

pub fn print_notice(notice: &Notice) {
    let icon = match notice.kind {
        NoticeKind::Success => "✔",
        NoticeKind::Info => "ℹ",
        NoticeKind::Error => "✖",
    };
    println!("{icon} {}", notice.message);
}
