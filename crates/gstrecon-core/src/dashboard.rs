//! Dashboard summary figures and chart series.

use std::collections::BTreeMap;

use crate::model::{AuditEntry, AuditStatus, MismatchRecord, RecordStatus, RiskLevel};

/// Headline numbers and chart series for the dashboard page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSummary {
    pub total_mismatches: usize,
    /// Sum of absolute differences: input tax credit that may be disallowed.
    pub itc_at_risk: f64,
    pub high_risk: usize,
    pub unresolved: usize,
    pub flagged_audits: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_risk: BTreeMap<RiskLevel, usize>,
    /// Mismatched amount per filing period, keyed by period label.
    pub by_period: BTreeMap<String, f64>,
}

impl DashboardSummary {
    pub fn from_records(records: &[MismatchRecord], entries: &[AuditEntry]) -> Self {
        let mut summary = Self {
            total_mismatches: records.len(),
            flagged_audits: entries
                .iter()
                .filter(|e| e.status == AuditStatus::Flagged)
                .count(),
            ..Default::default()
        };

        for r in records {
            summary.itc_at_risk += r.difference.abs();
            if r.risk_level == RiskLevel::High {
                summary.high_risk += 1;
            }
            if r.status == RecordStatus::Unresolved {
                summary.unresolved += 1;
            }
            *summary.by_type.entry(r.mismatch_type.clone()).or_default() += 1;
            *summary.by_risk.entry(r.risk_level).or_default() += 1;

            let period = if r.period.is_empty() {
                "N/A".to_string()
            } else {
                r.period.clone()
            };
            *summary.by_period.entry(period).or_default() += r.difference.abs();
        }
        summary
    }

    /// Share of mismatches already resolved, 0.0–1.0.
    pub fn resolution_rate(&self, records: &[MismatchRecord]) -> f64 {
        if records.is_empty() {
            return 0.0;
        }
        let resolved = records
            .iter()
            .filter(|r| r.status == RecordStatus::Resolved)
            .count();
        resolved as f64 / records.len() as f64
    }
}

/// Format a rupee amount with Indian digit grouping, e.g. `₹12,34,567`.
pub fn format_inr(amount: f64) -> String {
    let rounded = amount.abs().round() as u64;
    let digits = rounded.to_string();
    let grouped = if digits.len() <= 3 {
        digits
    } else {
        let (head, tail) = digits.split_at(digits.len() - 3);
        let mut parts: Vec<&str> = Vec::new();
        let mut rest = head;
        while rest.len() > 2 {
            let (l, r) = rest.split_at(rest.len() - 2);
            parts.push(r);
            rest = l;
        }
        parts.push(rest);
        parts.reverse();
        format!("{},{}", parts.join(","), tail)
    };
    if amount < 0.0 && rounded > 0 {
        format!("-₹{grouped}")
    } else {
        format!("₹{grouped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::tests::entry;
    use crate::filter::tests::record;
    use crate::model::Severity;

    #[test]
    fn summary_counts() {
        let mut records = vec![
            record("1", "INV-1", "27A", RiskLevel::High, RecordStatus::Unresolved),
            record("2", "INV-2", "27A", RiskLevel::Low, RecordStatus::Resolved),
            record("3", "INV-3", "29B", RiskLevel::High, RecordStatus::UnderReview),
        ];
        records[1].mismatch_type = "Missing".into();
        records[2].difference = -300.0;
        records[2].period = String::new();

        let entries = vec![
            entry("AUD-001", "INV-1", Severity::High, AuditStatus::Flagged),
            entry("AUD-002", "INV-3", Severity::High, AuditStatus::Cleared),
        ];

        let s = DashboardSummary::from_records(&records, &entries);
        assert_eq!(s.total_mismatches, 3);
        assert_eq!(s.itc_at_risk, 700.0);
        assert_eq!(s.high_risk, 2);
        assert_eq!(s.unresolved, 1);
        assert_eq!(s.flagged_audits, 1);
        assert_eq!(s.by_type["Amount Mismatch"], 2);
        assert_eq!(s.by_type["Missing"], 1);
        assert_eq!(s.by_risk[&RiskLevel::High], 2);
        assert_eq!(s.by_period["2024-03"], 400.0);
        assert_eq!(s.by_period["N/A"], 300.0);
        assert!((s.resolution_rate(&records) - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_summary() {
        let s = DashboardSummary::from_records(&[], &[]);
        assert_eq!(s, DashboardSummary::default());
        assert_eq!(s.resolution_rate(&[]), 0.0);
    }

    #[test]
    fn indian_grouping() {
        assert_eq!(format_inr(0.0), "₹0");
        assert_eq!(format_inr(999.4), "₹999");
        assert_eq!(format_inr(1000.0), "₹1,000");
        assert_eq!(format_inr(123456.0), "₹1,23,456");
        assert_eq!(format_inr(12345678.0), "₹1,23,45,678");
        assert_eq!(format_inr(-50000.0), "-₹50,000");
    }
}
