//! Audit trail filters and the optimistic status update.

use crate::model::{AuditEntry, AuditStatus, Severity};

/// Server-side filters for `GET /api/v1/audit-trail`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub severity: Option<Severity>,
    pub status: Option<AuditStatus>,
}

impl AuditFilter {
    /// Query pairs for the request; unset filters are omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, &'static str)> {
        let mut pairs = Vec::new();
        if let Some(s) = self.severity {
            pairs.push(("severity", s.as_str()));
        }
        if let Some(s) = self.status {
            pairs.push(("status", s.as_str()));
        }
        pairs
    }
}

/// Set `status` on every entry whose invoice number is `inv_no`.
///
/// The backend keys status by invoice, not by entry id, so one invoice with
/// several findings flips all of them. Returns the number of entries touched.
pub fn apply_status(entries: &mut [AuditEntry], inv_no: &str, status: AuditStatus) -> usize {
    let mut touched = 0;
    for entry in entries.iter_mut().filter(|e| e.inv_no == inv_no) {
        entry.status = status;
        touched += 1;
    }
    touched
}

/// Traversal path joined for display, e.g. `Invoice Node → GSTR-1 Filing`.
pub fn format_path(path: &[String]) -> String {
    path.join(" → ")
}

/// Counts per status, in flagged/reviewed/cleared order.
pub fn status_counts(entries: &[AuditEntry]) -> [(AuditStatus, usize); 3] {
    [AuditStatus::Flagged, AuditStatus::Reviewed, AuditStatus::Cleared]
        .map(|s| (s, entries.iter().filter(|e| e.status == s).count()))
}
