//! Client-side filtering for the reconciliation table.

use crate::model::{MismatchRecord, RecordStatus, RiskLevel};

/// Active filters on the reconciliation page.
///
/// `search` is a case-insensitive substring matched against the invoice
/// number, supplier GSTIN, and supplier name. `risk` and `status` match
/// exactly when set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub search: String,
    pub risk: Option<RiskLevel>,
    pub status: Option<RecordStatus>,
}

impl RecordFilter {
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.risk.is_none() && self.status.is_none()
    }

    pub fn matches(&self, record: &MismatchRecord) -> bool {
        let needle = self.search.trim().to_lowercase();
        let text_ok = needle.is_empty()
            || [
                &record.invoice_no,
                &record.supplier_gstin,
                &record.supplier_name,
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle));

        text_ok
            && self.risk.is_none_or(|r| record.risk_level == r)
            && self.status.is_none_or(|s| record.status == s)
    }

    /// Filter `records`, preserving their order.
    pub fn apply<'a>(&self, records: &'a [MismatchRecord]) -> Vec<&'a MismatchRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}
