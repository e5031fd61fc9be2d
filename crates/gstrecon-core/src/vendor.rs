//! Vendor risk table.
//!
//! The backend exposes no vendor endpoint yet, so the page works from a
//! fixed sample set.

use crate::model::{RiskLevel, Vendor};

/// Filters on the vendor risk page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VendorFilter {
    pub risk: Option<RiskLevel>,
    /// Only vendors scoring at or below this threshold.
    pub max_score: Option<u8>,
}

impl VendorFilter {
    /// Filter and sort riskiest first (lowest compliance score, then
    /// highest ITC at risk).
    pub fn apply<'a>(&self, vendors: &'a [Vendor]) -> Vec<&'a Vendor> {
        let mut out: Vec<&Vendor> = vendors
            .iter()
            .filter(|v| self.risk.is_none_or(|r| v.risk_level == r))
            .filter(|v| self.max_score.is_none_or(|m| v.compliance_score <= m))
            .collect();
        out.sort_by(|a, b| {
            a.compliance_score
                .cmp(&b.compliance_score)
                .then(b.itc_at_risk.total_cmp(&a.itc_at_risk))
        });
        out
    }
}

/// Risk bucket for a compliance score.
pub fn risk_for_score(score: u8) -> RiskLevel {
    match score {
        0..=59 => RiskLevel::High,
        60..=79 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

pub fn sample_vendors() -> Vec<Vendor> {
    const ROWS: &[(&str, &str, u8, u8, u32, f64)] = &[
        ("27AABCU9603R1ZM", "Sharma Steel Industries", 42, 58, 14, 1_845_000.0),
        ("29AAGCM4567K1Z2", "Mehta Textiles Pvt Ltd", 55, 71, 9, 962_500.0),
        ("07AAACR5055K1Z8", "Reliance Components", 68, 84, 6, 410_200.0),
        ("33AAFCS1234H1Z9", "Sundaram Auto Parts", 74, 88, 4, 238_750.0),
        ("24AAECP7788L1Z3", "Patel Chemicals", 81, 93, 2, 96_000.0),
        ("19AADCB2230M1Z6", "Bengal Jute Exports", 89, 97, 1, 18_400.0),
        ("36AAHCT9012N1Z1", "Telangana Agro Foods", 93, 100, 0, 0.0),
    ];
    ROWS.iter()
        .map(|&(gstin, name, score, filing, mismatches, itc)| Vendor {
            gstin: gstin.to_string(),
            name: name.to_string(),
            compliance_score: score,
            filing_rate: filing,
            mismatch_count: mismatches,
            itc_at_risk: itc,
            risk_level: risk_for_score(score),
        })
        .collect()
}
