//! Transport DTOs exchanged with the reconciliation API.
//!
//! Records arrive already computed by the backend; the client only reads
//! them, except for the audit status which is mutated optimistically.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

// ── Enumerations ──

/// Risk classification attached to a mismatch record or vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

/// Resolution state of a mismatch record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RecordStatus {
    Unresolved,
    #[serde(rename = "Under Review")]
    UnderReview,
    Resolved,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unresolved => "Unresolved",
            Self::UnderReview => "Under Review",
            Self::Resolved => "Resolved",
        }
    }
}

/// Severity of an audit finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Review state of an audit entry: flagged → reviewed → cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Flagged,
    Reviewed,
    Cleared,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flagged => "flagged",
            Self::Reviewed => "reviewed",
            Self::Cleared => "cleared",
        }
    }
}

/// Error returned when a string names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for RiskLevel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(ParseEnumError {
                kind: "risk level",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for RecordStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();
        match norm.as_str() {
            "unresolved" => Ok(Self::Unresolved),
            "underreview" => Ok(Self::UnderReview),
            "resolved" => Ok(Self::Resolved),
            _ => Err(ParseEnumError {
                kind: "record status",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for Severity {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(ParseEnumError {
                kind: "severity",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for AuditStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flagged" => Ok(Self::Flagged),
            "reviewed" => Ok(Self::Reviewed),
            "cleared" => Ok(Self::Cleared),
            _ => Err(ParseEnumError {
                kind: "audit status",
                value: s.to_string(),
            }),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(RiskLevel, RecordStatus, Severity, AuditStatus);

// The backend title-cases or lower-cases these freely and falls back to
// "medium" when a value is missing, so unknown strings degrade to Medium.
impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Ok(s.parse().unwrap_or(Self::Medium))
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Ok(s.parse().unwrap_or(Self::Medium))
    }
}

impl<'de> Deserialize<'de> for RecordStatus {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ── Records ──

/// A discrepancy between GSTR-1 and GSTR-2B for one invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MismatchRecord {
    pub id: String,
    pub invoice_no: String,
    pub supplier_gstin: String,
    #[serde(default)]
    pub supplier_name: String,
    pub buyer_gstin: String,
    pub gstr1_amount: f64,
    pub gstr2b_amount: f64,
    pub difference: f64,
    pub mismatch_type: String,
    pub risk_level: RiskLevel,
    pub status: RecordStatus,
    #[serde(default)]
    pub period: String,
}

/// An AI- or rule-generated audit finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub inv_no: String,
    #[serde(default)]
    pub supplier_gstin: String,
    #[serde(default)]
    pub buyer_gstin: String,
    #[serde(default)]
    pub mismatch_type: String,
    pub severity: Severity,
    pub status: AuditStatus,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub root_cause: String,
    /// Ordered step labels walked by the backend traversal.
    #[serde(default)]
    pub traversal_path: Vec<String>,
}

/// Graph vertex (a taxpayer GSTIN).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstNode {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Directed edge (an invoice from supplier to buyer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstLink {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub color: String,
}

/// Payload of `GET /api/v1/graph`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    pub nodes: Vec<GstNode>,
    #[serde(default)]
    pub links: Vec<GstLink>,
}

impl GraphData {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Vendor compliance metrics shown on the dashboard and vendor risk page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vendor {
    pub gstin: String,
    pub name: String,
    /// 0–100, higher is better.
    pub compliance_score: u8,
    /// Share of returns filed on time, 0–100.
    pub filing_rate: u8,
    pub mismatch_count: u32,
    pub itc_at_risk: f64,
    pub risk_level: RiskLevel,
}

// ── Envelopes ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationResponse {
    #[serde(default)]
    pub total: Option<usize>,
    pub records: Vec<MismatchRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditTrailResponse {
    #[serde(default)]
    pub total: Option<usize>,
    pub entries: Vec<AuditEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub rows: u64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}
