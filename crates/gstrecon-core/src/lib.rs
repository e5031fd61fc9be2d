//! Core types and page logic for the GST reconciliation console.
//!
//! Everything here is pure: the HTTP side lives in `gstrecon-sync`.

pub mod audit;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod filter;
pub mod graph;
pub mod model;
pub mod nav;
pub mod schema;
pub mod upload;
pub mod vendor;
pub mod view;

pub use error::ApiError;
pub use model::{
    AuditEntry, AuditStatus, GraphData, GstLink, GstNode, MismatchRecord, RecordStatus, RiskLevel,
    Severity, Vendor,
};
pub use view::{FetchState, Notice, NoticeKind, RequestToken, Resolution};
