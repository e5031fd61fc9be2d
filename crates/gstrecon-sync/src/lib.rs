//! Sync layer: HTTP client for the reconciliation API and the page
//! controllers that keep local view state in step with it.

#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub mod pages;

#[cfg(all(test, feature = "http"))]
mod testing;

#[cfg(feature = "http")]
pub use http::{ApiClient, ClientConfig};
#[cfg(feature = "http")]
pub use pages::{
    AuditTrailPage, GraphPage, ReconciliationPage, Synced, UploadController, UploadOutcome,
};
