//! Page controllers: fetch, upload, and mutation flows over shared view
//! state.
//!
//! Controllers are cheap to clone; clones share one [`FetchState`], so a
//! background refresh and the foreground both see the same data. Refreshes
//! may overlap freely; the generation token in [`FetchState`] ensures only
//! the newest request's response lands.

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use gstrecon_core::audit::{AuditFilter, apply_status};
use gstrecon_core::graph::{GraphView, RenderOptions, render};
use gstrecon_core::model::{AuditEntry, AuditStatus, GraphData, MismatchRecord};
use gstrecon_core::upload::REFRESH_DELAY;
use gstrecon_core::{ApiError, FetchState, Notice, Resolution};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::http::ApiClient;

/// Shared, lock-protected [`FetchState`] for one page.
pub struct Synced<T> {
    state: Arc<Mutex<FetchState<T>>>,
    what: &'static str,
}

impl<T> Clone for Synced<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            what: self.what,
        }
    }
}

impl<T> Synced<T> {
    /// `what` names the data in error messages ("audit trail").
    pub fn new(what: &'static str) -> Self {
        Self {
            state: Arc::new(Mutex::new(FetchState::new())),
            what,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FetchState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `request` as the newest fetch for this page.
    ///
    /// The token is taken when this future is first polled, so of two
    /// overlapping calls the one polled last wins.
    pub async fn sync<F>(&self, request: F) -> Resolution
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let token = self.lock().begin();
        let result = request.await;
        if let Err(err) = &result {
            warn!(what = self.what, error = %err, "fetch failed");
        }
        let resolution = self.lock().resolve(token, result, self.what);
        if resolution == Resolution::Stale {
            warn!(
                what = self.what,
                generation = token.generation(),
                "discarded response from superseded request"
            );
        }
        resolution
    }

    /// Read the current state.
    pub fn with<R>(&self, f: impl FnOnce(&FetchState<T>) -> R) -> R {
        f(&self.lock())
    }

    /// Mutate the current state.
    pub fn update<R>(&self, f: impl FnOnce(&mut FetchState<T>) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn error(&self) -> Option<String> {
        self.with(|s| s.error().map(str::to_string))
    }

    pub fn is_loading(&self) -> bool {
        self.with(|s| s.is_loading())
    }
}

impl<T: Clone> Synced<T> {
    pub fn data(&self) -> Option<T> {
        self.with(|s| s.data().cloned())
    }
}

// ── Reconciliation ──

#[derive(Clone)]
pub struct ReconciliationPage {
    client: Arc<ApiClient>,
    pub state: Synced<Vec<MismatchRecord>>,
}

impl ReconciliationPage {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            state: Synced::new("reconciliation data"),
        }
    }

    pub async fn refresh(&self) -> Resolution {
        let client = Arc::clone(&self.client);
        self.state
            .sync(async move { client.reconciliation().await.map(|r| r.records) })
            .await
    }
}

// ── Graph ──

#[derive(Clone)]
pub struct GraphPage {
    client: Arc<ApiClient>,
    pub state: Synced<GraphData>,
}

impl GraphPage {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            state: Synced::new("graph"),
        }
    }

    pub async fn refresh(&self) -> Resolution {
        let client = Arc::clone(&self.client);
        self.state.sync(async move { client.graph().await }).await
    }

    /// Rendered view of the loaded graph, or `None` before the first
    /// successful load.
    pub fn view(&self, opts: &RenderOptions) -> Option<GraphView> {
        self.state.with(|s| s.data().map(|g| render(g, opts)))
    }
}

// ── Audit trail ──

#[derive(Clone)]
pub struct AuditTrailPage {
    client: Arc<ApiClient>,
    filter: Arc<Mutex<AuditFilter>>,
    pub state: Synced<Vec<AuditEntry>>,
}

impl AuditTrailPage {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            filter: Arc::new(Mutex::new(AuditFilter::default())),
            state: Synced::new("audit trail"),
        }
    }

    pub fn filter(&self) -> AuditFilter {
        *self.filter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change the filters and fetch with them.
    pub async fn load(&self, filter: AuditFilter) -> Resolution {
        *self.filter.lock().unwrap_or_else(PoisonError::into_inner) = filter;
        let client = Arc::clone(&self.client);
        self.state
            .sync(async move { client.audit_trail(filter).await.map(|r| r.entries) })
            .await
    }

    /// Fetch again with the current filters.
    pub async fn refresh(&self) -> Resolution {
        self.load(self.filter()).await
    }

    /// Set the status for every local entry of `inv_no`, then tell the
    /// backend.
    ///
    /// The local change is not rolled back if the request fails; the
    /// returned notice reports the failure. Fetches already in flight are
    /// superseded so their older snapshot cannot overwrite the change.
    pub async fn set_status(&self, inv_no: &str, status: AuditStatus) -> Notice {
        let touched = self.state.update(|s| {
            s.supersede();
            s.data_mut()
                .map_or(0, |entries| apply_status(entries, inv_no, status))
        });
        info!(inv_no, %status, touched, "applied status locally");

        match self.client.update_audit_status(inv_no, status).await {
            Ok(resp) => Notice::success(
                resp.message
                    .unwrap_or_else(|| format!("{inv_no} marked as {status}.")),
            ),
            Err(err) => {
                warn!(inv_no, error = %err, "status update failed; local state kept");
                Notice::error(err.action_message(&format!("Status update for {inv_no}")))
            }
        }
    }
}

// ── Upload & reconcile ──

/// Result of [`UploadController::upload`].
pub struct UploadOutcome {
    pub notice: Notice,
    /// Delayed audit-trail refresh, present only after a successful upload.
    pub refresh: Option<JoinHandle<Resolution>>,
}

/// Clears the in-progress flag when the upload finishes or its future is
/// dropped.
struct UploadGuard<'a>(&'a AtomicBool);

impl Drop for UploadGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct UploadController {
    client: Arc<ApiClient>,
    audit: AuditTrailPage,
    delay: Duration,
    uploading: Arc<AtomicBool>,
}

impl UploadController {
    pub fn new(client: Arc<ApiClient>, audit: AuditTrailPage) -> Self {
        Self {
            client,
            audit,
            delay: REFRESH_DELAY,
            uploading: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading.load(Ordering::SeqCst)
    }

    /// Upload a CSV and schedule an audit-trail refresh after the fixed
    /// delay. The refresh is a timer, not a completion signal: it may run
    /// before the backend has finished reconciling.
    pub async fn upload(&self, path: &Path) -> UploadOutcome {
        if self.uploading.swap(true, Ordering::SeqCst) {
            return UploadOutcome {
                notice: Notice::info("An upload is already in progress."),
                refresh: None,
            };
        }
        let result = {
            let _guard = UploadGuard(&*self.uploading);
            self.client.upload_csv(path).await
        };

        match result {
            Ok(resp) => {
                let audit = self.audit.clone();
                let delay = self.delay;
                let refresh = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    audit.refresh().await
                });
                let mut message = format!("Imported {} rows.", resp.rows);
                if let Some(note) = resp.note {
                    message.push(' ');
                    message.push_str(&note);
                }
                UploadOutcome {
                    notice: Notice::success(message),
                    refresh: Some(refresh),
                }
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "upload failed");
                UploadOutcome {
                    notice: Notice::error(err.action_message("Upload")),
                    refresh: None,
                }
            }
        }
    }

    /// Trigger the backend reconciliation job.
    pub async fn reconcile(&self) -> Notice {
        match self.client.reconcile().await {
            Ok(resp) => Notice::info(
                resp.message
                    .unwrap_or_else(|| "Reconciliation started.".to_string()),
            ),
            Err(err) => Notice::error(err.action_message("Reconciliation")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ClientConfig;
    use crate::testing::{FakeServer, Reply, dead_base_url};
    use gstrecon_core::error::UNREACHABLE_MESSAGE;
    use gstrecon_core::model::Severity;
    use std::sync::atomic::AtomicUsize;

    const RECORDS: &str = r#"{"total":1,"records":[{
        "id":"1","invoiceNo":"INV-001","supplierGstin":"27AAAAA0000A1Z5","supplierName":"27AAAAA0000A1Z5",
        "buyerGstin":"29BBBBB1111B1Z6","gstr1Amount":0,"gstr2bAmount":0,"difference":75000,
        "mismatchType":"Missing","riskLevel":"Medium","status":"Unresolved","period":"2024-03"
    }]}"#;

    fn client(base_url: &str) -> Arc<ApiClient> {
        Arc::new(
            ApiClient::new(ClientConfig {
                base_url: base_url.to_string(),
                timeout: Some(Duration::from_secs(5)),
            })
            .unwrap(),
        )
    }

    const ENTRIES: &str = r#"{"total":3,"entries":[
        {"id":"AUD-001","inv_no":"INV-1","severity":"high","status":"flagged","traversal_path":["Invoice Node"]},
        {"id":"AUD-002","inv_no":"INV-2","severity":"low","status":"flagged","traversal_path":[]},
        {"id":"AUD-003","inv_no":"INV-1","severity":"medium","status":"reviewed","traversal_path":[]}
    ]}"#;

    #[tokio::test]
    async fn reconciliation_unreachable_shows_message() {
        let page = ReconciliationPage::new(client(&dead_base_url().await));
        assert_eq!(page.refresh().await, Resolution::Applied);
        assert_eq!(page.state.error().as_deref(), Some(UNREACHABLE_MESSAGE));
        assert!(!page.state.is_loading());
        assert!(page.state.data().is_none());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_records() {
        let calls = AtomicUsize::new(0);
        let server = FakeServer::start(move |_| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Reply::json(200, RECORDS)
            } else {
                Reply::json(500, r#"{"detail":"Failed to fetch reconciliation data."}"#)
            }
        })
        .await;
        let page = ReconciliationPage::new(client(&server.base_url));

        page.refresh().await;
        assert_eq!(page.state.data().unwrap().len(), 1);
        assert!(page.state.error().is_none());

        page.refresh().await;
        assert_eq!(page.state.data().unwrap()[0].invoice_no, "INV-001");
        assert_eq!(
            page.state.error().as_deref(),
            Some("Failed to load reconciliation data.")
        );
    }

    #[tokio::test]
    async fn empty_graph_renders_placeholder() {
        let server = FakeServer::start(|_| Reply::json(200, r#"{"nodes":[],"links":[]}"#)).await;
        let page = GraphPage::new(client(&server.base_url));
        assert!(page.view(&RenderOptions::default()).is_none());
        page.refresh().await;
        assert_eq!(page.view(&RenderOptions::default()), Some(GraphView::Empty));
    }

    #[tokio::test]
    async fn only_latest_overlapping_fetch_is_applied() {
        // The first (severity=high) request answers last.
        let server = FakeServer::start(|req| {
            if req.target.contains("severity=high") {
                Reply::json(
                    200,
                    r#"{"entries":[{"id":"OLD","inv_no":"INV-OLD","severity":"high","status":"flagged"}]}"#,
                )
                .delayed(Duration::from_millis(300))
            } else {
                Reply::json(
                    200,
                    r#"{"entries":[{"id":"NEW","inv_no":"INV-NEW","severity":"low","status":"flagged"}]}"#,
                )
            }
        })
        .await;
        let page = AuditTrailPage::new(client(&server.base_url));

        let high = AuditFilter {
            severity: Some(Severity::High),
            status: None,
        };
        let low = AuditFilter {
            severity: Some(Severity::Low),
            status: None,
        };
        let (first, second) = tokio::join!(page.load(high), page.load(low));

        assert_eq!(first, Resolution::Stale);
        assert_eq!(second, Resolution::Applied);
        let entries = page.state.data().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "NEW");
        assert_eq!(page.filter(), low);
    }

    #[tokio::test]
    async fn set_status_updates_every_entry_of_invoice() {
        let server = FakeServer::start(|req| match req.method.as_str() {
            "PATCH" => Reply::json(200, r#"{"message":"INV-1 updated to 'cleared'"}"#),
            _ => Reply::json(200, ENTRIES),
        })
        .await;
        let page = AuditTrailPage::new(client(&server.base_url));
        page.refresh().await;

        let notice = page.set_status("INV-1", AuditStatus::Cleared).await;
        assert!(!notice.is_error());

        let entries = page.state.data().unwrap();
        let statuses: Vec<AuditStatus> = entries.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            [AuditStatus::Cleared, AuditStatus::Flagged, AuditStatus::Cleared]
        );
        // No re-fetch happened: one GET, one PATCH.
        let methods: Vec<String> = server.requests().into_iter().map(|r| r.method).collect();
        assert_eq!(methods, ["GET", "PATCH"]);
    }

    #[tokio::test]
    async fn failed_status_update_keeps_local_change() {
        let server = FakeServer::start(|req| match req.method.as_str() {
            "PATCH" => Reply::json(404, r#"{"detail":"INV-2 not found."}"#),
            _ => Reply::json(200, ENTRIES),
        })
        .await;
        let page = AuditTrailPage::new(client(&server.base_url));
        page.refresh().await;

        let notice = page.set_status("INV-2", AuditStatus::Reviewed).await;
        assert_eq!(
            notice,
            Notice::error("Status update for INV-2 failed: INV-2 not found.")
        );
        let entries = page.state.data().unwrap();
        assert_eq!(entries[1].status, AuditStatus::Reviewed);
    }

    #[tokio::test]
    async fn status_change_wins_over_older_refresh() {
        let gets = AtomicUsize::new(0);
        let server = FakeServer::start(move |req| match req.method.as_str() {
            "PATCH" => Reply::json(200, r#"{"message":"ok"}"#),
            _ if gets.fetch_add(1, Ordering::SeqCst) == 0 => Reply::json(200, ENTRIES),
            _ => Reply::json(200, ENTRIES).delayed(Duration::from_millis(300)),
        })
        .await;
        let page = AuditTrailPage::new(client(&server.base_url));
        page.refresh().await;

        let (refresh, notice) = tokio::join!(page.refresh(), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            page.set_status("INV-1", AuditStatus::Cleared).await
        });

        assert_eq!(refresh, Resolution::Stale);
        assert!(!notice.is_error());
        assert!(!page.state.is_loading());
        let entries = page.state.data().unwrap();
        assert_eq!(entries[0].status, AuditStatus::Cleared);
        assert_eq!(entries[2].status, AuditStatus::Cleared);
    }

    #[tokio::test]
    async fn status_change_without_loaded_entries_still_patches() {
        let server = FakeServer::start(|_| Reply::json(200, r#"{"message":"done"}"#)).await;
        let page = AuditTrailPage::new(client(&server.base_url));

        let notice = page.set_status("INV-7", AuditStatus::Reviewed).await;
        assert_eq!(notice, Notice::success("done"));
        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "PATCH");
        assert_eq!(
            requests[0].target,
            "/api/v1/audit-trail/INV-7/status?new_status=reviewed"
        );
    }

    #[tokio::test]
    async fn rejected_upload_makes_no_request() {
        let server = FakeServer::start(|_| Reply::json(200, r#"{"rows":1}"#)).await;
        let c = client(&server.base_url);
        let uploads = UploadController::new(Arc::clone(&c), AuditTrailPage::new(c));

        let outcome = uploads.upload(Path::new("data.txt")).await;
        assert!(outcome.notice.is_error());
        assert!(outcome.refresh.is_none());
        assert!(!uploads.is_uploading());
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn upload_schedules_delayed_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gstr.csv");
        std::fs::write(&path, "supplier_gstin,buyer_gstin,inv_no,amount,status\n").unwrap();

        let server = FakeServer::start(|req| match req.method.as_str() {
            "POST" => Reply::json(200, r#"{"rows":42}"#),
            _ => Reply::json(200, ENTRIES),
        })
        .await;
        let c = client(&server.base_url);
        let audit = AuditTrailPage::new(Arc::clone(&c));
        let uploads = UploadController::new(c, audit.clone())
            .with_refresh_delay(Duration::from_millis(100));

        let outcome = uploads.upload(&path).await;
        assert_eq!(outcome.notice, Notice::success("Imported 42 rows."));
        assert_eq!(server.requests().len(), 1);

        let resolution = outcome.refresh.unwrap().await.unwrap();
        assert_eq!(resolution, Resolution::Applied);
        assert_eq!(audit.state.data().unwrap().len(), 3);
        let targets: Vec<String> = server.requests().into_iter().map(|r| r.target).collect();
        assert_eq!(targets, ["/api/v1/upload", "/api/v1/audit-trail"]);
    }

    #[tokio::test]
    async fn upload_failure_is_a_notice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gstr.csv");
        std::fs::write(&path, "inv_no\n").unwrap();

        let server = FakeServer::start(|_| {
            Reply::json(422, r#"{"detail":"Missing columns: {'amount'}"}"#)
        })
        .await;
        let c = client(&server.base_url);
        let uploads = UploadController::new(Arc::clone(&c), AuditTrailPage::new(c));
        let outcome = uploads.upload(&path).await;
        assert_eq!(
            outcome.notice,
            Notice::error("Upload failed: Missing columns: {'amount'}")
        );
        assert!(outcome.refresh.is_none());
        assert!(!uploads.is_uploading());
    }

    #[tokio::test]
    async fn second_upload_is_refused_while_first_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gstr.csv");
        std::fs::write(&path, "supplier_gstin,buyer_gstin,inv_no,amount,status\n").unwrap();

        let server = FakeServer::start(|_| {
            Reply::json(200, r#"{"rows":1}"#).delayed(Duration::from_millis(300))
        })
        .await;
        let c = client(&server.base_url);
        let uploads = UploadController::new(Arc::clone(&c), AuditTrailPage::new(c))
            .with_refresh_delay(Duration::from_secs(60));

        let (first, second) = tokio::join!(uploads.upload(&path), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(uploads.is_uploading());
            uploads.upload(&path).await
        });

        assert_eq!(first.notice, Notice::success("Imported 1 rows."));
        assert_eq!(second.notice, Notice::info("An upload is already in progress."));
        assert!(second.refresh.is_none());
        assert!(!uploads.is_uploading());
        let posts = server
            .requests()
            .into_iter()
            .filter(|r| r.method == "POST")
            .count();
        assert_eq!(posts, 1);
        if let Some(refresh) = first.refresh {
            refresh.abort();
        }
    }

    #[tokio::test]
    async fn abandoned_upload_clears_in_progress_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gstr.csv");
        std::fs::write(&path, "supplier_gstin,buyer_gstin,inv_no,amount,status\n").unwrap();

        let server = FakeServer::start(|_| {
            Reply::json(200, r#"{"rows":1}"#).delayed(Duration::from_millis(500))
        })
        .await;
        let c = client(&server.base_url);
        let uploads = UploadController::new(Arc::clone(&c), AuditTrailPage::new(c));

        let timed_out =
            tokio::time::timeout(Duration::from_millis(50), uploads.upload(&path)).await;
        assert!(timed_out.is_err());
        assert!(!uploads.is_uploading());
    }

    #[tokio::test]
    async fn reconcile_reports_backend_message() {
        let server = FakeServer::start(|_| {
            Reply::json(200, r#"{"message":"Reconciliation started."}"#)
        })
        .await;
        let c = client(&server.base_url);
        let uploads = UploadController::new(Arc::clone(&c), AuditTrailPage::new(c));
        let notice = uploads.reconcile().await;
        assert_eq!(notice, Notice::info("Reconciliation started."));
    }
}
