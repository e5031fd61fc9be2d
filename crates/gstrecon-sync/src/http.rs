//! HTTP client for the GST reconciliation API.

use std::path::Path;
use std::time::Duration;

use gstrecon_core::ApiError;
use gstrecon_core::audit::AuditFilter;
use gstrecon_core::model::{
    AuditStatus, AuditTrailResponse, GraphData, HealthResponse, MessageResponse,
    ReconciliationResponse, UploadResponse,
};
use gstrecon_core::upload::validate_upload;
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// e.g. `http://localhost:8000` (a trailing slash is ignored).
    pub base_url: String,
    /// `None` waits forever on a slow backend.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

/// Client for the `/api/v1` endpoints.
///
/// Every call distinguishes three failure classes: no response at all
/// ([`ApiError::NetworkUnreachable`]), HTTP 503
/// ([`ApiError::ServiceUnavailable`]), and any other non-2xx status
/// ([`ApiError::Server`]).
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

fn unreachable(err: reqwest::Error) -> ApiError {
    ApiError::NetworkUnreachable(err.to_string())
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Validation(format!("could not build HTTP client: {e}")))?;
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| ApiError::Validation(format!("invalid API base URL '{base_url}': {e}")))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build `{base_url}/{segments...}`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Validation(format!("invalid API base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Validation(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn body(&self, req: RequestBuilder) -> Result<String, ApiError> {
        let resp = req.send().await.map_err(unreachable)?;
        let status = resp.status();
        let body = resp.text().await.map_err(unreachable)?;
        if !status.is_success() {
            debug!(status = status.as_u16(), "request failed");
            return Err(ApiError::from_status(status.as_u16(), &body));
        }
        Ok(body)
    }

    async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let body = self.body(req).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Like [`json`](Self::json) but tolerates an empty body.
    async fn message(&self, req: RequestBuilder) -> Result<MessageResponse, ApiError> {
        let body = self.body(req).await?;
        if body.trim().is_empty() {
            return Ok(MessageResponse::default());
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// `GET /`: backend liveness and version.
    pub async fn health(&self) -> Result<HealthResponse, ApiError> {
        let url = self.endpoint(&[])?;
        self.json(self.client.get(url)).await
    }

    /// `GET /api/v1/graph`
    pub async fn graph(&self) -> Result<GraphData, ApiError> {
        let url = self.endpoint(&["api", "v1", "graph"])?;
        info!(url = %url, "fetching graph");
        let graph: GraphData = self.json(self.client.get(url)).await?;
        info!(nodes = graph.nodes.len(), links = graph.links.len(), "fetched graph");
        Ok(graph)
    }

    /// `GET /api/v1/reconciliation`
    pub async fn reconciliation(&self) -> Result<ReconciliationResponse, ApiError> {
        let url = self.endpoint(&["api", "v1", "reconciliation"])?;
        info!(url = %url, "fetching reconciliation records");
        let resp: ReconciliationResponse = self.json(self.client.get(url)).await?;
        info!(count = resp.records.len(), "fetched reconciliation records");
        Ok(resp)
    }

    /// `GET /api/v1/audit-trail`, filtered server-side.
    pub async fn audit_trail(&self, filter: AuditFilter) -> Result<AuditTrailResponse, ApiError> {
        let url = self.endpoint(&["api", "v1", "audit-trail"])?;
        info!(url = %url, ?filter, "fetching audit trail");
        let req = self.client.get(url).query(&filter.query_pairs());
        let resp: AuditTrailResponse = self.json(req).await?;
        info!(count = resp.entries.len(), "fetched audit trail");
        Ok(resp)
    }

    /// `POST /api/v1/upload` with the file as multipart field `file`.
    ///
    /// Non-CSV paths are rejected before any request is made.
    pub async fn upload_csv(&self, path: &Path) -> Result<UploadResponse, ApiError> {
        validate_upload(path)?;
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ApiError::Validation(format!("could not read {}: {e}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());

        let url = self.endpoint(&["api", "v1", "upload"])?;
        info!(url = %url, file = %file_name, bytes = bytes.len(), "uploading CSV");
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("text/csv")
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp: UploadResponse = self.json(self.client.post(url).multipart(form)).await?;
        info!(rows = resp.rows, "upload accepted");
        Ok(resp)
    }

    /// `POST /api/v1/reconcile`: start the backend job. Returns immediately;
    /// the job's results show up in the audit trail later.
    pub async fn reconcile(&self) -> Result<MessageResponse, ApiError> {
        let url = self.endpoint(&["api", "v1", "reconcile"])?;
        info!(url = %url, "triggering reconciliation");
        self.message(self.client.post(url)).await
    }

    /// `PATCH /api/v1/audit-trail/{inv_no}/status?new_status=`
    ///
    /// Keyed by invoice number: every entry for the invoice changes.
    pub async fn update_audit_status(
        &self,
        inv_no: &str,
        status: AuditStatus,
    ) -> Result<MessageResponse, ApiError> {
        let url = self.endpoint(&["api", "v1", "audit-trail", inv_no, "status"])?;
        info!(url = %url, status = %status, "updating audit status");
        let req = self
            .client
            .patch(url)
            .query(&[("new_status", status.as_str())]);
        self.message(req).await
    }
}
