use thiserror::Error;

/// Shown when no response came back at all (connect failure, timeout).
pub const UNREACHABLE_MESSAGE: &str = "Cannot reach the backend server.";
/// Shown for HTTP 503, which the backend returns when its database is down.
pub const UNAVAILABLE_MESSAGE: &str = "Database unavailable. Please try again later.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("backend unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("server returned {status}: {detail}")]
    Server { status: u16, detail: String },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("{0}")]
    Validation(String),
}

impl ApiError {
    /// Build the error for a non-success HTTP status.
    ///
    /// FastAPI wraps messages as `{"detail": "..."}`; the raw body is kept
    /// when it is not shaped that way.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
            .unwrap_or_else(|| body.trim().to_string());
        if status == 503 {
            Self::ServiceUnavailable(detail)
        } else {
            Self::Server { status, detail }
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::NetworkUnreachable(_))
    }

    /// Message for the inline error panel or toast. `what` names the data
    /// being loaded ("reconciliation data", "audit trail").
    pub fn user_message(&self, what: &str) -> String {
        match self {
            Self::NetworkUnreachable(_) => UNREACHABLE_MESSAGE.to_string(),
            Self::ServiceUnavailable(_) => UNAVAILABLE_MESSAGE.to_string(),
            Self::Validation(msg) => msg.clone(),
            Self::Server { .. } | Self::Decode(_) => format!("Failed to load {what}."),
        }
    }

    /// Message for a failed write (upload, status change, reconcile).
    /// `action` names it ("Upload"); the backend's `detail` is shown when
    /// it sent one.
    pub fn action_message(&self, action: &str) -> String {
        match self {
            Self::NetworkUnreachable(_) => UNREACHABLE_MESSAGE.to_string(),
            Self::ServiceUnavailable(_) => UNAVAILABLE_MESSAGE.to_string(),
            Self::Validation(msg) => msg.clone(),
            Self::Server { detail, .. } if !detail.is_empty() => {
                format!("{action} failed: {detail}")
            }
            Self::Server { .. } | Self::Decode(_) => format!("{action} failed."),
        }
    }
}
