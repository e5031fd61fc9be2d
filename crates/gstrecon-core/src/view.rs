//! Per-page view state.
//!
//! Every page holds a [`FetchState`]: the last successfully loaded data, a
//! loading flag, and the message of the last failure. Each fetch takes a
//! [`RequestToken`] from [`FetchState::begin`]; a response is only applied if
//! its token is still the newest, so a slow response to an older request can
//! never overwrite the result of a newer one.

use tracing::debug;

use crate::error::ApiError;

/// Generation number handed to a request when it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// Outcome of [`FetchState::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    /// A newer request was started after this one; the response was dropped.
    Stale,
}

#[derive(Debug, Clone)]
pub struct FetchState<T> {
    data: Option<T>,
    loading: bool,
    error: Option<String>,
    generation: u64,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            generation: 0,
        }
    }
}

impl<T> FetchState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request. Any in-flight request becomes stale.
    pub fn begin(&mut self) -> RequestToken {
        self.generation += 1;
        self.loading = true;
        RequestToken(self.generation)
    }

    /// Make every in-flight request stale without starting a new one. Used
    /// after a local edit that an older response would overwrite.
    pub fn supersede(&mut self) {
        self.generation += 1;
        self.loading = false;
    }

    /// Apply a response if `token` is still the newest request.
    ///
    /// Success replaces the data and clears the error. Failure records a
    /// user-facing message and keeps whatever was loaded before.
    pub fn resolve(
        &mut self,
        token: RequestToken,
        result: Result<T, ApiError>,
        what: &str,
    ) -> Resolution {
        if token.0 != self.generation {
            debug!(
                token = token.0,
                latest = self.generation,
                "dropping stale response"
            );
            return Resolution::Stale;
        }
        self.loading = false;
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
            }
            Err(err) => {
                self.error = Some(err.user_message(what));
            }
        }
        Resolution::Applied
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn data_mut(&mut self) -> Option<&mut T> {
        self.data.as_mut()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn latest(&self) -> u64 {
        self.generation
    }
}

/// Kind of a transient notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Info,
    Error,
}

/// Toast-style notification produced by uploads and mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UNREACHABLE_MESSAGE;

    #[test]
    fn begin_sets_loading() {
        let mut state: FetchState<Vec<u32>> = FetchState::new();
        assert!(!state.is_loading());
        let token = state.begin();
        assert!(state.is_loading());
        assert_eq!(token.generation(), 1);
    }

    #[test]
    fn success_replaces_data_and_clears_error() {
        let mut state = FetchState::new();
        let t = state.begin();
        state.resolve(t, Err(ApiError::NetworkUnreachable("x".into())), "data");
        assert_eq!(state.error(), Some(UNREACHABLE_MESSAGE));

        let t = state.begin();
        assert_eq!(state.resolve(t, Ok(vec![1, 2]), "data"), Resolution::Applied);
        assert_eq!(state.data(), Some(&vec![1, 2]));
        assert!(state.error().is_none());
        assert!(!state.is_loading());
    }

    #[test]
    fn failure_keeps_previous_data() {
        let mut state = FetchState::new();
        let t = state.begin();
        state.resolve(t, Ok(vec![7]), "data");
        let t = state.begin();
        state.resolve(t, Err(ApiError::from_status(500, "boom")), "data");
        assert_eq!(state.data(), Some(&vec![7]));
        assert_eq!(state.error(), Some("Failed to load data."));
    }

    #[test]
    fn supersede_drops_in_flight_response() {
        let mut state = FetchState::new();
        let t = state.begin();
        state.resolve(t, Ok(vec![1]), "data");

        let in_flight = state.begin();
        state.data_mut().unwrap().push(2);
        state.supersede();
        assert!(!state.is_loading());

        assert_eq!(state.resolve(in_flight, Ok(vec![9]), "data"), Resolution::Stale);
        assert_eq!(state.data(), Some(&vec![1, 2]));
    }

    #[test]
    fn stale_response_is_dropped() {
        let mut state = FetchState::new();
        let older = state.begin();
        let newer = state.begin();

        assert_eq!(state.resolve(newer, Ok("new"), "data"), Resolution::Applied);
        assert_eq!(state.resolve(older, Ok("old"), "data"), Resolution::Stale);
        assert_eq!(state.data(), Some(&"new"));
    }

    #[test]
    fn stale_error_does_not_clobber_loading_of_newer_request() {
        let mut state: FetchState<u8> = FetchState::new();
        let older = state.begin();
        let _newer = state.begin();
        state.resolve(older, Err(ApiError::Decode("bad".into())), "data");
        assert!(state.is_loading());
        assert!(state.error().is_none());
    }

    #[test]
    fn notices() {
        assert!(Notice::error("nope").is_error());
        assert!(!Notice::success("ok").is_error());
        assert_eq!(Notice::info("hi").kind, NoticeKind::Info);
    }
}
