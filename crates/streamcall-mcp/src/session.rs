//! Server-assigned session tracking.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

use crate::negotiate::SESSION_HEADER;

/// The session id currently held by one client.
///
/// Not synchronized. The owning client serializes access.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionState {
    id: Option<String>,
}

impl SessionState {
    /// Create an empty session state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The held session id.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Whether a session id is held.
    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }

    /// Return `base` plus the session header when a session id is held.
    pub fn attach_headers(&self, mut base: HeaderMap) -> HeaderMap {
        let Some(id) = self.id.as_deref() else {
            return base;
        };
        match HeaderValue::from_str(id) {
            Ok(value) => {
                base.insert(HeaderName::from_static(SESSION_HEADER), value);
            }
            Err(_) => warn!(session_id = %id, "Session id is not a valid header value"),
        }
        base
    }

    /// Replace the held session id. Last write wins.
    pub fn update(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.id.as_deref() != Some(id.as_str()) {
            debug!(session_id = %id, previous = ?self.id, "Session id updated");
        }
        self.id = Some(id);
    }

    /// Forget the held session id.
    pub fn clear(&mut self) -> Option<String> {
        self.id.take()
    }
}
