use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::{json, Value};
use smallvec::SmallVec;
use tracing::debug;

use crate::error::{escape_html, RoutingError};

/// Maximum inline headers before heap allocation
/// Most responses have ≤16 headers (JSF: no heap in hot path)
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for the hot path
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Plain response data: status, headers and JSON body
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// HTTP response headers (stack-allocated for ≤16 headers)
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    /// Response body as JSON
    pub body: Value,
}

impl Default for HandlerResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HeaderVec::new(),
            body: Value::Null,
        }
    }
}

impl HandlerResponse {
    /// Get a header by name (case-insensitive)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or update a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

#[derive(Debug, Default)]
struct ResponseState {
    data: HandlerResponse,
    sent: bool,
}

/// Response handle shared by every handler of a request.
///
/// Like [`Request`](super::Request), clones share state. The core only ever
/// calls [`send`](Response::send) and [`set_header`](Response::set_header);
/// writing the bytes to a socket belongs to the surrounding server.
#[derive(Debug, Clone, Default)]
pub struct Response {
    inner: Arc<Mutex<ResponseState>>,
}

impl Response {
    /// Create an unsent response (status 200, no body)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ResponseState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set status and body and mark the response as sent
    pub fn send(&self, status: u16, body: Value) {
        let mut state = self.state();
        if state.sent {
            debug!(status, "Response already sent, overwriting");
        }
        state.data.status = status;
        state.data.body = body;
        state.sent = true;
    }

    /// Send a bodyless response
    pub fn send_status(&self, status: u16) {
        self.send(status, Value::Null);
    }

    /// Render an error as a JSON problem body.
    ///
    /// [`RoutingError`]s keep their status code (and `Allow` header for 405s);
    /// anything else is a 500. Messages are HTML-escaped.
    pub fn send_error(&self, err: &anyhow::Error) {
        match err.downcast_ref::<RoutingError>() {
            Some(routing) => {
                if let Some(allow) = routing.allow_header() {
                    self.set_header("Allow", allow);
                }
                self.send(
                    routing.status().as_u16(),
                    json!({ "code": routing.code(), "message": routing.client_message() }),
                );
            }
            None => self.send(
                500,
                json!({ "code": "InternalError", "message": escape_html(&err.to_string()) }),
            ),
        }
    }

    /// Add or replace a header
    pub fn set_header(&self, name: &str, value: impl Into<String>) {
        self.state().data.set_header(name, value.into());
    }

    /// Read a header (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.state().data.get_header(name).map(str::to_owned)
    }

    /// Current status code
    #[must_use]
    pub fn status(&self) -> u16 {
        self.state().data.status
    }

    /// Current body
    #[must_use]
    pub fn body(&self) -> Value {
        self.state().data.body.clone()
    }

    /// Whether `send` has been called
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.state().sent
    }

    /// Copy of the response data
    #[must_use]
    pub fn snapshot(&self) -> HandlerResponse {
        self.state().data.clone()
    }
}
