use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use http::{Method, Uri};
use tracing::trace;

use crate::router::{ParamVec, Route};

/// Time spent inside one handler invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerTiming {
    /// Display name of the handler
    pub name: Arc<str>,
    /// Wall time between handler start and its continuation call
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
struct RequestState {
    params: HashMap<String, String>,
    route: Option<Arc<Route>>,
    current_handler: Option<Arc<str>>,
    running: Vec<(Arc<str>, Instant)>,
    timings: Vec<HandlerTiming>,
}

#[derive(Debug)]
struct RequestInner {
    method: Method,
    uri: Uri,
    original_url: String,
    closed: AtomicBool,
    state: Mutex<RequestState>,
}

/// Request as seen by the dispatch core.
///
/// A `Request` is a cheap handle: clones share the same underlying state, so a
/// handler can capture it and resume its chain later from another coroutine.
/// Mutable fields (params, matched route, timers) sit behind a mutex that is
/// never held while user code runs.
#[derive(Debug, Clone)]
pub struct Request {
    inner: Arc<RequestInner>,
}

impl Request {
    /// Create a request for the given method and URI
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        let original_url = uri.to_string();
        Self {
            inner: Arc::new(RequestInner {
                method,
                uri,
                original_url,
                closed: AtomicBool::new(false),
                state: Mutex::new(RequestState::default()),
            }),
        }
    }

    /// Parse `uri` and create a request
    ///
    /// # Errors
    ///
    /// Returns the parse error when `uri` is not a valid request target.
    pub fn try_new(method: Method, uri: &str) -> Result<Self, http::uri::InvalidUri> {
        Ok(Self::new(method, uri.parse()?))
    }

    fn state(&self) -> MutexGuard<'_, RequestState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// HTTP method
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    /// Full request URI
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    /// Path portion of the URI (no query string)
    #[must_use]
    pub fn path(&self) -> &str {
        self.inner.uri.path()
    }

    /// URL the request arrived with
    #[must_use]
    pub fn original_url(&self) -> &str {
        &self.inner.original_url
    }

    /// Snapshot of the request parameters
    #[must_use]
    pub fn params(&self) -> HashMap<String, String> {
        self.state().params.clone()
    }

    /// Look up a single parameter
    #[must_use]
    pub fn param(&self, name: &str) -> Option<String> {
        self.state().params.get(name).cloned()
    }

    /// Set a parameter, replacing any previous value
    pub fn set_param(&self, name: impl Into<String>, value: impl Into<String>) {
        self.state().params.insert(name.into(), value.into());
    }

    /// Merge matched path parameters. Incoming values win on key collision.
    pub(crate) fn merge_params(&self, params: &ParamVec) {
        let mut state = self.state();
        for (name, value) in params {
            state.params.insert(name.to_string(), value.clone());
        }
    }

    /// Route this request was dispatched to, once routed
    #[must_use]
    pub fn route(&self) -> Option<Arc<Route>> {
        self.state().route.clone()
    }

    pub(crate) fn set_route(&self, route: Arc<Route>) {
        self.state().route = Some(route);
    }

    /// Name of the handler most recently entered
    #[must_use]
    pub fn current_handler(&self) -> Option<Arc<str>> {
        self.state().current_handler.clone()
    }

    pub(crate) fn set_current_handler(&self, name: Arc<str>) {
        self.state().current_handler = Some(name);
    }

    /// Mark the request closed (client went away). Chains stop at the next step.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    /// Whether the request has been closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Start the timer for a handler about to run
    pub fn start_handler_timer(&self, name: &Arc<str>) {
        self.state().running.push((Arc::clone(name), Instant::now()));
    }

    /// Stop the most recent timer started under `name` and record its timing
    pub fn end_handler_timer(&self, name: &Arc<str>) {
        let mut state = self.state();
        let Some(pos) = state.running.iter().rposition(|(n, _)| n == name) else {
            return;
        };
        let (name, started) = state.running.remove(pos);
        let elapsed = started.elapsed();
        trace!(handler = %name, elapsed_us = elapsed.as_micros(), "Handler timer stopped");
        state.timings.push(HandlerTiming { name, elapsed });
    }

    /// Finished handler timings, in completion order
    #[must_use]
    pub fn handler_timings(&self) -> Vec<HandlerTiming> {
        self.state().timings.clone()
    }
}
