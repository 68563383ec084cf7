//! Chain core module - hot path for handler dispatch.
//!
//! # JSF Compliance (Rule 206)
//!
//! The dispatch loop allocates one `Dispatch` per `handle` call and one `Next`
//! per invoked handler. Handler lists are shared through `Arc` and never
//! copied per request.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use std::sync::{Arc, Mutex, PoisonError};

use may::coroutine;
use tracing::{error, trace};

use super::handler::{Handler, HandlerKind};
use super::next::{Control, Next, NextPolicy};
use crate::runtime_config;
use crate::server::{Request, Response};

/// Terminal callback of a chain walk
pub type Done = dyn Fn(Control) + Send + Sync;

/// How continuations handed to handlers behave on repeated calls.
///
/// `strict_next` implies `once_next`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainOptions {
    /// Ignore every continuation call after the first
    pub once_next: bool,
    /// Panic on any continuation call after the first
    pub strict_next: bool,
}

impl ChainOptions {
    pub(crate) fn policy(self) -> NextPolicy {
        if self.strict_next {
            NextPolicy::Strict
        } else if self.once_next {
            NextPolicy::Once
        } else {
            NextPolicy::Permissive
        }
    }
}

/// Ordered, append-only list of handlers run one at a time for a request.
///
/// Insertion order is execution order. Normal handlers run while no error is
/// in flight, error handlers run while one is; a silent abort skips
/// everything. Cloning a `Chain` is cheap and shares the handler list until
/// one of the clones is appended to.
///
/// ```rust
/// use brrtchain::chain::{Chain, ChainOptions, Handler};
///
/// let mut chain = Chain::new(ChainOptions::default());
/// chain.add(Handler::new(|_req, _res, next| next.proceed()).named("first"));
/// chain.add(Handler::error(|err, _req, _res, next| next.fail(err)).named("on_error"));
/// assert_eq!(chain.count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Chain {
    handlers: Arc<Vec<Handler>>,
    options: ChainOptions,
}

impl Chain {
    /// Create an empty chain
    #[must_use]
    pub fn new(options: ChainOptions) -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
            options,
        }
    }

    /// Append a handler, or a whole chain run as one opaque handler
    pub fn add(&mut self, handler: impl Into<Handler>) {
        Arc::make_mut(&mut self.handlers).push(handler.into());
    }

    /// Number of top-level entries; a nested chain counts as one
    #[must_use]
    pub fn count(&self) -> usize {
        self.handlers.len()
    }

    /// Options this chain was built with
    #[must_use]
    pub fn options(&self) -> ChainOptions {
        self.options
    }

    /// Snapshot of the top-level handlers in registration order
    #[must_use]
    pub fn handlers(&self) -> Vec<Handler> {
        self.handlers.as_ref().clone()
    }

    /// Top-level handlers in registration order, one entry per `add` call.
    ///
    /// A nested chain stays a single [`HandlerKind::SubChain`] entry, so the
    /// length always equals [`Chain::count`].
    #[must_use]
    pub fn extract_handlers(&self) -> Vec<Handler> {
        self.handlers()
    }

    /// Leaf handlers in execution order, nested chains expanded in place
    #[must_use]
    pub fn leaf_handlers(&self) -> Vec<Handler> {
        let mut out = Vec::with_capacity(self.handlers.len());
        for handler in self.handlers.iter() {
            match handler.kind() {
                HandlerKind::SubChain(chain) => out.extend(chain.leaf_handlers()),
                _ => out.push(handler.clone()),
            }
        }
        out
    }

    /// Run the chain for one request.
    ///
    /// `done` fires on a fresh coroutine once the cursor passes the last
    /// handler, the request is closed, or a handler aborts. It receives
    /// `Control::Proceed` when no error is in flight.
    pub fn handle<F>(&self, req: &Request, res: &Response, done: F)
    where
        F: Fn(Control) + Send + Sync + 'static,
    {
        let dispatch = Arc::new(Dispatch {
            handlers: Arc::clone(&self.handlers),
            policy: self.options.policy(),
            cursor: Mutex::new(0),
            request: req.clone(),
            response: res.clone(),
            done: Arc::new(done),
        });
        dispatch.step(Control::Proceed);
    }
}

/// Per-request state of one chain walk
pub(crate) struct Dispatch {
    handlers: Arc<Vec<Handler>>,
    policy: NextPolicy,
    cursor: Mutex<usize>,
    request: Request,
    response: Response,
    done: Arc<Done>,
}

impl Dispatch {
    pub(crate) fn request(&self) -> &Request {
        &self.request
    }

    /// Advance the cursor until a handler accepts `control`, then invoke it.
    pub(crate) fn step(self: Arc<Self>, mut control: Control) {
        loop {
            if control.is_abort() || self.request.is_closed() {
                *self.cursor.lock().unwrap_or_else(PoisonError::into_inner) = self.handlers.len();
                self.complete(control);
                return;
            }

            let handler = {
                let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
                match self.handlers.get(*cursor) {
                    Some(handler) => {
                        *cursor += 1;
                        handler.clone()
                    }
                    None => {
                        drop(cursor);
                        self.complete(control);
                        return;
                    }
                }
            };

            control = match (control, handler.kind()) {
                (Control::Proceed, HandlerKind::Normal(f)) => {
                    let next = self.enter(&handler);
                    f(&self.request, &self.response, next);
                    return;
                }
                (Control::Proceed, HandlerKind::SubChain(chain)) => {
                    let next = self.enter(&handler);
                    chain.handle(&self.request, &self.response, move |c| next.resume(c));
                    return;
                }
                (Control::Error(err), HandlerKind::ErrorHandling(f)) => {
                    let next = self.enter(&handler);
                    f(err, &self.request, &self.response, next);
                    return;
                }
                (skipped, _) => {
                    trace!(
                        handler = %handler.display_name(),
                        error_in_flight = skipped.is_error(),
                        "Skipping handler"
                    );
                    skipped
                }
            };
        }
    }

    /// Record entry into `handler` and build its continuation
    fn enter(self: &Arc<Self>, handler: &Handler) -> Next {
        let name = handler.display_name();
        trace!(handler = %name, "Entering handler");
        self.request.set_current_handler(Arc::clone(&name));
        self.request.start_handler_timer(&name);
        Next::new(Arc::clone(self), name, self.policy)
    }

    /// Deliver `control` to the terminal callback on a new coroutine
    fn complete(&self, control: Control) {
        let done = Arc::clone(&self.done);
        let stack_size = runtime_config::global().stack_size;
        // SAFETY: may::coroutine::Builder::spawn() is marked unsafe by the may runtime.
        // The closure owns everything it touches (Arc'd callback, owned Control),
        // so nothing borrowed from this stack frame outlives it.
        let spawned = unsafe {
            coroutine::Builder::new()
                .stack_size(stack_size)
                .spawn(move || done(control))
        };
        if let Err(e) = spawned {
            error!(error = %e, stack_size, "Failed to spawn completion coroutine");
        }
    }
}
