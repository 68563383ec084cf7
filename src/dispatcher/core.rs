//! Dispatcher core module - hot path for request dispatch.
//!
//! # JSF Compliance (Rule 206)
//!
//! Per request the dispatcher clones two request/response handles per stage
//! and allocates one completion closure; chains and the router are shared.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::chain::{Chain, ChainOptions, Control, Done, Handler};
use crate::router::Router;
use crate::server::{Request, Response};

/// Server-wide composition of a `pre` chain, a `use` chain and a router.
///
/// ```rust
/// use brrtchain::chain::Handler;
/// use brrtchain::dispatcher::Dispatcher;
/// use brrtchain::router::{RouteSpec, Router, RouterOptions};
/// use http::Method;
///
/// let mut router = Router::new(RouterOptions::default());
/// router
///     .mount(
///         RouteSpec::new("health", Method::GET, "/health"),
///         vec![Handler::new(|_req, res, next| {
///             res.send(200, serde_json::json!({ "status": "ok" }));
///             next.proceed();
///         })],
///     )
///     .unwrap();
///
/// let mut dispatcher = Dispatcher::new(router);
/// dispatcher.add(Handler::new(|_req, res, next| {
///     res.set_header("X-Served-By", "brrtchain");
///     next.proceed();
/// }));
/// ```
#[derive(Debug, Clone)]
pub struct Dispatcher {
    pre: Chain,
    use_chain: Chain,
    router: Arc<Router>,
}

impl Dispatcher {
    /// Wrap a fully mounted router. Both chains use the router's
    /// continuation options.
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self::with_router(Arc::new(router))
    }

    /// Like [`Dispatcher::new`] for a router that is already shared
    #[must_use]
    pub fn with_router(router: Arc<Router>) -> Self {
        let opts = router.options();
        let chain_options = ChainOptions {
            once_next: opts.once_next,
            strict_next: opts.strict_next,
        };
        Self {
            pre: Chain::new(chain_options),
            use_chain: Chain::new(chain_options),
            router,
        }
    }

    /// Append a handler that runs before anything else
    pub fn pre(&mut self, handler: impl Into<Handler>) {
        self.pre.add(handler);
    }

    /// Append a server-wide handler that runs after `pre`, before routing
    pub fn add(&mut self, handler: impl Into<Handler>) {
        self.use_chain.add(handler);
    }

    /// The router requests are dispatched to
    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// The `pre` chain
    #[must_use]
    pub fn pre_chain(&self) -> &Chain {
        &self.pre
    }

    /// The server-wide `use` chain
    #[must_use]
    pub fn use_chain(&self) -> &Chain {
        &self.use_chain
    }

    /// Run `pre`, then `use`, then the router for one request.
    ///
    /// An error or abort from either chain skips the remaining stages and goes
    /// straight to `done`. When `done` receives an error and nothing has been
    /// sent yet, the error is rendered with [`Response::send_error`] first.
    pub fn dispatch<F>(&self, req: &Request, res: &Response, done: F)
    where
        F: Fn(Control) + Send + Sync + 'static,
    {
        let started = Instant::now();
        let finish: Arc<Done> = {
            let req = req.clone();
            let res = res.clone();
            Arc::new(move |control: Control| {
                if let Control::Error(err) = &control {
                    if res.is_sent() {
                        warn!(
                            method = %req.method(),
                            path = %req.path(),
                            error = %err,
                            "Error after response was sent"
                        );
                    } else {
                        res.send_error(err);
                    }
                }
                let outcome = match &control {
                    Control::Proceed => "proceed",
                    Control::Error(_) => "error",
                    Control::Abort => "abort",
                };
                let route = req.route().map(|r| r.name.clone());
                debug!(
                    method = %req.method(),
                    path = %req.path(),
                    route = ?route,
                    status = res.status(),
                    outcome,
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "Request dispatched"
                );
                for timing in req.handler_timings() {
                    debug!(
                        handler = %timing.name,
                        elapsed_us = timing.elapsed.as_micros() as u64,
                        "Handler timing"
                    );
                }
                done(control);
            })
        };

        let use_chain = self.use_chain.clone();
        let router = Arc::clone(&self.router);
        let (pre_req, pre_res) = (req.clone(), res.clone());
        self.pre.handle(req, res, move |control| {
            if !control.is_proceed() {
                finish(control);
                return;
            }
            let finish = Arc::clone(&finish);
            let router = Arc::clone(&router);
            let (use_req, use_res) = (pre_req.clone(), pre_res.clone());
            use_chain.handle(&pre_req, &pre_res, move |control| {
                if !control.is_proceed() {
                    finish(control);
                    return;
                }
                let finish = Arc::clone(&finish);
                router.lookup(&use_req, &use_res, move |control| finish(control));
            });
        });
    }
}
