//! # brrtchain
//!
//! **brrtchain** is the request-dispatch core of a coroutine-powered HTTP
//! service: ordered handler chains driven by continuations, and a radix-tree
//! router that maps `(method, path)` to a named route and runs that route's
//! chain.
//!
//! ## Overview
//!
//! Handlers do not return a response. Each one receives the request, the
//! response and a [`Next`](chain::Next) continuation, and resumes the chain by
//! calling it, possibly later and from another coroutine:
//!
//! - `next.proceed()` runs the next normal handler
//! - `next.fail(err)` skips to the next error handler
//! - `next.abort()` stops the chain silently
//!
//! ## Architecture
//!
//! - **[`chain`]** - handler list, continuation semantics, nested chains
//! - **[`router`]** - path templates, radix matching, 404/405 default route
//! - **[`dispatcher`]** - server-wide `pre` and `use` chains in front of the router
//! - **[`server`]** - shared request/response handles seen by handlers
//! - **[`error`]** - configuration errors and routing outcomes
//! - **[`runtime_config`]** - environment-driven runtime settings
//! - **[`logging`]** - `tracing` subscriber bootstrap
//!
//! ## Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Dispatcher
//!     participant Pre as pre chain
//!     participant Use as use chain
//!     participant Router
//!     participant Route as route chain
//!
//!     Client->>Dispatcher: dispatch(req, res, done)
//!     Dispatcher->>Pre: handle
//!     Pre-->>Dispatcher: Proceed
//!     Dispatcher->>Use: handle
//!     Use-->>Dispatcher: Proceed
//!     Dispatcher->>Router: lookup
//!     alt route matched
//!         Router->>Route: handle
//!         Route-->>Dispatcher: Proceed / Error / Abort
//!     else no route
//!         Router-->>Dispatcher: Error(404 or 405)
//!     end
//!     Dispatcher-->>Client: done(control)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtchain::chain::Handler;
//! use brrtchain::router::{RouteSpec, Router, RouterOptions};
//! use brrtchain::server::{Request, Response};
//! use http::Method;
//!
//! let mut router = Router::new(RouterOptions::from_env());
//! router
//!     .mount(
//!         RouteSpec::new("get_pet", Method::GET, "/pets/:id"),
//!         vec![
//!             Handler::new(|req, _res, next| {
//!                 if req.param("id").as_deref() == Some("0") {
//!                     next.fail(anyhow::anyhow!("pet 0 is reserved"));
//!                 } else {
//!                     next.proceed();
//!                 }
//!             })
//!             .named("validate_id"),
//!             Handler::new(|req, res, next| {
//!                 res.send(200, serde_json::json!({ "id": req.param("id") }));
//!                 next.proceed();
//!             })
//!             .named("get_pet"),
//!         ],
//!     )
//!     .unwrap();
//!
//! let req = Request::new(Method::GET, "/pets/7".parse().unwrap());
//! let res = Response::new();
//! router.lookup(&req, &res, |control| {
//!     assert!(control.is_proceed());
//! });
//! ```
//!
//! ## Runtime Configuration
//!
//! - `BRRTCHAIN_STACK_SIZE` - stack size of completion coroutines
//! - `BRRTCHAIN_ONCE_NEXT` / `BRRTCHAIN_STRICT_NEXT` - repeated `next` calls
//! - `BRRTCHAIN_IGNORE_TRAILING_SLASH` - `/a/` matches `/a`
//! - `BRRTCHAIN_LOG_*` - see [`logging::LogConfig::from_env`]

pub mod chain;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod router;
pub mod runtime_config;
pub mod server;

pub use chain::{Chain, ChainOptions, Control, Handler, Next};
pub use dispatcher::Dispatcher;
pub use error::{RouterError, RoutingError};
pub use router::{Route, RouteSpec, Router, RouterOptions};
pub use server::{Request, Response};
