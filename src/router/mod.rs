//! # Router Module
//!
//! Maps `(method, path)` to a mounted route and runs the route's
//! [`Chain`](crate::chain::Chain).
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Mounting named routes from a path template (or regex) and handler list
//! - Matching requests with a radix tree (static > parametric > wildcard)
//! - Extracting percent-decoded path parameters into the request
//! - Answering unmatched requests with 404, 405 + `Allow`, or `OPTIONS *`
//!
//! ## Path templates
//!
//! ```text
//! /users                 static
//! /users/:id             parameter
//! /flights/:from-:to     two parameters in one segment
//! /files/:name(^\w+$)    parameter constrained by a regex
//! /assets/*              wildcard, value stored under "*"
//! ```
//!
//! ## Example
//!
//! ```rust
//! use brrtchain::chain::Handler;
//! use brrtchain::router::{RouteSpec, Router, RouterOptions};
//! use brrtchain::server::{Request, Response};
//! use http::Method;
//!
//! let mut router = Router::new(RouterOptions::default());
//! router
//!     .mount(
//!         RouteSpec::new("get_pet", Method::GET, "/pets/:id"),
//!         vec![Handler::new(|req, res, next| {
//!             res.send(200, serde_json::json!({ "id": req.param("id") }));
//!             next.proceed();
//!         })],
//!     )
//!     .unwrap();
//!
//! let req = Request::new(Method::GET, "/pets/123".parse().unwrap());
//! let res = Response::new();
//! router.lookup(&req, &res, |_control| {});
//! ```
//!
//! ## Events
//!
//! [`Router::on_mount`] and [`Router::on_routed`] register plain observer
//! callbacks; there is no general event bus.

mod core;
mod path;
mod radix;

pub use self::core::{
    MountListener, ParamVec, Route, RouteDebugInfo, RouteMatch, RoutePath, RouteSpec,
    RoutedListener, Router, RouterOptions, MAX_INLINE_PARAMS, SUPPORTED_METHODS,
};
pub use path::WILDCARD_PARAM;
