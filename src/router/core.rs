//! Router core module - hot path for request routing.
//!
//! # JSF Compliance (Rule 206)
//!
//! Matching allocates only parameter values; parameter names are `Arc<str>`
//! shared with the route tree.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use http::Method;
use regex::Regex;
use serde::Serialize;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use super::path::{parse_template, template_from_regex};
use super::radix::RadixTree;
use crate::chain::{Chain, ChainOptions, Control, Handler};
use crate::error::{RouterError, RoutingError};
use crate::runtime_config::env_flag;
use crate::server::{Request, Response};

/// Maximum number of path parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/:id/posts/:post_id).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names are `Arc<str>` shared with the route tree; values are
/// per-request data from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// HTTP methods the router accepts and probes for 405 responses
pub static SUPPORTED_METHODS: [Method; 8] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::OPTIONS,
    Method::HEAD,
    Method::TRACE,
];

/// Path of a route, as a template or as a regular expression.
///
/// Regular expressions are converted to templates at mount time by stripping
/// the `^`/`$` anchors and backslash escapes.
#[derive(Debug, Clone)]
pub enum RoutePath {
    /// Template in the router grammar, e.g. `/users/:id`
    Template(String),
    /// Regular expression such as `^\/users\/:id$`
    Regex(Regex),
}

impl From<&str> for RoutePath {
    fn from(path: &str) -> Self {
        RoutePath::Template(path.to_string())
    }
}

impl From<String> for RoutePath {
    fn from(path: String) -> Self {
        RoutePath::Template(path)
    }
}

impl From<Regex> for RoutePath {
    fn from(re: Regex) -> Self {
        RoutePath::Regex(re)
    }
}

/// What to mount: route name, method and path
#[derive(Debug, Clone)]
pub struct RouteSpec {
    /// Unique route name
    pub name: String,
    /// HTTP method
    pub method: Method,
    /// Path template or regex
    pub path: RoutePath,
}

impl RouteSpec {
    /// Build a route spec
    pub fn new(name: impl Into<String>, method: Method, path: impl Into<RoutePath>) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
        }
    }
}

/// A mounted route
#[derive(Debug)]
pub struct Route {
    /// Unique route name
    pub name: String,
    /// HTTP method
    pub method: Method,
    /// Normalized path template
    pub path: String,
    /// Handlers run for this route
    pub chain: Chain,
}

/// Result of matching a method and path against the tree
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route
    pub route: Arc<Route>,
    /// Path parameters extracted from the URL
    pub params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name (last occurrence wins)
    #[inline]
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Introspection record returned by [`Router::debug_info`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDebugInfo {
    /// Route name
    pub name: String,
    /// Lower-cased HTTP method
    pub method: String,
    /// Path template
    pub path: String,
    /// Handler names in execution order
    pub handlers: Vec<String>,
}

/// Router-wide options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterOptions {
    /// Passed to every route chain, see [`ChainOptions::once_next`]
    pub once_next: bool,
    /// Passed to every route chain, see [`ChainOptions::strict_next`]
    pub strict_next: bool,
    /// Treat `/a/` and `/a` as the same path
    pub ignore_trailing_slash: bool,
}

impl RouterOptions {
    /// Read `BRRTCHAIN_ONCE_NEXT`, `BRRTCHAIN_STRICT_NEXT` and
    /// `BRRTCHAIN_IGNORE_TRAILING_SLASH`
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            once_next: env_flag("BRRTCHAIN_ONCE_NEXT"),
            strict_next: env_flag("BRRTCHAIN_STRICT_NEXT"),
            ignore_trailing_slash: env_flag("BRRTCHAIN_IGNORE_TRAILING_SLASH"),
        }
    }

    fn chain_options(self) -> ChainOptions {
        ChainOptions {
            once_next: self.once_next,
            strict_next: self.strict_next,
        }
    }
}

/// Observer notified after a successful mount
pub type MountListener = dyn Fn(&Method, &str) + Send + Sync;

/// Observer notified when a request matched a route, before its chain runs
pub type RoutedListener = dyn Fn(&Request, &Response, &Arc<Route>) + Send + Sync;

/// Maps method + path to a mounted route and runs that route's chain.
///
/// Routes are mounted at startup through `&mut self`; all request-time
/// operations take `&self`, so a built router can be shared across coroutines.
///
/// ```rust
/// use brrtchain::chain::Handler;
/// use brrtchain::router::{RouteSpec, Router, RouterOptions};
/// use http::Method;
///
/// let mut router = Router::new(RouterOptions::default());
/// router
///     .mount(
///         RouteSpec::new("get_user", Method::GET, "/users/:id"),
///         vec![Handler::new(|_req, _res, next| next.proceed())],
///     )
///     .unwrap();
/// let m = router.route(&Method::GET, "/users/42").unwrap();
/// assert_eq!(m.get_param("id"), Some("42"));
/// ```
pub struct Router {
    options: RouterOptions,
    tree: RadixTree,
    routes: HashMap<String, Arc<Route>>,
    anonymous_handlers: usize,
    mount_listeners: Vec<Arc<MountListener>>,
    routed_listeners: Vec<Arc<RoutedListener>>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouterOptions::default())
    }
}

impl Router {
    /// Create an empty router
    #[must_use]
    pub fn new(options: RouterOptions) -> Self {
        Self {
            options,
            tree: RadixTree::new(options.ignore_trailing_slash),
            routes: HashMap::new(),
            anonymous_handlers: 0,
            mount_listeners: Vec::new(),
            routed_listeners: Vec::new(),
        }
    }

    /// Options this router was built with
    #[must_use]
    pub fn options(&self) -> RouterOptions {
        self.options
    }

    /// Register an observer for successful mounts
    pub fn on_mount<F>(&mut self, listener: F)
    where
        F: Fn(&Method, &str) + Send + Sync + 'static,
    {
        self.mount_listeners.push(Arc::new(listener));
    }

    /// Register an observer for matched requests
    pub fn on_routed<F>(&mut self, listener: F)
    where
        F: Fn(&Request, &Response, &Arc<Route>) + Send + Sync + 'static,
    {
        self.routed_listeners.push(Arc::new(listener));
    }

    /// Mount a route with its handlers.
    ///
    /// Anonymous handlers are named `handler-<n>` from a per-router counter
    /// that is never reused.
    ///
    /// # Errors
    ///
    /// Fails with a [`RouterError`] for an empty or duplicate name, an
    /// unsupported method, a malformed template, or a method already mounted
    /// on the same template. Nothing is registered on failure.
    pub fn mount(
        &mut self,
        spec: RouteSpec,
        handlers: Vec<Handler>,
    ) -> Result<Arc<Route>, RouterError> {
        if spec.name.is_empty() {
            return Err(RouterError::EmptyName);
        }
        if self.routes.contains_key(&spec.name) {
            return Err(RouterError::DuplicateName { name: spec.name });
        }
        if !SUPPORTED_METHODS.contains(&spec.method) {
            return Err(RouterError::UnsupportedMethod {
                method: spec.method,
            });
        }

        let path = match &spec.path {
            RoutePath::Template(template) => template.clone(),
            RoutePath::Regex(re) => template_from_regex(re),
        };
        let segments = parse_template(&path, self.options.ignore_trailing_slash)
            .map_err(|reason| RouterError::InvalidPath {
                path: path.clone(),
                reason,
            })?;

        let mut chain = Chain::new(self.options.chain_options());
        for handler in handlers {
            let handler = if handler.name().is_some() {
                handler
            } else {
                let name = format!("handler-{}", self.anonymous_handlers);
                self.anonymous_handlers += 1;
                handler.named(name)
            };
            chain.add(handler);
        }

        let route = Arc::new(Route {
            name: spec.name,
            method: spec.method,
            path,
            chain,
        });

        if !self
            .tree
            .insert(&segments, route.method.clone(), Arc::clone(&route))
        {
            return Err(RouterError::DuplicateRoute {
                method: route.method.clone(),
                path: route.path.clone(),
            });
        }
        self.routes.insert(route.name.clone(), Arc::clone(&route));

        info!(
            route = %route.name,
            method = %route.method,
            path = %route.path,
            handlers = route.chain.count(),
            "Route mounted"
        );
        for listener in &self.mount_listeners {
            listener(&route.method, &route.path);
        }
        Ok(route)
    }

    /// Removing routes is not supported.
    ///
    /// # Errors
    ///
    /// Always returns [`RouterError::UnmountNotSupported`], whether or not the
    /// route exists, so callers never believe a route was removed.
    pub fn unmount(&self, name: &str) -> Result<(), RouterError> {
        warn!(route = %name, "Attempted to unmount a route");
        Err(RouterError::UnmountNotSupported {
            name: name.to_string(),
        })
    }

    /// Match a method and path without dispatching
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let (route, params) = self.tree.find(method, path)?;
        Some(RouteMatch { route, params })
    }

    /// Route a request and run the matched chain, or the default route.
    ///
    /// On a match the path parameters are merged into the request (matched
    /// values win), the route is recorded on the request, `routed` observers
    /// fire, and the route's chain runs with `next` as its terminal callback.
    pub fn lookup<F>(&self, req: &Request, res: &Response, next: F)
    where
        F: Fn(Control) + Send + Sync + 'static,
    {
        let Some(matched) = self.route(req.method(), req.path()) else {
            debug!(method = %req.method(), path = %req.path(), "No route matched");
            self.default_route(req, res, next);
            return;
        };

        debug!(
            method = %req.method(),
            path = %req.path(),
            route = %matched.route.name,
            path_params = ?matched.params,
            "Route matched"
        );
        req.merge_params(&matched.params);
        req.set_route(Arc::clone(&matched.route));
        for listener in &self.routed_listeners {
            listener(req, res, &matched.route);
        }
        matched.route.chain.handle(req, res, next);
    }

    /// Run a route by name, bypassing path matching.
    ///
    /// An unknown name falls through to [`Router::default_route`]. Callers
    /// must not rely on `next` being called in that case.
    pub fn lookup_by_name<F>(&self, name: &str, req: &Request, res: &Response, next: F)
    where
        F: Fn(Control) + Send + Sync + 'static,
    {
        let Some(route) = self.routes.get(name) else {
            debug!(route = %name, "No route with this name");
            self.default_route(req, res, next);
            return;
        };
        req.set_route(Arc::clone(route));
        route.chain.handle(req, res, next);
    }

    /// Fallback for requests no route matched.
    ///
    /// - `OPTIONS *` is answered with 200 and continues without error.
    /// - If other methods match the path: `Allow` is set and a 405
    ///   [`RoutingError::MethodNotAllowed`] is passed to `next`.
    /// - Otherwise a 404 [`RoutingError::ResourceNotFound`] is passed to `next`.
    pub fn default_route<F>(&self, req: &Request, res: &Response, next: F)
    where
        F: Fn(Control) + Send + Sync + 'static,
    {
        let path = req.path();
        if req.method() == Method::OPTIONS && path == "*" {
            res.send_status(200);
            next(Control::Proceed);
            return;
        }

        let allowed: Vec<Method> = self
            .tree
            .methods_for(path)
            .into_iter()
            .filter(|m| m != req.method())
            .collect();

        let err = if allowed.is_empty() {
            RoutingError::ResourceNotFound {
                path: path.to_string(),
            }
        } else {
            let err = RoutingError::MethodNotAllowed {
                method: req.method().clone(),
                path: path.to_string(),
                allowed,
            };
            if let Some(allow) = err.allow_header() {
                res.set_header("Allow", allow);
            }
            err
        };
        debug!(
            method = %req.method(),
            path = %path,
            status = err.status().as_u16(),
            "Default route"
        );
        next(Control::Error(err.into()));
    }

    /// Mounted route by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<Route>> {
        self.routes.get(name)
    }

    /// All mounted routes, keyed by name
    #[must_use]
    pub fn routes(&self) -> &HashMap<String, Arc<Route>> {
        &self.routes
    }

    /// Route name → name, lower-cased method, path and handler names
    #[must_use]
    pub fn debug_info(&self) -> BTreeMap<String, RouteDebugInfo> {
        self.routes
            .values()
            .map(|route| {
                let info = RouteDebugInfo {
                    name: route.name.clone(),
                    method: route.method.as_str().to_lowercase(),
                    path: route.path.clone(),
                    handlers: route
                        .chain
                        .handlers()
                        .iter()
                        .map(|h| h.display_name().to_string())
                        .collect(),
                };
                (route.name.clone(), info)
            })
            .collect()
    }

    /// Log every mounted route at `info`
    pub fn dump_routes(&self) {
        let mut routes: Vec<&Arc<Route>> = self.routes.values().collect();
        routes.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.name.cmp(&b.name)));
        info!(count = routes.len(), "Mounted routes");
        for route in routes {
            info!(
                method = %route.method,
                path = %route.path,
                route = %route.name,
                "Route"
            );
        }
    }
}

impl fmt::Display for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.tree, f)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("options", &self.options)
            .field("routes", &self.routes.len())
            .finish_non_exhaustive()
    }
}
