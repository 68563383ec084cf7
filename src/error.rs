//! Error types surfaced by the dispatch core.
//!
//! Two families live here:
//!
//! - [`RouterError`] is a configuration error. It is returned synchronously from
//!   [`Router::mount`](crate::router::Router::mount) and friends at setup time and
//!   never at request time.
//! - [`RoutingError`] is a routing outcome (404 / 405). It travels through the
//!   normal continuation channel wrapped in an [`anyhow::Error`] and is recovered
//!   with `downcast_ref::<RoutingError>()`.

use std::fmt;

use http::{Method, StatusCode};

/// Configuration error raised while building a [`Router`](crate::router::Router).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// Route names must be non-empty
    EmptyName,
    /// A route with this name is already mounted
    DuplicateName {
        /// The conflicting route name
        name: String,
    },
    /// The HTTP method is not one of [`SUPPORTED_METHODS`](crate::router::SUPPORTED_METHODS)
    UnsupportedMethod {
        /// The rejected method
        method: Method,
    },
    /// The path template does not follow the router grammar
    InvalidPath {
        /// The offending template
        path: String,
        /// What is wrong with it
        reason: String,
    },
    /// The same method is already mounted on an identical template
    DuplicateRoute {
        /// HTTP method
        method: Method,
        /// Normalized path template
        path: String,
    },
    /// Routes cannot be removed once mounted
    UnmountNotSupported {
        /// Name passed to `unmount`
        name: String,
    },
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::EmptyName => write!(f, "route name must not be empty"),
            RouterError::DuplicateName { name } => {
                write!(f, "a route named '{name}' is already mounted")
            }
            RouterError::UnsupportedMethod { method } => {
                write!(f, "HTTP method '{method}' is not supported by the router")
            }
            RouterError::InvalidPath { path, reason } => {
                write!(f, "invalid route path '{path}': {reason}")
            }
            RouterError::DuplicateRoute { method, path } => {
                write!(f, "method '{method}' already declared for route '{path}'")
            }
            RouterError::UnmountNotSupported { name } => {
                write!(
                    f,
                    "cannot unmount route '{name}': unmounting routes is not supported"
                )
            }
        }
    }
}

impl std::error::Error for RouterError {}

/// Routing outcome produced by the router's default route.
///
/// The `Display` output embeds the request path and is meant for logs only.
/// Use [`RoutingError::client_message`] for anything rendered back to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// No route matched the path for any method (404)
    ResourceNotFound {
        /// Request path, as a label for logs
        path: String,
    },
    /// The path matched, but only for other methods (405)
    MethodNotAllowed {
        /// The requested method
        method: Method,
        /// Request path, as a label for logs
        path: String,
        /// Methods that would have matched
        allowed: Vec<Method>,
    },
}

impl RoutingError {
    /// HTTP status code carried by this outcome
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            RoutingError::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            RoutingError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// Stable machine-readable error code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            RoutingError::ResourceNotFound { .. } => "ResourceNotFound",
            RoutingError::MethodNotAllowed { .. } => "MethodNotAllowed",
        }
    }

    /// Value for the `Allow` header, comma-joined. `None` for 404s.
    #[must_use]
    pub fn allow_header(&self) -> Option<String> {
        match self {
            RoutingError::ResourceNotFound { .. } => None,
            RoutingError::MethodNotAllowed { allowed, .. } => Some(
                allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        }
    }

    /// Message safe to render in a response body.
    ///
    /// Request-derived text is HTML-escaped so a crafted URL cannot be
    /// reflected back as markup.
    #[must_use]
    pub fn client_message(&self) -> String {
        escape_html(&self.to_string())
    }
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::ResourceNotFound { path } => write!(f, "{path} does not exist"),
            RoutingError::MethodNotAllowed { method, .. } => {
                write!(f, "{method} is not allowed")
            }
        }
    }
}

impl std::error::Error for RoutingError {}

/// Escape the five HTML-significant characters.
pub(crate) fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
