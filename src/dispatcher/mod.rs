//! # Dispatcher Module
//!
//! Server-wide request flow on top of the router:
//!
//! 1. the `pre` chain (request ids, early rejection)
//! 2. the `use` chain (auth, CORS, shared headers)
//! 3. [`Router::lookup`](crate::router::Router::lookup), which runs the
//!    matched route's chain or the default route
//!
//! Each stage starts from the previous stage's completion, so all three run
//! in order even when handlers resume asynchronously. An error or abort ends
//! the request early; errors nobody rendered become a JSON error response.

mod core;

pub use self::core::Dispatcher;
