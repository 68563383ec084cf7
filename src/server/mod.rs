//! Request and response handles consumed by the dispatch core.
//!
//! Body parsing, content negotiation and socket I/O live in the surrounding
//! server. These types expose only what chains and the router need: method,
//! path, params, the matched route, handler timers and a send/header surface.

mod request;
mod response;

pub use request::{HandlerTiming, Request};
pub use response::{HandlerResponse, HeaderVec, Response, MAX_INLINE_HEADERS};
