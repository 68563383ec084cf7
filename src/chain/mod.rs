//! # Chain Module
//!
//! A [`Chain`] is the ordered list of handlers attached to a route (or to a
//! whole server) together with the engine that walks it for one request.
//!
//! ## Control Flow
//!
//! Every handler receives a [`Next`] continuation and resumes the chain by
//! calling it with one of three [`Control`] values:
//!
//! | Value                  | Effect                                                      |
//! |------------------------|-------------------------------------------------------------|
//! | `Control::Proceed`     | run the next normal handler                                 |
//! | `Control::Error(err)`  | skip normal handlers, run the next error handler with `err` |
//! | `Control::Abort`       | stop; no further handler runs, error handlers included      |
//!
//! Handler roles are fixed at construction ([`Handler::new`] vs
//! [`Handler::error`]); a handler whose role does not match the current state
//! is skipped and the state carries forward unchanged. A nested chain added
//! with [`Chain::add`] behaves like one normal handler that continues or
//! aborts as a unit.
//!
//! ## Completion
//!
//! The terminal callback passed to [`Chain::handle`] never runs on the caller's
//! stack: it is delivered on a freshly spawned `may` coroutine, so code that
//! follows `handle` never observes a half-finished walk.
//!
//! ## Repeated continuation calls
//!
//! By default a second call to the same `Next` advances the chain again, from
//! wherever the cursor now is. [`ChainOptions::once_next`] drops repeated
//! calls; [`ChainOptions::strict_next`] panics with [`STRICT_NEXT_MESSAGE`].

mod core;
mod handler;
mod next;

pub use self::core::{Chain, ChainOptions, Done};
pub use handler::{ErrorHandlerFn, Handler, HandlerFn, HandlerKind};
pub use next::{Control, Next, STRICT_NEXT_MESSAGE};
