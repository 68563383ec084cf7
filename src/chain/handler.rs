use std::fmt;
use std::sync::Arc;

use super::{Chain, Next};
use crate::server::{Request, Response};

/// Signature of a normal handler: runs only while no error is in flight
pub type HandlerFn = dyn Fn(&Request, &Response, Next) + Send + Sync;

/// Signature of an error handler: runs only while an error is in flight
pub type ErrorHandlerFn = dyn Fn(anyhow::Error, &Request, &Response, Next) + Send + Sync;

/// Role of a handler, fixed when it is constructed
#[derive(Clone)]
pub enum HandlerKind {
    /// Runs when no error is in flight
    Normal(Arc<HandlerFn>),
    /// Runs when an error is in flight and receives that error
    ErrorHandling(Arc<ErrorHandlerFn>),
    /// A nested chain, driven as a single normal handler
    SubChain(Chain),
}

/// A named unit of request processing stored in a [`Chain`].
///
/// ```rust
/// use brrtchain::chain::Handler;
///
/// let h = Handler::new(|_req, _res, next| next.proceed()).named("noop");
/// assert_eq!(h.name(), Some("noop"));
/// assert!(!h.is_error_handler());
/// ```
#[derive(Clone)]
pub struct Handler {
    name: Option<Arc<str>>,
    kind: HandlerKind,
}

impl Handler {
    /// Wrap a normal handler. Named `fn` items keep their function name;
    /// closures stay anonymous.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Request, &Response, Next) + Send + Sync + 'static,
    {
        Self {
            name: infer_name::<F>(),
            kind: HandlerKind::Normal(Arc::new(f)),
        }
    }

    /// Wrap an error handler
    pub fn error<F>(f: F) -> Self
    where
        F: Fn(anyhow::Error, &Request, &Response, Next) + Send + Sync + 'static,
    {
        Self {
            name: infer_name::<F>(),
            kind: HandlerKind::ErrorHandling(Arc::new(f)),
        }
    }

    /// Set an explicit display name
    #[must_use]
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Explicit or inferred name, `None` for anonymous handlers
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name used for timers and debug listings
    #[must_use]
    pub fn display_name(&self) -> Arc<str> {
        self.name
            .as_ref()
            .map_or_else(|| Arc::from("anonymous"), Arc::clone)
    }

    /// The handler's role
    #[must_use]
    pub fn kind(&self) -> &HandlerKind {
        &self.kind
    }

    /// True for error-handling handlers
    #[must_use]
    pub fn is_error_handler(&self) -> bool {
        matches!(self.kind, HandlerKind::ErrorHandling(_))
    }
}

impl From<Chain> for Handler {
    fn from(chain: Chain) -> Self {
        Self {
            name: None,
            kind: HandlerKind::SubChain(chain),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Handler");
        s.field("name", &self.name);
        match &self.kind {
            HandlerKind::Normal(_) => s.field("kind", &"normal"),
            HandlerKind::ErrorHandling(_) => s.field("kind", &"error"),
            HandlerKind::SubChain(chain) => s.field("chain_len", &chain.count()),
        };
        s.finish()
    }
}

/// Derive a display name from the handler's type.
///
/// `fn` items report their path (`my_crate::auth::check_token`), from which
/// the last segment is kept. Closures and fn pointers have no usable name.
fn infer_name<F>() -> Option<Arc<str>> {
    let full = std::any::type_name::<F>();
    if full.contains('{') || full.contains('(') || full.contains('<') {
        return None;
    }
    full.rsplit("::").next().map(Arc::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_user(_req: &Request, _res: &Response, next: Next) {
        next.proceed();
    }

    fn report(err: anyhow::Error, _req: &Request, _res: &Response, next: Next) {
        next.fail(err);
    }

    #[test]
    fn test_fn_item_name_is_inferred() {
        let h = Handler::new(load_user);
        assert_eq!(h.name(), Some("load_user"));
        let h = Handler::error(report);
        assert_eq!(h.name(), Some("report"));
        assert!(h.is_error_handler());
    }

    #[test]
    fn test_closure_is_anonymous() {
        let h = Handler::new(|_req, _res, next| next.proceed());
        assert_eq!(h.name(), None);
        assert_eq!(h.display_name().as_ref(), "anonymous");
    }

    #[test]
    fn test_explicit_name_wins() {
        let h = Handler::new(load_user).named("users");
        assert_eq!(h.name(), Some("users"));
    }

    #[test]
    fn test_sub_chain_conversion() {
        let mut inner = Chain::default();
        inner.add(Handler::new(load_user));
        let h = Handler::from(inner);
        assert!(matches!(h.kind(), HandlerKind::SubChain(c) if c.count() == 1));
        assert!(!h.is_error_handler());
    }
}
