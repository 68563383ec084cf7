use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use super::core::Dispatch;

/// Panic message for a repeated continuation call under `strict_next`
pub const STRICT_NEXT_MESSAGE: &str = "next shouldn't be called more than once";

/// Value a handler hands to its continuation, and the value a chain
/// completes with.
#[derive(Debug)]
pub enum Control {
    /// Continue with the next normal handler. As a completion: no error.
    Proceed,
    /// Abort normal processing; only error handlers run from here on
    Error(anyhow::Error),
    /// Abort silently. No further handler runs, error handlers included.
    Abort,
}

impl Control {
    /// True for [`Control::Proceed`]
    #[must_use]
    pub fn is_proceed(&self) -> bool {
        matches!(self, Control::Proceed)
    }

    /// True for [`Control::Error`]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Control::Error(_))
    }

    /// True for [`Control::Abort`]
    #[must_use]
    pub fn is_abort(&self) -> bool {
        matches!(self, Control::Abort)
    }

    /// The in-flight error, if any
    #[must_use]
    pub fn error(&self) -> Option<&anyhow::Error> {
        match self {
            Control::Error(err) => Some(err),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for Control {
    fn from(err: anyhow::Error) -> Self {
        Control::Error(err)
    }
}

impl<E> From<Result<(), E>> for Control
where
    E: Into<anyhow::Error>,
{
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Control::Proceed,
            Err(err) => Control::Error(err.into()),
        }
    }
}

/// How a continuation reacts to being called more than once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NextPolicy {
    /// Every call advances the chain
    Permissive,
    /// Calls after the first are dropped
    Once,
    /// Calls after the first panic
    Strict,
}

/// Lifecycle of a single continuation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NextState {
    /// Not called yet
    Pending,
    /// Called once, the chain has moved on
    Advanced,
    /// Called again after advancing
    AlreadyCompleted,
}

struct NextInner {
    state: Mutex<NextState>,
    policy: NextPolicy,
    handler: Arc<str>,
    dispatch: Arc<Dispatch>,
}

/// Continuation passed to every handler.
///
/// Calling it resumes the chain that invoked the handler. The first call stops
/// the handler's timer. Later calls depend on the chain's configuration: by
/// default they advance the chain again, under `once_next` they are ignored,
/// and under `strict_next` they panic with [`STRICT_NEXT_MESSAGE`].
///
/// `Next` is `Clone + Send`, so a handler may hand it to another coroutine and
/// resume the chain from there.
#[derive(Clone)]
pub struct Next {
    inner: Arc<NextInner>,
}

impl Next {
    pub(crate) fn new(dispatch: Arc<Dispatch>, handler: Arc<str>, policy: NextPolicy) -> Self {
        Self {
            inner: Arc::new(NextInner {
                state: Mutex::new(NextState::Pending),
                policy,
                handler,
                dispatch,
            }),
        }
    }

    /// Continue to the next handler
    pub fn proceed(&self) {
        self.resume(Control::Proceed);
    }

    /// Put `err` in flight; only error handlers run afterwards
    pub fn fail(&self, err: impl Into<anyhow::Error>) {
        self.resume(Control::Error(err.into()));
    }

    /// Stop the chain without error handling
    pub fn abort(&self) {
        self.resume(Control::Abort);
    }

    /// Resume the chain with an explicit control value
    ///
    /// # Panics
    ///
    /// Under `strict_next`, panics with [`STRICT_NEXT_MESSAGE`] when called more
    /// than once.
    #[allow(clippy::panic)]
    pub fn resume(&self, control: Control) {
        let previous = {
            let mut state = self
                .inner
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let previous = *state;
            *state = match previous {
                NextState::Pending => NextState::Advanced,
                NextState::Advanced | NextState::AlreadyCompleted => NextState::AlreadyCompleted,
            };
            previous
        };

        if previous == NextState::Pending {
            self.inner
                .dispatch
                .request()
                .end_handler_timer(&self.inner.handler);
            Arc::clone(&self.inner.dispatch).step(control);
            return;
        }

        match self.inner.policy {
            NextPolicy::Permissive => Arc::clone(&self.inner.dispatch).step(control),
            NextPolicy::Once => {
                debug!(
                    handler = %self.inner.handler,
                    "Continuation called more than once, ignoring"
                );
            }
            NextPolicy::Strict => panic!("{}", STRICT_NEXT_MESSAGE),
        }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("handler", &self.inner.handler)
            .field("policy", &self.inner.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_from_result() {
        let ok: Result<(), std::io::Error> = Ok(());
        assert!(Control::from(ok).is_proceed());
        let err: Result<(), std::io::Error> = Err(std::io::Error::other("disk"));
        let control = Control::from(err);
        assert!(control.is_error());
        assert_eq!(control.error().map(ToString::to_string).as_deref(), Some("disk"));
    }

    #[test]
    fn test_control_predicates() {
        assert!(Control::Abort.is_abort());
        assert!(!Control::Abort.is_error());
        assert!(Control::from(anyhow::anyhow!("x")).is_error());
    }
}
