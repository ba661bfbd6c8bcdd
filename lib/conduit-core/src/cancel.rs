//! Cooperative request cancellation.
//!
//! A [`CancelToken`] is handed to a request through
//! [`RequestConfig::cancel_token`](crate::RequestConfig::cancel_token); the
//! linked [`Canceller`] is kept by the caller and may be triggered from any
//! task. The transition is one-way: the first reason wins and later calls are
//! no-ops.
//!
//! ```
//! use conduit_core::CancelToken;
//!
//! let source = CancelToken::source();
//! assert!(source.cancel.cancel("user navigated away"));
//! assert!(!source.cancel.cancel("too late"));
//! assert_eq!(
//!     source.token.reason().and_then(|r| r.message().map(String::from)),
//!     Some("user navigated away".to_string())
//! );
//! ```

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use crate::{Error, Result};

/// The reason a request was cancelled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cancel {
    message: Option<String>,
}

impl Cancel {
    /// Create a reason with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// Create a reason without a message.
    #[must_use]
    pub const fn silent() -> Self {
        Self { message: None }
    }

    /// The cancellation message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for Cancel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "Cancel: {message}"),
            None => write!(f, "Cancel"),
        }
    }
}

/// Observing side of a cancellation pair.
///
/// Cheap to clone; all clones observe the same state.
#[derive(Clone)]
pub struct CancelToken {
    state: Arc<watch::Sender<Option<Cancel>>>,
}

/// Triggering side of a cancellation pair.
#[derive(Clone)]
pub struct Canceller {
    state: Arc<watch::Sender<Option<Cancel>>>,
}

/// A linked token and canceller, as returned by [`CancelToken::source`].
#[derive(Debug, Clone)]
pub struct CancelTokenSource {
    /// Token to put in the request configuration.
    pub token: CancelToken,
    /// Function-like handle that cancels the token.
    pub cancel: Canceller,
}

impl CancelToken {
    /// Create a linked token and canceller.
    #[must_use]
    pub fn source() -> CancelTokenSource {
        let (state, _) = watch::channel(None);
        let state = Arc::new(state);
        CancelTokenSource {
            token: Self {
                state: Arc::clone(&state),
            },
            cancel: Canceller { state },
        }
    }

    /// Current cancellation reason, or `None` while pending.
    #[must_use]
    pub fn reason(&self) -> Option<Cancel> {
        self.state.borrow().clone()
    }

    /// Returns `true` once the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Fail fast if cancellation has been requested.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] carrying the reason when the token is
    /// cancelled.
    pub fn check(&self) -> Result<()> {
        match self.reason() {
            Some(reason) => Err(Error::Cancelled(reason)),
            None => Ok(()),
        }
    }

    /// Wait until the token is cancelled and return the reason.
    ///
    /// Resolves immediately if the token is already cancelled.
    pub async fn cancelled(&self) -> Cancel {
        let mut receiver = self.state.subscribe();
        let reason = receiver
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|reason| (*reason).clone());
        match reason {
            Some(reason) => reason,
            // The token owns the sender, so the channel never closes while we wait.
            None => std::future::pending().await,
        }
    }
}

impl Canceller {
    /// Cancel the linked token with a message.
    ///
    /// Returns `true` if this call performed the transition, `false` if the
    /// token was already cancelled (the original reason is kept).
    pub fn cancel(&self, message: impl Into<String>) -> bool {
        self.cancel_with(Cancel::new(message))
    }

    /// Cancel the linked token with an explicit reason.
    pub fn cancel_with(&self, reason: Cancel) -> bool {
        let transitioned = self.state.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(reason);
            true
        });
        if transitioned {
            tracing::debug!("cancellation requested");
        }
        transitioned
    }

    /// Returns `true` once the linked token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.borrow().is_some()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("reason", &self.reason())
            .finish()
    }
}

impl fmt::Debug for Canceller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canceller")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
