//! Status-based outcome decision.

use std::fmt;
use std::sync::Arc;

use crate::{Error, Response, Result};

/// Predicate deciding which statuses count as success.
///
/// The default accepts `200..300`.
#[derive(Clone)]
pub struct ValidateStatus(Arc<dyn Fn(u16) -> bool + Send + Sync>);

impl ValidateStatus {
    /// Wrap a predicate.
    pub fn new(predicate: impl Fn(u16) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    /// A predicate accepting every status.
    #[must_use]
    pub fn accept_all() -> Self {
        Self::new(|_| true)
    }

    /// Returns `true` if `status` is accepted.
    #[must_use]
    pub fn validate(&self, status: u16) -> bool {
        (self.0)(status)
    }
}

impl Default for ValidateStatus {
    fn default() -> Self {
        Self::new(|status| (200..300).contains(&status))
    }
}

impl fmt::Debug for ValidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValidateStatus(..)")
    }
}

/// Resolve or reject a response by status.
///
/// Without a predicate every status is accepted.
///
/// # Errors
///
/// Returns [`Error::Status`] carrying the response when the predicate
/// rejects its status.
pub fn settle(response: Response, validate_status: Option<&ValidateStatus>) -> Result<Response> {
    match validate_status {
        Some(validate) if !validate.validate(response.status()) => {
            Err(Error::status_failure(response))
        }
        _ => Ok(response),
    }
}
