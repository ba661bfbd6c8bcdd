//! Error types for conduit.
//!
//! Every failed request settles with exactly one [`Error`]. Cancellation has
//! its own variant so callers can tell it apart without inspecting messages:
//!
//! ```
//! use conduit_core::{Cancel, Error};
//!
//! let err = Error::Cancelled(Cancel::new("navigated away"));
//! assert!(err.is_cancel());
//! assert_eq!(err.to_string(), "Cancel: navigated away");
//! ```

use derive_more::{Display, Error};

use crate::{Cancel, RawHandle, Response};

/// Main error type for conduit operations.
#[derive(Debug, Display, Error)]
pub enum Error {
    /// The request was sent but no response was received.
    #[display("{message}")]
    Network {
        /// Error message.
        message: String,
        /// Transport handle, if the adapter exposes one.
        raw: Option<RawHandle>,
    },

    /// The adapter-enforced deadline was exceeded.
    #[display("{message}")]
    Timeout {
        /// Error message.
        message: String,
        /// Transport handle, if the adapter exposes one.
        raw: Option<RawHandle>,
    },

    /// The request was cancelled through its cancel token.
    #[display("{_0}")]
    Cancelled(#[error(not(source))] Cancel),

    /// A response was received but its status failed validation.
    #[display("Request failed with status code {}", _0.status())]
    Status(#[error(not(source))] Box<Response>),

    /// Transform or adapter level failure (serialization, invalid URL, ...).
    #[display("{_0}")]
    Adapter(#[error(not(source))] String),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            raw: None,
        }
    }

    /// Create a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
            raw: None,
        }
    }

    /// Create a status error carrying the rejected response.
    #[must_use]
    pub fn status_failure(response: Response) -> Self {
        Self::Status(Box::new(response))
    }

    /// Create an adapter error.
    #[must_use]
    pub fn adapter(message: impl Into<String>) -> Self {
        Self::Adapter(message.into())
    }

    /// Attach a transport handle to a network or timeout error.
    #[must_use]
    pub fn with_raw(mut self, handle: RawHandle) -> Self {
        if let Self::Network { raw, .. } | Self::Timeout { raw, .. } = &mut self {
            *raw = Some(handle);
        }
        self
    }

    /// Returns `true` if this is a cancellation.
    #[must_use]
    pub const fn is_cancel(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this is a network error.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// The cancellation reason, if this is a cancellation.
    #[must_use]
    pub const fn cancel_reason(&self) -> Option<&Cancel> {
        match self {
            Self::Cancelled(reason) => Some(reason),
            _ => None,
        }
    }

    /// Returns the HTTP status code if a response is attached.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.response().map(Response::status)
    }

    /// The response attached to a status failure.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Status(response) => Some(&**response),
            _ => None,
        }
    }

    /// Mutable access to the response attached to a status failure.
    #[must_use]
    pub fn response_mut(&mut self) -> Option<&mut Response> {
        match self {
            Self::Status(response) => Some(&mut **response),
            _ => None,
        }
    }

    /// Consume the error, returning the attached response.
    #[must_use]
    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Status(response) => Some(*response),
            _ => None,
        }
    }

    /// The transport handle attached to this error, if any.
    #[must_use]
    pub fn raw(&self) -> Option<&RawHandle> {
        match self {
            Self::Network { raw, .. } | Self::Timeout { raw, .. } => raw.as_ref(),
            Self::Status(response) => response.raw(),
            Self::Cancelled(_) | Self::Adapter(_) => None,
        }
    }

    /// Returns `true` if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }

    /// Returns `true` if this is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| (500..600).contains(&s))
    }
}

/// Returns `true` if the error is a cancellation.
#[must_use]
pub const fn is_cancel(error: &Error) -> bool {
    error.is_cancel()
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Adapter(format!("JSON serialization error: {err}"))
    }
}

impl From<serde_urlencoded::ser::Error> for Error {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        Self::Adapter(format!("form serialization error: {err}"))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Adapter(format!("invalid URL: {err}"))
    }
}
