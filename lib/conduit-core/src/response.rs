//! Settled responses.
//!
//! A [`Response`] carries the (possibly transformed) payload together with the
//! finalized [`RequestConfig`] the adapter received.
//!
//! ```
//! use conduit_core::{Body, Headers, Response};
//!
//! let response = Response::new(200, Headers::new(), Some(Body::from(r#"{"id":1}"#)));
//! assert!(response.is_success());
//! assert_eq!(response.status_text(), "OK");
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::{Body, Error, Headers, RequestConfig, Result};

/// Opaque adapter-owned handle to the underlying exchange.
///
/// Only meant for diagnostics; adapters document the concrete type they store.
#[derive(Clone)]
pub struct RawHandle(Arc<dyn Any + Send + Sync>);

impl RawHandle {
    /// Wrap an adapter value.
    #[must_use]
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the handle as `T`, if that is the stored type.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawHandle(..)")
    }
}

/// HTTP response with status, headers, and payload.
#[derive(Debug, Clone)]
pub struct Response {
    data: Option<Body>,
    status: u16,
    status_text: String,
    headers: Headers,
    config: RequestConfig,
    raw: Option<RawHandle>,
}

impl Response {
    /// Creates a new response.
    ///
    /// The status text defaults to the canonical reason phrase, if any.
    #[must_use]
    pub fn new(status: u16, headers: Headers, data: Option<Body>) -> Self {
        let status_text = http::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            data,
            status,
            status_text,
            headers,
            config: RequestConfig::new(),
            raw: None,
        }
    }

    /// Set the status text.
    #[must_use]
    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    /// Attach the config the adapter received.
    #[must_use]
    pub fn with_config(mut self, config: RequestConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach the adapter's raw handle.
    #[must_use]
    pub fn with_raw(mut self, raw: RawHandle) -> Self {
        self.raw = Some(raw);
        self
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Status text as reported by the transport.
    #[must_use]
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable response headers.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Single header value by name, case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Payload.
    #[must_use]
    pub const fn data(&self) -> Option<&Body> {
        self.data.as_ref()
    }

    /// Mutable payload.
    pub fn data_mut(&mut self) -> &mut Option<Body> {
        &mut self.data
    }

    /// Take the payload, leaving `None`.
    pub fn take_data(&mut self) -> Option<Body> {
        self.data.take()
    }

    /// Replace the payload.
    pub fn set_data(&mut self, data: Option<Body>) {
        self.data = data;
    }

    /// The finalized config this response answers.
    #[must_use]
    pub const fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// The adapter's raw handle, if any.
    #[must_use]
    pub const fn raw(&self) -> Option<&RawHandle> {
        self.raw.as_ref()
    }

    /// Consume into the payload.
    #[must_use]
    pub fn into_data(self) -> Option<Body> {
        self.data
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }

    /// Deserialize the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no payload or it does not match `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        self.data
            .as_ref()
            .ok_or_else(|| Error::adapter("response has no data"))?
            .deserialize()
    }

    /// Payload as text, if it is a text body.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.data.as_ref().and_then(Body::as_text)
    }
}
