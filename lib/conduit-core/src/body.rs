//! Request and response payloads.
//!
//! [`Body`] is opaque to the pipeline: transforms decide how each variant is
//! turned into something an adapter can send, and adapters decide which
//! variant a response carries.

use std::ops::Range;

use bytes::Bytes;

use crate::{Form, Result};

/// Content type for request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Plain text content type (`text/plain`).
    PlainText,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::PlainText => "text/plain",
            Self::OctetStream => "application/octet-stream",
        }
    }

    /// Header value with an explicit UTF-8 charset for textual types.
    #[must_use]
    pub const fn with_charset(&self) -> &'static str {
        match self {
            Self::Json => "application/json;charset=utf-8",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded;charset=utf-8",
            Self::PlainText => "text/plain;charset=utf-8",
            Self::OctetStream => "application/octet-stream",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed view over a window of a shared buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferView {
    buffer: Bytes,
    range: Range<usize>,
}

impl BufferView {
    /// Create a view over `range` of `buffer`.
    ///
    /// Returns `None` if the range does not fit in the buffer.
    #[must_use]
    pub fn new(buffer: Bytes, range: Range<usize>) -> Option<Self> {
        (range.start <= range.end && range.end <= buffer.len()).then_some(Self { buffer, range })
    }

    /// The viewed bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        self.buffer.get(self.range.clone()).unwrap_or_default()
    }

    /// The whole underlying buffer, regardless of the view window.
    #[must_use]
    pub const fn buffer(&self) -> &Bytes {
        &self.buffer
    }

    /// Consume the view, returning the underlying buffer.
    #[must_use]
    pub fn into_buffer(self) -> Bytes {
        self.buffer
    }
}

/// An opaque request or response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Raw binary data.
    Bytes(Bytes),
    /// Typed view over part of a buffer.
    View(BufferView),
    /// Multipart form data.
    Multipart(Form),
    /// Text.
    Text(String),
    /// Query-parameter style key/value pairs.
    UrlEncoded(Vec<(String, String)>),
    /// Structured value, sent as JSON.
    Json(serde_json::Value),
}

impl Body {
    /// Build a [`Body::Json`] from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as JSON.
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Build a [`Body::UrlEncoded`] from any serializable struct or map.
    ///
    /// # Errors
    ///
    /// Returns an error if form serialization fails.
    pub fn form<T: serde::Serialize>(value: &T) -> Result<Self> {
        let encoded = serde_urlencoded::to_string(value)?;
        let pairs = url::form_urlencoded::parse(encoded.as_bytes())
            .into_owned()
            .collect();
        Ok(Self::UrlEncoded(pairs))
    }

    /// Text content, if this is a [`Body::Text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// JSON content, if this is a [`Body::Json`].
    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Raw bytes, if this is a [`Body::Bytes`] or a [`Body::View`].
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::View(view) => Some(view.as_slice()),
            _ => None,
        }
    }

    /// Encode the payload for the wire.
    ///
    /// Multipart forms are encoded with their own boundary; the matching
    /// `Content-Type` is available from [`Form::content_type`].
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Bytes> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::View(view) => Ok(Bytes::copy_from_slice(view.as_slice())),
            Self::Multipart(form) => Ok(form.encode()),
            Self::Text(text) => Ok(Bytes::from(text.clone())),
            Self::UrlEncoded(pairs) => Ok(Bytes::from(serde_urlencoded::to_string(pairs)?)),
            Self::Json(value) => to_json(value),
        }
    }

    /// Deserialize the payload into `T`.
    ///
    /// JSON values are converted directly; text and binary payloads are
    /// parsed as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not match `T`.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        match self {
            Self::Json(value) => from_json(&to_json(value)?),
            other => from_json(&other.to_bytes()?),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<Form> for Body {
    fn from(form: Form) -> Self {
        Self::Multipart(form)
    }
}

impl From<BufferView> for Body {
    fn from(view: BufferView) -> Self {
        Self::View(view)
    }
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Example
///
/// ```
/// use conduit_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct User { name: String }
///
/// let user = User { name: "Alice".to_string() };
/// let bytes = to_json(&user).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Alice"}"#);
/// ```
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// # Errors
///
/// Returns an error if JSON deserialization fails, with the error message
/// including the path to the problematic field (e.g., "user.address.city").
///
/// # Example
///
/// ```
/// use conduit_core::from_json;
/// use serde::Deserialize;
///
/// #[derive(Debug, PartialEq, Deserialize)]
/// struct User { name: String }
///
/// let user: User = from_json(br#"{"name":"Alice"}"#).expect("deserialize");
/// assert_eq!(user, User { name: "Alice".to_string() });
/// ```
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::adapter(format!(
            "JSON deserialization error at '{}': {}",
            e.path(),
            e.inner()
        ))
    })
}
