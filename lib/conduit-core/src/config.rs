//! Request configuration.
//!
//! Every field of [`RequestConfig`] is optional so that [`RequestConfig::merge`]
//! can tell "unset" from "set". Configs are plain values: merging always
//! produces a new config and never touches either side.
//!
//! ```
//! use std::time::Duration;
//! use conduit_core::{Method, RequestConfig};
//!
//! let defaults = RequestConfig::new()
//!     .base_url("https://api.example.com")
//!     .timeout(Duration::from_secs(5));
//! let call = RequestConfig::new()
//!     .url("/users")
//!     .method(Method::Post)
//!     .header("X-Trace", "abc");
//!
//! let merged = defaults.merge(&call);
//! assert_eq!(merged.base_url.as_deref(), Some("https://api.example.com"));
//! assert_eq!(merged.url.as_deref(), Some("/users"));
//! assert_eq!(merged.timeout, Some(Duration::from_secs(5)));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::headers::{ACCEPT, CONTENT_TYPE};
use crate::transform::{Transform, default_request_transform, default_response_transform};
use crate::{Adapter, Body, CancelToken, Error, HeaderConfig, Headers, Method, Result, ValidateStatus};

/// Default `Accept` header sent with every method.
pub const DEFAULT_ACCEPT: &str = "application/json, text/plain, */*";

/// Default `Content-Type` for methods that carry a body.
pub const DEFAULT_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Ordered query parameters.
///
/// `Null` values are skipped when the query string is built; arrays expand
/// to repeated `key[]` entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<(String, Value)>);

impl Params {
    /// Create an empty parameter list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build parameters from any value serializing to a JSON object.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not serialize to an object.
    pub fn from_serialize<T: serde::Serialize>(value: &T) -> Result<Self> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(map.into_iter().collect()),
            Value::Null => Ok(Self::new()),
            other => Err(Error::adapter(format!(
                "query parameters must be an object, got {other}"
            ))),
        }
    }

    /// Set a parameter, replacing an existing one with the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Value of a parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterate over parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns `true` if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// Custom query string serializer.
#[derive(Clone)]
pub struct ParamsSerializer(Arc<dyn Fn(&Params) -> String + Send + Sync>);

impl ParamsSerializer {
    /// Wrap a serializer function. The output must not start with `?`.
    pub fn new(serialize: impl Fn(&Params) -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(serialize))
    }

    /// Serialize parameters to a query string.
    #[must_use]
    pub fn serialize(&self, params: &Params) -> String {
        (self.0)(params)
    }
}

impl fmt::Debug for ParamsSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ParamsSerializer(..)")
    }
}

/// How the adapter should materialize the response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// Binary buffer.
    ArrayBuffer,
    /// Binary blob.
    Blob,
    /// Markup document, delivered as text.
    Document,
    /// JSON; delivered as text and decoded by the default response transform.
    #[default]
    Json,
    /// Plain text.
    Text,
    /// Raw bytes; bodies are always buffered.
    Stream,
}

impl ResponseType {
    /// Returns `true` if the payload should be delivered as bytes.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, Self::ArrayBuffer | Self::Blob | Self::Stream)
    }
}

/// Transfer progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Bytes transferred so far.
    pub loaded: u64,
    /// Total bytes, when known.
    pub total: Option<u64>,
}

/// Progress callback.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Credentials for HTTP basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl BasicCredentials {
    /// Create credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Configuration of a single request, or the defaults of a client.
#[derive(Clone, Default)]
pub struct RequestConfig {
    /// HTTP method.
    pub method: Option<Method>,
    /// Request URL, absolute or relative to `base_url`.
    pub url: Option<String>,
    /// Prefix for relative URLs.
    pub base_url: Option<String>,
    /// Layered headers.
    pub headers: HeaderConfig,
    /// Request payload.
    pub data: Option<Body>,
    /// Query parameters.
    pub params: Option<Params>,
    /// Custom query string serializer.
    pub params_serializer: Option<ParamsSerializer>,
    /// Adapter deadline; zero means none.
    pub timeout: Option<Duration>,
    /// Message of the timeout error.
    pub timeout_error_message: Option<String>,
    /// Adapter override for this request.
    pub adapter: Option<Arc<dyn Adapter>>,
    /// Transforms applied to the payload before dispatch.
    pub transform_request: Option<Vec<Transform>>,
    /// Transforms applied to the response payload.
    pub transform_response: Option<Vec<Transform>>,
    /// Status predicate used by `settle`.
    pub validate_status: Option<ValidateStatus>,
    /// Cancellation token.
    pub cancel_token: Option<CancelToken>,
    /// Requested response payload form.
    pub response_type: Option<ResponseType>,
    /// Upload progress callback.
    pub on_upload_progress: Option<ProgressCallback>,
    /// Download progress callback.
    pub on_download_progress: Option<ProgressCallback>,
    /// Basic authentication.
    pub auth: Option<BasicCredentials>,
    /// Send cross-site credentials (browser transports only).
    pub with_credentials: Option<bool>,
    /// Name of the XSRF cookie.
    pub xsrf_cookie_name: Option<String>,
    /// Name of the XSRF header.
    pub xsrf_header_name: Option<String>,
    /// Cap on the buffered response size, in bytes.
    pub max_content_length: Option<usize>,
}

impl RequestConfig {
    /// Create an empty config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Library defaults for a client.
    #[must_use]
    pub fn defaults() -> Self {
        let mut headers = HeaderConfig::new();
        headers.common.insert(ACCEPT, DEFAULT_ACCEPT);
        for method in Method::ALL {
            let group = headers.for_method_mut(method);
            if method.has_body() {
                group.insert(CONTENT_TYPE, DEFAULT_CONTENT_TYPE);
            }
        }

        Self {
            headers,
            timeout: Some(Duration::ZERO),
            transform_request: Some(vec![default_request_transform()]),
            transform_response: Some(vec![default_response_transform()]),
            validate_status: Some(ValidateStatus::default()),
            xsrf_cookie_name: Some("XSRF-TOKEN".to_string()),
            xsrf_header_name: Some("X-XSRF-TOKEN".to_string()),
            ..Self::default()
        }
    }

    /// Merge `other` over `self`.
    ///
    /// Set fields of `other` win; headers merge one level deep.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        fn pick<T: Clone>(left: &Option<T>, right: &Option<T>) -> Option<T> {
            right.as_ref().or(left.as_ref()).cloned()
        }

        Self {
            method: other.method.or(self.method),
            url: pick(&self.url, &other.url),
            base_url: pick(&self.base_url, &other.base_url),
            headers: self.headers.merge(&other.headers),
            data: pick(&self.data, &other.data),
            params: pick(&self.params, &other.params),
            params_serializer: pick(&self.params_serializer, &other.params_serializer),
            timeout: other.timeout.or(self.timeout),
            timeout_error_message: pick(&self.timeout_error_message, &other.timeout_error_message),
            adapter: pick(&self.adapter, &other.adapter),
            transform_request: pick(&self.transform_request, &other.transform_request),
            transform_response: pick(&self.transform_response, &other.transform_response),
            validate_status: pick(&self.validate_status, &other.validate_status),
            cancel_token: pick(&self.cancel_token, &other.cancel_token),
            response_type: other.response_type.or(self.response_type),
            on_upload_progress: pick(&self.on_upload_progress, &other.on_upload_progress),
            on_download_progress: pick(&self.on_download_progress, &other.on_download_progress),
            auth: pick(&self.auth, &other.auth),
            with_credentials: other.with_credentials.or(self.with_credentials),
            xsrf_cookie_name: pick(&self.xsrf_cookie_name, &other.xsrf_cookie_name),
            xsrf_header_name: pick(&self.xsrf_header_name, &other.xsrf_header_name),
            max_content_length: other.max_content_length.or(self.max_content_length),
        }
    }

    /// The method to use, `GET` when unset.
    #[must_use]
    pub fn resolved_method(&self) -> Method {
        self.method.unwrap_or_default()
    }

    /// The effective timeout, `None` when unset or zero.
    #[must_use]
    pub fn effective_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|timeout| !timeout.is_zero())
    }

    /// Set the URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the method.
    #[must_use]
    pub const fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the base URL.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set an explicit request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.request.insert(name, value);
        self
    }

    /// Set a header common to every method.
    #[must_use]
    pub fn common_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.common.insert(name, value);
        self
    }

    /// Set a header sent only with `method`.
    #[must_use]
    pub fn method_header(
        mut self,
        method: Method,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.headers.for_method_mut(method).insert(name, value);
        self
    }

    /// Replace the layered headers.
    #[must_use]
    pub fn headers(mut self, headers: impl Into<HeaderConfig>) -> Self {
        self.headers = headers.into();
        self
    }

    /// Set the payload.
    #[must_use]
    pub fn data(mut self, data: impl Into<Body>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set a JSON payload from a serializable value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as JSON.
    pub fn json<T: serde::Serialize>(self, value: &T) -> Result<Self> {
        Ok(self.data(Body::json(value)?))
    }

    /// Set a URL-encoded payload from a serializable value.
    ///
    /// # Errors
    ///
    /// Returns an error if form serialization fails.
    pub fn form<T: serde::Serialize>(self, value: &T) -> Result<Self> {
        Ok(self.data(Body::form(value)?))
    }

    /// Add a query parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.get_or_insert_with(Params::new).insert(key, value);
        self
    }

    /// Replace the query parameters.
    #[must_use]
    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    /// Use a custom query string serializer.
    #[must_use]
    pub fn params_serializer(
        mut self,
        serialize: impl Fn(&Params) -> String + Send + Sync + 'static,
    ) -> Self {
        self.params_serializer = Some(ParamsSerializer::new(serialize));
        self
    }

    /// Set the adapter deadline.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the timeout error message.
    #[must_use]
    pub fn timeout_error_message(mut self, message: impl Into<String>) -> Self {
        self.timeout_error_message = Some(message.into());
        self
    }

    /// Use `adapter` for this request.
    #[must_use]
    pub fn adapter(mut self, adapter: impl Adapter + 'static) -> Self {
        self.adapter = Some(Arc::new(adapter));
        self
    }

    /// Replace the request transforms.
    #[must_use]
    pub fn transform_request(mut self, transforms: Vec<Transform>) -> Self {
        self.transform_request = Some(transforms);
        self
    }

    /// Replace the response transforms.
    #[must_use]
    pub fn transform_response(mut self, transforms: Vec<Transform>) -> Self {
        self.transform_response = Some(transforms);
        self
    }

    /// Set the status predicate.
    #[must_use]
    pub fn validate_status(mut self, validate: impl Fn(u16) -> bool + Send + Sync + 'static) -> Self {
        self.validate_status = Some(ValidateStatus::new(validate));
        self
    }

    /// Accept every status.
    #[must_use]
    pub fn accept_all_statuses(mut self) -> Self {
        self.validate_status = Some(ValidateStatus::accept_all());
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Set the response type.
    #[must_use]
    pub const fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    /// Set the upload progress callback.
    #[must_use]
    pub fn on_upload_progress(mut self, callback: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.on_upload_progress = Some(Arc::new(callback));
        self
    }

    /// Set the download progress callback.
    #[must_use]
    pub fn on_download_progress(
        mut self,
        callback: impl Fn(ProgressEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_download_progress = Some(Arc::new(callback));
        self
    }

    /// Use basic authentication.
    #[must_use]
    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(BasicCredentials::new(username, password));
        self
    }

    /// Send cross-site credentials.
    #[must_use]
    pub const fn with_credentials(mut self, enabled: bool) -> Self {
        self.with_credentials = Some(enabled);
        self
    }

    /// Set the XSRF cookie name.
    #[must_use]
    pub fn xsrf_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.xsrf_cookie_name = Some(name.into());
        self
    }

    /// Set the XSRF header name.
    #[must_use]
    pub fn xsrf_header_name(mut self, name: impl Into<String>) -> Self {
        self.xsrf_header_name = Some(name.into());
        self
    }

    /// Cap the buffered response size.
    #[must_use]
    pub const fn max_content_length(mut self, bytes: usize) -> Self {
        self.max_content_length = Some(bytes);
        self
    }

    /// Flattened headers for the resolved method.
    #[must_use]
    pub fn flat_headers(&self) -> Headers {
        self.headers.flatten(self.resolved_method())
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("data", &self.data)
            .field("params", &self.params)
            .field("timeout", &self.timeout)
            .field("adapter", &self.adapter.as_ref().map(|_| ".."))
            .field("cancel_token", &self.cancel_token)
            .field("response_type", &self.response_type)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}
