//! Interceptable, cancellable async HTTP client.
//!
//! `conduit` pairs the transport-agnostic pipeline of [`conduit_core`] with a
//! hyper transport ([`HyperAdapter`]) that handles TLS, connection pooling,
//! deadlines, cancellation and status validation.
//!
//! # Example
//!
//! ```no_run
//! use conduit::prelude::*;
//!
//! #[derive(Debug, Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! # async fn run() -> conduit::Result<()> {
//! let client = conduit::create(RequestConfig::new().base_url("https://api.example.com"));
//!
//! client.interceptors().request.add(Interceptor::fulfilled(|config: RequestConfig| async move {
//!     Ok(config.header("X-Client", "conduit"))
//! }));
//!
//! let response = client.get("/users/42", RequestConfig::new()).await?;
//! let user: User = response.json()?;
//! # Ok(())
//! # }
//! ```
//!
//! Transport behavior is extended with Tower layers, see [`middleware`].

mod adapter;
mod config;
mod connector;
pub mod middleware;
pub mod prelude;

pub use adapter::{BoxedService, Exchange, HyperAdapter, HyperAdapterBuilder, ServiceFuture};
pub use config::{TransportConfig, TransportConfigBuilder};

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use conduit_core::{
    ACCEPT, AUTHORIZATION, Adapter, AdapterFuture, BasicCredentials, Body, BufferView, CONTENT_TYPE,
    Cancel, CancelToken, CancelTokenSource, Canceller, Client, ContentType, DEFAULT_ACCEPT,
    DEFAULT_CONTENT_TYPE, Dispatcher, Error, Form, HeaderConfig, Headers, Interceptor,
    InterceptorId, InterceptorRegistry, Interceptors, Method, Params, ParamsSerializer, Part,
    ProgressCallback, ProgressEvent, RawHandle, RequestConfig, Response, ResponseType, Result,
    Transform, ValidateStatus, from_json, is_cancel, settle, to_json, transform, url,
};

/// Create a client over the hyper transport.
///
/// `defaults` is merged over [`RequestConfig::defaults`], so only the
/// settings that differ need to be given.
#[must_use]
pub fn create(defaults: RequestConfig) -> Client {
    Client::with_adapter(RequestConfig::defaults().merge(&defaults), HyperAdapter::new())
}

/// A client with the built-in defaults over the hyper transport.
#[must_use]
pub fn client() -> Client {
    create(RequestConfig::new())
}
