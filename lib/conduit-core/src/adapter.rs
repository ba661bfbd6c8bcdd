//! Transport adapter contract.
//!
//! An [`Adapter`] performs the network exchange for a finalized
//! [`RequestConfig`]: headers are flattened and the payload has already been
//! through the request transforms. Adapters are expected to:
//!
//! - settle the response with [`settle`](crate::settle) and the config's
//!   `validate_status`,
//! - race in-flight I/O against the config's cancel token and fail with
//!   [`Error::Cancelled`](crate::Error::Cancelled) when it fires,
//! - attach a [`RawHandle`](crate::RawHandle) to responses and, where
//!   available, to network and timeout failures.
//!
//! Any `Fn(RequestConfig) -> impl Future<Output = Result<Response>>` closure
//! is an adapter, which makes in-memory adapters trivial to write:
//!
//! ```
//! use conduit_core::{Adapter, Body, Headers, RequestConfig, Response, Result};
//!
//! let echo = |config: RequestConfig| async move {
//!     let response: Result<Response> = Ok(Response::new(200, Headers::new(), config.data.clone())
//!         .with_config(config));
//!     response
//! };
//! let _future = echo.dispatch(RequestConfig::new().data("hi"));
//! ```

use std::future::Future;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::{RequestConfig, Response, Result};

/// Future returned by [`Adapter::dispatch`].
pub type AdapterFuture = BoxFuture<'static, Result<Response>>;

/// A pluggable transport.
pub trait Adapter: Send + Sync {
    /// Perform one exchange for `config`.
    fn dispatch(&self, config: RequestConfig) -> AdapterFuture;
}

impl<F, Fut> Adapter for F
where
    F: Fn(RequestConfig) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    fn dispatch(&self, config: RequestConfig) -> AdapterFuture {
        self(config).boxed()
    }
}
