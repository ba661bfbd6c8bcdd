//! Transport-agnostic request pipeline for conduit.
//!
//! This crate turns a [`RequestConfig`] into a settled [`Response`] or an
//! [`Error`], without doing any network I/O itself:
//! - [`Client`] - merges config with defaults and runs the interceptor chain
//! - [`Interceptors`] - request and response interceptor registries
//! - [`Dispatcher`] - request transforms, header flattening, adapter call
//! - [`Adapter`] - the pluggable transport contract
//! - [`CancelToken`] - cooperative cancellation
//! - [`settle`] - status validation
//! - [`transform`] - payload transforms
//! - [`url`] - query string and base URL helpers
//!
//! The `conduit` crate provides the default hyper transport.

mod adapter;
mod body;
mod cancel;
mod client;
mod config;
mod dispatch;
mod error;
mod headers;
mod interceptor;
mod method;
mod multipart;
pub mod prelude;
mod response;
mod settle;
pub mod transform;
pub mod url;

pub use adapter::{Adapter, AdapterFuture};
pub use body::{Body, BufferView, ContentType, from_json, to_json};
pub use cancel::{Cancel, CancelToken, CancelTokenSource, Canceller};
pub use client::Client;
pub use config::{
    BasicCredentials, DEFAULT_ACCEPT, DEFAULT_CONTENT_TYPE, Params, ParamsSerializer,
    ProgressCallback, ProgressEvent, RequestConfig, ResponseType,
};
pub use dispatch::Dispatcher;
pub use error::{Error, Result, is_cancel};
pub use headers::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderConfig, Headers};
pub use interceptor::{Interceptor, InterceptorId, InterceptorRegistry, Interceptors};
pub use method::Method;
pub use multipart::{Form, Part};
pub use response::{RawHandle, Response};
pub use settle::{ValidateStatus, settle};
pub use transform::Transform;
