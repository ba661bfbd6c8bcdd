//! Prelude module for convenient imports.
//!
//! ```
//! use conduit_core::prelude::*;
//! ```

pub use crate::{
    Adapter, Body, Cancel, CancelToken, Client, Error, Form, Headers, Interceptor, Method, Part,
    RequestConfig, Response, Result, is_cancel,
};
