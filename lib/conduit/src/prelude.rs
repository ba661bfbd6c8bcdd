//! Prelude module for convenient imports.
//!
//! ```
//! use conduit::prelude::*;
//! ```

pub use crate::{
    Body, Cancel, CancelToken, Client, Error, Form, Headers, HyperAdapter, Interceptor, Method,
    Part, RequestConfig, Response, ResponseType, Result, is_cancel,
};
pub use serde::{Deserialize, Serialize};
