//! Tower middleware layers for the hyper transport.
//!
//! Layers wrap the transport service of a [`HyperAdapter`](crate::HyperAdapter)
//! and see every finalized [`RequestConfig`](crate::RequestConfig) together
//! with its settled outcome. The first layer added is the outermost.
//!
//! - [`LoggingLayer`] - Logs requests and outcomes using `tracing`
//! - [`BasicAuthLayer`] - Supplies default basic credentials
//!
//! ```
//! use conduit::HyperAdapter;
//! use conduit::middleware::{BasicAuthLayer, LoggingLayer};
//!
//! let adapter = HyperAdapter::builder()
//!     .layer(LoggingLayer::debug())
//!     .layer(BasicAuthLayer::new("user", "secret"))
//!     .build();
//! ```

mod basic_auth;
mod logging;

pub use basic_auth::{BasicAuth, BasicAuthLayer, basic_authorization};
pub use logging::{LogLevel, Logging, LoggingLayer};

pub use tower::{Layer, Service, ServiceBuilder};
