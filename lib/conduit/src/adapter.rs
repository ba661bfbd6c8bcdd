//! Default transport adapter using hyper-util.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use conduit_core::url::{build_full_path, build_url};
use conduit_core::{Adapter, AdapterFuture, Body, CONTENT_TYPE, ProgressEvent, RawHandle, settle};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tower::Layer;
use tower::util::BoxCloneService;
use tower_service::Service;

use crate::middleware::{BasicAuthLayer, LoggingLayer, basic_authorization};
use crate::{
    AUTHORIZATION, Error, Headers, RequestConfig, Response, Result, TransportConfig,
    TransportConfigBuilder, connector::https_connector,
};

// ============================================================================
// Type-Erased Service for Middleware Composition
// ============================================================================

/// Type-erased transport service for middleware composition.
pub type BoxedService = BoxCloneService<RequestConfig, Response, Error>;

/// Future type for the Tower Service implementation.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'static>>;

/// Thread-safe wrapper for `BoxedService`.
///
/// `BoxCloneService` is not `Sync`; adapters must be.
#[derive(Clone)]
struct SyncService {
    inner: Arc<Mutex<BoxedService>>,
}

impl SyncService {
    fn new(service: BoxedService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    fn call(&self, config: RequestConfig) -> ServiceFuture {
        // Lock, clone the service, and release the lock immediately
        let mut service = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        Box::pin(async move { service.call(config).await })
    }
}

// ============================================================================
// Exchange handle
// ============================================================================

/// Raw handle stored on responses and transport errors.
///
/// Retrieve it with `response.raw().and_then(|raw| raw.downcast_ref::<Exchange>())`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Request method.
    pub method: http::Method,
    /// Request URI.
    pub uri: http::Uri,
    /// Protocol version of the response, once one was received.
    pub version: Option<http::Version>,
}

/// A hyper request ready to send.
#[derive(Debug)]
struct Prepared {
    request: http::Request<Full<Bytes>>,
    exchange: Exchange,
    upload_size: Option<u64>,
}

// ============================================================================
// Raw Transport (internal, used for direct hyper access)
// ============================================================================

/// Raw hyper transport (internal implementation).
#[derive(Clone)]
struct RawHyperTransport {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl RawHyperTransport {
    fn new(config: &TransportConfig) -> Self {
        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(https_connector(config));

        Self { inner }
    }

    /// Absolute URL for a finalized config.
    fn request_url(config: &RequestConfig) -> Result<url::Url> {
        let full_path = build_full_path(
            config.base_url.as_deref(),
            config.url.as_deref().unwrap_or_default(),
        );
        let url = build_url(
            &full_path,
            config.params.as_ref(),
            config.params_serializer.as_ref(),
        );
        Ok(url::Url::parse(&url)?)
    }

    /// Build a hyper request from a finalized config.
    fn build_hyper_request(config: &RequestConfig) -> Result<Prepared> {
        let url = Self::request_url(config)?;
        let method = http::Method::from(config.resolved_method());

        let mut headers: Headers = config.flat_headers();
        if let Some(credentials) = &config.auth {
            headers.insert(AUTHORIZATION, basic_authorization(credentials));
        }

        let body = match &config.data {
            None => {
                headers.remove(CONTENT_TYPE);
                None
            }
            Some(Body::Multipart(form)) => {
                headers.insert(CONTENT_TYPE, form.content_type());
                Some(form.encode())
            }
            Some(body) => Some(body.to_bytes()?),
        };

        let mut builder = http::Request::builder()
            .method(method.clone())
            .uri(url.as_str());
        for (name, value) in headers.iter() {
            builder = builder.header(name, value);
        }

        let upload_size = body.as_ref().map(|bytes| bytes.len() as u64);
        let request = builder
            .body(body.map_or_else(Full::default, Full::new))
            .map_err(|err| Error::adapter(format!("invalid request: {err}")))?;

        let exchange = Exchange {
            method,
            uri: request.uri().clone(),
            version: None,
        };
        Ok(Prepared {
            request,
            exchange,
            upload_size,
        })
    }

    /// Convert response headers, skipping values that are not visible ASCII.
    ///
    /// Repeated names are joined with `", "`.
    fn extract_headers(headers: &http::HeaderMap) -> Headers {
        headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
            .fold(Headers::new(), |mut acc, (name, value)| {
                acc.append(name, value);
                acc
            })
    }

    async fn execute(&self, config: RequestConfig) -> Result<Response> {
        let token = config.cancel_token.clone();
        let timeout = config.effective_timeout();
        let timeout_message = config.timeout_error_message.clone();

        let prepared = Self::build_hyper_request(&config)?;
        let raw = RawHandle::new(prepared.exchange.clone());

        let bounded = async {
            let Some(timeout) = timeout else {
                return self.exchange(config, prepared).await;
            };
            tokio::time::timeout(timeout, self.exchange(config, prepared))
                .await
                .map_err(|_| {
                    let message = timeout_message
                        .unwrap_or_else(|| format!("timeout of {}ms exceeded", timeout.as_millis()));
                    Error::timeout(message).with_raw(raw)
                })?
        };

        match token {
            Some(token) => tokio::select! {
                biased;
                reason = token.cancelled() => Err(Error::Cancelled(reason)),
                result = bounded => result,
            },
            None => bounded.await,
        }
    }

    async fn exchange(&self, config: RequestConfig, prepared: Prepared) -> Result<Response> {
        let Prepared {
            request,
            mut exchange,
            upload_size,
        } = prepared;

        let response = self
            .inner
            .request(request)
            .await
            .map_err(|err| Error::network(err.to_string()).with_raw(RawHandle::new(exchange.clone())))?;

        if let (Some(progress), Some(size)) = (&config.on_upload_progress, upload_size) {
            progress(ProgressEvent {
                loaded: size,
                total: Some(size),
            });
        }

        let status = response.status();
        exchange.version = Some(response.version());
        let headers = Self::extract_headers(response.headers());
        let total = headers
            .get("content-length")
            .and_then(|length| length.parse::<u64>().ok());

        let mut body = response.into_body();
        let mut buffer = BytesMut::new();
        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|err| {
                Error::network(err.to_string()).with_raw(RawHandle::new(exchange.clone()))
            })?;
            let Ok(chunk) = frame.into_data() else {
                continue;
            };
            buffer.extend_from_slice(&chunk);

            if let Some(max) = config.max_content_length
                && buffer.len() > max
            {
                return Err(Error::adapter(format!("maxContentLength size of {max} exceeded")));
            }
            if let Some(progress) = &config.on_download_progress {
                progress(ProgressEvent {
                    loaded: buffer.len() as u64,
                    total,
                });
            }
        }

        let bytes = buffer.freeze();
        let data = if config.response_type.is_some_and(|kind| kind.is_binary()) {
            Body::Bytes(bytes)
        } else {
            Body::Text(String::from_utf8_lossy(&bytes).into_owned())
        };

        let validate_status = config.validate_status.clone();
        let response = Response::new(status.as_u16(), headers, Some(data))
            .with_config(config)
            .with_raw(RawHandle::new(exchange));
        settle(response, validate_status.as_ref())
    }
}

impl Service<RequestConfig> for RawHyperTransport {
    type Response = Response;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, config: RequestConfig) -> Self::Future {
        let transport = self.clone();
        Box::pin(async move { transport.execute(config).await })
    }
}

// ============================================================================
// Public Adapter
// ============================================================================

/// Transport adapter using hyper-util with connection pooling, TLS, and
/// middleware support.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use conduit::HyperAdapter;
///
/// // Simple adapter without middleware
/// let adapter = HyperAdapter::new();
///
/// // Adapter with tuned pool and logging
/// let adapter = HyperAdapter::builder()
///     .connect_timeout(Duration::from_secs(3))
///     .with_logging()
///     .build();
/// ```
#[derive(Clone)]
pub struct HyperAdapter {
    service: SyncService,
    config: TransportConfig,
}

impl fmt::Debug for HyperAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperAdapter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperAdapter {
    /// Create a new adapter with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    /// Create a new adapter with custom configuration (no middleware).
    #[must_use]
    pub fn with_config(config: TransportConfig) -> Self {
        let raw = RawHyperTransport::new(&config);
        Self::with_service(BoxCloneService::new(raw), config)
    }

    fn with_service(service: BoxedService, config: TransportConfig) -> Self {
        Self {
            service: SyncService::new(service),
            config,
        }
    }

    /// Create a new adapter builder.
    #[must_use]
    pub fn builder() -> HyperAdapterBuilder {
        HyperAdapterBuilder::default()
    }

    /// Get the transport configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Default for HyperAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for HyperAdapter {
    fn dispatch(&self, config: RequestConfig) -> AdapterFuture {
        self.service.call(config)
    }
}

// ============================================================================
// Tower Service Implementation
// ============================================================================

impl Service<RequestConfig> for HyperAdapter {
    type Response = Response;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        // SyncService is always ready (the underlying service is polled when called)
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, config: RequestConfig) -> Self::Future {
        self.service.call(config)
    }
}

/// Builder for [`HyperAdapter`].
#[derive(Default)]
pub struct HyperAdapterBuilder {
    config: TransportConfigBuilder,
    layers: Vec<Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>>,
}

impl fmt::Debug for HyperAdapterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperAdapterBuilder")
            .field("config", &self.config)
            .field("layers_count", &self.layers.len())
            .finish()
    }
}

impl HyperAdapterBuilder {
    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config = self.config.pool_idle_timeout(timeout);
        self
    }

    /// Add a Tower layer around the transport.
    ///
    /// Layers are applied in order: first added = outermost.
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<RequestConfig, Response = Response, Error = Error>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<RequestConfig>>::Future: Send,
    {
        self.layers
            .push(Arc::new(move |service| BoxCloneService::new(layer.layer(service))));
        self
    }

    /// Add exchange logging at info level.
    #[must_use]
    pub fn with_logging(self) -> Self {
        self.layer(LoggingLayer::new())
    }

    /// Add exchange logging at debug level (includes headers).
    #[must_use]
    pub fn with_debug_logging(self) -> Self {
        self.layer(LoggingLayer::debug())
    }

    /// Supply default basic credentials to requests without any.
    #[must_use]
    pub fn with_basic_auth(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.layer(BasicAuthLayer::new(username, password))
    }

    /// Build the adapter with all configured middleware.
    #[must_use]
    pub fn build(self) -> HyperAdapter {
        let config = self.config.build();
        let mut service: BoxedService = BoxCloneService::new(RawHyperTransport::new(&config));

        // Wrap in reverse so that the first layer added ends up outermost.
        for layer_fn in self.layers.into_iter().rev() {
            service = layer_fn(service);
        }

        HyperAdapter::with_service(service, config)
    }
}
