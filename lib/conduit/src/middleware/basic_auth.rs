//! Basic authentication middleware.
//!
//! [`BasicAuthLayer`] fills in default credentials for requests that carry
//! none; the transport turns a request's credentials into an
//! `Authorization: Basic <base64(user:pass)>` header.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use base64::Engine;
use tower::{Layer, Service};

use crate::{BasicCredentials, Error, RequestConfig, Response, Result};

/// `Authorization` header value for `credentials`.
#[must_use]
pub fn basic_authorization(credentials: &BasicCredentials) -> String {
    let pair = format!("{}:{}", credentials.username, credentials.password);
    let encoded = base64::engine::general_purpose::STANDARD.encode(pair);
    format!("Basic {encoded}")
}

/// Layer that supplies default basic credentials.
///
/// # Example
///
/// ```
/// use conduit::HyperAdapter;
/// use conduit::middleware::BasicAuthLayer;
///
/// let adapter = HyperAdapter::builder()
///     .layer(BasicAuthLayer::new("username", "password"))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct BasicAuthLayer {
    credentials: BasicCredentials,
}

impl BasicAuthLayer {
    /// Create a new basic auth layer with the given username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: BasicCredentials::new(username, password),
        }
    }
}

impl<S> Layer<S> for BasicAuthLayer {
    type Service = BasicAuth<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BasicAuth {
            inner,
            credentials: self.credentials.clone(),
        }
    }
}

/// Service that supplies default basic credentials.
#[derive(Debug, Clone)]
pub struct BasicAuth<S> {
    inner: S,
    credentials: BasicCredentials,
}

impl<S> Service<RequestConfig> for BasicAuth<S>
where
    S: Service<RequestConfig, Response = Response, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut config: RequestConfig) -> Self::Future {
        if config.auth.is_none() {
            config.auth = Some(self.credentials.clone());
        }

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(config).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_authorization_encodes_correctly() {
        // "user:pass" -> "dXNlcjpwYXNz"
        let credentials = BasicCredentials::new("user", "pass");
        assert_eq!(basic_authorization(&credentials), "Basic dXNlcjpwYXNz");
    }

    #[tokio::test]
    async fn fills_missing_credentials_only() {
        let echo = tower::service_fn(|config: RequestConfig| async move {
            let auth = config.auth.clone().map(|c| c.username).unwrap_or_default();
            Ok::<_, Error>(Response::new(200, crate::Headers::new(), Some(auth.into())))
        });
        let mut service = BasicAuthLayer::new("default", "pw").layer(echo);

        let response = service.call(RequestConfig::new()).await.expect("call");
        assert_eq!(response.text(), Some("default"));

        let response = service
            .call(RequestConfig::new().auth("explicit", "pw"))
            .await
            .expect("call");
        assert_eq!(response.text(), Some("explicit"));
    }
}
