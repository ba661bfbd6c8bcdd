//! The request pipeline controller.
//!
//! A [`Client`] owns default configuration and two interceptor registries.
//! Each call merges the caller's config over the defaults, snapshots both
//! registries and runs the chain
//! `reverse(request interceptors) → dispatch → response interceptors`
//! as one sequential pipeline.
//!
//! ```
//! use conduit_core::{Client, Error, Headers, Interceptor, RequestConfig, Response};
//!
//! # tokio_test_block(async {
//! let client = Client::with_adapter(RequestConfig::defaults(), |config: RequestConfig| async move {
//!     Ok::<_, Error>(Response::new(200, Headers::new(), None).with_config(config))
//! });
//! client.interceptors().request.add(Interceptor::fulfilled(|config: RequestConfig| async move {
//!     Ok(config.header("X-Trace", "1"))
//! }));
//!
//! let response = client.get("/health", RequestConfig::new()).await?;
//! assert_eq!(response.config().headers.request.get("x-trace"), Some("1"));
//! # Ok::<_, Error>(())
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use tracing::Instrument;

use crate::url::build_url;
use crate::{Adapter, Body, Dispatcher, Interceptors, Method, RequestConfig, Response, Result};

/// Entry point for issuing requests.
///
/// Cloning a client shares its interceptor registries.
#[derive(Debug, Clone)]
pub struct Client {
    defaults: RequestConfig,
    interceptors: Arc<Interceptors>,
    dispatcher: Dispatcher,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(RequestConfig::defaults())
    }
}

impl Client {
    /// A client without a fallback adapter.
    ///
    /// Requests must then carry their own adapter.
    #[must_use]
    pub fn new(defaults: RequestConfig) -> Self {
        Self::with_dispatcher(defaults, Dispatcher::new())
    }

    /// A client falling back to `adapter`.
    #[must_use]
    pub fn with_adapter(defaults: RequestConfig, adapter: impl Adapter + 'static) -> Self {
        Self::with_dispatcher(defaults, Dispatcher::with_adapter(Arc::new(adapter)))
    }

    /// A client using `dispatcher`.
    #[must_use]
    pub fn with_dispatcher(defaults: RequestConfig, dispatcher: Dispatcher) -> Self {
        Self {
            defaults,
            interceptors: Arc::new(Interceptors::default()),
            dispatcher,
        }
    }

    /// A new client whose defaults are these defaults with `config` merged
    /// over them. The new client has empty interceptor registries.
    #[must_use]
    pub fn derive(&self, config: &RequestConfig) -> Self {
        Self::with_dispatcher(self.defaults.merge(config), self.dispatcher.clone())
    }

    /// Default configuration.
    #[must_use]
    pub const fn defaults(&self) -> &RequestConfig {
        &self.defaults
    }

    /// Interceptor registries.
    #[must_use]
    pub fn interceptors(&self) -> &Interceptors {
        &self.interceptors
    }

    /// Issue a request.
    ///
    /// Merging and the interceptor snapshot happen when this is called, not
    /// when the returned future is first polled.
    ///
    /// # Errors
    ///
    /// The future fails with the error of the last chain step that failed
    /// without being recovered by a rejection handler.
    pub fn request(&self, config: RequestConfig) -> impl Future<Output = Result<Response>> + Send + 'static {
        let mut merged = self.defaults.merge(&config);
        let method = merged.resolved_method();
        merged.method = Some(method);

        let request_chain = self.interceptors.request.snapshot();
        let response_chain = self.interceptors.response.snapshot();
        let dispatcher = self.dispatcher.clone();

        let span = tracing::info_span!(
            "http_request",
            %method,
            url = merged.url.as_deref().unwrap_or_default()
        );

        async move {
            let mut outcome = Ok(merged);
            for interceptor in request_chain.into_iter().rev() {
                outcome = interceptor.handle(outcome).await;
            }

            let mut outcome = match outcome {
                Ok(config) => dispatcher.dispatch(config).await,
                Err(error) => Err(error),
            };

            for interceptor in response_chain {
                outcome = interceptor.handle(outcome).await;
            }

            match &outcome {
                Ok(response) => tracing::debug!(status = response.status(), "request settled"),
                Err(error) => tracing::debug!(%error, "request failed"),
            }
            outcome
        }
        .instrument(span)
    }

    /// Issue a request to `url`.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub fn request_url(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> impl Future<Output = Result<Response>> + Send + 'static {
        self.request(config.url(url))
    }

    fn without_data(
        &self,
        method: Method,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> impl Future<Output = Result<Response>> + Send + 'static {
        self.request(config.url(url).method(method))
    }

    fn with_data(
        &self,
        method: Method,
        url: impl Into<String>,
        data: impl Into<Body>,
        config: RequestConfig,
    ) -> impl Future<Output = Result<Response>> + Send + 'static {
        self.request(config.url(url).method(method).data(data))
    }

    /// Issue a `GET` request.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub fn get(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> impl Future<Output = Result<Response>> + Send + 'static {
        self.without_data(Method::Get, url, config)
    }

    /// Issue a `DELETE` request.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub fn delete(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> impl Future<Output = Result<Response>> + Send + 'static {
        self.without_data(Method::Delete, url, config)
    }

    /// Issue a `HEAD` request.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub fn head(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> impl Future<Output = Result<Response>> + Send + 'static {
        self.without_data(Method::Head, url, config)
    }

    /// Issue an `OPTIONS` request.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub fn options(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> impl Future<Output = Result<Response>> + Send + 'static {
        self.without_data(Method::Options, url, config)
    }

    /// Issue a `POST` request.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub fn post(
        &self,
        url: impl Into<String>,
        data: impl Into<Body>,
        config: RequestConfig,
    ) -> impl Future<Output = Result<Response>> + Send + 'static {
        self.with_data(Method::Post, url, data, config)
    }

    /// Issue a `PUT` request.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub fn put(
        &self,
        url: impl Into<String>,
        data: impl Into<Body>,
        config: RequestConfig,
    ) -> impl Future<Output = Result<Response>> + Send + 'static {
        self.with_data(Method::Put, url, data, config)
    }

    /// Issue a `PATCH` request.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub fn patch(
        &self,
        url: impl Into<String>,
        data: impl Into<Body>,
        config: RequestConfig,
    ) -> impl Future<Output = Result<Response>> + Send + 'static {
        self.with_data(Method::Patch, url, data, config)
    }

    /// The URL (path and query) a request with `config` would target,
    /// without the base URL and without a leading `?`.
    #[must_use]
    pub fn get_uri(&self, config: &RequestConfig) -> String {
        let merged = self.defaults.merge(config);
        let uri = build_url(
            merged.url.as_deref().unwrap_or_default(),
            merged.params.as_ref(),
            merged.params_serializer.as_ref(),
        );
        match uri.strip_prefix('?') {
            Some(rest) => rest.to_string(),
            None => uri,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};

    use assert2::{check, let_assert};
    use serde_json::json;

    use super::*;
    use crate::{CancelToken, Error, Headers, Interceptor, settle};

    #[derive(Clone, Default)]
    struct Recorder {
        calls: Arc<AtomicUsize>,
        trail: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn log(&self, entry: impl Into<String>) {
            self.trail
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(entry.into());
        }

        fn trail(&self) -> Vec<String> {
            self.trail.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }

        /// Echo adapter: answers with the request payload and headers, then
        /// settles like a real transport.
        fn client(&self, defaults: RequestConfig) -> Client {
            let recorder = self.clone();
            Client::with_adapter(defaults, move |config: RequestConfig| {
                recorder.calls.fetch_add(1, Ordering::SeqCst);
                recorder.log("dispatch");
                async move {
                    let status = config
                        .headers
                        .request
                        .get("X-Status")
                        .and_then(|status| status.parse().ok())
                        .unwrap_or(200);
                    let response = Response::new(status, config.headers.request.clone(), config.data.clone())
                        .with_config(config.clone());
                    settle(response, config.validate_status.as_ref())
                }
            })
        }

        fn logging(&self, tag: &'static str) -> (Interceptor<RequestConfig>, Interceptor<Response>) {
            let request = {
                let recorder = self.clone();
                Interceptor::fulfilled(move |config: RequestConfig| {
                    recorder.log(format!("request {tag}"));
                    async move { Ok(config) }
                })
            };
            let response = {
                let recorder = self.clone();
                Interceptor::fulfilled(move |response: Response| {
                    recorder.log(format!("response {tag}"));
                    async move { Ok(response) }
                })
            };
            (request, response)
        }
    }

    #[tokio::test]
    async fn interceptor_order() {
        let recorder = Recorder::default();
        let client = recorder.client(RequestConfig::defaults());
        for tag in ["A", "B"] {
            let (request, response) = recorder.logging(tag);
            client.interceptors().request.add(request);
            client.interceptors().response.add(response);
        }

        client.get("/order", RequestConfig::new()).await.expect("request");

        assert_eq!(
            recorder.trail(),
            vec!["request B", "request A", "dispatch", "response A", "response B"]
        );
    }

    #[tokio::test]
    async fn adapter_called_at_most_once() {
        let recorder = Recorder::default();
        let client = recorder.client(RequestConfig::defaults());

        client.get("/a", RequestConfig::new()).await.expect("get");
        let _ = client
            .get("/b", RequestConfig::new().header("X-Status", "500"))
            .await;
        client.post("/c", json!({"k": 1}), RequestConfig::new()).await.expect("post");

        assert_eq!(recorder.calls(), 3);
    }

    #[tokio::test]
    async fn requests_join_concurrently() {
        let recorder = Recorder::default();
        let client = recorder.client(RequestConfig::defaults());

        let responses = futures_util::future::try_join_all(
            ["/one", "/two", "/three"].map(|url| client.get(url, RequestConfig::new())),
        )
        .await
        .expect("all settle");

        let urls: Vec<_> = responses
            .iter()
            .map(|response| response.config().url.as_deref())
            .collect();
        assert_eq!(urls, vec![Some("/one"), Some("/two"), Some("/three")]);
        assert_eq!(recorder.calls(), 3);
    }

    #[tokio::test]
    async fn cancelled_at_call_time_skips_adapter() {
        let recorder = Recorder::default();
        let client = recorder.client(RequestConfig::defaults());
        let source = CancelToken::source();
        source.cancel.cancel("never mind");

        let result = client
            .get("/a", RequestConfig::new().cancel_token(source.token))
            .await;

        let_assert!(Err(err) = result);
        check!(crate::is_cancel(&err));
        assert_eq!(err.to_string(), "Cancel: never mind");
        assert_eq!(recorder.calls(), 0);
    }

    #[tokio::test]
    async fn eject_after_snapshot() {
        let recorder = Recorder::default();
        let client = recorder.client(RequestConfig::defaults());
        let (request, _) = recorder.logging("A");
        let id = client.interceptors().request.add(request);

        let in_flight = client.get("/first", RequestConfig::new());
        check!(client.interceptors().request.eject(id));
        in_flight.await.expect("first");

        client.get("/second", RequestConfig::new()).await.expect("second");

        assert_eq!(recorder.trail(), vec!["request A", "dispatch", "dispatch"]);
    }

    #[tokio::test]
    async fn json_round_trip() {
        let recorder = Recorder::default();
        let client = recorder.client(RequestConfig::defaults());
        let payload = json!({"id": 7, "nested": {"list": [1, "two", null], "ok": true}});

        let response = client
            .post("/echo", payload.clone(), RequestConfig::new())
            .await
            .expect("post");

        assert_eq!(response.data(), Some(&Body::Json(payload)));
    }

    #[tokio::test]
    async fn status_validation() {
        let recorder = Recorder::default();
        let client = recorder.client(RequestConfig::defaults());

        let response = client
            .delete("/a", RequestConfig::new().header("X-Status", "204"))
            .await
            .expect("204 settles");
        assert_eq!(response.status(), 204);

        let result = client
            .get("/a", RequestConfig::new().header("X-Status", "404"))
            .await;
        let_assert!(Err(Error::Status(response)) = result);
        assert_eq!(response.status(), 404);

        let response = client
            .get(
                "/a",
                RequestConfig::new()
                    .header("X-Status", "404")
                    .accept_all_statuses(),
            )
            .await
            .expect("accepted");
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn rejection_handler_recovers() {
        let recorder = Recorder::default();
        let client = recorder.client(RequestConfig::defaults());
        client
            .interceptors()
            .response
            .add(Interceptor::rejected(|error: Error| async move {
                match error.into_response() {
                    Some(response) => Ok(response),
                    None => Err(Error::adapter("no response")),
                }
            }));

        let response = client
            .get("/missing", RequestConfig::new().header("X-Status", "404"))
            .await
            .expect("recovered");
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn request_interceptor_failure_skips_dispatch() {
        let recorder = Recorder::default();
        let client = recorder.client(RequestConfig::defaults());
        client
            .interceptors()
            .request
            .add(Interceptor::fulfilled(|_config: RequestConfig| async move {
                Err::<RequestConfig, _>(Error::adapter("refused"))
            }));
        let seen = Arc::new(AtomicUsize::new(0));
        client.interceptors().response.add(Interceptor::rejected({
            let seen = Arc::clone(&seen);
            move |error: Error| {
                seen.fetch_add(1, Ordering::SeqCst);
                async move { Err::<Response, _>(error) }
            }
        }));

        let result = client.get("/a", RequestConfig::new()).await;

        let_assert!(Err(Error::Adapter(message)) = result);
        assert_eq!(message, "refused");
        assert_eq!(recorder.calls(), 0);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn header_precedence() {
        let recorder = Recorder::default();
        let defaults = RequestConfig::defaults()
            .common_header("X-Layer", "common")
            .common_header("X-Common", "c")
            .method_header(Method::Post, "x-layer", "post")
            .method_header(Method::Post, "X-Post", "p");
        let client = recorder.client(defaults);

        let response = client
            .post("/h", "body", RequestConfig::new().header("X-LAYER", "explicit"))
            .await
            .expect("post");
        let sent = &response.config().headers.request;
        assert_eq!(sent.get("x-layer"), Some("explicit"));
        assert_eq!(sent.get("x-common"), Some("c"));
        assert_eq!(sent.get("x-post"), Some("p"));

        let response = client.post("/h", "body", RequestConfig::new()).await.expect("post");
        assert_eq!(response.config().headers.request.get("X-Layer"), Some("post"));

        let response = client.get("/h", RequestConfig::new()).await.expect("get");
        let sent = &response.config().headers.request;
        assert_eq!(sent.get("X-Layer"), Some("common"));
        check!(!sent.contains("X-Post"));
    }

    #[tokio::test]
    async fn method_resolution() {
        let recorder = Recorder::default();
        let client = recorder.client(RequestConfig::defaults());

        let response = client.request(RequestConfig::new().url("/m")).await.expect("default");
        assert_eq!(response.config().method, Some(Method::Get));

        let derived = client.derive(&RequestConfig::new().method("put".parse().expect("method")));
        let response = derived.request(RequestConfig::new().url("/m")).await.expect("derived");
        assert_eq!(response.config().method, Some(Method::Put));

        let response = derived
            .request_url("/m", RequestConfig::new().method(Method::Patch))
            .await
            .expect("explicit");
        assert_eq!(response.config().method, Some(Method::Patch));
    }

    #[tokio::test]
    async fn derived_client_has_fresh_registries() {
        let recorder = Recorder::default();
        let client = recorder.client(RequestConfig::defaults());
        let (request, _) = recorder.logging("parent");
        client.interceptors().request.add(request);

        let derived = client.derive(&RequestConfig::new().base_url("https://api.example.com"));
        check!(derived.interceptors().request.is_empty());
        assert_eq!(
            derived.defaults().base_url.as_deref(),
            Some("https://api.example.com")
        );
        check!(client.defaults().base_url.is_none());

        derived.get("/x", RequestConfig::new()).await.expect("derived");
        assert_eq!(recorder.trail(), vec!["dispatch"]);
    }

    #[test]
    fn get_uri() {
        let client = Client::default();

        let config = RequestConfig::new().url("/a").param("x", 1);
        assert_eq!(client.get_uri(&config), "/a?x=1");

        let config = RequestConfig::new().url("/a#frag").param("x", 1);
        assert_eq!(client.get_uri(&config), "/a?x=1");

        let config = RequestConfig::new().param("page", 2).param("q", "rust lang");
        insta::assert_snapshot!(client.get_uri(&config), @"page=2&q=rust+lang");
    }

    #[tokio::test]
    async fn no_adapter_configured() {
        let client = Client::new(RequestConfig::defaults());
        let result = client.get("/a", RequestConfig::new()).await;
        let_assert!(Err(Error::Adapter(_)) = result);

        let response = client
            .get(
                "/a",
                RequestConfig::new().adapter(|config: RequestConfig| async move {
                    Ok::<_, Error>(Response::new(200, Headers::new(), None).with_config(config))
                }),
            )
            .await
            .expect("per-request adapter");
        assert_eq!(response.status(), 200);
    }
}
