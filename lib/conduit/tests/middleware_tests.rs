//! Integration tests for transport middleware.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use assert2::check;
use conduit::middleware::LoggingLayer;
use conduit::tower::{Layer, Service, service_fn};
use conduit::{BoxedService, Client, Error, HyperAdapter, RequestConfig, Response};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

fn client_with(adapter: HyperAdapter, server: &MockServer) -> Client {
    Client::with_adapter(
        RequestConfig::defaults().merge(&RequestConfig::new().base_url(server.uri())),
        adapter,
    )
}

/// Logging middleware doesn't break the request/response flow.
#[tokio::test]
async fn test_logging_middleware() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/logged"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"logged": true})))
        .mount(&mock_server)
        .await;

    let client = client_with(HyperAdapter::builder().with_logging().build(), &mock_server);
    let response = client
        .get("/logged", RequestConfig::new())
        .await
        .expect("response");

    check!(response.is_success());
}

#[tokio::test]
async fn test_debug_logging_sees_failures() {
    let mock_server = MockServer::start().await;

    let client = client_with(
        HyperAdapter::builder().with_debug_logging().build(),
        &mock_server,
    );
    let err = client
        .get("/unmocked", RequestConfig::new())
        .await
        .expect_err("404");

    check!(err.status() == Some(404));
}

#[tokio::test]
async fn test_basic_auth_layer_supplies_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("Authorization", "Basic YWxpY2U6c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("Authorization", "Basic Ym9iOmh1bnRlcjI="))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_with(
        HyperAdapter::builder().with_basic_auth("alice", "secret").build(),
        &mock_server,
    );

    let response = client
        .get("/private", RequestConfig::new())
        .await
        .expect("layer credentials");
    check!(response.status() == 200);

    let response = client
        .get("/private", RequestConfig::new().auth("bob", "hunter2"))
        .await
        .expect("request credentials");
    check!(response.status() == 202);
}

/// Layers are applied in order: the first one added is outermost.
#[tokio::test]
async fn test_generic_layer_api() {
    #[derive(Clone)]
    struct CountLayer(Arc<AtomicUsize>);

    impl Layer<BoxedService> for CountLayer {
        type Service = BoxedService;

        fn layer(&self, inner: BoxedService) -> BoxedService {
            let counter = Arc::clone(&self.0);
            BoxedService::new(service_fn(move |config: RequestConfig| {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut inner = inner.clone();
                async move { inner.call(config).await }
            }))
        }
    }

    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/counted"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let counter = Arc::new(AtomicUsize::new(0));
    let adapter = HyperAdapter::builder()
        .layer(LoggingLayer::new())
        .layer(CountLayer(Arc::clone(&counter)))
        .build();
    let client = client_with(adapter, &mock_server);

    for _ in 0..3 {
        client
            .get("/counted", RequestConfig::new())
            .await
            .expect("response");
    }

    check!(counter.load(Ordering::SeqCst) == 3);
}

/// The adapter is itself a tower service.
#[tokio::test]
async fn test_adapter_as_service() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/items/7"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let mut adapter = HyperAdapter::new();
    let config = RequestConfig::new()
        .url(format!("{}/items/7", mock_server.uri()))
        .method(conduit::Method::Delete);
    let response: Result<Response, Error> = adapter.call(config).await;

    check!(response.map(|response| response.status()).ok() == Some(204));
}
