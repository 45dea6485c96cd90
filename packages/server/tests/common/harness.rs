//! Test harness for integration testing.
//!
//! Builds the full axum router around an in-memory catalog, so every test gets
//! its own queue, event bus and rate limiter without any external services.
//! Requests go through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use queue_core::domains::queue::QUEUE_TOPIC;
use queue_core::kernel::{EventBus, InMemoryCatalog, RateLimiter, ServerDeps, Subscription};
use queue_core::server::{build_app, AxumAppState};
use queue_core::QueueSettings;
use serde_json::Value;
use test_context::AsyncTestContext;
use tower::ServiceExt;

/// Address used for requests that do not pick one.
pub const DEFAULT_CLIENT: &str = "192.0.2.10";

/// Test harness that manages test infrastructure.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &mut TestHarness) {
///     let response = ctx.get("/api/queue").await;
///     // ... test code
/// }
/// ```
pub struct TestHarness {
    pub state: AxumAppState,
    pub router: Router,
}

/// Status, headers and decoded JSON body of one response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `error.code` of an error response.
    pub fn error_code(&self) -> &str {
        self.body["error"]["code"].as_str().unwrap_or_default()
    }
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_settings(QueueSettings::default())
    }

    pub fn with_settings(settings: QueueSettings) -> Self {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let deps = ServerDeps::new(
            Arc::new(InMemoryCatalog::with_samples()),
            EventBus::with_capacity(settings.event_channel_capacity),
            Arc::new(RateLimiter::new(
                settings.vote_rate_limit_calls,
                settings.vote_rate_limit_window,
            )),
        );
        let state = AxumAppState::new(deps, &settings);
        let router = build_app(state.clone());

        Self { state, router }
    }

    /// Join the queue topic the way a WebSocket client does.
    pub async fn subscribe(&self) -> Subscription {
        self.state.server_deps.event_bus.subscribe(QUEUE_TOPIC).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None, DEFAULT_CLIENT).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body), DEFAULT_CLIENT).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::PATCH, uri, Some(body), DEFAULT_CLIENT).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None, DEFAULT_CLIENT).await
    }

    /// POST from a specific client address (sent as `X-Forwarded-For`).
    pub async fn post_from(&self, client: &str, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body), client).await
    }

    /// POST a raw, possibly malformed, JSON body.
    pub async fn post_raw(&self, uri: &str, raw: &'static str) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(raw))
            .expect("valid request");
        self.execute(request).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        client: &str,
    ) -> TestResponse {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", client);

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        self.execute(request).await
    }

    async fn execute(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON response body")
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }
}
