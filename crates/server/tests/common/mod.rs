//! Common test utilities for in-process API testing with mocks.
//!
//! The fixture wires the real router and digest service to mock news,
//! model and messenger backends, so every endpoint can be driven without
//! network access.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use veille_core::{
    pipeline::{BackoffPolicy, RetryPolicy},
    testing::{MockLanguageModel, MockMessenger, MockNewsSource},
    Config, DailySchedule, DigestService, ExecutionTracker, PipelineOrchestrator,
};
use veille_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use veille_core::testing::fixtures;

/// Test fixture with an in-process router and controllable mocks.
pub struct TestFixture {
    pub router: Router,
    pub news: Arc<MockNewsSource>,
    pub model: Arc<MockLanguageModel>,
    pub messenger: Arc<MockMessenger>,
    pub service: Arc<DigestService>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Key required on the trigger endpoint
    pub api_key: Option<String>,
    /// Delay injected into every model call
    pub model_delay: Option<Duration>,
    /// Attach a daily schedule to the service
    pub schedule: Option<DailySchedule>,
}

impl TestFixture {
    /// Create a new test fixture whose model answers every stage correctly.
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    pub fn with_config(test_config: TestConfig) -> Self {
        let mut config = Config::default();
        config.server.api_key = test_config.api_key.clone();

        let news = Arc::new(MockNewsSource::with_articles(fixtures::articles(20)));
        let mut model = fixtures::scripted_model(20, 10, 5);
        if let Some(delay) = test_config.model_delay {
            model = model.with_delay(delay);
        }
        let model = Arc::new(model);
        let messenger = Arc::new(MockMessenger::new());

        let mut retry = RetryPolicy::from_config(&config.pipeline);
        retry.backoff = BackoffPolicy::None;

        let orchestrator = PipelineOrchestrator::new(
            config.pipeline.clone(),
            config.news.limit,
            Arc::clone(&news) as _,
            Arc::clone(&model) as _,
            Arc::clone(&messenger) as _,
            Arc::new(ExecutionTracker::default()),
        )
        .with_retry_policy(retry);

        let mut service = DigestService::new(Arc::new(orchestrator));
        if let Some(schedule) = test_config.schedule {
            service = service.with_schedule(schedule);
        }
        let service = Arc::new(service);

        let state = Arc::new(AppState::new(config, Arc::clone(&service)));
        let router = create_router(state);

        Self {
            router,
            news,
            model,
            messenger,
            service,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, &[]).await
    }

    /// Send a POST request without a body.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path, &[]).await
    }

    /// Send a POST request with extra headers.
    pub async fn post_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        self.request("POST", path, headers).await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            request_builder = request_builder.header(*name, *value);
        }
        let request = request_builder.body(Body::empty()).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    /// Poll until no execution is in flight.
    pub async fn wait_until_idle(&self) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.service.status().is_running {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("execution did not finish in time");
    }
}
