//! HTTP API tests against the in-process router.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use chrono::NaiveTime;
use veille_core::{pipeline::PipelinePhase, DailySchedule};

use common::{TestConfig, TestFixture};

#[tokio::test]
async fn test_health_reports_version_and_hash() {
    let fixture = TestFixture::new();
    let response = fixture.get("/api/v1/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(response.body["config_hash"].as_str().unwrap().len(), 16);
}

#[tokio::test]
async fn test_config_redacts_secrets() {
    let fixture = TestFixture::with_config(TestConfig {
        api_key: Some("server-secret".to_string()),
        ..Default::default()
    });
    let response = fixture.get("/api/v1/config").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["server"]["api_key_configured"], true);
    assert_eq!(response.body["pipeline"]["selection_size"], 5);
    assert!(!response.body.to_string().contains("server-secret"));
}

#[tokio::test]
async fn test_trigger_wait_returns_finished_execution() {
    let fixture = TestFixture::new();
    let response = fixture.post("/api/v1/pipeline/trigger?wait=true").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Pipeline completed");
    let execution = &response.body["execution"];
    assert_eq!(execution["status"], "completed");
    assert_eq!(execution["trigger"], "manual");
    assert_eq!(execution["ideas_translated"], 5);
    assert_eq!(execution["delivered"], true);
    assert_eq!(fixture.messenger.message_count().await, 1);
}

#[tokio::test]
async fn test_trigger_wait_reports_failure() {
    let fixture = TestFixture::new();
    fixture
        .model
        .set_default_response(PipelinePhase::Analyzing, "not json at all")
        .await;

    let response = fixture.post("/api/v1/pipeline/trigger?wait=true").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Pipeline failed");
    assert_eq!(response.body["execution"]["status"], "failed");
    assert_eq!(response.body["execution"]["failed_stage"], "Analyzing");
    assert_eq!(fixture.messenger.message_count().await, 0);
}

#[tokio::test]
async fn test_trigger_detached_then_conflict() {
    let fixture = TestFixture::with_config(TestConfig {
        model_delay: Some(Duration::from_millis(50)),
        ..Default::default()
    });

    let first = fixture.post("/api/v1/pipeline/trigger").await;
    assert_eq!(first.status, StatusCode::ACCEPTED);
    assert_eq!(first.body["status"], "running");
    let running_id = first.body["id"].as_str().unwrap().to_string();

    let second = fixture.post("/api/v1/pipeline/trigger?wait=true").await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.body["running_execution_id"], running_id.as_str());
    assert!(second.body["error"].as_str().unwrap().contains("already running"));

    let status = fixture.get("/api/v1/pipeline/status").await;
    assert_eq!(status.body["is_running"], true);
    assert_eq!(status.body["current"]["id"], running_id.as_str());

    fixture.wait_until_idle().await;

    let status = fixture.get("/api/v1/pipeline/status").await;
    assert_eq!(status.body["is_running"], false);
    assert!(status.body["current"].is_null());
    assert_eq!(status.body["last_execution"]["id"], running_id.as_str());
    assert_eq!(status.body["last_execution"]["status"], "completed");
}

#[tokio::test]
async fn test_trigger_requires_api_key_when_configured() {
    let fixture = TestFixture::with_config(TestConfig {
        api_key: Some("secret".to_string()),
        ..Default::default()
    });

    let missing = fixture.post("/api/v1/pipeline/trigger?wait=true").await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let wrong = fixture
        .post_with_headers(
            "/api/v1/pipeline/trigger?wait=true",
            &[("Authorization", "Bearer nope")],
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(fixture.service.history(10).len(), 0);

    let ok = fixture
        .post_with_headers(
            "/api/v1/pipeline/trigger?wait=true",
            &[("Authorization", "Bearer secret")],
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK);

    // Read-only endpoints stay open.
    let status = fixture.get("/api/v1/pipeline/status").await;
    assert_eq!(status.status, StatusCode::OK);
}

#[tokio::test]
async fn test_status_reports_next_scheduled_run() {
    let schedule = DailySchedule::parse("09:00", "+01:00").unwrap();
    let fixture = TestFixture::with_config(TestConfig {
        schedule: Some(schedule),
        ..Default::default()
    });

    let status = fixture.get("/api/v1/pipeline/status").await;
    assert_eq!(status.status, StatusCode::OK);
    let next = status.body["next_scheduled_run"].as_str().unwrap();
    let next: chrono::DateTime<chrono::Utc> = next.parse().unwrap();
    assert_eq!(
        next.with_timezone(&schedule.offset).time(),
        NaiveTime::from_hms_opt(9, 0, 0).unwrap()
    );

    let unscheduled = TestFixture::new();
    let status = unscheduled.get("/api/v1/pipeline/status").await;
    assert!(status.body["next_scheduled_run"].is_null());
}

#[tokio::test]
async fn test_history_lists_most_recent_first() {
    let fixture = TestFixture::new();
    for _ in 0..3 {
        let response = fixture.post("/api/v1/pipeline/trigger?wait=true").await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let response = fixture.get("/api/v1/pipeline/history?limit=2").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 2);

    let executions = response.body["executions"].as_array().unwrap();
    let expected: Vec<String> = fixture
        .service
        .history(2)
        .into_iter()
        .map(|e| e.id.to_string())
        .collect();
    let actual: Vec<&str> = executions
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(actual, expected);

    let default_page = fixture.get("/api/v1/pipeline/history").await;
    assert_eq!(default_page.body["count"], 3);
}

#[tokio::test]
async fn test_history_rejects_out_of_range_limit() {
    let fixture = TestFixture::new();
    for limit in ["0", "51", "-1"] {
        let response = fixture
            .get(&format!("/api/v1/pipeline/history?limit={}", limit))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "limit={}", limit);
        assert!(response.body["error"].as_str().unwrap().contains("between 1 and 50"));
    }

    let response = fixture.get("/api/v1/pipeline/history?limit=50").await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_get_execution_by_id() {
    let fixture = TestFixture::new();
    let triggered = fixture.post("/api/v1/pipeline/trigger?wait=true").await;
    let id = triggered.body["execution"]["id"].as_str().unwrap().to_string();

    let response = fixture
        .get(&format!("/api/v1/pipeline/executions/{}", id))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["id"], id.as_str());
    assert_eq!(response.body["phase"], "Done");

    let missing = fixture
        .get("/api/v1/pipeline/executions/550e8400-e29b-41d4-a716-446655440000")
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let malformed = fixture.get("/api/v1/pipeline/executions/not-a-uuid").await;
    assert_eq!(malformed.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_counters() {
    let fixture = TestFixture::new();
    fixture.post("/api/v1/pipeline/trigger?wait=true").await;
    fixture.get("/api/v1/health").await;

    let (status, body) = fixture.get_text("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("veille_http_requests_total"));
    assert!(body.contains("veille_executions_total"));
    assert!(body.contains("veille_execution_running"));
}
