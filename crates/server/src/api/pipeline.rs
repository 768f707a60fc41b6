//! Pipeline API endpoints: trigger, status, history and execution lookup.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use veille_core::{
    ConflictError, Execution, ExecutionId, ExecutionStatus, PipelineStatus, TriggerSource,
    DEFAULT_HISTORY_LIMIT,
};

use crate::state::AppState;

/// Largest page accepted by the history endpoint.
pub const MAX_HISTORY_LIMIT: i64 = 50;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for triggering a run.
#[derive(Debug, Default, Deserialize)]
pub struct TriggerParams {
    /// Block until the execution finishes.
    #[serde(default)]
    pub wait: bool,
}

/// Query parameters for listing past executions.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

/// Response for a synchronous trigger.
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub message: String,
    pub execution: Execution,
}

/// Response for the history endpoint.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub count: usize,
    pub executions: Vec<Execution>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct PipelineErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running_execution_id: Option<ExecutionId>,
}

impl PipelineErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            running_execution_id: None,
        }
    }
}

fn conflict(err: ConflictError) -> Response {
    let body = PipelineErrorResponse {
        error: err.to_string(),
        running_execution_id: Some(err.running_id),
    };
    (StatusCode::CONFLICT, Json(body)).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// Start a manual execution.
///
/// With `?wait=true` the response carries the finished record; otherwise the
/// run continues in the background and the running record is returned.
pub async fn trigger(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TriggerParams>,
) -> Response {
    let service = state.service();

    if params.wait {
        return match service.trigger(TriggerSource::Manual).await {
            Ok(execution) => {
                let message = match execution.status {
                    ExecutionStatus::Completed => "Pipeline completed",
                    _ => "Pipeline failed",
                };
                let body = TriggerResponse {
                    message: message.to_string(),
                    execution,
                };
                (StatusCode::OK, Json(body)).into_response()
            }
            Err(err) => conflict(err),
        };
    }

    match service.trigger_detached(TriggerSource::Manual) {
        Ok(execution) => {
            info!(execution_id = %execution.id, "Manual execution started");
            (StatusCode::ACCEPTED, Json(execution)).into_response()
        }
        Err(err) => conflict(err),
    }
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<PipelineStatus> {
    Json(state.service().status())
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Response {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT as i64);
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        let body = PipelineErrorResponse::new(format!(
            "limit must be between 1 and {}",
            MAX_HISTORY_LIMIT
        ));
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    let executions = state.service().history(limit as usize);
    let body = HistoryResponse {
        count: executions.len(),
        executions,
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub async fn get_execution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let found = ExecutionId::parse_str(&id)
        .ok()
        .and_then(|id| state.service().get(id));

    match found {
        Some(execution) => (StatusCode::OK, Json(execution)).into_response(),
        None => {
            let body = PipelineErrorResponse::new(format!("execution not found: {}", id));
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
    }
}
