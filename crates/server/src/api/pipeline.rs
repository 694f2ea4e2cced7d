//! # Pipeline API
//!
//! Onboarding endpoints: start a step, submit inputs, complete the step.
//! Validation failures come back as 200s with `success: false` - only
//! storage problems are 5xx.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use sitewright_core::pipeline::{PipelineState, SetupStep, StepOutcome};

use crate::SharedState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionQuery {
    pub project_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartStepRequest {
    pub project_id: String,
    pub step: SetupStep,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetInputRequest {
    pub project_id: String,
    pub field: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteStepResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<SetupStep>,
    pub pipeline_completed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

pub async fn start_step(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Json(request): Json<StartStepRequest>,
) -> Result<Json<PipelineState>, StatusCode> {
    let pipeline = state.pipeline(&session_id, &request.project_id).await;
    let mut pipeline = pipeline.lock().await;
    if let Err(e) = pipeline.start_step(request.step).await {
        error!(%e, "start_step failed");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(pipeline.state().clone()))
}

pub async fn set_input(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Json(request): Json<SetInputRequest>,
) -> Result<Json<PipelineState>, StatusCode> {
    let pipeline = state.pipeline(&session_id, &request.project_id).await;
    let mut pipeline = pipeline.lock().await;
    if let Err(e) = pipeline.set_input(&request.field, request.value).await {
        error!(%e, "set_input failed");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(pipeline.state().clone()))
}

pub async fn complete_step(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Json(request): Json<SessionQuery>,
) -> Result<Json<CompleteStepResponse>, StatusCode> {
    let pipeline = state.pipeline(&session_id, &request.project_id).await;
    let mut pipeline = pipeline.lock().await;
    match pipeline.complete_step().await {
        Ok(StepOutcome::Advanced(next)) => Ok(Json(CompleteStepResponse {
            success: true,
            next_step: Some(next),
            pipeline_completed: false,
            errors: Vec::new(),
        })),
        Ok(StepOutcome::PipelineCompleted) => Ok(Json(CompleteStepResponse {
            success: true,
            next_step: None,
            pipeline_completed: true,
            errors: Vec::new(),
        })),
        Ok(StepOutcome::Failed(validation)) => Ok(Json(CompleteStepResponse {
            success: false,
            next_step: None,
            pipeline_completed: false,
            errors: validation.errors,
        })),
        Err(e) => {
            error!(%e, "complete_step failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn get_state(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Query(query): Query<SessionQuery>,
) -> Json<PipelineState> {
    let pipeline = state.pipeline(&session_id, &query.project_id).await;
    let state = pipeline.lock().await.state().clone();
    Json(state)
}
