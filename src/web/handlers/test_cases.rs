use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use validator::Validate;

use super::super::AppState;
use super::super::auth::AuthUser;
use super::workflows::owned_workflow;
use crate::ai::{parse_test_cases, prompts};
use crate::error::ApiError;
use crate::workflow::phase::WorkflowStatus;

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[validate(length(min = 1, message = "workflowId is required"))]
    workflow_id: String,
}

/// One AI call turns a finished workflow's transcript into stored test cases.
pub async fn generate(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<Value>, ApiError> {
    payload.validate()?;
    let workflow = owned_workflow(&state, &user.id, &payload.workflow_id).await?;
    if !matches!(
        workflow.status,
        WorkflowStatus::Completed | WorkflowStatus::Submitted
    ) {
        return Err(ApiError::validation(
            "workflowId",
            "test cases can only be generated from a completed workflow",
        ));
    }

    let history = state.db.list_messages(&workflow.id).await?;
    let context = prompts::test_case_context(&workflow, &history);
    let raw = state
        .gateway
        .complete(&context)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;
    let generated = parse_test_cases(&raw).map_err(|e| ApiError::Upstream(e.to_string()))?;

    let stored = state.db.insert_test_cases(&workflow.id, &generated).await?;
    tracing::info!(
        "generated {} test cases for workflow {}",
        stored.len(),
        workflow.id
    );
    Ok(Json(json!({ "success": true, "testCases": stored })))
}

pub async fn list_for_workflow(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let workflow = owned_workflow(&state, &user.id, &id).await?;
    let test_cases = state.db.list_test_cases(&workflow.id).await?;
    Ok(Json(json!({ "success": true, "testCases": test_cases })))
}
