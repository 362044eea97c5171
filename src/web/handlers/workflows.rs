use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use validator::Validate;

use super::super::AppState;
use super::super::auth::AuthUser;
use crate::ai::{parse_assistant_reply, parse_summary, prompts};
use crate::error::ApiError;
use crate::store::types::WorkflowRecord;
use crate::workflow::evaluator::{self, EvaluatedMessage};
use crate::workflow::phase::{MessageKind, MessageRole, WorkflowStatus};

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkflowRequest {
    #[validate(length(min = 1, message = "title is required"))]
    title: String,
    #[serde(default)]
    description: String,
    #[validate(length(min = 1, message = "epicContent is required"))]
    epic_content: String,
    #[serde(default)]
    project_id: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
}

#[derive(Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct SummitRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// Resolve a workflow for the requesting user. Someone else's workflow is
/// indistinguishable from a missing one.
pub(crate) async fn owned_workflow(
    state: &AppState,
    user_id: &str,
    workflow_id: &str,
) -> Result<WorkflowRecord, ApiError> {
    let workflow = state
        .db
        .get_workflow(workflow_id)
        .await?
        .ok_or(ApiError::NotFound("workflow"))?;
    if workflow.user_id != user_id {
        return Err(ApiError::NotFound("workflow"));
    }
    Ok(workflow)
}

/// One full chat turn: persist the user message, ask the gateway, persist the
/// reply, re-run the evaluator, and derive the new status. The evaluator is
/// the only readiness authority; the model's phaseComplete hint is echoed in
/// the response but never persisted.
pub(crate) async fn run_chat_turn(
    state: &AppState,
    workflow: &WorkflowRecord,
    content: &str,
) -> Result<Value, ApiError> {
    if !workflow.status.accepts_chat() {
        return Err(ApiError::validation(
            "content",
            "workflow is no longer accepting chat messages",
        ));
    }

    state
        .db
        .append_message(
            &workflow.id,
            MessageRole::User,
            content,
            MessageKind::Answer,
            None,
            workflow.phase,
        )
        .await?;

    let history = state.db.list_messages(&workflow.id).await?;
    let context = prompts::chat_context(workflow, &history);
    let raw = state
        .gateway
        .complete(&context)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;
    let reply = parse_assistant_reply(&raw).map_err(|e| ApiError::Upstream(e.to_string()))?;

    state
        .db
        .append_message(
            &workflow.id,
            MessageRole::Assistant,
            &reply.ai_response,
            reply.message_type,
            reply.category.as_deref(),
            workflow.phase,
        )
        .await?;

    let slice = state
        .db
        .list_messages_in_phase(&workflow.id, workflow.phase)
        .await?;
    let evaluated: Vec<EvaluatedMessage> = slice
        .iter()
        .map(|m| EvaluatedMessage::new(m.role, &m.content))
        .collect();
    let evaluation = evaluator::evaluate(workflow.phase, &workflow.epic_content, &evaluated);

    let status = if evaluation.phase_complete {
        WorkflowStatus::ReadyToAdvance
    } else {
        workflow.status
    };
    state
        .db
        .update_workflow_evaluation(&workflow.id, &evaluation.completeness, status)
        .await?;

    Ok(json!({
        "success": true,
        "aiResponse": reply.ai_response,
        "messageType": reply.message_type,
        "category": reply.category,
        "phaseComplete": evaluation.phase_complete,
        "modelPhaseComplete": reply.phase_complete,
        "completeness": evaluation.completeness,
        "phase": workflow.phase,
        "status": status,
    }))
}

pub async fn create_workflow(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<CreateWorkflowRequest>,
) -> Result<Json<Value>, ApiError> {
    payload.validate()?;

    if let Some(project_id) = payload.project_id.as_deref() {
        let project = state
            .db
            .get_project(project_id)
            .await?
            .ok_or(ApiError::NotFound("project"))?;
        if project.user_id != user.id {
            return Err(ApiError::NotFound("project"));
        }
    }

    let workflow = state
        .db
        .create_workflow(
            &user.id,
            payload.project_id.as_deref(),
            &payload.title,
            &payload.description,
            &payload.epic_content,
        )
        .await?;

    tracing::info!("created workflow {} for user {}", workflow.id, user.id);
    Ok(Json(json!({ "success": true, "workflow": workflow })))
}

pub async fn chat(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<Value>, ApiError> {
    payload.validate()?;
    let workflow = owned_workflow(&state, &user.id, &id).await?;
    let outcome = run_chat_turn(&state, &workflow, &payload.content).await?;
    Ok(Json(outcome))
}

pub async fn status(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let workflow = owned_workflow(&state, &user.id, &id).await?;
    let messages = state.db.list_messages(&workflow.id).await?;
    Ok(Json(json!({
        "success": true,
        "workflow": workflow,
        "messages": messages,
    })))
}

/// Explicit advance. READY_TO_ADVANCE is required; nothing advances on its own.
pub async fn complete(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let workflow = owned_workflow(&state, &user.id, &id).await?;
    if workflow.status != WorkflowStatus::ReadyToAdvance {
        return Err(ApiError::validation(
            "status",
            "workflow is not ready to advance",
        ));
    }

    let advanced = state
        .db
        .advance_workflow(&workflow.id)
        .await?
        .ok_or(ApiError::NotFound("workflow"))?;
    tracing::info!(
        "workflow {} advanced to {}",
        advanced.id,
        advanced.phase.as_str()
    );
    Ok(Json(json!({ "success": true, "workflow": advanced })))
}

pub async fn reopen(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let workflow = owned_workflow(&state, &user.id, &id).await?;
    if !matches!(
        workflow.status,
        WorkflowStatus::Completed | WorkflowStatus::Submitted
    ) {
        return Err(ApiError::validation(
            "status",
            "only completed or submitted workflows can be reopened",
        ));
    }

    state
        .db
        .set_workflow_status(&workflow.id, WorkflowStatus::Reopened)
        .await?;
    let workflow = owned_workflow(&state, &user.id, &id).await?;
    Ok(Json(json!({ "success": true, "workflow": workflow })))
}

pub async fn list_in_progress(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let workflows = state.db.list_in_progress_workflows(&user.id).await?;
    Ok(Json(json!({ "success": true, "workflows": workflows })))
}

pub async fn list_completed(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let workflows = state.db.list_completed_workflows(&user.id).await?;
    Ok(Json(json!({ "success": true, "workflows": workflows })))
}

// --- Summit (final summary artifact) ---

pub async fn summit_create(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<SummitRequest>,
) -> Result<Json<Value>, ApiError> {
    let workflow = owned_workflow(&state, &user.id, &id).await?;
    if !workflow.phase.is_terminal() {
        return Err(ApiError::validation(
            "status",
            "workflow must complete all phases before a summit summary",
        ));
    }

    let (title, content) = match payload.content {
        Some(content) => (
            payload.title.unwrap_or_else(|| "Summary".to_string()),
            content,
        ),
        None => {
            let history = state.db.list_messages(&workflow.id).await?;
            let context = prompts::summary_context(&workflow, &history);
            let raw = state
                .gateway
                .complete(&context)
                .await
                .map_err(|e| ApiError::Upstream(e.to_string()))?;
            let generated = parse_summary(&raw).map_err(|e| ApiError::Upstream(e.to_string()))?;
            (generated.title, generated.content)
        }
    };

    let summary = state.db.upsert_summary(&workflow.id, &title, &content).await?;
    state
        .db
        .set_workflow_status(&workflow.id, WorkflowStatus::Submitted)
        .await?;

    Ok(Json(json!({ "success": true, "summary": summary })))
}

pub async fn summit_update(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<SummitRequest>,
) -> Result<Json<Value>, ApiError> {
    let workflow = owned_workflow(&state, &user.id, &id).await?;
    if payload.title.is_none() && payload.content.is_none() {
        return Err(ApiError::validation(
            "content",
            "provide a title or content to update",
        ));
    }

    let updated = state
        .db
        .update_summary(
            &workflow.id,
            payload.title.as_deref(),
            payload.content.as_deref(),
        )
        .await?;
    if !updated {
        return Err(ApiError::NotFound("summary"));
    }

    let summary = state
        .db
        .get_summary(&workflow.id)
        .await?
        .ok_or(ApiError::NotFound("summary"))?;
    Ok(Json(json!({ "success": true, "summary": summary })))
}

pub async fn summit_get(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let workflow = owned_workflow(&state, &user.id, &id).await?;
    let summary = state
        .db
        .get_summary(&workflow.id)
        .await?
        .ok_or(ApiError::NotFound("summary"))?;
    Ok(Json(json!({ "success": true, "summary": summary })))
}
