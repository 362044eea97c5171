use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use validator::Validate;

use super::super::AppState;
use super::super::auth::AuthUser;
use super::workflows::{ChatRequest, run_chat_turn};
use crate::error::ApiError;
use crate::store::types::{ProjectRecord, WorkflowRecord};
use crate::workflow::phase::WorkflowStatus;

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, message = "name is required"))]
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAndStartRequest {
    #[validate(length(min = 1, message = "name is required"))]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    title: Option<String>,
    #[validate(length(min = 1, message = "epicContent is required"))]
    epic_content: String,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartWorkflowRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: String,
    #[validate(length(min = 1, message = "epicContent is required"))]
    epic_content: String,
}

async fn owned_project(
    state: &AppState,
    user_id: &str,
    project_id: &str,
) -> Result<ProjectRecord, ApiError> {
    let project = state
        .db
        .get_project(project_id)
        .await?
        .ok_or(ApiError::NotFound("project"))?;
    if project.user_id != user_id {
        return Err(ApiError::NotFound("project"));
    }
    Ok(project)
}

async fn active_workflow(
    state: &AppState,
    project: &ProjectRecord,
) -> Result<WorkflowRecord, ApiError> {
    state
        .db
        .active_workflow_for_project(&project.id)
        .await?
        .ok_or(ApiError::NotFound("active workflow for project"))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<Json<Value>, ApiError> {
    payload.validate()?;
    let project = state
        .db
        .create_project(&user.id, &payload.name, &payload.description)
        .await?;
    Ok(Json(json!({ "success": true, "project": project })))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let projects = state.db.list_projects(&user.id).await?;
    Ok(Json(json!({ "success": true, "projects": projects })))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let project = owned_project(&state, &user.id, &id).await?;
    let workflow = state.db.active_workflow_for_project(&project.id).await?;
    Ok(Json(json!({
        "success": true,
        "project": project,
        "activeWorkflow": workflow,
    })))
}

/// Create a project and immediately start its first workflow.
pub async fn create_and_start(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<CreateAndStartRequest>,
) -> Result<Json<Value>, ApiError> {
    payload.validate()?;
    let project = state
        .db
        .create_project(&user.id, &payload.name, &payload.description)
        .await?;
    let title = payload.title.unwrap_or_else(|| payload.name.clone());
    let workflow = state
        .db
        .create_workflow(
            &user.id,
            Some(&project.id),
            &title,
            &payload.description,
            &payload.epic_content,
        )
        .await?;

    tracing::info!("created project {} with workflow {}", project.id, workflow.id);
    Ok(Json(json!({
        "success": true,
        "project": project,
        "workflow": workflow,
    })))
}

/// Start a workflow for an existing project. One live workflow at a time.
pub async fn start_workflow(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<StartWorkflowRequest>,
) -> Result<Json<Value>, ApiError> {
    payload.validate()?;
    let project = owned_project(&state, &user.id, &id).await?;

    if state
        .db
        .active_workflow_for_project(&project.id)
        .await?
        .is_some()
    {
        return Err(ApiError::validation(
            "projectId",
            "project already has a workflow in progress",
        ));
    }

    let title = payload.title.unwrap_or_else(|| project.name.clone());
    let workflow = state
        .db
        .create_workflow(
            &user.id,
            Some(&project.id),
            &title,
            &payload.description,
            &payload.epic_content,
        )
        .await?;
    Ok(Json(json!({ "success": true, "workflow": workflow })))
}

pub async fn chat(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<Value>, ApiError> {
    payload.validate()?;
    let project = owned_project(&state, &user.id, &id).await?;
    let workflow = active_workflow(&state, &project).await?;
    let outcome = run_chat_turn(&state, &workflow, &payload.content).await?;
    Ok(Json(outcome))
}

/// Explicit advance for the project's active workflow.
pub async fn complete(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let project = owned_project(&state, &user.id, &id).await?;
    let workflow = active_workflow(&state, &project).await?;
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
    Ok(Json(json!({ "success": true, "workflow": advanced })))
}
