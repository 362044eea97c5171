use serde::Serialize;

use crate::workflow::evaluator::Completeness;
use crate::workflow::phase::{MessageKind, MessageRole, WorkflowPhase, WorkflowStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: String,
}

/// Session metadata returned on login; the raw token is never stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRecord {
    pub id: String,
    pub user_id: String,
    pub project_id: Option<String>,
    pub title: String,
    pub description: String,
    pub epic_content: String,
    pub phase: WorkflowPhase,
    pub status: WorkflowStatus,
    pub completeness: Completeness,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: i64,
    pub workflow_id: String,
    pub role: MessageRole,
    pub content: String,
    pub kind: MessageKind,
    pub category: Option<String>,
    pub phase: WorkflowPhase,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

/// The "summit" artifact: one final summary per workflow.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub workflow_id: String,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseRecord {
    pub id: String,
    pub workflow_id: String,
    pub title: String,
    pub steps: Vec<String>,
    pub expected_result: String,
    pub priority: String,
    pub created_at: String,
}
