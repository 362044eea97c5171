use anyhow::Result;
use rusqlite::{Row, params};

use super::Database;
use super::types::{SummaryRecord, WorkflowRecord};
use crate::workflow::evaluator::Completeness;
use crate::workflow::phase::{WorkflowPhase, WorkflowStatus};

const WORKFLOW_COLUMNS: &str = "id, user_id, project_id, title, description, epic_content, \
                                phase, status, completeness_json, created_at, updated_at";

fn text_conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, message.into())
}

fn workflow_from_row(row: &Row<'_>) -> rusqlite::Result<WorkflowRecord> {
    let phase_raw: String = row.get(6)?;
    let status_raw: String = row.get(7)?;
    let completeness_raw: String = row.get(8)?;

    let phase = WorkflowPhase::parse(&phase_raw)
        .ok_or_else(|| text_conversion_error(6, format!("unknown phase '{}'", phase_raw)))?;
    let status = WorkflowStatus::parse(&status_raw)
        .ok_or_else(|| text_conversion_error(7, format!("unknown status '{}'", status_raw)))?;
    let completeness: Completeness = serde_json::from_str(&completeness_raw)
        .map_err(|e| text_conversion_error(8, format!("bad completeness column: {}", e)))?;

    Ok(WorkflowRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        project_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        epic_content: row.get(5)?,
        phase,
        status,
        completeness,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl Database {
    /// Create a workflow in ANALYSIS / IN_PROGRESS with zeroed scores.
    pub async fn create_workflow(
        &self,
        user_id: &str,
        project_id: Option<&str>,
        title: &str,
        description: &str,
        epic_content: &str,
    ) -> Result<WorkflowRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let completeness = Completeness::zero();
        let completeness_json = serde_json::to_string(&completeness)?;

        {
            let db = self.conn().lock().await;
            db.execute(
                "INSERT INTO workflows \
                 (id, user_id, project_id, title, description, epic_content, phase, status, completeness_json) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id,
                    user_id,
                    project_id,
                    title,
                    description,
                    epic_content,
                    WorkflowPhase::Analysis.as_str(),
                    WorkflowStatus::InProgress.as_str(),
                    completeness_json,
                ],
            )?;
        }

        self.get_workflow(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("workflow {} vanished after insert", id))
    }

    pub async fn get_workflow(&self, id: &str) -> Result<Option<WorkflowRecord>> {
        let db = self.conn().lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM workflows WHERE id = ?1",
            WORKFLOW_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![id], workflow_from_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Workflows the user is still working on, newest first.
    pub async fn list_in_progress_workflows(&self, user_id: &str) -> Result<Vec<WorkflowRecord>> {
        self.list_workflows_with_statuses(
            user_id,
            &[
                WorkflowStatus::InProgress,
                WorkflowStatus::ReadyToAdvance,
                WorkflowStatus::Reopened,
            ],
        )
        .await
    }

    /// Finished workflows (completed or submitted), newest first.
    pub async fn list_completed_workflows(&self, user_id: &str) -> Result<Vec<WorkflowRecord>> {
        self.list_workflows_with_statuses(
            user_id,
            &[WorkflowStatus::Completed, WorkflowStatus::Submitted],
        )
        .await
    }

    async fn list_workflows_with_statuses(
        &self,
        user_id: &str,
        statuses: &[WorkflowStatus],
    ) -> Result<Vec<WorkflowRecord>> {
        let placeholders: Vec<String> = (0..statuses.len())
            .map(|i| format!("?{}", i + 2))
            .collect();
        let sql = format!(
            "SELECT {} FROM workflows WHERE user_id = ?1 AND status IN ({}) ORDER BY rowid DESC",
            WORKFLOW_COLUMNS,
            placeholders.join(", ")
        );

        let db = self.conn().lock().await;
        let mut stmt = db.prepare(&sql)?;
        let status_strings: Vec<&'static str> = statuses.iter().map(|s| s.as_str()).collect();
        let mut bindings: Vec<&dyn rusqlite::ToSql> = vec![&user_id];
        for s in &status_strings {
            bindings.push(s);
        }

        let rows = stmt.query_map(&bindings[..], workflow_from_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// The project's workflow currently accepting chat, if any.
    pub async fn active_workflow_for_project(
        &self,
        project_id: &str,
    ) -> Result<Option<WorkflowRecord>> {
        let db = self.conn().lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM workflows WHERE project_id = ?1 \
             AND status IN ('IN_PROGRESS', 'READY_TO_ADVANCE', 'REOPENED') \
             ORDER BY rowid DESC LIMIT 1",
            WORKFLOW_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![project_id], workflow_from_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Persist a fresh evaluator result alongside the derived status.
    pub async fn update_workflow_evaluation(
        &self,
        id: &str,
        completeness: &Completeness,
        status: WorkflowStatus,
    ) -> Result<bool> {
        let completeness_json = serde_json::to_string(completeness)?;
        let db = self.conn().lock().await;
        let rows = db.execute(
            "UPDATE workflows SET completeness_json = ?1, overall_score = ?2, status = ?3, \
             updated_at = CURRENT_TIMESTAMP WHERE id = ?4",
            params![
                completeness_json,
                completeness.overall_score as i64,
                status.as_str(),
                id
            ],
        )?;
        Ok(rows > 0)
    }

    pub async fn set_workflow_status(&self, id: &str, status: WorkflowStatus) -> Result<bool> {
        let db = self.conn().lock().await;
        let rows = db.execute(
            "UPDATE workflows SET status = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(rows > 0)
    }

    /// Move one step forward in the phase sequence. Scores reset so the new
    /// phase has to be earned on its own; status becomes COMPLETED only at
    /// the end of the sequence.
    pub async fn advance_workflow(&self, id: &str) -> Result<Option<WorkflowRecord>> {
        let current = match self.get_workflow(id).await? {
            Some(w) => w,
            None => return Ok(None),
        };

        let next_phase = current.phase.next();
        let next_status = if next_phase.is_terminal() {
            WorkflowStatus::Completed
        } else {
            WorkflowStatus::InProgress
        };
        let completeness = if next_phase.is_terminal() {
            Completeness::full()
        } else {
            Completeness::zero()
        };
        let completeness_json = serde_json::to_string(&completeness)?;

        {
            let db = self.conn().lock().await;
            db.execute(
                "UPDATE workflows SET phase = ?1, status = ?2, completeness_json = ?3, \
                 overall_score = ?4, updated_at = CURRENT_TIMESTAMP WHERE id = ?5",
                params![
                    next_phase.as_str(),
                    next_status.as_str(),
                    completeness_json,
                    completeness.overall_score as i64,
                    id
                ],
            )?;
        }

        self.get_workflow(id).await
    }

    // --- Summit summary artifact ---

    pub async fn upsert_summary(
        &self,
        workflow_id: &str,
        title: &str,
        content: &str,
    ) -> Result<SummaryRecord> {
        {
            let db = self.conn().lock().await;
            db.execute(
                "INSERT INTO summaries (workflow_id, title, content) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(workflow_id) DO UPDATE SET \
                 title = excluded.title, content = excluded.content, updated_at = CURRENT_TIMESTAMP",
                params![workflow_id, title, content],
            )?;
        }
        self.get_summary(workflow_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("summary for {} vanished after upsert", workflow_id))
    }

    pub async fn get_summary(&self, workflow_id: &str) -> Result<Option<SummaryRecord>> {
        let db = self.conn().lock().await;
        let mut stmt = db.prepare(
            "SELECT workflow_id, title, content, created_at, updated_at \
             FROM summaries WHERE workflow_id = ?1",
        )?;
        let mut rows = stmt.query_map(params![workflow_id], |row| {
            Ok(SummaryRecord {
                workflow_id: row.get(0)?,
                title: row.get(1)?,
                content: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
            })
        })?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub async fn update_summary(
        &self,
        workflow_id: &str,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<bool> {
        let db = self.conn().lock().await;
        let rows = db.execute(
            "UPDATE summaries SET \
             title = COALESCE(?1, title), content = COALESCE(?2, content), \
             updated_at = CURRENT_TIMESTAMP WHERE workflow_id = ?3",
            params![title, content, workflow_id],
        )?;
        Ok(rows > 0)
    }
}
