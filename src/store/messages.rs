use anyhow::Result;
use rusqlite::{Row, params};

use super::Database;
use super::types::MessageRecord;
use crate::workflow::phase::{MessageKind, MessageRole, WorkflowPhase};

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRecord> {
    let role_raw: String = row.get(2)?;
    let kind_raw: String = row.get(4)?;
    let phase_raw: String = row.get(6)?;

    let bad = |idx: usize, msg: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, msg.into())
    };
    let role = MessageRole::parse(&role_raw)
        .ok_or_else(|| bad(2, format!("unknown role '{}'", role_raw)))?;
    let kind = MessageKind::parse(&kind_raw)
        .ok_or_else(|| bad(4, format!("unknown message kind '{}'", kind_raw)))?;
    let phase = WorkflowPhase::parse(&phase_raw)
        .ok_or_else(|| bad(6, format!("unknown phase '{}'", phase_raw)))?;

    Ok(MessageRecord {
        id: row.get(0)?,
        workflow_id: row.get(1)?,
        role,
        content: row.get(3)?,
        kind,
        category: row.get(5)?,
        phase,
        created_at: row.get(7)?,
    })
}

const MESSAGE_COLUMNS: &str = "id, workflow_id, role, content, kind, category, phase, created_at";

impl Database {
    /// Append one chat turn. The log is append-only; rowid is the ordering key.
    pub async fn append_message(
        &self,
        workflow_id: &str,
        role: MessageRole,
        content: &str,
        kind: MessageKind,
        category: Option<&str>,
        phase: WorkflowPhase,
    ) -> Result<MessageRecord> {
        let db = self.conn().lock().await;
        db.execute(
            "INSERT INTO messages (workflow_id, role, content, kind, category, phase) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                workflow_id,
                role.as_str(),
                content,
                kind.as_str(),
                category,
                phase.as_str()
            ],
        )?;
        let id = db.last_insert_rowid();

        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM messages WHERE id = ?1",
            MESSAGE_COLUMNS
        ))?;
        let record = stmt.query_row(params![id], message_from_row)?;
        Ok(record)
    }

    /// Full ordered history for a workflow.
    pub async fn list_messages(&self, workflow_id: &str) -> Result<Vec<MessageRecord>> {
        let db = self.conn().lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM messages WHERE workflow_id = ?1 ORDER BY id ASC",
            MESSAGE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![workflow_id], message_from_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Ordered history restricted to the turns recorded in one phase.
    pub async fn list_messages_in_phase(
        &self,
        workflow_id: &str,
        phase: WorkflowPhase,
    ) -> Result<Vec<MessageRecord>> {
        let db = self.conn().lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM messages WHERE workflow_id = ?1 AND phase = ?2 ORDER BY id ASC",
            MESSAGE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![workflow_id, phase.as_str()], message_from_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}
