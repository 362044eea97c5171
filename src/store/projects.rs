use anyhow::Result;
use rusqlite::params;

use super::Database;
use super::types::ProjectRecord;

impl Database {
    pub async fn create_project(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<ProjectRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        {
            let db = self.conn().lock().await;
            db.execute(
                "INSERT INTO projects (id, user_id, name, description) VALUES (?1, ?2, ?3, ?4)",
                params![id, user_id, name, description],
            )?;
        }
        self.get_project(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("project {} vanished after insert", id))
    }

    pub async fn get_project(&self, id: &str) -> Result<Option<ProjectRecord>> {
        let db = self.conn().lock().await;
        let mut stmt = db.prepare(
            "SELECT id, user_id, name, description, created_at, updated_at \
             FROM projects WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], |row| {
            Ok(ProjectRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                name: row.get(2)?,
                description: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            })
        })?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub async fn list_projects(&self, user_id: &str) -> Result<Vec<ProjectRecord>> {
        let db = self.conn().lock().await;
        let mut stmt = db.prepare(
            "SELECT id, user_id, name, description, created_at, updated_at \
             FROM projects WHERE user_id = ?1 ORDER BY rowid DESC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(ProjectRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                name: row.get(2)?,
                description: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            })
        })?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}
