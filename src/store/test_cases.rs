use anyhow::Result;
use rusqlite::params;

use super::Database;
use super::types::TestCaseRecord;
use crate::ai::GeneratedTestCase;

impl Database {
    /// Store one AI generation batch verbatim.
    pub async fn insert_test_cases(
        &self,
        workflow_id: &str,
        cases: &[GeneratedTestCase],
    ) -> Result<Vec<TestCaseRecord>> {
        {
            let db = self.conn().lock().await;
            for case in cases {
                let id = uuid::Uuid::new_v4().to_string();
                let steps_json = serde_json::to_string(&case.steps)?;
                db.execute(
                    "INSERT INTO test_cases (id, workflow_id, title, steps_json, expected_result, priority) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        id,
                        workflow_id,
                        case.title,
                        steps_json,
                        case.expected_result,
                        case.priority
                    ],
                )?;
            }
        }
        self.list_test_cases(workflow_id).await
    }

    pub async fn list_test_cases(&self, workflow_id: &str) -> Result<Vec<TestCaseRecord>> {
        let db = self.conn().lock().await;
        let mut stmt = db.prepare(
            "SELECT id, workflow_id, title, steps_json, expected_result, priority, created_at \
             FROM test_cases WHERE workflow_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![workflow_id], |row| {
            let steps_raw: String = row.get(3)?;
            let steps: Vec<String> = serde_json::from_str(&steps_raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    format!("bad steps column: {}", e).into(),
                )
            })?;
            Ok(TestCaseRecord {
                id: row.get(0)?,
                workflow_id: row.get(1)?,
                title: row.get(2)?,
                steps,
                expected_result: row.get(4)?,
                priority: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}
