mod messages;
mod projects;
mod test_cases;
pub mod types;
mod users;
mod workflows;

use anyhow::Result;
use rusqlite::Connection;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// SQLite-backed persistence for workflows, messages, projects, users, and
/// generated artifacts. One connection behind an async mutex; SQLite's own
/// transactional semantics serialize everything else.
pub struct Database {
    db: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let db = Connection::open(path)?;
        init_schema(&db)?;
        info!("Database ready at {}", path);
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    pub(crate) fn conn(&self) -> &Arc<Mutex<Connection>> {
        &self.db
    }
}

fn init_schema(db: &Connection) -> Result<()> {
    db.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            password_digest TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            token_digest TEXT NOT NULL UNIQUE,
            expires_at INTEGER NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS workflows (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            project_id TEXT,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            epic_content TEXT NOT NULL DEFAULT '',
            phase TEXT NOT NULL,
            status TEXT NOT NULL,
            completeness_json TEXT NOT NULL,
            overall_score INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workflow_id TEXT NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            kind TEXT NOT NULL,
            category TEXT,
            phase TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS summaries (
            workflow_id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS test_cases (
            id TEXT PRIMARY KEY,
            workflow_id TEXT NOT NULL,
            title TEXT NOT NULL,
            steps_json TEXT NOT NULL,
            expected_result TEXT NOT NULL DEFAULT '',
            priority TEXT NOT NULL DEFAULT 'MEDIUM',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_messages_workflow_id ON messages(workflow_id, id)",
        [],
    )?;
    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_workflows_user_status ON workflows(user_id, status)",
        [],
    )?;
    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_workflows_project ON workflows(project_id)",
        [],
    )?;
    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_test_cases_workflow ON test_cases(workflow_id)",
        [],
    )?;

    Ok(())
}

/// In-memory database for tests. No filesystem side-effects.
#[cfg(test)]
pub fn test_database() -> Database {
    let db = Connection::open_in_memory().expect("open in-memory db");
    init_schema(&db).expect("init schema");
    Database {
        db: Arc::new(Mutex::new(db)),
    }
}
