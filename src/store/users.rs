use anyhow::Result;
use hmac::{Hmac, Mac};
use rusqlite::params;
use sha2::Sha256;

use super::Database;
use super::types::{SessionRecord, UserRecord};

/// HMAC-SHA256 over `payload`, keyed with the configured secret.
fn keyed_digest(secret: &str, payload: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn generate_raw_token() -> String {
    let bytes: [u8; 16] = rand::random();
    format!("tfk_{}", hex::encode(bytes))
}

fn generate_salt() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes)
}

fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

impl Database {
    pub async fn create_user(
        &self,
        email: &str,
        name: &str,
        password: &str,
        secret: &str,
    ) -> Result<UserRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let salt = generate_salt();
        let digest = keyed_digest(secret, &format!("{}{}", salt, password));

        let db = self.conn().lock().await;
        db.execute(
            "INSERT INTO users (id, email, name, password_salt, password_digest) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, email, name, salt, digest],
        )?;

        let created_at = db.query_row(
            "SELECT created_at FROM users WHERE id = ?1",
            params![id],
            |row| row.get::<_, String>(0),
        )?;

        Ok(UserRecord {
            id,
            email: email.to_string(),
            name: name.to_string(),
            created_at,
        })
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let db = self.conn().lock().await;
        let mut stmt =
            db.prepare("SELECT id, email, name, created_at FROM users WHERE email = ?1")?;
        let mut rows = stmt.query_map(params![email], |row| {
            Ok(UserRecord {
                id: row.get(0)?,
                email: row.get(1)?,
                name: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Check credentials; returns the user on a match.
    pub async fn verify_login(
        &self,
        email: &str,
        password: &str,
        secret: &str,
    ) -> Result<Option<UserRecord>> {
        let db = self.conn().lock().await;
        let mut stmt = db.prepare(
            "SELECT id, email, name, password_salt, password_digest, created_at \
             FROM users WHERE email = ?1",
        )?;
        let mut rows = stmt.query_map(params![email], |row| {
            Ok((
                UserRecord {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    name: row.get(2)?,
                    created_at: row.get(5)?,
                },
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        match rows.next() {
            Some(row) => {
                let (user, salt, stored) = row?;
                let candidate = keyed_digest(secret, &format!("{}{}", salt, password));
                if candidate == stored {
                    Ok(Some(user))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    /// Mint a bearer session token. Only its keyed digest is persisted.
    pub async fn create_session(
        &self,
        user_id: &str,
        secret: &str,
        ttl_secs: i64,
    ) -> Result<(String, SessionRecord)> {
        let raw_token = generate_raw_token();
        let token_digest = keyed_digest(secret, &raw_token);
        let id = uuid::Uuid::new_v4().to_string();
        let expires_at = now_epoch() + ttl_secs;

        let db = self.conn().lock().await;
        db.execute(
            "INSERT INTO sessions (id, user_id, token_digest, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, user_id, token_digest, expires_at],
        )?;

        Ok((
            raw_token,
            SessionRecord {
                id,
                user_id: user_id.to_string(),
                expires_at,
            },
        ))
    }

    /// Resolve a bearer token to its user. Expired or unknown tokens yield None.
    pub async fn validate_session(&self, raw_token: &str, secret: &str) -> Result<Option<UserRecord>> {
        let token_digest = keyed_digest(secret, raw_token);
        let db = self.conn().lock().await;
        let mut stmt = db.prepare(
            "SELECT u.id, u.email, u.name, u.created_at, s.expires_at \
             FROM sessions s JOIN users u ON u.id = s.user_id \
             WHERE s.token_digest = ?1",
        )?;
        let mut rows = stmt.query_map(params![token_digest], |row| {
            Ok((
                UserRecord {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    name: row.get(2)?,
                    created_at: row.get(3)?,
                },
                row.get::<_, i64>(4)?,
            ))
        })?;

        match rows.next() {
            Some(row) => {
                let (user, expires_at) = row?;
                if expires_at <= now_epoch() {
                    db.execute(
                        "DELETE FROM sessions WHERE token_digest = ?1",
                        params![token_digest],
                    )?;
                    Ok(None)
                } else {
                    Ok(Some(user))
                }
            }
            None => Ok(None),
        }
    }

    pub async fn delete_session(&self, raw_token: &str, secret: &str) -> Result<bool> {
        let token_digest = keyed_digest(secret, raw_token);
        let db = self.conn().lock().await;
        let rows = db.execute(
            "DELETE FROM sessions WHERE token_digest = ?1",
            params![token_digest],
        )?;
        Ok(rows > 0)
    }
}
