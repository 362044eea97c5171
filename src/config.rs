use anyhow::{Context, Result};

/// Runtime configuration, resolved once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub app_env: String,
    /// Path of the SQLite database file.
    pub database_url: String,
    /// Key for session-token and password digests.
    pub auth_secret: String,
    /// Session lifetime in seconds.
    pub session_ttl_secs: i64,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_max_tokens: u32,
    pub rate_limit_window_ms: u64,
    pub rate_limit_max: u32,
}

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

impl Config {
    pub fn from_env() -> Result<Self> {
        let auth_secret =
            std::env::var("JWT_SECRET").context("JWT_SECRET must be set (session signing key)")?;
        if auth_secret.len() < 16 {
            anyhow::bail!("JWT_SECRET must be at least 16 characters");
        }

        Ok(Self {
            port: env_parsed("PORT", 3000)?,
            app_env: std::env::var("APP_ENV")
                .or_else(|_| std::env::var("NODE_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "testforge.db".to_string()),
            auth_secret,
            session_ttl_secs: env_parsed("JWT_EXPIRES_IN", 86_400)?,
            openai_api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_max_tokens: env_parsed("OPENAI_MAX_TOKENS", 1024)?,
            rate_limit_window_ms: env_parsed("RATE_LIMIT_WINDOW_MS", 60_000)?,
            rate_limit_max: env_parsed("RATE_LIMIT_MAX", 120)?,
        })
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} is not a valid value for {}", raw, name)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        port: 0,
        app_env: "test".to_string(),
        database_url: ":memory:".to_string(),
        auth_secret: "test-secret-0123456789abcdef".to_string(),
        session_ttl_secs: 3600,
        openai_api_key: "sk-test".to_string(),
        openai_base_url: "http://127.0.0.1:0/unused".to_string(),
        openai_model: "mock-model".to_string(),
        openai_max_tokens: 256,
        rate_limit_window_ms: 60_000,
        rate_limit_max: 1_000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parsed_falls_back_to_default() {
        let port: u16 = env_parsed("TESTFORGE_UNSET_PORT_VAR", 3000).unwrap();
        assert_eq!(port, 3000);
    }

    #[test]
    fn env_parsed_rejects_garbage() {
        // Safety: test-only env mutation, single-threaded access to this var.
        unsafe { std::env::set_var("TESTFORGE_BAD_PORT_VAR", "not-a-number") };
        let result: Result<u16> = env_parsed("TESTFORGE_BAD_PORT_VAR", 3000);
        assert!(result.is_err());
        unsafe { std::env::remove_var("TESTFORGE_BAD_PORT_VAR") };
    }
}
