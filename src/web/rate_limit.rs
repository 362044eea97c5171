use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::AppState;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Exceeded { retry_after_seconds: u64 },
}

/// Fixed-window counter per client key. State is in-memory only; restarting
/// the process resets all windows.
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, (Instant, u32)>>,
}

impl RateLimiter {
    pub fn new(window_ms: u64, max_requests: u32) -> Self {
        Self {
            config: RateLimitConfig {
                window: Duration::from_millis(window_ms.max(1)),
                max_requests: max_requests.max(1),
            },
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        let now = Instant::now();
        let mut windows = self.windows.lock().expect("rate limiter lock poisoned");

        // Opportunistic cleanup so idle keys do not accumulate forever.
        if windows.len() > 10_000 {
            let window = self.config.window;
            windows.retain(|_, (start, _)| now.duration_since(*start) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert((now, 0));
        if now.duration_since(entry.0) >= self.config.window {
            *entry = (now, 0);
        }

        if entry.1 >= self.config.max_requests {
            let elapsed = now.duration_since(entry.0);
            let remaining = self.config.window.saturating_sub(elapsed);
            return RateLimitDecision::Exceeded {
                retry_after_seconds: remaining.as_secs().max(1),
            };
        }

        entry.1 += 1;
        RateLimitDecision::Allowed
    }
}

/// Key requests by bearer token when present, falling back to the forwarded
/// client address, then to a shared bucket.
fn client_key(req: &Request<Body>) -> String {
    if let Some(auth) = req.headers().get("authorization")
        && let Ok(value) = auth.to_str()
    {
        return format!("token:{}", value);
    }
    if let Some(forwarded) = req.headers().get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
    {
        return format!("ip:{}", value.split(',').next().unwrap_or(value).trim());
    }
    "anonymous".to_string()
}

pub async fn enforce(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    match state.limiter.check(&client_key(&req)) {
        RateLimitDecision::Allowed => next.run(req).await,
        RateLimitDecision::Exceeded {
            retry_after_seconds,
        } => ApiError::RateLimited {
            retry_after_seconds,
        }
        .into_response(),
    }
}
