pub mod auth;
mod handlers;
pub mod rate_limit;
mod router;

pub use router::build_api_router;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::ai::LlmGateway;
use crate::config::Config;
use crate::store::Database;
use rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub gateway: Arc<dyn LlmGateway>,
    pub limiter: Arc<RateLimiter>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, db: Database, gateway: Arc<dyn LlmGateway>) -> Self {
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit_window_ms,
            config.rate_limit_max,
        ));
        Self {
            db: Arc::new(db),
            gateway,
            limiter,
            config: Arc::new(config),
        }
    }
}

pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn serve(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.state.config.port);
        let app = router::build_api_router(self.state);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("API server running at http://{addr}");
        axum::serve(listener, app).await?;
        Ok(())
    }
}

// --- Test support ---


/// Build an in-memory state plus a valid session token for one test user.
#[cfg(test)]
pub(crate) async fn test_state() -> (AppState, String) {
    test_state_with_gateway(Arc::new(testing::ScriptedGateway::new())).await
}

#[cfg(test)]
pub(crate) async fn test_state_with_gateway(
    gateway: Arc<dyn LlmGateway>,
) -> (AppState, String) {
    let config = crate::config::test_config();
    let db = crate::store::test_database();
    let user = db
        .create_user("tester@example.com", "Tester", "test-password", &config.auth_secret)
        .await
        .expect("test user should be created");
    let (token, _) = db
        .create_session(&user.id, &config.auth_secret, config.session_ttl_secs)
        .await
        .expect("test session should be created");

    (AppState::new(config, db, gateway), token)
}
