use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use testforge::ai::OpenAiGateway;
use testforge::config::Config;
use testforge::store::Database;
use testforge::web::{ApiServer, AppState};

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        "starting testforge ({}) on port {}",
        config.app_env,
        config.port
    );

    let db = Database::open(&config.database_url)?;
    let gateway = Arc::new(OpenAiGateway::new(&config));
    let state = AppState::new(config, db, gateway);

    ApiServer::new(state).serve().await
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("testforge failed to start: {:#}", e);
        std::process::exit(1);
    }
}
