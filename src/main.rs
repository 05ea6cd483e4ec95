use std::sync::Arc;

mod app;
mod auth;
mod config;
mod contacts;
mod envelope;
mod error;
#[cfg(test)]
mod memory;
mod pagination;
mod state;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "contact_keeper=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);
    let pool = state::connect(&config).await?;
    let addr = config.bind_addr();

    let app = app::build_app(AppState::from_pool(pool.clone(), config));
    app::serve(app, &addr).await?;

    pool.close().await;
    tracing::info!("database pool closed");
    Ok(())
}
