use crate::auth::repo::{PgUserStore, UserStore};
use crate::config::AppConfig;
use crate::contacts::repo::{ContactStore, PgContactStore};
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub contacts: Arc<dyn ContactStore>,
}

/// Opens the pool and applies pending migrations.
pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let db = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;
    tracing::info!("migrations applied");

    Ok(db)
}

impl AppState {
    pub fn from_pool(db: PgPool, config: Arc<AppConfig>) -> Self {
        Self::from_parts(
            config,
            Arc::new(PgUserStore::new(db.clone())),
            Arc::new(PgContactStore::new(db)),
        )
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        contacts: Arc<dyn ContactStore>,
    ) -> Self {
        Self {
            config,
            users,
            contacts,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::memory::{MemoryContactStore, MemoryUserStore};

        Self::from_parts(
            Arc::new(AppConfig::for_tests()),
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryContactStore::default()),
        )
    }
}
