//! Application state for the signing API

use anyhow::Result;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::audit;
use crate::config::Config;
use crate::storage::Storage;

pub struct AppState {
    pub db: SqlitePool,
    pub storage: Storage,
    /// Size ceiling for source documents and uploads
    pub max_pdf_bytes: usize,
}

impl AppState {
    pub async fn new(config: &Config) -> Result<Self> {
        tracing::info!("Connecting to database: {}", config.database_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&config.database_url)
            .await?;

        Self::with_pool(pool, Storage::new(&config.upload_dir), config.max_pdf_bytes).await
    }

    /// Build state around an existing pool, running migrations on it
    pub async fn with_pool(db: SqlitePool, storage: Storage, max_pdf_bytes: usize) -> Result<Self> {
        Self::run_migrations(&db).await?;
        storage.ensure_dir().await?;

        Ok(Self {
            db,
            storage,
            max_pdf_bytes,
        })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        tracing::info!("Running database migrations...");
        audit::migrate(pool).await?;
        tracing::info!("Migrations complete");
        Ok(())
    }
}
