//! Session database migration.
//!
//! # Environment Variables
//!
//! - `BIZGROW_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn database_url() -> Result<SecretString, MigrateError> {
    std::env::var("BIZGROW_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrateError::MissingEnvVar("BIZGROW_DATABASE_URL"))
}

/// Create the `tower_sessions` schema and table if they do not exist.
///
/// # Errors
///
/// Returns an error if the URL is missing or the database rejects the DDL.
pub async fn sessions() -> Result<(), MigrateError> {
    dotenvy::dotenv().ok();
    let url = database_url()?;

    tracing::info!("Connecting to session database...");
    let pool = PgPool::connect(url.expose_secret()).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Session migrations complete");
    Ok(())
}
