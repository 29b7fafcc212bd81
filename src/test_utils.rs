//! Shared test utilities.
//!
//! Helpers for setting up in-memory databases and session records with
//! sensible defaults.

use crate::{
    clients::AuthTokens,
    core::session,
    entities::user,
    errors::Result,
};
use sea_orm::DatabaseConnection;
use tracing_subscriber::EnvFilter;

/// Installs a test-friendly tracing subscriber once per process.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Token set with a custom auth token.
///
/// # Defaults
/// * `refresh_auth_token`: `"refresh"`
/// * `device_token`: `"device"`
#[must_use]
pub fn test_tokens(auth_token: &str) -> AuthTokens {
    AuthTokens {
        auth_token: auth_token.to_string(),
        refresh_auth_token: Some("refresh".to_string()),
        device_token: Some("device".to_string()),
    }
}

/// Runs the login + callback path so the user ends up authenticated.
pub async fn create_authenticated_user(
    db: &DatabaseConnection,
    discord_id: &str,
    auth_token: &str,
) -> Result<user::Model> {
    session::begin_login(db, discord_id).await?;
    session::complete_auth(db, discord_id, &test_tokens(auth_token)).await
}
