//! Persistent error log for failed commands.

use crate::{
    entities::{ErrorLog, error_log},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};

/// Stores one failed command invocation.
pub async fn record(
    db: &DatabaseConnection,
    command: &str,
    user_id: &str,
    error: &Error,
) -> Result<error_log::Model> {
    let entry = error_log::ActiveModel {
        command: Set(command.to_string()),
        error: Set(error.to_string()),
        details: Set(Some(format!("{error:?}"))),
        user_id: Set(user_id.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    entry.insert(db).await.map_err(Into::into)
}

/// Most recent entries first.
pub async fn recent(db: &DatabaseConnection, limit: u64) -> Result<Vec<error_log::Model>> {
    ErrorLog::find()
        .order_by_desc(error_log::Column::CreatedAt)
        .order_by_desc(error_log::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}
