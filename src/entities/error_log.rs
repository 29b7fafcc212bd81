//! Error log entity - One row per failed command.
//! Lets operators see what broke without digging through process logs.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Error log database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "error_logs")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the command that failed
    pub command: String,
    /// User-facing error message
    pub error: String,
    /// Debug representation of the error, when it adds anything
    pub details: Option<String>,
    /// Discord user ID that invoked the command
    pub user_id: String,
    /// When the failure happened
    pub created_at: DateTimeUtc,
}

/// `ErrorLog` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
