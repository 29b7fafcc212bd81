//! User entity - The per-Discord-user session record.
//!
//! One row per Discord user. Holds the custodial wallet API tokens obtained
//! through the OAuth callback and, in the Solana backend, the Privy wallet
//! that signs on the user's behalf.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Where a user is in the login lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// `/login` was issued, the OAuth callback has not arrived yet
    #[sea_orm(string_value = "awaiting_auth")]
    AwaitingAuth,
    /// Tokens are stored and usable
    #[sea_orm(string_value = "authenticated")]
    Authenticated,
    /// Tokens were cleared by `/logout`
    #[sea_orm(string_value = "logged_out")]
    LoggedOut,
}

/// Session record database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user ID (snowflake as string)
    #[sea_orm(unique)]
    pub discord_id: String,
    /// Bearer token for the custodial wallet API
    pub auth_token: Option<String>,
    /// Token used to obtain a fresh `auth_token`
    pub refresh_auth_token: Option<String>,
    /// Device token bound to the session
    pub device_token: Option<String>,
    /// Solana address of the Privy-managed wallet
    pub sol_address: Option<String>,
    /// Privy wallet identifier
    pub privy_id: Option<String>,
    /// Login lifecycle state
    pub status: SessionStatus,
    /// When the record was created
    pub created_at: DateTimeUtc,
    /// Last change of any column
    pub updated_at: DateTimeUtc,
}

/// Users have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
