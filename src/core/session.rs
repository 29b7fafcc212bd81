//! Session business logic - the per-Discord-user record lifecycle.
//!
//! A record is created by `/login`, filled in by the OAuth callback and
//! cleared by `/logout`. The `discord_id` column is unique, so every function
//! here works on "the" record for a user.

use crate::{
    clients::{AuthTokens, PrivyWallet},
    entities::{SessionStatus, User, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, prelude::*, sea_query::OnConflict};
use tracing::{info, instrument};

/// The Privy wallet attached to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletRef {
    /// Solana address
    pub address: String,
    /// Privy wallet ID used for signing
    pub privy_id: String,
}

/// Finds the session record of a Discord user.
pub async fn find(db: &DatabaseConnection, discord_id: &str) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::DiscordId.eq(discord_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// A fresh `awaiting_auth` record for `discord_id`.
fn new_record(discord_id: &str) -> user::ActiveModel {
    let now = Utc::now();
    user::ActiveModel {
        discord_id: Set(discord_id.to_string()),
        status: Set(SessionStatus::AwaitingAuth),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
}

/// Inserts `record`, or updates `on_conflict` columns of the user's existing row.
///
/// A single `INSERT .. ON CONFLICT(discord_id) DO UPDATE`, so concurrent
/// calls for the same user cannot trip the unique constraint.
async fn upsert(
    db: &DatabaseConnection,
    discord_id: &str,
    record: user::ActiveModel,
    on_conflict: &[user::Column],
) -> Result<user::Model> {
    User::insert(record)
        .on_conflict(
            OnConflict::column(user::Column::DiscordId)
                .update_columns(on_conflict.iter().copied())
                .to_owned(),
        )
        .exec(db)
        .await?;
    find(db, discord_id)
        .await?
        .ok_or_else(|| Error::SessionNotFound {
            discord_id: discord_id.to_string(),
        })
}

/// Marks the user as waiting for the OAuth callback, creating the record if needed.
#[instrument(skip(db))]
pub async fn begin_login(db: &DatabaseConnection, discord_id: &str) -> Result<user::Model> {
    let session = upsert(
        db,
        discord_id,
        new_record(discord_id),
        &[user::Column::Status, user::Column::UpdatedAt],
    )
    .await?;
    info!("Session awaiting auth");
    Ok(session)
}

fn apply_tokens(record: &mut user::ActiveModel, tokens: &AuthTokens) {
    record.auth_token = Set(Some(tokens.auth_token.clone()));
    record.refresh_auth_token = Set(tokens.refresh_auth_token.clone());
    record.device_token = Set(tokens.device_token.clone());
    record.updated_at = Set(Utc::now());
}

/// Stores the tokens from a successful OAuth callback and marks the user authenticated.
///
/// # Errors
/// [`Error::SessionNotFound`] when the user never ran `/login`.
#[instrument(skip(db, tokens))]
pub async fn complete_auth(
    db: &DatabaseConnection,
    discord_id: &str,
    tokens: &AuthTokens,
) -> Result<user::Model> {
    let existing = find(db, discord_id)
        .await?
        .ok_or_else(|| Error::SessionNotFound {
            discord_id: discord_id.to_string(),
        })?;

    let mut record: user::ActiveModel = existing.into();
    apply_tokens(&mut record, tokens);
    record.status = Set(SessionStatus::Authenticated);
    let updated = record.update(db).await?;
    info!("Session authenticated");
    Ok(updated)
}

/// Replaces the tokens of an authenticated session after a refresh.
pub async fn store_tokens(
    db: &DatabaseConnection,
    session: user::Model,
    tokens: &AuthTokens,
) -> Result<user::Model> {
    let mut record: user::ActiveModel = session.into();
    apply_tokens(&mut record, tokens);
    record.update(db).await.map_err(Into::into)
}

/// Returns the session if it holds an auth token.
///
/// # Errors
/// [`Error::NotAuthenticated`] when there is no record or no token.
pub async fn require_auth(db: &DatabaseConnection, discord_id: &str) -> Result<user::Model> {
    find(db, discord_id)
        .await?
        .filter(|session| session.auth_token.is_some())
        .ok_or(Error::NotAuthenticated)
}

/// Clears every token and marks the session logged out.
#[instrument(skip(db, session), fields(discord_id = %session.discord_id))]
pub async fn logout(db: &DatabaseConnection, session: user::Model) -> Result<user::Model> {
    let mut record: user::ActiveModel = session.into();
    record.auth_token = Set(None);
    record.refresh_auth_token = Set(None);
    record.device_token = Set(None);
    record.status = Set(SessionStatus::LoggedOut);
    record.updated_at = Set(Utc::now());
    let updated = record.update(db).await?;
    info!("Session logged out");
    Ok(updated)
}

/// Records the Privy wallet of a user. Leaves `status` untouched.
#[instrument(skip(db, wallet))]
pub async fn attach_wallet(
    db: &DatabaseConnection,
    discord_id: &str,
    wallet: &PrivyWallet,
) -> Result<user::Model> {
    let mut record = new_record(discord_id);
    record.privy_id = Set(Some(wallet.id.clone()));
    record.sol_address = Set(Some(wallet.address.clone()));
    upsert(
        db,
        discord_id,
        record,
        &[
            user::Column::PrivyId,
            user::Column::SolAddress,
            user::Column::UpdatedAt,
        ],
    )
    .await
}

/// Extracts the attached wallet of a session, if complete.
#[must_use]
pub fn wallet_of(session: &user::Model) -> Option<WalletRef> {
    match (&session.sol_address, &session.privy_id) {
        (Some(address), Some(privy_id)) => Some(WalletRef {
            address: address.clone(),
            privy_id: privy_id.clone(),
        }),
        _ => None,
    }
}

/// Returns the user's Privy wallet.
///
/// # Errors
/// [`Error::NotAuthenticated`] when no wallet has been created yet.
pub async fn require_wallet(db: &DatabaseConnection, discord_id: &str) -> Result<WalletRef> {
    find(db, discord_id)
        .await?
        .as_ref()
        .and_then(wallet_of)
        .ok_or(Error::NotAuthenticated)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn test_begin_login_creates_single_record() -> Result<()> {
        let db = setup_test_db().await?;

        let first = begin_login(&db, "1001").await?;
        assert_eq!(first.status, SessionStatus::AwaitingAuth);
        assert!(first.auth_token.is_none());

        let second = begin_login(&db, "1001").await?;
        assert_eq!(second.id, first.id);
        assert_eq!(User::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_begin_login_resets_existing_record() -> Result<()> {
        let db = setup_test_db().await?;
        let authed = create_authenticated_user(&db, "1001", "auth").await?;

        let again = begin_login(&db, "1001").await?;
        assert_eq!(again.id, authed.id);
        assert_eq!(again.status, SessionStatus::AwaitingAuth);
        assert_eq!(again.created_at, authed.created_at);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_logins_share_one_record() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = PrivyWallet {
            id: "privy-1".to_string(),
            address: "SoLAddr".to_string(),
        };

        let (a, b, c) = tokio::join!(
            begin_login(&db, "1001"),
            begin_login(&db, "1001"),
            attach_wallet(&db, "1001", &wallet),
        );
        let (a, b, c) = (a?, b?, c?);
        assert_eq!(a.id, b.id);
        assert_eq!(b.id, c.id);
        assert_eq!(User::find().count(&db).await?, 1);
        assert_eq!(
            require_wallet(&db, "1001").await?.address,
            "SoLAddr".to_string()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_auth_stores_tokens() -> Result<()> {
        let db = setup_test_db().await?;
        begin_login(&db, "1001").await?;

        let session = complete_auth(&db, "1001", &test_tokens("auth-1")).await?;
        assert_eq!(session.status, SessionStatus::Authenticated);
        assert_eq!(session.auth_token.as_deref(), Some("auth-1"));
        assert_eq!(session.refresh_auth_token.as_deref(), Some("refresh"));
        assert_eq!(session.device_token.as_deref(), Some("device"));

        let reloaded = find(&db, "1001").await?.unwrap();
        assert_eq!(reloaded, session);
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_auth_without_login_fails() -> Result<()> {
        let db = setup_test_db().await?;

        let result = complete_auth(&db, "unknown", &test_tokens("auth")).await;
        assert!(matches!(
            result,
            Err(Error::SessionNotFound { ref discord_id }) if discord_id == "unknown"
        ));
        assert!(find(&db, "unknown").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_require_auth() -> Result<()> {
        let db = setup_test_db().await?;

        assert!(matches!(
            require_auth(&db, "1001").await,
            Err(Error::NotAuthenticated)
        ));

        begin_login(&db, "1001").await?;
        assert!(matches!(
            require_auth(&db, "1001").await,
            Err(Error::NotAuthenticated)
        ));

        create_authenticated_user(&db, "1001", "auth").await?;
        let session = require_auth(&db, "1001").await?;
        assert_eq!(session.auth_token.as_deref(), Some("auth"));
        Ok(())
    }

    #[tokio::test]
    async fn test_logout_clears_tokens() -> Result<()> {
        let db = setup_test_db().await?;
        let session = create_authenticated_user(&db, "1001", "auth").await?;

        let logged_out = logout(&db, session).await?;
        assert_eq!(logged_out.status, SessionStatus::LoggedOut);
        assert!(logged_out.auth_token.is_none());
        assert!(logged_out.refresh_auth_token.is_none());
        assert!(logged_out.device_token.is_none());

        assert!(matches!(
            require_auth(&db, "1001").await,
            Err(Error::NotAuthenticated)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_store_tokens_keeps_status() -> Result<()> {
        let db = setup_test_db().await?;
        let session = create_authenticated_user(&db, "1001", "old").await?;

        let refreshed = store_tokens(&db, session, &test_tokens("new")).await?;
        assert_eq!(refreshed.auth_token.as_deref(), Some("new"));
        assert_eq!(refreshed.status, SessionStatus::Authenticated);
        Ok(())
    }

    #[tokio::test]
    async fn test_attach_wallet_leaves_status_alone() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = PrivyWallet {
            id: "privy-1".to_string(),
            address: "SoLAddr".to_string(),
        };

        assert!(matches!(
            require_wallet(&db, "2002").await,
            Err(Error::NotAuthenticated)
        ));

        let session = attach_wallet(&db, "2002", &wallet).await?;
        assert_eq!(session.status, SessionStatus::AwaitingAuth);
        assert_eq!(
            require_wallet(&db, "2002").await?,
            WalletRef {
                address: "SoLAddr".to_string(),
                privy_id: "privy-1".to_string(),
            }
        );

        let authed = create_authenticated_user(&db, "3003", "auth").await?;
        let with_wallet = attach_wallet(&db, "3003", &wallet).await?;
        assert_eq!(with_wallet.id, authed.id);
        assert_eq!(with_wallet.status, SessionStatus::Authenticated);
        Ok(())
    }
}
