//! Okto backend command logic.
//!
//! Each function resolves the caller's session, performs one Okto call and
//! returns the reply text. Session-gated functions fail with
//! [`Error::NotAuthenticated`] before any request leaves the process.

use crate::{
    clients::{GoogleOAuth, OktoClient, okto::TransferRequest},
    core::{format::json_block, session},
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tracing::{info, instrument};
use url::Url;

fn data_at(body: &Value, pointer: &str) -> Value {
    body.pointer(pointer).cloned().unwrap_or(Value::Null)
}

/// Starts a login: resets the session to `awaiting_auth` and returns the
/// Google consent URL carrying the Discord ID as `state`.
#[instrument(skip(db, google))]
pub async fn login_url(
    db: &DatabaseConnection,
    google: &GoogleOAuth,
    discord_id: &str,
) -> Result<Url> {
    session::begin_login(db, discord_id).await?;
    google.authorization_url(discord_id)
}

/// DM carrying the sign-in link.
#[must_use]
pub fn login_message(url: &Url) -> String {
    format!("Please log in using this link: {url}")
}

/// Lists the caller's Okto wallets.
pub async fn wallets(db: &DatabaseConnection, okto: &OktoClient, discord_id: &str) -> Result<String> {
    let session = session::require_auth(db, discord_id).await?;
    let body = okto.wallets(session_token(&session)).await?;
    Ok(json_block("Your wallets:", &data_at(&body, "/data/wallets")))
}

/// Creates the caller's wallets and lists them.
pub async fn create_wallet(
    db: &DatabaseConnection,
    okto: &OktoClient,
    discord_id: &str,
) -> Result<String> {
    let session = session::require_auth(db, discord_id).await?;
    let body = okto.create_wallet(session_token(&session)).await?;
    Ok(json_block(
        "Wallet created successfully:",
        &data_at(&body, "/data/wallets"),
    ))
}

/// Shows token balances across the caller's wallets.
pub async fn portfolio(db: &DatabaseConnection, okto: &OktoClient, discord_id: &str) -> Result<String> {
    let session = session::require_auth(db, discord_id).await?;
    let body = okto.portfolio(session_token(&session)).await?;
    Ok(json_block("Your portfolio:", &data_at(&body, "/data")))
}

/// Shows the caller's Okto profile.
pub async fn user_details(
    db: &DatabaseConnection,
    okto: &OktoClient,
    discord_id: &str,
) -> Result<String> {
    let session = session::require_auth(db, discord_id).await?;
    let body = okto.user_details(session_token(&session)).await?;
    Ok(json_block("User details:", &data_at(&body, "/data")))
}

/// Networks Okto supports.
pub async fn networks(db: &DatabaseConnection, okto: &OktoClient, discord_id: &str) -> Result<String> {
    let session = session::require_auth(db, discord_id).await?;
    let body = okto.networks(session_token(&session)).await?;
    Ok(json_block("Supported networks:", &data_at(&body, "/data/network")))
}

/// Tokens Okto can transfer. Needs a session like every other call.
pub async fn tokens(db: &DatabaseConnection, okto: &OktoClient, discord_id: &str) -> Result<String> {
    let session = session::require_auth(db, discord_id).await?;
    let body = okto.tokens(session_token(&session)).await?;
    Ok(json_block("Supported tokens:", &data_at(&body, "/data/tokens")))
}

/// Lists the caller's transfer orders.
pub async fn orders(db: &DatabaseConnection, okto: &OktoClient, discord_id: &str) -> Result<String> {
    let session = session::require_auth(db, discord_id).await?;
    let body = okto.orders(session_token(&session)).await?;
    Ok(json_block("Your orders:", &data_at(&body, "/data/jobs")))
}

/// Refreshes the Okto session, persisting new tokens when they are returned.
#[instrument(skip(db, okto))]
pub async fn refresh_token(
    db: &DatabaseConnection,
    okto: &OktoClient,
    discord_id: &str,
) -> Result<String> {
    let session = session::require_auth(db, discord_id).await?;
    let refreshed = okto
        .refresh_token(
            session_token(&session),
            session.refresh_auth_token.as_deref(),
            session.device_token.as_deref(),
        )
        .await?;
    if let Some(tokens) = refreshed {
        session::store_tokens(db, session, &tokens).await?;
        info!("Stored refreshed tokens");
    }
    Ok("Token refreshed successfully.".to_string())
}

/// Logs out of Okto, then clears the local session.
///
/// Users without a session get a plain notice instead of an error.
#[instrument(skip(db, okto))]
pub async fn logout(db: &DatabaseConnection, okto: &OktoClient, discord_id: &str) -> Result<String> {
    let session = match session::require_auth(db, discord_id).await {
        Ok(session) => session,
        Err(Error::NotAuthenticated) => return Ok("You are not logged in.".to_string()),
        Err(e) => return Err(e),
    };
    okto.logout(session_token(&session)).await?;
    session::logout(db, session).await?;
    Ok("Successfully logged out from Okto.".to_string())
}

/// Arguments of `/transfer`
#[derive(Debug, Clone)]
pub struct TransferArgs {
    /// Okto network name, e.g. `POLYGON`
    pub network: String,
    /// Token contract, empty for the native token
    pub token_address: String,
    /// Human-readable amount, must be finite and positive
    pub quantity: f64,
    /// Destination address
    pub recipient: String,
}

/// Starts a token transfer and replies with the order ID.
#[instrument(skip(db, okto))]
pub async fn transfer(
    db: &DatabaseConnection,
    okto: &OktoClient,
    discord_id: &str,
    args: TransferArgs,
) -> Result<String> {
    let session = session::require_auth(db, discord_id).await?;
    if !args.quantity.is_finite() || args.quantity <= 0.0 {
        return Err(Error::InvalidAmount {
            amount: args.quantity,
        });
    }

    let request = TransferRequest {
        network_name: args.network,
        token_address: args.token_address,
        quantity: args.quantity.to_string(),
        recipient_address: args.recipient,
    };
    let order_id = okto.transfer(session_token(&session), &request).await?;
    info!("Transfer order {} created", order_id);
    Ok(format!("Token transfer initiated. Order ID: {order_id}"))
}

/// `require_auth` guarantees the token is present.
fn session_token(session: &crate::entities::UserModel) -> &str {
    session.auth_token.as_deref().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::clients::mock;
    use crate::entities::SessionStatus;
    use crate::test_utils::*;
    use axum::{
        Json, Router,
        http::HeaderMap,
        routing::{get, post},
    };
    use secrecy::SecretString;
    use serde_json::json;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn okto_client(base: &str) -> OktoClient {
        OktoClient::new(reqwest::Client::new(), base, SecretString::from("key"))
    }

    /// Mock Okto that counts every request it receives.
    async fn counting_okto() -> (OktoClient, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new().fallback(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(json!({ "status": "success", "data": {} }))
            }
        });
        let base = mock::serve(app).await;
        (okto_client(&base), hits)
    }

    #[tokio::test]
    async fn test_gated_commands_make_no_call_without_login() -> Result<()> {
        let db = setup_test_db().await?;
        let (okto, hits) = counting_okto().await;
        let user = "1001";

        let results = vec![
            wallets(&db, &okto, user).await,
            create_wallet(&db, &okto, user).await,
            portfolio(&db, &okto, user).await,
            user_details(&db, &okto, user).await,
            networks(&db, &okto, user).await,
            tokens(&db, &okto, user).await,
            orders(&db, &okto, user).await,
            refresh_token(&db, &okto, user).await,
            transfer(
                &db,
                &okto,
                user,
                TransferArgs {
                    network: "POLYGON".to_string(),
                    token_address: String::new(),
                    quantity: 1.0,
                    recipient: "0xabc".to_string(),
                },
            )
            .await,
        ];
        for result in results {
            assert!(matches!(result, Err(Error::NotAuthenticated)));
        }
        assert_eq!(logout(&db, &okto, user).await?, "You are not logged in.");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_awaiting_auth_user_is_still_gated() -> Result<()> {
        let db = setup_test_db().await?;
        let (okto, hits) = counting_okto().await;
        session::begin_login(&db, "1001").await?;

        assert!(matches!(
            wallets(&db, &okto, "1001").await,
            Err(Error::NotAuthenticated)
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_wallets_reply_uses_stored_token() -> Result<()> {
        let db = setup_test_db().await?;
        create_authenticated_user(&db, "1001", "auth-1001").await?;
        let app = Router::new().route(
            "/api/v1/wallet",
            get(|headers: HeaderMap| async move {
                assert_eq!(headers["authorization"], "Bearer auth-1001");
                Json(json!({
                    "status": "success",
                    "data": { "wallets": [ { "network_name": "POLYGON", "address": "0x1" } ] }
                }))
            }),
        );
        let okto = okto_client(&mock::serve(app).await);

        let reply = wallets(&db, &okto, "1001").await?;
        assert!(reply.starts_with("Your wallets:\n```json\n"));
        assert!(reply.contains("\"address\": \"0x1\""));
        Ok(())
    }

    #[tokio::test]
    async fn test_logout_clears_session_after_okto_call() -> Result<()> {
        let db = setup_test_db().await?;
        create_authenticated_user(&db, "1001", "auth").await?;
        let (okto, hits) = counting_okto().await;

        let reply = logout(&db, &okto, "1001").await?;
        assert_eq!(reply, "Successfully logged out from Okto.");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let stored = session::find(&db, "1001").await?.unwrap();
        assert_eq!(stored.status, SessionStatus::LoggedOut);
        assert!(stored.auth_token.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_logout_accepts_no_content_reply() -> Result<()> {
        let db = setup_test_db().await?;
        create_authenticated_user(&db, "1001", "auth").await?;
        let app = Router::new().route(
            "/api/v1/logout",
            post(|| async { axum::http::StatusCode::NO_CONTENT }),
        );
        let okto = okto_client(&mock::serve(app).await);

        assert_eq!(
            logout(&db, &okto, "1001").await?,
            "Successfully logged out from Okto."
        );
        let stored = session::find(&db, "1001").await?.unwrap();
        assert_eq!(stored.status, SessionStatus::LoggedOut);
        assert!(stored.auth_token.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_logout_keeps_session() -> Result<()> {
        let db = setup_test_db().await?;
        create_authenticated_user(&db, "1001", "auth").await?;
        let app = Router::new().route(
            "/api/v1/logout",
            post(|| async {
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "maintenance" })),
                )
            }),
        );
        let okto = okto_client(&mock::serve(app).await);

        let err = logout(&db, &okto, "1001").await.err().unwrap();
        assert_eq!(err.to_string(), "Okto error: maintenance");
        let stored = session::find(&db, "1001").await?.unwrap();
        assert_eq!(stored.status, SessionStatus::Authenticated);
        Ok(())
    }

    #[tokio::test]
    async fn test_refresh_token_persists_new_tokens() -> Result<()> {
        let db = setup_test_db().await?;
        create_authenticated_user(&db, "1001", "old").await?;
        let app = Router::new().route(
            "/api/v1/refresh_token",
            post(|| async {
                Json(json!({
                    "status": "success",
                    "data": { "auth_token": "new", "refresh_auth_token": "r2", "device_token": "d2" }
                }))
            }),
        );
        let okto = okto_client(&mock::serve(app).await);

        assert_eq!(
            refresh_token(&db, &okto, "1001").await?,
            "Token refreshed successfully."
        );
        let stored = session::find(&db, "1001").await?.unwrap();
        assert_eq!(stored.auth_token.as_deref(), Some("new"));
        assert_eq!(stored.refresh_auth_token.as_deref(), Some("r2"));
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_rejects_bad_quantity_before_calling() -> Result<()> {
        let db = setup_test_db().await?;
        create_authenticated_user(&db, "1001", "auth").await?;
        let (okto, hits) = counting_okto().await;

        let result = transfer(
            &db,
            &okto,
            "1001",
            TransferArgs {
                network: "POLYGON".to_string(),
                token_address: String::new(),
                quantity: -2.0,
                recipient: "0xabc".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_login_url_starts_awaiting_auth() -> Result<()> {
        let db = setup_test_db().await?;
        let google = GoogleOAuth::new(
            reqwest::Client::new(),
            &crate::config::settings::GoogleSettings::default(),
            "client".to_string(),
            SecretString::from("secret"),
            "http://localhost:3000/auth/google/callback".to_string(),
        );

        let url = login_url(&db, &google, "1001").await?;
        assert!(url.query_pairs().any(|(k, v)| k == "state" && v == "1001"));
        let stored = session::find(&db, "1001").await?.unwrap();
        assert_eq!(stored.status, SessionStatus::AwaitingAuth);

        let message = login_message(&url);
        assert!(message.starts_with("Please log in using this link: "));
        assert!(message.ends_with(url.as_str()));
        Ok(())
    }
}
