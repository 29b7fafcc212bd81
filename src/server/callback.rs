//! `GET /auth/google/callback` - finishes the Google to Okto login.

use crate::{
    core::session,
    errors::Error,
    server::AppState,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

/// Browser response after a successful login
pub const AUTHENTICATED_PAGE: &str =
    "You have been successfully authenticated! You can now return to Discord.";
/// DM sent to the user after a successful login
pub const AUTHENTICATED_DM: &str = "You have been successfully authenticated with Okto!";

/// Query string Google appends to the redirect
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
}

type Reply = (StatusCode, &'static str);

/// Exchanges the code for a Google ID token, trades it for Okto tokens and
/// marks the session identified by `state` as authenticated.
#[instrument(skip_all)]
pub async fn google_callback(
    State(app): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Reply {
    let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    let (Some(code), Some(discord_id)) = (present(params.code), present(params.state)) else {
        return (StatusCode::BAD_REQUEST, "Invalid request");
    };

    match session::find(&app.db, &discord_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            warn!("Callback for a user that never started a login");
            return (StatusCode::BAD_REQUEST, "Unknown login request");
        }
        Err(e) => {
            error!("Session lookup failed: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.");
        }
    }

    let id_token = match app.google.exchange_code(&code).await {
        Ok(Some(id_token)) => id_token,
        Ok(None) => {
            return (
                StatusCode::BAD_REQUEST,
                "Failed to retrieve id_token from Google",
            );
        }
        Err(e) => {
            error!("Google token exchange failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Google token exchange failed.",
            );
        }
    };

    let tokens = match app.okto.authenticate(&id_token).await {
        Ok(tokens) => tokens,
        Err(e) => {
            error!("Okto authentication failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Okto authentication failed.",
            );
        }
    };

    match session::complete_auth(&app.db, &discord_id, &tokens).await {
        Ok(_) => {}
        Err(Error::SessionNotFound { .. }) => {
            return (StatusCode::BAD_REQUEST, "Unknown login request");
        }
        Err(e) => {
            error!("Failed to store session: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.");
        }
    }
    info!("User authenticated with Okto");

    if let Err(e) = app.notifier.notify(&discord_id, AUTHENTICATED_DM).await {
        warn!("Could not DM authenticated user: {}", e);
    }

    (StatusCode::OK, AUTHENTICATED_PAGE)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        clients::{GoogleOAuth, OktoClient, mock},
        config::settings::GoogleSettings,
        core::session,
        entities::{SessionStatus, User},
        errors::Result,
        server::{Notifier, router},
        test_utils::setup_test_db,
    };
    use async_trait::async_trait;
    use axum::{Json, Router, body::Body, http::Request, routing::post};
    use sea_orm::{DatabaseConnection, EntityTrait};
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };
    use tower::ServiceExt;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, discord_id: &str, message: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((discord_id.to_string(), message.to_string()));
            Ok(())
        }
    }

    struct Harness {
        db: DatabaseConnection,
        notifier: Arc<RecordingNotifier>,
        upstream_calls: Arc<AtomicUsize>,
        app: Router,
    }

    /// Mock Google and Okto on one server; `id_token` is what Google returns.
    async fn harness(id_token: Option<&'static str>) -> Harness {
        let db = setup_test_db().await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let google_calls = calls.clone();
        let okto_calls = calls.clone();
        let upstream = Router::new()
            .route(
                "/token",
                post(move || {
                    google_calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        Json(match id_token {
                            Some(token) => json!({ "access_token": "a", "id_token": token }),
                            None => json!({ "access_token": "a" }),
                        })
                    }
                }),
            )
            .route(
                "/api/v2/authenticate",
                post(move |Json(body): Json<Value>| {
                    okto_calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if body["id_token"] == "good-id-token" {
                            (
                                StatusCode::OK,
                                Json(json!({ "status": "success", "data": {
                                    "auth_token": "okto-auth",
                                    "refresh_auth_token": "okto-refresh",
                                    "device_token": "okto-device"
                                }})),
                            )
                        } else {
                            (
                                StatusCode::UNAUTHORIZED,
                                Json(json!({ "status": "error", "message": "bad id token" })),
                            )
                        }
                    }
                }),
            );
        let base = mock::serve(upstream).await;

        let google = GoogleOAuth::new(
            reqwest::Client::new(),
            &GoogleSettings {
                token_url: format!("{base}/token"),
                ..GoogleSettings::default()
            },
            "client".to_string(),
            SecretString::from("secret"),
            "http://localhost:3000/auth/google/callback".to_string(),
        );
        let okto = OktoClient::new(reqwest::Client::new(), base, SecretString::from("key"));
        let notifier = Arc::new(RecordingNotifier::default());
        let app = router(AppState {
            db: db.clone(),
            okto,
            google,
            notifier: notifier.clone(),
        });

        Harness {
            db,
            notifier,
            upstream_calls: calls,
            app,
        }
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_successful_callback_authenticates_and_notifies() {
        let h = harness(Some("good-id-token")).await;
        session::begin_login(&h.db, "4242").await.unwrap();

        let (status, body) = get(h.app, "/auth/google/callback?code=auth-code&state=4242").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, AUTHENTICATED_PAGE);

        let user = session::find(&h.db, "4242").await.unwrap().unwrap();
        assert_eq!(user.status, SessionStatus::Authenticated);
        assert_eq!(user.auth_token.as_deref(), Some("okto-auth"));
        assert_eq!(user.refresh_auth_token.as_deref(), Some("okto-refresh"));
        assert_eq!(user.device_token.as_deref(), Some("okto-device"));

        let sent = h.notifier.sent.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![("4242".to_string(), AUTHENTICATED_DM.to_string())]
        );
    }

    #[tokio::test]
    async fn test_missing_params_is_bad_request_without_side_effects() {
        let h = harness(Some("good-id-token")).await;
        session::begin_login(&h.db, "4242").await.unwrap();

        for uri in [
            "/auth/google/callback",
            "/auth/google/callback?code=abc",
            "/auth/google/callback?state=4242",
            "/auth/google/callback?code=&state=4242",
            "/auth/google/callback?code=abc&state=",
        ] {
            let (status, body) = get(h.app.clone(), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body, "Invalid request");
        }

        assert_eq!(h.upstream_calls.load(Ordering::SeqCst), 0);
        assert!(h.notifier.sent.lock().unwrap().is_empty());
        let user = session::find(&h.db, "4242").await.unwrap().unwrap();
        assert_eq!(user.status, SessionStatus::AwaitingAuth);
        assert!(user.auth_token.is_none());
    }

    #[tokio::test]
    async fn test_unknown_state_is_rejected() {
        let h = harness(Some("good-id-token")).await;

        let (status, body) = get(h.app, "/auth/google/callback?code=abc&state=999").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Unknown login request");
        assert_eq!(h.upstream_calls.load(Ordering::SeqCst), 0);
        assert!(User::find().all(&h.db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_id_token() {
        let h = harness(None).await;
        session::begin_login(&h.db, "4242").await.unwrap();

        let (status, body) = get(h.app, "/auth/google/callback?code=abc&state=4242").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Failed to retrieve id_token from Google");
    }

    #[tokio::test]
    async fn test_okto_rejection_is_server_error() {
        let h = harness(Some("revoked-id-token")).await;
        session::begin_login(&h.db, "4242").await.unwrap();

        let (status, body) = get(h.app, "/auth/google/callback?code=abc&state=4242").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Okto authentication failed.");

        let user = session::find(&h.db, "4242").await.unwrap().unwrap();
        assert_eq!(user.status, SessionStatus::AwaitingAuth);
        assert!(h.notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_google_failure_is_server_error() {
        let h = harness(Some("good-id-token")).await;
        session::begin_login(&h.db, "4242").await.unwrap();
        let google = GoogleOAuth::new(
            reqwest::Client::new(),
            &GoogleSettings {
                token_url: "http://127.0.0.1:1/token".to_string(),
                ..GoogleSettings::default()
            },
            "client".to_string(),
            SecretString::from("secret"),
            "http://localhost:3000/auth/google/callback".to_string(),
        );
        let app = router(AppState {
            db: h.db.clone(),
            okto: OktoClient::new(
                reqwest::Client::new(),
                "http://127.0.0.1:1",
                SecretString::from("k"),
            ),
            google,
            notifier: h.notifier.clone(),
        });

        let (status, body) = get(app, "/auth/google/callback?code=abc&state=4242").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Google token exchange failed.");
    }
}
