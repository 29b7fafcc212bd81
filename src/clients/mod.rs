//! Typed HTTP clients for every external service the bot talks to.
//!
//! All clients share one `reqwest::Client` (built from [`HttpSettings`]) and
//! convert non-success responses into [`Error::Upstream`] carrying the most
//! useful message the service returned.
//!
//! [`HttpSettings`]: crate::config::settings::HttpSettings

/// Google OAuth authorization-code flow
pub mod google;
/// Okto custodial wallet REST API
pub mod okto;
/// Privy server wallets
pub mod privy;
/// Raydium swap quotes and transactions
pub mod raydium;
/// Solana JSON-RPC and token metadata directory
pub mod solana;

pub use google::GoogleOAuth;
pub use okto::{AuthTokens, OktoClient};
pub use privy::{PrivyClient, PrivyWallet};
pub use raydium::RaydiumClient;
pub use solana::{SolanaRpc, TokenDirectory};

use crate::errors::{Error, Result};
use serde_json::Value;
use tracing::warn;

/// Reads a JSON body, turning non-2xx responses into [`Error::Upstream`].
///
/// An empty success body (e.g. `204 No Content`) reads as `Value::Null`.
pub(crate) async fn json_or_upstream(
    service: &'static str,
    response: reqwest::Response,
) -> Result<Value> {
    let status = response.status();
    if status.is_success() {
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        return serde_json::from_slice(&bytes).map_err(Into::into);
    }

    let body = response.text().await.unwrap_or_default();
    warn!("{} returned {}: {}", service, status, body);
    Err(Error::Upstream {
        service,
        message: upstream_message(status, &body),
    })
}

/// Picks the `message` (or `error`) field of a JSON error body, else the raw body.
pub(crate) fn upstream_message(status: reqwest::StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|json| {
        ["message", "error", "error_description"]
            .iter()
            .find_map(|key| json.get(key).and_then(Value::as_str).map(str::to_string))
    });

    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => status.to_string(),
        None => body.trim().to_string(),
    }
}

/// Looks up a string at a JSON pointer, failing with [`Error::MissingField`].
pub(crate) fn required_str(service: &'static str, value: &Value, pointer: &str) -> Result<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::MissingField {
            service,
            field: pointer.to_string(),
        })
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-process HTTP server standing in for external APIs.

    use axum::Router;
    use tokio::net::TcpListener;

    /// Serves `app` on a random local port and returns its base URL.
    pub(crate) async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock server");
        });
        format!("http://{addr}")
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn test_upstream_message_prefers_json_message() {
        let body = json!({ "status": "error", "message": "wallet limit reached" }).to_string();
        assert_eq!(
            upstream_message(StatusCode::BAD_REQUEST, &body),
            "wallet limit reached"
        );
    }

    #[test]
    fn test_upstream_message_falls_back_to_body_then_status() {
        assert_eq!(
            upstream_message(StatusCode::BAD_GATEWAY, "  upstream down \n"),
            "upstream down"
        );
        assert_eq!(
            upstream_message(StatusCode::BAD_GATEWAY, ""),
            "502 Bad Gateway"
        );
    }

    #[tokio::test]
    async fn test_empty_success_body_is_null() {
        use axum::{Router, routing::get};

        let app = Router::new()
            .route("/no-content", get(|| async { StatusCode::NO_CONTENT }))
            .route("/empty", get(|| async { "" }))
            .route("/broken", get(|| async { "{not json" }));
        let base = mock::serve(app).await;
        let http = reqwest::Client::new();
        let fetch = |path: &str| http.get(format!("{base}{path}")).send();

        let no_content = json_or_upstream("Okto", fetch("/no-content").await.unwrap()).await;
        assert_eq!(no_content.ok(), Some(Value::Null));
        let empty = json_or_upstream("Okto", fetch("/empty").await.unwrap()).await;
        assert_eq!(empty.ok(), Some(Value::Null));
        let broken = json_or_upstream("Okto", fetch("/broken").await.unwrap()).await;
        assert!(matches!(broken, Err(Error::Json(_))));
    }

    #[test]
    fn test_required_str_reports_pointer() {
        let value = json!({ "data": { "orderId": "abc" } });
        assert_eq!(required_str("Okto", &value, "/data/orderId").ok(), Some("abc".to_string()));

        let err = required_str("Okto", &value, "/data/missing").err();
        assert!(matches!(
            err,
            Some(Error::MissingField { service: "Okto", ref field }) if field == "/data/missing"
        ));
    }
}
