//! Okto custodial wallet REST API.
//!
//! Every authenticated call sends the user's bearer token together with the
//! application's `X-Api-Key`. A 401 means the stored token is no longer valid
//! and maps to [`Error::SessionExpired`].

use crate::clients::{json_or_upstream, required_str};
use crate::errors::{Error, Result};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

const SERVICE: &str = "Okto";

/// Tokens issued by `/api/v2/authenticate` and `/api/v1/refresh_token`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTokens {
    /// Bearer token for every authenticated call
    pub auth_token: String,
    /// Sent as `x-refresh-authorization` on refresh
    pub refresh_auth_token: Option<String>,
    /// Sent as `x-device-token` on refresh
    pub device_token: Option<String>,
}

impl AuthTokens {
    /// Extracts tokens from a `{ "data": { ... } }` envelope.
    fn from_response(body: &Value) -> Result<Self> {
        let optional = |pointer: &str| {
            body.pointer(pointer)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Ok(Self {
            auth_token: required_str(SERVICE, body, "/data/auth_token")?,
            refresh_auth_token: optional("/data/refresh_auth_token"),
            device_token: optional("/data/device_token"),
        })
    }
}

/// Body of `POST /api/v1/transfer/tokens/execute`
#[derive(Debug, Clone, Serialize)]
pub struct TransferRequest {
    /// Okto network name, e.g. `POLYGON`
    pub network_name: String,
    /// Token contract address, empty for the native token
    pub token_address: String,
    /// Human-readable amount, e.g. `"1.5"`
    pub quantity: String,
    pub recipient_address: String,
}

/// Client for the Okto REST API
#[derive(Debug, Clone)]
pub struct OktoClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl OktoClient {
    /// `base_url` may end with a slash.
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Exchanges a Google ID token for Okto session tokens.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, id_token: &str) -> Result<AuthTokens> {
        let response = self
            .http
            .post(format!("{}/api/v2/authenticate", self.base_url))
            .header("X-Api-Key", self.api_key.expose_secret())
            .json(&serde_json::json!({ "id_token": id_token }))
            .send()
            .await?;
        let body = json_or_upstream(SERVICE, response).await?;
        AuthTokens::from_response(&body)
    }

    /// Sends an authenticated request and returns the full JSON body.
    #[instrument(skip(self, auth_token, body))]
    pub async fn call(
        &self,
        auth_token: &str,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        debug!("Calling Okto {} {}", method, endpoint);
        let mut request = self
            .http
            .request(method, format!("{}{}", self.base_url, endpoint))
            .bearer_auth(auth_token)
            .header("X-Api-Key", self.api_key.expose_secret());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::SessionExpired);
        }
        json_or_upstream(SERVICE, response).await
    }

    /// Lists the wallets of the session user.
    pub async fn wallets(&self, auth_token: &str) -> Result<Value> {
        self.call(auth_token, Method::GET, "/api/v1/wallet", None)
            .await
    }

    /// Creates wallets on every supported network.
    pub async fn create_wallet(&self, auth_token: &str) -> Result<Value> {
        self.call(auth_token, Method::POST, "/api/v1/wallet", None)
            .await
    }

    /// Token holdings across all wallets.
    pub async fn portfolio(&self, auth_token: &str) -> Result<Value> {
        self.call(auth_token, Method::GET, "/api/v1/portfolio", None)
            .await
    }

    /// Profile of the session user.
    pub async fn user_details(&self, auth_token: &str) -> Result<Value> {
        self.call(auth_token, Method::GET, "/api/v1/user_from_token", None)
            .await
    }

    /// Networks Okto supports.
    pub async fn networks(&self, auth_token: &str) -> Result<Value> {
        self.call(auth_token, Method::GET, "/api/v1/supported/networks", None)
            .await
    }

    /// Tokens Okto supports.
    pub async fn tokens(&self, auth_token: &str) -> Result<Value> {
        self.call(auth_token, Method::GET, "/api/v1/supported/tokens", None)
            .await
    }

    /// Order history, newest first.
    pub async fn orders(&self, auth_token: &str) -> Result<Value> {
        self.call(auth_token, Method::GET, "/api/v1/orders", None)
            .await
    }

    /// Ends the Okto session.
    pub async fn logout(&self, auth_token: &str) -> Result<Value> {
        self.call(auth_token, Method::POST, "/api/v1/logout", None)
            .await
    }

    /// Starts a token transfer and returns the order ID.
    pub async fn transfer(&self, auth_token: &str, request: &TransferRequest) -> Result<String> {
        let body = serde_json::to_value(request)?;
        let response = self
            .call(
                auth_token,
                Method::POST,
                "/api/v1/transfer/tokens/execute",
                Some(&body),
            )
            .await?;
        required_str(SERVICE, &response, "/data/orderId")
    }

    /// Refreshes the session. Returns new tokens when Okto sends them back.
    #[instrument(skip_all)]
    pub async fn refresh_token(
        &self,
        auth_token: &str,
        refresh_auth_token: Option<&str>,
        device_token: Option<&str>,
    ) -> Result<Option<AuthTokens>> {
        let mut request = self
            .http
            .post(format!("{}/api/v1/refresh_token", self.base_url))
            .bearer_auth(auth_token)
            .header("X-Api-Key", self.api_key.expose_secret());
        if let Some(refresh) = refresh_auth_token {
            request = request.header("x-refresh-authorization", format!("Bearer {refresh}"));
        }
        if let Some(device) = device_token {
            request = request.header("x-device-token", device);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::SessionExpired);
        }
        let body = json_or_upstream(SERVICE, response).await?;
        if body.pointer("/data/auth_token").is_some() {
            AuthTokens::from_response(&body).map(Some)
        } else {
            Ok(None)
        }
    }
}
