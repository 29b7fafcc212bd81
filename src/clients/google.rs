//! Google OAuth 2.0 authorization-code flow.
//!
//! The Discord user ID travels through the flow as the `state` parameter so the
//! callback can find the session record it belongs to.

use crate::clients::json_or_upstream;
use crate::config::settings::GoogleSettings;
use crate::errors::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::instrument;
use url::Url;

const SERVICE: &str = "Google";
const SCOPES: &str = "openid email profile";

/// Google OAuth client
#[derive(Debug, Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    auth_url: String,
    token_url: String,
}

impl GoogleOAuth {
    /// Builds the client from the `[google]` settings and the client secret.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        settings: &GoogleSettings,
        client_id: String,
        client_secret: SecretString,
        redirect_uri: String,
    ) -> Self {
        Self {
            http,
            client_id,
            client_secret,
            redirect_uri,
            auth_url: settings.auth_url.clone(),
            token_url: settings.token_url.clone(),
        }
    }

    /// Builds the consent-screen URL the user is sent to from `/login`.
    pub fn authorization_url(&self, state: &str) -> Result<Url> {
        Url::parse_with_params(
            &self.auth_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("state", state),
            ],
        )
        .map_err(|e| Error::Config {
            message: format!("Invalid Google auth URL {}: {e}", self.auth_url),
        })
    }

    /// Exchanges an authorization code. Returns the ID token, if Google sent one.
    #[instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str) -> Result<Option<String>> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await?;
        let body = json_or_upstream(SERVICE, response).await?;
        Ok(body
            .get("id_token")
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}
