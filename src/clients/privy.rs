//! Privy server wallets: creation and remote signing of Solana transactions.

use crate::clients::{json_or_upstream, required_str};
use crate::errors::Result;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{info, instrument};

const SERVICE: &str = "Privy";
/// CAIP-2 identifier of Solana mainnet
pub const SOLANA_MAINNET_CAIP2: &str = "solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp";

/// A wallet created through Privy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivyWallet {
    /// Privy wallet ID, used for signing
    pub id: String,
    /// On-chain address
    pub address: String,
}

/// Client for the Privy server-wallet API, authenticated with the app credentials
#[derive(Debug, Clone)]
pub struct PrivyClient {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
    app_secret: SecretString,
}

impl PrivyClient {
    /// `base_url` may end with a slash.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        app_id: String,
        app_secret: SecretString,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_id,
            app_secret,
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.app_id, Some(self.app_secret.expose_secret()))
            .header("privy-app-id", &self.app_id)
    }

    /// Creates a new Solana wallet.
    #[instrument(skip(self))]
    pub async fn create_solana_wallet(&self) -> Result<PrivyWallet> {
        let response = self
            .post("/v1/wallets")
            .json(&json!({ "chain_type": "solana" }))
            .send()
            .await?;
        let body = json_or_upstream(SERVICE, response).await?;
        let wallet = PrivyWallet {
            id: required_str(SERVICE, &body, "/id")?,
            address: required_str(SERVICE, &body, "/address")?,
        };
        info!("Created Privy wallet {}", wallet.id);
        Ok(wallet)
    }

    /// Signs a base64 transaction with the wallet and submits it. Returns the signature.
    #[instrument(skip(self, transaction))]
    pub async fn sign_and_send(&self, wallet_id: &str, transaction: &str) -> Result<String> {
        let response = self
            .post(&format!("/v1/wallets/{wallet_id}/rpc"))
            .json(&json!({
                "method": "signAndSendTransaction",
                "caip2": SOLANA_MAINNET_CAIP2,
                "params": {
                    "transaction": transaction,
                    "encoding": "base64",
                },
            }))
            .send()
            .await?;
        let body = json_or_upstream(SERVICE, response).await?;
        required_str(SERVICE, &body, "/data/hash")
    }
}
