//! Solana JSON-RPC reads and token metadata lookups.
//!
//! Only read-only RPC methods are used here; signing and sending is done by
//! Privy. Account data is requested with `jsonParsed` encoding, so SPL token
//! accounts are decoded from JSON rather than raw account bytes.

use crate::clients::json_or_upstream;
use crate::errors::{Error, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use solana_sdk::hash::Hash;
use std::str::FromStr;
use tracing::{debug, instrument};

const SERVICE: &str = "Solana RPC";

/// SPL Token program
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
/// Wrapped SOL mint, used by swap APIs to mean native SOL
pub const NATIVE_MINT: &str = "So11111111111111111111111111111111111111112";
/// Decimals of native SOL
pub const NATIVE_DECIMALS: u8 = 9;

/// One SPL token account owned by a wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHolding {
    /// Token account address
    pub account: String,
    /// Mint of the held token
    pub mint: String,
    /// Raw amount in base units
    pub amount: u64,
    /// Decimals of the mint
    pub decimals: u8,
}

impl TokenHolding {
    /// Single-supply, zero-decimal tokens are NFTs, not fungible balances.
    #[must_use]
    pub const fn is_nft(&self) -> bool {
        self.decimals == 0 && self.amount == 1
    }

    /// Amount scaled by `decimals`, formatted without trailing zeros.
    #[must_use]
    pub fn ui_amount(&self) -> String {
        format_base_units(self.amount, self.decimals)
    }
}

/// Formats a base-unit amount as a decimal string.
#[must_use]
pub fn format_base_units(amount: u64, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let divisor = 10u64.pow(u32::from(decimals));
    let whole = amount / divisor;
    let frac = amount % divisor;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:0>width$}", width = usize::from(decimals));
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Converts a human amount into base units.
///
/// # Errors
/// Returns [`Error::InvalidAmount`] for non-finite, non-positive or
/// out-of-range amounts.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn to_base_units(amount: f64, decimals: u8) -> Result<u64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    let scaled = (amount * 10f64.powi(i32::from(decimals))).round();
    if scaled < 1.0 || scaled >= u64::MAX as f64 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(scaled as u64)
}

/// Minimal JSON-RPC client
#[derive(Debug, Clone)]
pub struct SolanaRpc {
    http: reqwest::Client,
    rpc_url: String,
}

impl SolanaRpc {
    /// Client for the JSON-RPC endpoint at `rpc_url`.
    #[must_use]
    pub fn new(http: reqwest::Client, rpc_url: impl Into<String>) -> Self {
        Self {
            http,
            rpc_url: rpc_url.into(),
        }
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value> {
        debug!("Solana RPC {}", method);
        let response = self
            .http
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await?;
        let mut body = json_or_upstream(SERVICE, response).await?;

        if let Some(error) = body.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| error.to_string(), str::to_string);
            return Err(Error::Upstream {
                service: SERVICE,
                message,
            });
        }
        match body.get_mut("result") {
            Some(result) => Ok(result.take()),
            None => Err(Error::MissingField {
                service: SERVICE,
                field: "result".to_string(),
            }),
        }
    }

    /// Lists SPL token accounts owned by `owner`, optionally for a single mint.
    #[instrument(skip(self))]
    pub async fn token_accounts(&self, owner: &str, mint: Option<&str>) -> Result<Vec<TokenHolding>> {
        let filter = match mint {
            Some(mint) => json!({ "mint": mint }),
            None => json!({ "programId": TOKEN_PROGRAM_ID }),
        };
        let result = self
            .rpc(
                "getTokenAccountsByOwner",
                json!([owner, filter, { "encoding": "jsonParsed" }]),
            )
            .await?;
        Ok(parse_token_accounts(&result))
    }

    /// Reads the `decimals` of a mint account.
    #[instrument(skip(self))]
    pub async fn mint_decimals(&self, mint: &str) -> Result<u8> {
        if mint == NATIVE_MINT {
            return Ok(NATIVE_DECIMALS);
        }
        let result = self
            .rpc("getAccountInfo", json!([mint, { "encoding": "jsonParsed" }]))
            .await?;
        result
            .pointer("/value/data/parsed/info/decimals")
            .and_then(Value::as_u64)
            .and_then(|d| u8::try_from(d).ok())
            .ok_or_else(|| Error::Upstream {
                service: SERVICE,
                message: format!("{mint} is not a token mint account"),
            })
    }
}

impl SolanaRpc {
    /// Latest blockhash at `finalized` commitment.
    #[instrument(skip(self))]
    pub async fn latest_blockhash(&self) -> Result<Hash> {
        let result = self
            .rpc("getLatestBlockhash", json!([{ "commitment": "finalized" }]))
            .await?;
        let blockhash = result
            .pointer("/value/blockhash")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MissingField {
                service: SERVICE,
                field: "/value/blockhash".to_string(),
            })?;
        Hash::from_str(blockhash).map_err(|e| Error::Upstream {
            service: SERVICE,
            message: format!("invalid blockhash {blockhash}: {e}"),
        })
    }

    /// Whether an account exists at `address`.
    #[instrument(skip(self))]
    pub async fn account_exists(&self, address: &str) -> Result<bool> {
        let result = self
            .rpc("getAccountInfo", json!([address, { "encoding": "base64" }]))
            .await?;
        Ok(!result.get("value").is_none_or(Value::is_null))
    }
}

/// Extracts holdings from a `getTokenAccountsByOwner` result, skipping entries
/// that are not parsed SPL token accounts.
fn parse_token_accounts(result: &Value) -> Vec<TokenHolding> {
    let Some(accounts) = result.get("value").and_then(Value::as_array) else {
        return Vec::new();
    };

    accounts
        .iter()
        .filter_map(|entry| {
            let info = entry.pointer("/account/data/parsed/info")?;
            let token_amount = info.get("tokenAmount")?;
            Some(TokenHolding {
                account: entry.get("pubkey")?.as_str()?.to_string(),
                mint: info.get("mint")?.as_str()?.to_string(),
                amount: token_amount.get("amount")?.as_str()?.parse().ok()?,
                decimals: u8::try_from(token_amount.get("decimals")?.as_u64()?).ok()?,
            })
        })
        .collect()
}

/// Token metadata as served by the token directory
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TokenInfo {
    /// Mint address
    pub address: String,
    pub name: String,
    /// Ticker, e.g. `USDC`
    pub symbol: String,
    pub decimals: u8,
}

/// Token metadata directory (`GET {base_url}/{mint}`)
#[derive(Debug, Clone)]
pub struct TokenDirectory {
    http: reqwest::Client,
    base_url: String,
}

impl TokenDirectory {
    /// `base_url` may end with a slash.
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Looks up a mint. Unknown mints (404 or a `null` body) yield `None`.
    pub async fn lookup(&self, mint: &str) -> Result<Option<TokenInfo>> {
        let response = self
            .http
            .get(format!("{}/{}", self.base_url, mint))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = json_or_upstream("Token directory", response).await?;
        if body.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(body)?))
    }
}
