//! Raydium trade API: swap quotes and unsigned swap transactions.

use crate::clients::json_or_upstream;
use crate::config::settings::SolanaSettings;
use crate::errors::{Error, Result};
use serde_json::{Value, json};
use tracing::{info, instrument};

const SERVICE: &str = "Raydium";
const TX_VERSION: &str = "V0";

/// Parameters of one exact-input swap
#[derive(Debug, Clone)]
pub struct SwapRequest<'a> {
    /// Wallet that pays and signs
    pub wallet: &'a str,
    /// Mint spent
    pub input_mint: &'a str,
    /// Mint received
    pub output_mint: &'a str,
    /// Input amount in base units
    pub amount: u64,
    /// Token account holding the input, `None` when swapping native SOL
    pub input_account: Option<&'a str>,
    /// Token account receiving the output, `None` to let Raydium create one
    pub output_account: Option<&'a str>,
    /// Wrap native SOL into WSOL before the swap
    pub wrap_sol: bool,
    /// Unwrap WSOL output back into native SOL
    pub unwrap_sol: bool,
}

/// Client for `transaction-v1.raydium.io`
#[derive(Debug, Clone)]
pub struct RaydiumClient {
    http: reqwest::Client,
    swap_host: String,
    slippage_bps: u32,
    compute_unit_price: u64,
}

impl RaydiumClient {
    /// Reads the swap host, slippage and priority fee from `settings`.
    #[must_use]
    pub fn new(http: reqwest::Client, settings: &SolanaSettings) -> Self {
        Self {
            http,
            swap_host: settings.raydium_swap_host.trim_end_matches('/').to_string(),
            slippage_bps: settings.slippage_bps,
            compute_unit_price: settings.compute_unit_price_micro_lamports,
        }
    }

    /// Fetches a quote and returns the base64 transactions implementing it,
    /// in the order they must be sent.
    #[instrument(skip(self), fields(amount = request.amount))]
    pub async fn swap_transactions(&self, request: &SwapRequest<'_>) -> Result<Vec<String>> {
        let quote = self.quote(request).await?;

        let response = self
            .http
            .post(format!("{}/transaction/swap-base-in", self.swap_host))
            .json(&json!({
                "computeUnitPriceMicroLamports": self.compute_unit_price.to_string(),
                "swapResponse": quote,
                "txVersion": TX_VERSION,
                "wallet": request.wallet,
                "wrapSol": request.wrap_sol,
                "unwrapSol": request.unwrap_sol,
                "inputAccount": request.input_account,
                "outputAccount": request.output_account,
            }))
            .send()
            .await?;
        let body = ensure_success(json_or_upstream(SERVICE, response).await?)?;

        let transactions: Vec<String> = body
            .get("data")
            .and_then(Value::as_array)
            .map(|txs| {
                txs.iter()
                    .filter_map(|tx| tx.get("transaction").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if transactions.is_empty() {
            return Err(Error::MissingField {
                service: SERVICE,
                field: "data[].transaction".to_string(),
            });
        }
        info!("Raydium built {} swap transaction(s)", transactions.len());
        Ok(transactions)
    }

    async fn quote(&self, request: &SwapRequest<'_>) -> Result<Value> {
        let response = self
            .http
            .get(format!("{}/compute/swap-base-in", self.swap_host))
            .query(&[
                ("inputMint", request.input_mint.to_string()),
                ("outputMint", request.output_mint.to_string()),
                ("amount", request.amount.to_string()),
                ("slippageBps", self.slippage_bps.to_string()),
                ("txVersion", TX_VERSION.to_string()),
            ])
            .send()
            .await?;
        ensure_success(json_or_upstream(SERVICE, response).await?)
    }
}

/// Raydium answers 200 with `success: false` and a `msg` on logical failures.
fn ensure_success(body: Value) -> Result<Value> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let message = body
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or("request was not successful")
            .to_string();
        return Err(Error::Upstream {
            service: SERVICE,
            message,
        });
    }
    Ok(body)
}
