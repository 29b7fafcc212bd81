//! Solana backend command logic.
//!
//! Wallets are Privy server wallets, created on `/login` and used to sign
//! Raydium swaps and direct transfers. Balances are read straight from the
//! chain.

use crate::{
    clients::{
        PrivyClient, RaydiumClient, SolanaRpc, TokenDirectory,
        raydium::SwapRequest,
        solana::{NATIVE_DECIMALS, NATIVE_MINT, TokenHolding, to_base_units},
    },
    core::{
        format::truncate_message,
        session,
        solana_tx::{self, Asset, TransferPlan},
    },
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use std::fmt::Write;
use tracing::{info, instrument};

/// Everything the Solana backend talks to
#[derive(Debug, Clone)]
pub struct ChainServices {
    /// JSON-RPC node for balances, decimals and blockhashes
    pub rpc: SolanaRpc,
    /// Token name/symbol lookups
    pub directory: TokenDirectory,
    /// Swap quotes and transactions
    pub raydium: RaydiumClient,
    /// Wallet creation and signing
    pub privy: PrivyClient,
}

/// Returns the user's wallet address, creating a Privy wallet on first use.
#[instrument(skip(db, privy))]
pub async fn login(db: &DatabaseConnection, privy: &PrivyClient, discord_id: &str) -> Result<String> {
    if let Some(wallet) = session::find(db, discord_id)
        .await?
        .as_ref()
        .and_then(session::wallet_of)
    {
        return Ok(format!(
            "Login Successful. Your address is `{}`. Top up your wallet with SOL to cover gas fees.",
            wallet.address
        ));
    }

    let wallet = privy.create_solana_wallet().await?;
    session::attach_wallet(db, discord_id, &wallet).await?;
    info!("Attached new wallet {}", wallet.address);
    Ok(format!("Wallet created successfully: `{}`", wallet.address))
}

/// Fungible holdings worth showing: no NFTs, no empty accounts.
fn fungible(holdings: Vec<TokenHolding>) -> Vec<TokenHolding> {
    holdings
        .into_iter()
        .filter(|h| h.amount > 0 && !h.is_nft())
        .collect()
}

/// Lists the SPL tokens held by the user's wallet.
#[instrument(skip(db, services))]
pub async fn wallet(
    db: &DatabaseConnection,
    services: &ChainServices,
    discord_id: &str,
) -> Result<String> {
    let wallet = session::require_wallet(db, discord_id).await?;
    let holdings = fungible(services.rpc.token_accounts(&wallet.address, None).await?);

    let mut reply = format!("Your wallet address: `{}`\n", wallet.address);
    let mut listed = 0usize;
    for holding in holdings {
        let Some(info) = services.directory.lookup(&holding.mint).await? else {
            continue;
        };
        writeln!(
            reply,
            "• {} ({}): {}",
            info.symbol,
            info.name,
            holding.ui_amount()
        )
        .ok();
        listed += 1;
    }
    if listed == 0 {
        reply.push_str("No token balances found.");
    }
    Ok(truncate_message(reply.trim_end()))
}

/// Arguments of `/swap`
#[derive(Debug, Clone)]
pub struct SwapArgs {
    /// Mint being sold
    pub input_mint: String,
    /// Mint being bought
    pub output_mint: String,
    /// Human amount of the input token
    pub quantity: f64,
}

/// Swaps through Raydium and submits every resulting transaction via Privy.
#[instrument(skip(db, services))]
pub async fn swap(
    db: &DatabaseConnection,
    services: &ChainServices,
    discord_id: &str,
    args: SwapArgs,
) -> Result<String> {
    let wallet = session::require_wallet(db, discord_id).await?;
    if !args.quantity.is_finite() || args.quantity <= 0.0 {
        return Err(Error::InvalidAmount {
            amount: args.quantity,
        });
    }

    let decimals = services.rpc.mint_decimals(&args.input_mint).await?;
    let amount = to_base_units(args.quantity, decimals)?;

    let is_input_sol = args.input_mint == NATIVE_MINT;
    let is_output_sol = args.output_mint == NATIVE_MINT;

    let input_account = if is_input_sol {
        None
    } else {
        let account = services
            .rpc
            .token_accounts(&wallet.address, Some(&args.input_mint))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoTokenAccount {
                mint: args.input_mint.clone(),
            })?;
        Some(account.account)
    };
    let output_account = if is_output_sol {
        None
    } else {
        services
            .rpc
            .token_accounts(&wallet.address, Some(&args.output_mint))
            .await?
            .into_iter()
            .next()
            .map(|holding| holding.account)
    };

    let transactions = services
        .raydium
        .swap_transactions(&SwapRequest {
            wallet: &wallet.address,
            input_mint: &args.input_mint,
            output_mint: &args.output_mint,
            amount,
            input_account: input_account.as_deref(),
            output_account: output_account.as_deref(),
            wrap_sol: is_input_sol,
            unwrap_sol: is_output_sol,
        })
        .await?;

    // Raydium transactions depend on each other, send them in order.
    let mut signatures = Vec::with_capacity(transactions.len());
    for transaction in &transactions {
        signatures.push(
            services
                .privy
                .sign_and_send(&wallet.privy_id, transaction)
                .await?,
        );
    }
    info!("Swap submitted in {} transaction(s)", signatures.len());

    let mut reply = String::from("Swap submitted. Transaction signatures:");
    for signature in &signatures {
        write!(reply, "\n`{signature}`").ok();
    }
    Ok(truncate_message(&reply))
}

/// Arguments of `/transfer` in the Solana backend
#[derive(Debug, Clone)]
pub struct TransferArgs {
    /// Mint to send; the wrapped SOL mint or `SOL` sends native SOL
    pub token_address: String,
    /// Human amount
    pub quantity: f64,
    /// Recipient wallet address
    pub recipient: String,
}

fn is_native(token_address: &str) -> bool {
    let token_address = token_address.trim();
    token_address == NATIVE_MINT || token_address.eq_ignore_ascii_case("SOL")
}

/// Sends SOL or an SPL token from the user's wallet, creating the recipient's
/// token account when it does not exist yet.
#[instrument(skip(db, services))]
pub async fn transfer(
    db: &DatabaseConnection,
    services: &ChainServices,
    discord_id: &str,
    args: TransferArgs,
) -> Result<String> {
    let wallet = session::require_wallet(db, discord_id).await?;
    if !args.quantity.is_finite() || args.quantity <= 0.0 {
        return Err(Error::InvalidAmount {
            amount: args.quantity,
        });
    }
    let from = solana_tx::parse_pubkey(&wallet.address)?;
    let to = solana_tx::parse_pubkey(&args.recipient)?;

    let (asset, decimals) = if is_native(&args.token_address) {
        (Asset::Native, NATIVE_DECIMALS)
    } else {
        let mint = solana_tx::parse_pubkey(&args.token_address)?;
        let mint_address = mint.to_string();
        let decimals = services.rpc.mint_decimals(&mint_address).await?;
        if services
            .rpc
            .token_accounts(&wallet.address, Some(&mint_address))
            .await?
            .is_empty()
        {
            return Err(Error::NoTokenAccount { mint: mint_address });
        }
        let destination = solana_tx::associated_token_address(&to, &mint);
        let create_destination_account =
            !services.rpc.account_exists(&destination.to_string()).await?;
        let asset = Asset::Token {
            mint,
            decimals,
            create_destination_account,
        };
        (asset, decimals)
    };

    let plan = TransferPlan {
        from,
        to,
        asset,
        amount: to_base_units(args.quantity, decimals)?,
    };
    let blockhash = services.rpc.latest_blockhash().await?;
    let transaction = solana_tx::build_transfer(&plan, blockhash)?;
    let signature = services
        .privy
        .sign_and_send(&wallet.privy_id, &transaction)
        .await?;
    info!("Transfer submitted: {}", signature);
    Ok(format!(
        "Token transfer initiated. Transaction signature: `{signature}`"
    ))
}
