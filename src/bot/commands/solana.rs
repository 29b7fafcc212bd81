//! Solana Discord commands - Privy wallet login, balances, transfers and Raydium swaps.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::{discord_id, reply_private},
        },
        core::chain,
        errors::{Error, Result},
    };

    type Context<'a> = poise::Context<'a, BotData, Error>;

    /// Creates your Solana wallet, or shows it if you already have one.
    #[poise::command(slash_command, prefix_command)]
    pub async fn login(ctx: Context<'_>) -> Result<()> {
        ctx.defer_ephemeral().await?;
        let data = ctx.data();
        let reply = chain::login(&data.database, &data.chain()?.privy, &discord_id(ctx)).await?;
        reply_private(ctx, reply).await
    }

    /// Shows your wallet address and token balances.
    #[poise::command(slash_command, prefix_command)]
    pub async fn wallet(ctx: Context<'_>) -> Result<()> {
        ctx.defer_ephemeral().await?;
        let data = ctx.data();
        let reply = chain::wallet(&data.database, data.chain()?, &discord_id(ctx)).await?;
        reply_private(ctx, reply).await
    }

    /// Sends SOL or an SPL token from your wallet.
    #[poise::command(slash_command, prefix_command)]
    pub async fn transfer(
        ctx: Context<'_>,
        #[description = "Mint address of the token (or SOL)"] token_address: String,
        #[description = "Amount to send"] quantity: f64,
        #[description = "Recipient wallet address"] recipient: String,
    ) -> Result<()> {
        ctx.defer_ephemeral().await?;
        let data = ctx.data();
        let args = chain::TransferArgs {
            token_address,
            quantity,
            recipient,
        };
        let reply = chain::transfer(&data.database, data.chain()?, &discord_id(ctx), args).await?;
        reply_private(ctx, reply).await
    }

    /// Swaps tokens in your wallet through Raydium.
    #[poise::command(slash_command, prefix_command)]
    pub async fn swap(
        ctx: Context<'_>,
        #[description = "Mint address of the token to sell"] input_mint: String,
        #[description = "Mint address of the token to buy"] output_mint: String,
        #[description = "Amount of the input token"] quantity: f64,
    ) -> Result<()> {
        ctx.defer_ephemeral().await?;
        let data = ctx.data();
        let args = chain::SwapArgs {
            input_mint,
            output_mint,
            quantity,
        };
        let reply = chain::swap(&data.database, data.chain()?, &discord_id(ctx), args).await?;
        reply_private(ctx, reply).await
    }
}

// Re-export all commands
pub use inner::*;
