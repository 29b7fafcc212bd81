//! Okto Discord commands - Google login and custodial wallet operations.
//!
//! Every handler defers, hands the invoker's Discord ID to `core::okto` and
//! sends back the reply text. Errors bubble up to the framework `on_error`.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::{discord_id, reply_private},
        },
        core::okto as ops,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use tracing::{info, warn};

    type Context<'a> = poise::Context<'a, BotData, Error>;

    /// Sends you a Google sign-in link to connect your Okto account.
    #[poise::command(slash_command, prefix_command)]
    pub async fn login(ctx: Context<'_>) -> Result<()> {
        ctx.defer_ephemeral().await?;
        let data = ctx.data();
        let services = data.okto()?;
        let url = ops::login_url(&data.database, &services.google, &discord_id(ctx)).await?;

        let message = serenity::CreateMessage::new().content(ops::login_message(&url));
        match ctx.author().direct_message(ctx.serenity_context(), message).await {
            Ok(_) => {
                info!("Sent login link to {}", ctx.author().name);
                reply_private(ctx, "I have sent you a DM with the login link.").await
            }
            Err(e) => {
                warn!("Could not DM {}: {}", ctx.author().name, e);
                reply_private(
                    ctx,
                    "I couldn't send you a DM. Please check your privacy settings.",
                )
                .await
            }
        }
    }

    /// Shows your Okto wallets.
    #[poise::command(slash_command, prefix_command)]
    pub async fn wallets(ctx: Context<'_>) -> Result<()> {
        ctx.defer_ephemeral().await?;
        let data = ctx.data();
        let reply = ops::wallets(&data.database, &data.okto()?.okto, &discord_id(ctx)).await?;
        reply_private(ctx, reply).await
    }

    /// Creates wallets on every network Okto supports.
    #[poise::command(slash_command, prefix_command)]
    pub async fn createwallet(ctx: Context<'_>) -> Result<()> {
        ctx.defer_ephemeral().await?;
        let data = ctx.data();
        let reply =
            ops::create_wallet(&data.database, &data.okto()?.okto, &discord_id(ctx)).await?;
        reply_private(ctx, reply).await
    }

    /// Shows your token portfolio.
    #[poise::command(slash_command, prefix_command)]
    pub async fn portfolio(ctx: Context<'_>) -> Result<()> {
        ctx.defer_ephemeral().await?;
        let data = ctx.data();
        let reply = ops::portfolio(&data.database, &data.okto()?.okto, &discord_id(ctx)).await?;
        reply_private(ctx, reply).await
    }

    /// Refreshes your Okto session tokens.
    #[poise::command(slash_command, prefix_command)]
    pub async fn refresh_token(ctx: Context<'_>) -> Result<()> {
        ctx.defer_ephemeral().await?;
        let data = ctx.data();
        let reply =
            ops::refresh_token(&data.database, &data.okto()?.okto, &discord_id(ctx)).await?;
        reply_private(ctx, reply).await
    }

    /// Logs you out of Okto.
    #[poise::command(slash_command, prefix_command)]
    pub async fn logout(ctx: Context<'_>) -> Result<()> {
        ctx.defer_ephemeral().await?;
        let data = ctx.data();
        let reply = ops::logout(&data.database, &data.okto()?.okto, &discord_id(ctx)).await?;
        reply_private(ctx, reply).await
    }

    /// Shows your Okto user details.
    #[poise::command(slash_command, prefix_command)]
    pub async fn userdetails(ctx: Context<'_>) -> Result<()> {
        ctx.defer_ephemeral().await?;
        let data = ctx.data();
        let reply =
            ops::user_details(&data.database, &data.okto()?.okto, &discord_id(ctx)).await?;
        reply_private(ctx, reply).await
    }

    /// Lists the networks Okto supports.
    #[poise::command(slash_command, prefix_command)]
    pub async fn networks(ctx: Context<'_>) -> Result<()> {
        ctx.defer_ephemeral().await?;
        let data = ctx.data();
        let reply = ops::networks(&data.database, &data.okto()?.okto, &discord_id(ctx)).await?;
        reply_private(ctx, reply).await
    }

    /// Lists the tokens Okto supports.
    #[poise::command(slash_command, prefix_command)]
    pub async fn tokens(ctx: Context<'_>) -> Result<()> {
        ctx.defer_ephemeral().await?;
        let data = ctx.data();
        let reply = ops::tokens(&data.database, &data.okto()?.okto, &discord_id(ctx)).await?;
        reply_private(ctx, reply).await
    }

    /// Transfers tokens from your Okto wallet.
    #[poise::command(slash_command, prefix_command)]
    pub async fn transfer(
        ctx: Context<'_>,
        #[description = "Network name, e.g. POLYGON"] network: String,
        #[description = "Token contract address (empty for the native token)"]
        token_address: String,
        #[description = "Amount to send"] quantity: f64,
        #[description = "Recipient address"] recipient: String,
    ) -> Result<()> {
        ctx.defer_ephemeral().await?;
        let data = ctx.data();
        let args = ops::TransferArgs {
            network,
            token_address,
            quantity,
            recipient,
        };
        let reply =
            ops::transfer(&data.database, &data.okto()?.okto, &discord_id(ctx), args).await?;
        reply_private(ctx, reply).await
    }

    /// Shows your order history.
    #[poise::command(slash_command, prefix_command)]
    pub async fn orders(ctx: Context<'_>) -> Result<()> {
        ctx.defer_ephemeral().await?;
        let data = ctx.data();
        let reply = ops::orders(&data.database, &data.okto()?.okto, &discord_id(ctx)).await?;
        reply_private(ctx, reply).await
    }
}

// Re-export all commands
pub use inner::*;
