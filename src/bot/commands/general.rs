//! General Discord commands - help text for the active backend.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::reply_private},
        config::Backend,
        errors::{Error, Result},
    };

    /// Lists the commands available for `backend`.
    #[must_use]
    pub fn help_text(backend: Backend) -> &'static str {
        match backend {
            Backend::Okto => {
                "**Okto Buddy Help**\n\
                • `/login` - Sign in with Google to link your Okto account.\n\
                • `/wallets` - Show your Okto wallets.\n\
                • `/createwallet` - Create wallets on all supported networks.\n\
                • `/portfolio` - Show your token portfolio.\n\
                • `/userdetails` - Show your Okto user details.\n\
                • `/networks` - List supported networks.\n\
                • `/tokens` - List supported tokens.\n\
                • `/transfer <network> <token_address> <quantity> <recipient>` - Transfer tokens.\n\
                • `/orders` - Show your order history.\n\
                • `/refresh_token` - Refresh your Okto session.\n\
                • `/logout` - Log out of Okto.\n\
                • `/help` - Shows this help message."
            }
            Backend::Solana => {
                "**Okto Buddy Help**\n\
                • `/login` - Create or show your Solana wallet.\n\
                • `/wallet` - Show your wallet address and token balances.\n\
                • `/transfer <token_address> <quantity> <recipient>` - Send SOL or an SPL token.\n\
                • `/swap <input_mint> <output_mint> <quantity>` - Swap tokens through Raydium.\n\
                • `/help` - Shows this help message."
            }
        }
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        reply_private(ctx, help_text(ctx.data().backend())).await
    }
}

// Re-export all commands
pub use inner::*;
