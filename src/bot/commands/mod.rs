//! Discord command implementations organized by backend.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Help and other backend-independent commands
pub mod general;

/// Commands backed by the Okto custodial wallet API
pub mod okto;

/// Commands backed by Privy wallets and Solana RPC
pub mod solana;

pub use general::*;

use crate::{
    bot::{BotData, Context},
    config::Backend,
    core::format::truncate_message,
    errors::{Error, Result},
};

/// Commands registered for `backend`.
#[must_use]
pub fn for_backend(backend: Backend) -> Vec<poise::Command<BotData, Error>> {
    match backend {
        Backend::Okto => vec![
            okto::login(),
            okto::wallets(),
            okto::createwallet(),
            okto::portfolio(),
            okto::refresh_token(),
            okto::logout(),
            okto::userdetails(),
            okto::networks(),
            okto::tokens(),
            okto::transfer(),
            okto::orders(),
            general::help(),
        ],
        Backend::Solana => vec![
            solana::login(),
            solana::wallet(),
            solana::transfer(),
            solana::swap(),
            general::help(),
        ],
    }
}

/// Sends a reply only the invoking user can see (ephemeral for slash commands).
pub(crate) async fn reply_private(ctx: Context<'_>, text: impl Into<String>) -> Result<()> {
    let reply = poise::CreateReply::default()
        .content(truncate_message(&text.into()))
        .ephemeral(true);
    ctx.send(reply).await?;
    Ok(())
}

/// Discord user ID of the invoker, the key of every session.
pub(crate) fn discord_id(ctx: Context<'_>) -> String {
    ctx.author().id.to_string()
}
