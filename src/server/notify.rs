//! Delivery of out-of-band messages to Discord users.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Sends a direct message to a Discord user
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers `message` to the user with snowflake `discord_id`.
    async fn notify(&self, discord_id: &str, message: &str) -> Result<()>;
}

/// Sends DMs through the bot's REST client.
pub struct DiscordNotifier {
    http: Arc<serenity::Http>,
}

impl DiscordNotifier {
    /// Wraps the serenity REST client of the running bot.
    #[must_use]
    pub const fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, discord_id: &str, message: &str) -> Result<()> {
        let id = discord_id
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .ok_or_else(|| Error::Config {
                message: format!("Invalid Discord user ID: {discord_id}"),
            })?;
        serenity::UserId::new(id)
            .direct_message(&*self.http, serenity::CreateMessage::new().content(message))
            .await?;
        Ok(())
    }
}
