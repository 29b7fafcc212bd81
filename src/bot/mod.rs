//! Bot layer - Discord-specific interface and command handlers
//!
//! Wires the poise framework: which commands exist for the active backend,
//! how command errors are reported back to the user, and client startup.

/// Discord command implementations (general, okto, solana)
pub mod commands;

use crate::{
    clients::{GoogleOAuth, OktoClient},
    config::Backend,
    core::{chain::ChainServices, error_log, format::truncate_message},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::future::Future;
use tracing::{error, info, instrument, warn};

/// Reply for any command that needs a session the user does not have
pub const LOGIN_PROMPT: &str = "Please log in first using `/login`.";

/// Clients used by the Okto backend
#[derive(Debug, Clone)]
pub struct OktoServices {
    /// Okto REST client
    pub okto: OktoClient,
    /// Google OAuth client for `/login` links and the callback
    pub google: GoogleOAuth,
}

/// External services of the active backend
#[derive(Debug, Clone)]
pub enum Services {
    /// Custodial wallets through Okto
    Okto(OktoServices),
    /// Privy-held wallets with direct Solana access
    Solana(ChainServices),
}

/// Shared data available to all bot commands.
pub struct BotData {
    /// Database connection for session and error log storage
    pub database: DatabaseConnection,
    /// Backend-specific API clients
    pub services: Services,
}

impl BotData {
    /// Bundles the connection and the backend's clients.
    #[must_use]
    pub const fn new(database: DatabaseConnection, services: Services) -> Self {
        Self { database, services }
    }

    /// Which command set is active.
    #[must_use]
    pub const fn backend(&self) -> Backend {
        match self.services {
            Services::Okto(_) => Backend::Okto,
            Services::Solana(_) => Backend::Solana,
        }
    }

    /// Okto clients, or a configuration error when running the Solana backend.
    pub fn okto(&self) -> Result<&OktoServices> {
        match &self.services {
            Services::Okto(services) => Ok(services),
            Services::Solana(_) => Err(Error::Config {
                message: "Okto commands are not available in the solana backend".to_string(),
            }),
        }
    }

    /// Chain clients, or a configuration error when running the Okto backend.
    pub fn chain(&self) -> Result<&ChainServices> {
        match &self.services {
            Services::Solana(services) => Ok(services),
            Services::Okto(_) => Err(Error::Config {
                message: "Solana commands are not available in the okto backend".to_string(),
            }),
        }
    }
}

/// Command context carrying [`BotData`]
pub type Context<'a> = poise::Context<'a, BotData, Error>;

/// Text shown to the user for a failed command.
#[must_use]
pub fn reply_for_error(error: &Error) -> String {
    match error {
        Error::NotAuthenticated => LOGIN_PROMPT.to_string(),
        other => truncate_message(&format!("Error: {other}")),
    }
}

/// Logs a failed command and returns the reply for the user.
///
/// `NotAuthenticated` is an expected answer and is neither logged nor stored;
/// every other error goes to the tracing log and the `error_logs` table.
pub async fn handle_command_error(
    db: &DatabaseConnection,
    command: &str,
    user_id: &str,
    error: &Error,
) -> String {
    if !matches!(error, Error::NotAuthenticated) {
        error!("Error in command `{}`: {:?}", command, error);
        if let Err(e) = error_log::record(db, command, user_id, error).await {
            error!("Failed to write error log: {}", e);
        }
    }
    reply_for_error(error)
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            let user_id = ctx.author().id.to_string();
            let content =
                handle_command_error(&ctx.data().database, &ctx.command().name, &user_id, &error)
                    .await;

            let reply = poise::CreateReply::default()
                .content(content)
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                error!("Failed to send error message: {}", e);
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Connects to Discord and serves commands until `shutdown` resolves.
#[instrument(skip_all, fields(backend = ?data.backend()))]
pub async fn run_bot<F>(token: &str, data: BotData, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::for_backend(data.backend()),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("/".into()),
                ..Default::default()
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(data)
            })
        })
        .build();

    // Message content is needed for the `/command` text form in DMs and guilds
    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {:?}", e))?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        shutdown.await;
        warn!("Shutting down Discord client");
        shard_manager.shutdown_all().await;
    });

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {:?}", e))?;
    Ok(())
}
