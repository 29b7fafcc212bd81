//! Unified error type for the bot, the callback server and the API clients.

use thiserror::Error;

/// Every failure the crate can surface.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// sea-orm / sqlx failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Transport-level failure talking to an external service
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body that was not the JSON we expected
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem or socket failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The user has no session or no auth token yet
    #[error("User is not authenticated.")]
    NotAuthenticated,

    /// The custodial wallet API rejected the stored token
    #[error("Session expired. Please login again using /login")]
    SessionExpired,

    /// The OAuth callback referenced a user that never started a login
    #[error("No session found for Discord user {discord_id}")]
    SessionNotFound {
        /// `state` value received in the callback
        discord_id: String,
    },

    /// Non-success answer from an external API
    #[error("{service} error: {message}")]
    Upstream {
        /// Which service answered
        service: &'static str,
        /// Message extracted from the response body
        message: String,
    },

    /// A response was missing a field we need
    #[error("{service} response is missing `{field}`")]
    MissingField {
        /// Which service answered
        service: &'static str,
        /// JSON pointer or field name
        field: String,
    },

    /// The wallet has no token account for a mint it tries to spend
    #[error("Your wallet does not hold any {mint}")]
    NoTokenAccount {
        /// Mint address
        mint: String,
    },

    /// A string that is not a base58 Solana public key
    #[error("Invalid Solana address: {address}")]
    InvalidAddress {
        /// The rejected input
        address: String,
    },

    /// A Solana transaction could not be assembled or serialized
    #[error("Failed to build transaction: {message}")]
    Transaction {
        /// What went wrong
        message: String,
    },

    /// Amounts must be finite and positive
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Serenity / Poise framework error
    #[error("Serenity/Poise framework error: {0}")]
    #[allow(clippy::enum_variant_names)]
    FrameworkError(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::FrameworkError(Box::new(value))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
