//! Application settings from `config.toml` plus secrets from the environment.
//!
//! The settings file is optional: every field has a default pointing at the
//! public endpoints of each service. Secrets never live in the file, they are
//! read from the environment (usually populated from `.env`).

use crate::errors::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Which command set the bot serves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Okto custodial wallet REST API behind Google OAuth
    #[default]
    Okto,
    /// Privy-managed Solana wallets with Raydium swaps
    Solana,
}

/// Top-level structure of `config.toml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Active backend
    pub backend: Backend,
    /// OAuth callback server
    pub server: ServerSettings,
    /// Outbound HTTP behaviour
    pub http: HttpSettings,
    /// Okto REST API
    pub okto: OktoSettings,
    /// Google OAuth endpoints
    pub google: GoogleSettings,
    /// Solana backend endpoints and swap parameters
    pub solana: SolanaSettings,
}

/// OAuth callback server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address the callback server binds to
    pub bind_address: String,
    /// Externally reachable base URL, used to build the OAuth redirect URI
    pub public_url: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            public_url: "http://localhost:3000".to_string(),
        }
    }
}

impl ServerSettings {
    /// Path of the Google OAuth callback route
    pub const CALLBACK_PATH: &'static str = "/auth/google/callback";

    /// Redirect URI registered with Google
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!(
            "{}{}",
            self.public_url.trim_end_matches('/'),
            Self::CALLBACK_PATH
        )
    }
}

/// `[http]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Per-request timeout for every external API
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl HttpSettings {
    /// Builds the shared `reqwest` client
    pub fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(Into::into)
    }
}

/// `[okto]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OktoSettings {
    /// API root, sandbox by default
    pub base_url: String,
}

impl Default for OktoSettings {
    fn default() -> Self {
        Self {
            base_url: "https://sandbox-api.okto.tech".to_string(),
        }
    }
}

/// `[google]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// Consent screen endpoint
    pub auth_url: String,
    /// Code exchange endpoint
    pub token_url: String,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

/// `[solana]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolanaSettings {
    /// JSON-RPC node
    pub rpc_url: String,
    /// Token metadata lookup, queried as `{token_directory_url}/{mint}`
    pub token_directory_url: String,
    /// Raydium trade API host
    pub raydium_swap_host: String,
    /// Privy REST API base
    pub privy_base_url: String,
    /// Swap slippage in basis points
    pub slippage_bps: u32,
    /// Priority fee passed to Raydium when building swap transactions
    pub compute_unit_price_micro_lamports: u64,
}

impl Default for SolanaSettings {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            token_directory_url: "https://tokens.jup.ag/token".to_string(),
            raydium_swap_host: "https://transaction-v1.raydium.io".to_string(),
            privy_base_url: "https://api.privy.io".to_string(),
            slippage_bps: 50,
            compute_unit_price_micro_lamports: 100_000,
        }
    }
}

/// Parses settings from TOML text.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads settings from `path`, or defaults when the file does not exist.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    if !path.exists() {
        info!("No settings file at {:?}, using defaults", path);
        return Ok(Settings::default());
    }
    debug!("Loading settings from {:?}", path);
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path:?}: {e}"),
    })?;
    parse_settings(&contents)
}

/// Credentials needed by the active backend
pub enum BackendSecrets {
    /// `OKTO_API_KEY`, `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`
    Okto {
        /// Okto application key
        api_key: SecretString,
        /// Google OAuth client ID
        google_client_id: String,
        /// Google OAuth client secret
        google_client_secret: SecretString,
    },
    /// `PRIVY_APP_ID`, `PRIVY_APP_SECRET`
    Solana {
        /// Privy application ID
        privy_app_id: String,
        /// Privy application secret
        privy_app_secret: SecretString,
    },
}

/// All secrets the process needs
pub struct Secrets {
    /// Discord bot token
    pub discord_token: SecretString,
    /// Credentials of the active backend
    pub backend: BackendSecrets,
}

impl Secrets {
    /// Reads secrets from the process environment.
    pub fn from_env(backend: Backend) -> Result<Self> {
        Self::from_lookup(backend, |name| std::env::var(name).ok())
    }

    /// Reads secrets through `lookup`, requiring only what `backend` uses.
    pub fn from_lookup<F>(backend: Backend, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| Error::Config {
                    message: format!("{name} must be set"),
                })
        };

        let discord_token = SecretString::from(required("DISCORD_BOT_TOKEN")?);
        let backend = match backend {
            Backend::Okto => BackendSecrets::Okto {
                api_key: SecretString::from(required("OKTO_CLIENT_API_KEY")?),
                google_client_id: required("GOOGLE_CLIENT_ID")?,
                google_client_secret: SecretString::from(required("GOOGLE_CLIENT_SECRET")?),
            },
            Backend::Solana => BackendSecrets::Solana {
                privy_app_id: required("PRIVY_APP_ID")?,
                privy_app_secret: SecretString::from(required("PRIVY_APP_SECRET")?),
            },
        };

        Ok(Self {
            discord_token,
            backend,
        })
    }
}
