/// Database configuration and connection management
pub mod database;

/// Settings file and environment secrets
pub mod settings;

pub use settings::{Backend, BackendSecrets, Secrets, Settings};
