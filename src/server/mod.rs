//! OAuth callback server.
//!
//! A small axum app running next to the Discord client in the Okto backend.
//! Google redirects the user here after consent; the handler finishes the
//! login and tells the user over DM.

/// Google OAuth redirect handler
pub mod callback;

/// Discord DM delivery
pub mod notify;

pub use notify::{DiscordNotifier, Notifier};

use crate::{
    clients::{GoogleOAuth, OktoClient},
    config::settings::ServerSettings,
    errors::Result,
};
use axum::{Router, routing::get};
use sea_orm::DatabaseConnection;
use std::{future::Future, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

/// State shared by the callback handlers
#[derive(Clone)]
pub struct AppState {
    /// Session store
    pub db: DatabaseConnection,
    /// Trades Google ID tokens for Okto sessions
    pub okto: OktoClient,
    /// Exchanges the authorization code
    pub google: GoogleOAuth,
    /// Tells the user the login finished
    pub notifier: Arc<dyn Notifier>,
}

/// Routes of the callback server.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(ServerSettings::CALLBACK_PATH, get(callback::google_callback))
        .with_state(state)
}

/// Serves the callback routes on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("OAuth callback server listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
