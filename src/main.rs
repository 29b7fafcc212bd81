use okto_buddy::{
    bot::{self, BotData, OktoServices, Services},
    clients::{
        GoogleOAuth, OktoClient, PrivyClient, RaydiumClient, SolanaRpc, TokenDirectory,
    },
    config::{self, BackendSecrets, Secrets},
    core::chain::ChainServices,
    errors::Result,
    server::{self, AppState, DiscordNotifier},
};
use dotenvy::dotenv;
use poise::serenity_prelude as serenity;
use secrecy::ExposeSecret;
use std::{env, sync::Arc};
use tokio::{net::TcpListener, sync::watch};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal: env vars can be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Settings file plus secrets for the selected backend
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let settings = config::settings::load_settings(&config_path)?;
    let secrets = Secrets::from_env(settings.backend)
        .inspect_err(|e| error!("Missing secrets: {}", e))?;
    info!("Running with the {:?} backend", settings.backend);

    // 4. Database
    let database_url = config::database::get_database_url();
    config::database::ensure_parent_dir(&database_url)?;
    let db = config::database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    config::database::create_tables(&db).await?;
    info!("Database initialized successfully.");

    let http = settings.http.build_client()?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let on_shutdown = |mut rx: watch::Receiver<bool>| async move {
        let _ = rx.changed().await;
    };

    // 5. Backend services, plus the OAuth callback server for Okto
    let mut server_task = None;
    let services = match secrets.backend {
        BackendSecrets::Okto {
            api_key,
            google_client_id,
            google_client_secret,
        } => {
            let okto = OktoClient::new(http.clone(), &settings.okto.base_url, api_key);
            let google = GoogleOAuth::new(
                http.clone(),
                &settings.google,
                google_client_id,
                google_client_secret,
                settings.server.redirect_uri(),
            );

            let notifier = DiscordNotifier::new(Arc::new(serenity::Http::new(
                secrets.discord_token.expose_secret(),
            )));
            let state = AppState {
                db: db.clone(),
                okto: okto.clone(),
                google: google.clone(),
                notifier: Arc::new(notifier),
            };
            let listener = TcpListener::bind(&settings.server.bind_address)
                .await
                .inspect_err(|e| {
                    error!("Failed to bind {}: {}", settings.server.bind_address, e);
                })?;
            server_task = Some(tokio::spawn(server::serve(
                listener,
                state,
                on_shutdown(shutdown_rx.clone()),
            )));

            Services::Okto(OktoServices { okto, google })
        }
        BackendSecrets::Solana {
            privy_app_id,
            privy_app_secret,
        } => Services::Solana(ChainServices {
            rpc: SolanaRpc::new(http.clone(), &settings.solana.rpc_url),
            directory: TokenDirectory::new(http.clone(), &settings.solana.token_directory_url),
            raydium: RaydiumClient::new(http.clone(), &settings.solana),
            privy: PrivyClient::new(
                http,
                &settings.solana.privy_base_url,
                privy_app_id,
                privy_app_secret,
            ),
        }),
    };

    // 6. Ctrl-C / SIGTERM stop both tasks
    let signal_tx = Arc::clone(&shutdown_tx);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received");
        let _ = signal_tx.send(true);
    });

    // 7. Run the bot until shutdown
    let data = BotData::new(db.clone(), services);
    let bot_result = bot::run_bot(
        secrets.discord_token.expose_secret(),
        data,
        on_shutdown(shutdown_rx),
    )
    .await;

    // The bot may also stop on its own; take the callback server down with it
    let _ = shutdown_tx.send(true);
    if let Some(task) = server_task {
        match task.await {
            Ok(Err(e)) => error!("Callback server error: {}", e),
            Err(e) => error!("Callback server task failed: {}", e),
            Ok(Ok(())) => {}
        }
    }
    if let Err(e) = db.close().await {
        warn!("Failed to close database: {}", e);
    }
    info!("Shut down cleanly.");
    bot_result
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
