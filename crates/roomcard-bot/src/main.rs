//! Room card bot binary.
//!
//! This is the main entry point that wires together the ingress server,
//! the reflector loop, and the Discord publisher. It loads configuration,
//! restores the card message identity from disk, and runs until Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `roomcard-config.yaml` and the environment
//! 3. Create the shared pending-update state
//! 4. Create the Discord REST client
//! 5. Create the reflector and load the persisted message identity
//! 6. Bind the ingress listener
//! 7. Run the ingress server and the reflector until shutdown

mod error;

use std::sync::Arc;

use roomcard_core::{BotConfig, FileIdentityStore, Reflector, ReflectorState};
use roomcard_discord::DiscordClient;
use roomcard_ingress::{IngressState, ServerConfig};
use tokio::sync::watch;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::error::BotError;

/// Application entry point for the room card bot.
///
/// # Errors
///
/// Returns an error if any initialization step fails or the ingress
/// server stops with an error.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("roomcard-bot starting");

    run().await?;

    info!("roomcard-bot shutdown complete");
    Ok(())
}

async fn run() -> Result<(), BotError> {
    // 2. Load configuration.
    let config = BotConfig::load()?;
    info!(
        channel_id = %config.channel_id,
        host = %config.host,
        port = config.port,
        update_interval_secs = config.update_interval.as_secs(),
        tick_interval_secs = config.tick_interval.as_secs(),
        message_id_path = %config.message_id_path.display(),
        publish_on_ingress = config.publish_on_ingress,
        "Configuration loaded"
    );

    // 3. Shared pending-update state.
    let state = Arc::new(ReflectorState::new(config.update_interval));

    // 4. Discord REST client.
    let publisher = DiscordClient::new(
        config.discord_api_url.as_str(),
        config.discord_token.as_str(),
        config.channel_id.as_str(),
    )?;
    info!(api_url = %config.discord_api_url, "Discord client ready");

    // 5. Reflector with persisted identity.
    let store = FileIdentityStore::new(config.message_id_path.clone());
    let mut reflector = Reflector::new(
        Arc::clone(&state),
        publisher,
        store,
        config.card_template(),
        config.tick_interval,
    );
    reflector.bootstrap().await;

    // 6. Bind the ingress listener before spawning anything.
    let listener = roomcard_ingress::bind(&ServerConfig {
        host: config.host.clone(),
        port: config.port,
    })
    .await?;
    let ingress_state = Arc::new(
        IngressState::new(Arc::clone(&state), config.api_key.as_str())
            .with_publish_on_ingress(config.publish_on_ingress),
    );

    // 7. Run both tasks until Ctrl-C (or until the server dies).
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut server = tokio::spawn(roomcard_ingress::serve(
        listener,
        ingress_state,
        wait_for_shutdown(shutdown_rx.clone()),
    ));
    let reflector_task = tokio::spawn(async move {
        reflector.run_until(wait_for_shutdown(shutdown_rx)).await;
    });

    let early_exit = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Shutdown signal received"),
                Err(e) => error!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
            }
            None
        }
        joined = &mut server => {
            error!("Ingress server exited unexpectedly");
            Some(joined)
        }
    };

    if shutdown_tx.send(true).is_err() {
        debug!("All shutdown receivers already gone");
    }

    let server_result = match early_exit {
        Some(joined) => joined,
        None => server.await,
    };

    reflector_task.await.map_err(|e| BotError::Task {
        message: format!("reflector task: {e}"),
    })?;

    server_result.map_err(|e| BotError::Task {
        message: format!("ingress task: {e}"),
    })??;

    Ok(())
}

/// Resolve once shutdown has been signalled (or the sender is gone).
async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
