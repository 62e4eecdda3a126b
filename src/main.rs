use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use account_watcher::config::Config;
use account_watcher::notify::webhook::WebhookNotifier;
use account_watcher::notify::{LogNotifier, Notifier};
use account_watcher::watcher::connection::WsConnector;
use account_watcher::watcher::subscriptions::SubscriptionRegistry;
use account_watcher::watcher::supervisor::{Supervisor, SupervisorSettings};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Initialize structured logging (set RUST_LOG=info for output)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path)?;
    let watched = config.watched_address()?;
    let token = config.token_scope()?;
    tracing::info!(
        address = %watched,
        token = ?token.as_ref().map(|t| t.address),
        "Configuration loaded from {}",
        config_path
    );

    let notifier: Arc<dyn Notifier> = match &config.notifier.webhook_url {
        Some(url) => Arc::new(
            WebhookNotifier::new(
                url.clone(),
                Duration::from_secs(config.notifier.timeout_secs),
            )
            .map_err(|e| eyre::eyre!("Failed to build webhook client: {}", e))?,
        ),
        None => {
            tracing::warn!("No webhook configured, notifications go to the log only");
            Arc::new(LogNotifier)
        }
    };

    let registry = SubscriptionRegistry::register_filters(watched, token);
    let supervisor = Supervisor::new(
        WsConnector::new(config.node.ws_url.clone()),
        registry,
        notifier,
        config.message_style(),
        SupervisorSettings {
            restart_delay: config.restart_delay(),
            restart_mode: config.supervisor.restart_mode,
            idle_timeout: config.idle_timeout(),
            connect_timeout: config.connect_timeout(),
        },
    );

    // Create shutdown signal
    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                return;
            }
            tracing::info!("Shutdown signal received, stopping watcher...");
            shutdown.cancel();
        });
    }

    // In exit mode a lost connection ends the process non-zero for an external relaunch.
    supervisor
        .run(&shutdown)
        .await
        .map_err(|e| eyre::eyre!("Transport failed, exiting for restart: {}", e))?;

    tracing::info!("Account watcher stopped gracefully");
    Ok(())
}
