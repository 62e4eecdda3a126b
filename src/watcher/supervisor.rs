use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::connection::{ChainEvent, Connector};
use super::scanner::BlockScanner;
use super::subscriptions::SubscriptionRegistry;
use super::types::{ConnectionState, TransferEvent};
use crate::config::RestartMode;
use crate::error::TransportError;
use crate::notify::format::{self, MessageStyle};
use crate::notify::{self, Notifier};

#[derive(Debug, Clone, Copy)]
pub struct SupervisorSettings {
    pub restart_delay: Duration,
    pub restart_mode: RestartMode,
    /// A connection with no block or log for this long counts as lost.
    pub idle_timeout: Duration,
    /// Bound on `connect` plus every subscribe call.
    pub connect_timeout: Duration,
}

/// Owns the connection lifecycle.
///
/// Each generation opens one connection, declares every subscription from
/// scratch and processes events until a stream ends or goes quiet for
/// `idle_timeout`. Then the generation is
/// dropped, including any in-flight block scans, and a new one starts after
/// `restart_delay`. Blocks produced during the gap are not revisited.
pub struct Supervisor<C: Connector> {
    connector: C,
    registry: SubscriptionRegistry,
    scanner: BlockScanner,
    notifier: Arc<dyn Notifier>,
    style: Arc<MessageStyle>,
    settings: SupervisorSettings,
    state: watch::Sender<ConnectionState>,
}

impl<C: Connector> Supervisor<C> {
    pub fn new(
        connector: C,
        registry: SubscriptionRegistry,
        notifier: Arc<dyn Notifier>,
        style: MessageStyle,
        settings: SupervisorSettings,
    ) -> Self {
        let scanner = BlockScanner::new(*registry.watched());
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            connector,
            registry,
            scanner,
            notifier,
            style: Arc::new(style),
            settings,
            state,
        }
    }

    /// Observe state transitions. Only the supervisor writes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: ConnectionState) {
        tracing::debug!(state = %state, "Connection state changed");
        self.state.send_replace(state);
    }

    /// Run until `shutdown` fires. In [`RestartMode::Exit`] the first transport
    /// failure is returned after the restart delay instead.
    pub async fn run(&self, shutdown: &CancellationToken) -> Result<(), TransportError> {
        let watched = *self.registry.watched();
        tracing::info!(address = %watched, "Account watcher starting");
        notify::dispatch(&self.notifier, format::started(&watched));

        let mut generation = 0u64;
        let outcome = loop {
            generation += 1;
            self.set_state(ConnectionState::Connecting);

            let err = match self.run_generation(generation, shutdown).await {
                Ok(()) => break Ok(()),
                Err(e) => e,
            };

            self.set_state(ConnectionState::Disconnected);
            tracing::error!(
                generation,
                error = %err,
                delay_ms = self.settings.restart_delay.as_millis() as u64,
                "Connection lost, restarting"
            );
            notify::deliver(
                self.notifier.as_ref(),
                &format::reconnecting(&err.to_string(), self.settings.restart_delay),
            )
            .await;

            self.set_state(ConnectionState::Restarting);
            tokio::select! {
                _ = tokio::time::sleep(self.settings.restart_delay) => {}
                _ = shutdown.cancelled() => break Ok(()),
            }

            if self.settings.restart_mode == RestartMode::Exit {
                break Err(err);
            }
        };

        tracing::info!(address = %watched, generations = generation, "Account watcher stopped");
        notify::deliver(self.notifier.as_ref(), &format::stopped(&watched)).await;
        outcome
    }

    async fn run_generation(
        &self,
        generation: u64,
        shutdown: &CancellationToken,
    ) -> Result<(), TransportError> {
        let connect_timeout = self.settings.connect_timeout;
        let setup = tokio::time::timeout(connect_timeout, async {
            let conn = Arc::new(self.connector.connect().await?);
            let events = self.registry.subscribe(conn.as_ref()).await?;
            Ok::<_, TransportError>((conn, events))
        });

        let (conn, mut events) = tokio::select! {
            setup = setup => setup.map_err(|_| TransportError::ConnectTimeout(connect_timeout))??,
            _ = shutdown.cancelled() => return Ok(()),
        };
        self.set_state(ConnectionState::Live);
        tracing::info!(
            generation,
            filters = self.registry.filters().len(),
            "Subscriptions active"
        );

        let idle_timeout = self.settings.idle_timeout;
        let idle = tokio::time::sleep(idle_timeout);
        tokio::pin!(idle);

        let mut scans = JoinSet::new();
        loop {
            tokio::select! {
                event = events.next() => {
                    idle.as_mut().reset(Instant::now() + idle_timeout);
                    match event {
                        Some(ChainEvent::NewBlock(height)) => {
                            self.spawn_scan(&mut scans, conn.clone(), height);
                        }
                        Some(ChainEvent::Log { direction, log }) => {
                            if let Some(event) = self.registry.route(direction, &log) {
                                self.notify_transfer(&event);
                            }
                        }
                        Some(ChainEvent::Closed(kind)) => return Err(TransportError::StreamClosed(kind)),
                        None => return Err(TransportError::StreamClosed("event")),
                    }
                }
                _ = &mut idle => return Err(TransportError::Stalled(idle_timeout)),
                Some(joined) = scans.join_next(), if !scans.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Block scan task failed");
                    }
                }
                _ = shutdown.cancelled() => {
                    tracing::info!(generation, "Shutdown received, closing connection");
                    return Ok(());
                }
            }
        }
    }

    fn spawn_scan(
        &self,
        scans: &mut JoinSet<()>,
        conn: Arc<C::Connection>,
        height: u64,
    ) {
        let scanner = self.scanner.clone();
        let state = self.state.subscribe();
        let notifier = self.notifier.clone();
        let style = self.style.clone();
        let watched = *self.registry.watched();

        scans.spawn(async move {
            match scanner.on_new_block(conn.as_ref(), height, &state).await {
                Ok(events) => {
                    for event in &events {
                        log_event(event);
                        notify::dispatch(&notifier, format::transfer(event, &watched, &style));
                    }
                }
                Err(e) => {
                    tracing::warn!(block = height, error = %e, "Block scan failed, native transfers for this block skipped");
                }
            }
        });
    }

    fn notify_transfer(&self, event: &TransferEvent) {
        log_event(event);
        notify::dispatch(
            &self.notifier,
            format::transfer(event, self.registry.watched(), &self.style),
        );
    }
}

fn log_event(event: &TransferEvent) {
    tracing::info!(
        direction = %event.direction,
        asset = ?event.asset,
        amount = %event.amount.display(),
        block = event.block_number,
        tx = %event.tx_hash,
        "Transfer detected"
    );
}
