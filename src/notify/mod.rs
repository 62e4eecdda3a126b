pub mod format;
pub mod webhook;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::NotifyError;

/// Outbound sink for finished notification text.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post(&self, content: &str) -> Result<(), NotifyError>;
}

/// Writes notifications to the process log. Used when no webhook is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn post(&self, content: &str) -> Result<(), NotifyError> {
        tracing::info!(target: "notification", "{}", content);
        Ok(())
    }
}

/// Fire-and-forget delivery: a failure is logged and never retried.
pub fn dispatch(notifier: &Arc<dyn Notifier>, content: String) {
    let notifier = notifier.clone();
    tokio::spawn(async move {
        deliver(notifier.as_ref(), &content).await;
    });
}

/// Deliver and wait, logging any failure. For status messages that must go
/// out before the process exits.
pub async fn deliver(notifier: &dyn Notifier, content: &str) {
    if let Err(e) = notifier.post(content).await {
        tracing::warn!(error = %e, "Notification delivery failed");
    }
}
