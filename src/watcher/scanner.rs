use tokio::sync::watch;

use super::classifier;
use super::connection::ChainConnection;
use super::types::{ConnectionState, TransferEvent, TxSummary, WatchedAddress};
use crate::error::ScanError;

/// Scans each new block for native-coin transfers touching the watched address.
///
/// Holds no mutable state, so overlapping scans of consecutive blocks are fine.
#[derive(Debug, Clone)]
pub struct BlockScanner {
    watched: WatchedAddress,
}

impl BlockScanner {
    pub fn new(watched: WatchedAddress) -> Self {
        Self { watched }
    }

    /// Fetch `height` with full transactions and classify them.
    ///
    /// Nothing is classified if the connection stopped being live while the
    /// block was in flight.
    pub async fn on_new_block<C: ChainConnection + ?Sized>(
        &self,
        conn: &C,
        height: u64,
        state: &watch::Receiver<ConnectionState>,
    ) -> Result<Vec<TransferEvent>, ScanError> {
        let txs = conn.block_transactions(height).await?;

        let live = *state.borrow() == ConnectionState::Live;
        if !live {
            tracing::debug!(block = height, "Connection no longer live, discarding block");
            return Ok(Vec::new());
        }

        let events = self.scan(height, &txs);
        tracing::debug!(
            block = height,
            txs = txs.len(),
            matches = events.len(),
            "Scanned block"
        );
        Ok(events)
    }

    pub fn scan(&self, height: u64, txs: &[TxSummary]) -> Vec<TransferEvent> {
        txs.iter()
            .filter_map(|tx| classifier::classify_transaction(tx, &self.watched, height))
            .collect()
    }
}
