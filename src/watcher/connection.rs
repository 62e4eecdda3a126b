use alloy::consensus::Transaction as ConsensusTx;
use alloy::network::TransactionResponse;
use alloy::providers::{DynProvider, Provider, ProviderBuilder, WsConnect};
use alloy::rpc::types::{BlockNumberOrTag, Log};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;

use super::subscriptions::SubscriptionFilter;
use super::types::{Direction, TxSummary};
use crate::error::{ScanError, TransportError};

/// One notification from a live connection, in arrival order.
#[derive(Debug, Clone)]
pub enum ChainEvent {
    NewBlock(u64),
    Log { direction: Direction, log: Log },
    /// The named stream ended; the connection is gone.
    Closed(&'static str),
}

/// A live connection to a node. Transport only: it reports a dropped
/// connection by ending its streams and never reconnects on its own.
#[async_trait]
pub trait ChainConnection: Send + Sync {
    /// Stream of new block heights.
    async fn subscribe_blocks(&self) -> Result<BoxStream<'static, u64>, TransportError>;

    /// Stream of logs matching one filter.
    async fn subscribe_logs(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<BoxStream<'static, Log>, TransportError>;

    /// Fetch a block with full transaction bodies.
    async fn block_transactions(&self, height: u64) -> Result<Vec<TxSummary>, ScanError>;
}

/// Opens fresh connections, once per supervisor generation.
#[async_trait]
pub trait Connector: Send + Sync {
    type Connection: ChainConnection + 'static;

    async fn connect(&self) -> Result<Self::Connection, TransportError>;
}

/// Connects to a node over WebSocket JSON-RPC.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Connection = WsChainConnection;

    async fn connect(&self) -> Result<WsChainConnection, TransportError> {
        // No client-side reconnect: the supervisor owns that.
        let ws = WsConnect::new(self.url.clone()).with_max_retries(0);
        let provider = ProviderBuilder::new()
            .connect_ws(ws)
            .await
            .map_err(|e| TransportError::Connect {
                endpoint: self.url.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(endpoint = %self.url, "WebSocket connected");

        Ok(WsChainConnection {
            provider: provider.erased(),
        })
    }
}

pub struct WsChainConnection {
    provider: DynProvider,
}

#[async_trait]
impl ChainConnection for WsChainConnection {
    async fn subscribe_blocks(&self) -> Result<BoxStream<'static, u64>, TransportError> {
        let sub = self
            .provider
            .subscribe_blocks()
            .await
            .map_err(|e| TransportError::Subscribe(e.to_string()))?;

        Ok(sub.into_stream().map(|header| header.number).boxed())
    }

    async fn subscribe_logs(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<BoxStream<'static, Log>, TransportError> {
        let sub = self
            .provider
            .subscribe_logs(&filter.to_rpc_filter())
            .await
            .map_err(|e| TransportError::Subscribe(e.to_string()))?;

        Ok(sub.into_stream().boxed())
    }

    async fn block_transactions(&self, height: u64) -> Result<Vec<TxSummary>, ScanError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(height))
            .full()
            .await
            .map_err(|e| ScanError::Fetch {
                height,
                reason: e.to_string(),
            })?
            .ok_or(ScanError::BlockNotFound(height))?;

        let txs = block
            .transactions
            .txns()
            .map(|tx| TxSummary {
                hash: TransactionResponse::tx_hash(tx),
                from: TransactionResponse::from(tx),
                to: ConsensusTx::to(tx),
                value: ConsensusTx::value(tx),
            })
            .collect();

        Ok(txs)
    }
}
