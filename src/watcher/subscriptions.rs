use alloy::primitives::{Address, B256};
use alloy::rpc::types::{Filter, Log};
use alloy::sol_types::SolEvent;
use futures::stream::{self, BoxStream};
use futures::StreamExt;

use super::classifier::{self, Transfer};
use super::connection::{ChainConnection, ChainEvent};
use super::types::{Direction, TransferEvent, WatchedAddress};
use crate::error::TransportError;

/// Narrows both filters to a single token contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenScope {
    pub address: Address,
    pub event_signature: B256,
    pub decimals: Option<u8>,
}

/// One `eth_subscribe("logs")` filter and the direction it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionFilter {
    pub event_signature: B256,
    /// The watched address as a 32-byte topic.
    pub address_topic: B256,
    pub direction: Direction,
    pub token: Option<Address>,
}

impl SubscriptionFilter {
    /// Topic position holding the watched address: 1 (`from`) for OUT, 2 (`to`) for IN.
    pub fn slot(&self) -> usize {
        match self.direction {
            Direction::Out => 1,
            Direction::In => 2,
        }
    }

    pub fn to_rpc_filter(&self) -> Filter {
        let filter = Filter::new().event_signature(self.event_signature);
        let filter = match self.direction {
            Direction::Out => filter.topic1(self.address_topic),
            Direction::In => filter.topic2(self.address_topic),
        };
        match self.token {
            Some(token) => filter.address(token),
            None => filter,
        }
    }
}

/// The filter → classifier routing table for one watched address.
#[derive(Debug, Clone)]
pub struct SubscriptionRegistry {
    watched: WatchedAddress,
    token: Option<TokenScope>,
    filters: Vec<SubscriptionFilter>,
}

impl SubscriptionRegistry {
    /// Build the outbound (topic1) and inbound (topic2) Transfer filters.
    pub fn register_filters(watched: WatchedAddress, token: Option<TokenScope>) -> Self {
        let event_signature = token
            .as_ref()
            .map(|t| t.event_signature)
            .unwrap_or(Transfer::SIGNATURE_HASH);
        let contract = token.as_ref().map(|t| t.address);

        let filters = [Direction::Out, Direction::In]
            .into_iter()
            .map(|direction| SubscriptionFilter {
                event_signature,
                address_topic: watched.topic(),
                direction,
                token: contract,
            })
            .collect();

        Self {
            watched,
            token,
            filters,
        }
    }

    pub fn watched(&self) -> &WatchedAddress {
        &self.watched
    }

    pub fn filters(&self) -> &[SubscriptionFilter] {
        &self.filters
    }

    /// Issue every subscription on `conn` and merge them into one event stream.
    ///
    /// Each underlying stream is followed by a [`ChainEvent::Closed`] marker, so
    /// the merged stream reports the first stream to end.
    pub async fn subscribe<C: ChainConnection + ?Sized>(
        &self,
        conn: &C,
    ) -> Result<BoxStream<'static, ChainEvent>, TransportError> {
        let mut streams = Vec::with_capacity(self.filters.len() + 1);

        let blocks = conn.subscribe_blocks().await?;
        streams.push(
            blocks
                .map(ChainEvent::NewBlock)
                .chain(stream::once(async { ChainEvent::Closed("block") }))
                .boxed(),
        );

        for filter in &self.filters {
            let direction = filter.direction;
            let logs = conn.subscribe_logs(filter).await?;
            streams.push(
                logs.map(move |log| ChainEvent::Log { direction, log })
                    .chain(stream::once(async { ChainEvent::Closed("log") }))
                    .boxed(),
            );
            tracing::debug!(direction = %direction, slot = filter.slot(), "Log subscription registered");
        }

        Ok(stream::select_all(streams).boxed())
    }

    /// Classify a log delivered by the filter for `direction`.
    ///
    /// Returns `None` for logs that are removed, malformed, out of scope, or owned
    /// by the other filter. A self-transfer is owned by the IN filter.
    pub fn route(&self, direction: Direction, log: &Log) -> Option<TransferEvent> {
        let tx = log.transaction_hash.unwrap_or_default();

        if log.removed {
            tracing::debug!(tx = %tx, "Skipping log removed by reorg");
            return None;
        }

        if let Some(token) = &self.token {
            if log.inner.address != token.address {
                tracing::debug!(tx = %tx, contract = %log.inner.address, "Log from unwatched contract");
                return None;
            }
        }

        let (from, to) = match classifier::decode_parties(log) {
            Ok(parties) => parties,
            Err(e) => {
                tracing::warn!(tx = %tx, direction = %direction, error = %e, "Dropping malformed transfer log");
                return None;
            }
        };

        let owns = match direction {
            Direction::Out => self.watched.matches(&from) && !self.watched.matches(&to),
            Direction::In => self.watched.matches(&to),
        };
        if !owns {
            tracing::debug!(tx = %tx, direction = %direction, "Log not owned by this filter");
            return None;
        }

        let decimals = self.token.as_ref().and_then(|t| t.decimals);
        match classifier::classify_log(log, direction, decimals) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(tx = %tx, direction = %direction, error = %e, "Dropping malformed transfer log");
                None
            }
        }
    }
}
