use alloy::primitives::B256;
use std::time::Duration;

/// Connection-level failure. Fatal to the current connection generation;
/// the supervisor reacts by tearing everything down and reconnecting.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("subscription request failed: {0}")]
    Subscribe(String),

    #[error("{0} stream closed by the node")]
    StreamClosed(&'static str),

    #[error("no events received for {0:?}")]
    Stalled(Duration),

    #[error("connecting and subscribing took longer than {0:?}")]
    ConnectTimeout(Duration),
}

/// A single log or transaction could not be turned into a transfer event.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("expected 3 topics, got {0}")]
    TopicCount(usize),

    #[error("topic {index} is not a left-padded address: {topic}")]
    MalformedTopic { index: usize, topic: B256 },

    #[error("expected a single 32-byte value word, got {0} bytes")]
    DataLength(usize),

    #[error("log has no transaction hash")]
    MissingTransactionHash,

    #[error("log has no block number")]
    MissingBlockNumber,
}

/// Fetching a block's transactions failed. That height's native transfers are lost.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("block {0} not found")]
    BlockNotFound(u64),

    #[error("failed to fetch block {height}: {reason}")]
    Fetch { height: u64, reason: String },
}

/// Delivery to the messaging sink failed. Logged, never retried.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("webhook returned {status}: {body}")]
    Status { status: u16, body: String },
}
