use alloy::primitives::{hex, Address, B256, U256};
use std::fmt;
use std::str::FromStr;

/// Decimal exponent of the chain's native coin.
pub const NATIVE_DECIMALS: u8 = 18;

/// The single account this process reports on, normalized to lower case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchedAddress(Address);

impl WatchedAddress {
    pub fn new(address: Address) -> Self {
        Self(address)
    }

    pub fn parse(s: &str) -> eyre::Result<Self> {
        let lower = s.trim().to_lowercase();
        let address = Address::from_str(&lower)
            .map_err(|e| eyre::eyre!("Invalid watched address '{}': {}", s, e))?;
        Ok(Self(address))
    }

    pub fn address(&self) -> Address {
        self.0
    }

    /// The address as it appears in an indexed event topic.
    pub fn topic(&self) -> B256 {
        self.0.into_word()
    }

    pub fn matches(&self, other: &Address) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for WatchedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_prefixed(self.0.as_slice()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "IN",
            Direction::Out => "OUT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Asset {
    NativeCoin,
    /// Identified by the emitting contract's address.
    Token(Address),
}

/// A base-unit amount plus the exponent needed to show it to a human, if known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amount {
    pub raw: U256,
    pub decimals: Option<u8>,
}

impl Amount {
    pub fn native(raw: U256) -> Self {
        Self {
            raw,
            decimals: Some(NATIVE_DECIMALS),
        }
    }

    pub fn raw(raw: U256) -> Self {
        Self {
            raw,
            decimals: None,
        }
    }

    /// Scaled display string, e.g. `1.5` for 1.5e18 wei. Falls back to the raw
    /// base-unit integer when decimals are unknown.
    pub fn display(&self) -> String {
        let decimals = match self.decimals {
            Some(d) if d > 0 => d,
            _ => return self.raw.to_string(),
        };

        let base = U256::from(10u64).pow(U256::from(decimals));
        let whole = self.raw / base;
        let frac = (self.raw % base).to_string();
        let frac = format!("{:0>width$}", frac, width = decimals as usize);
        let frac = frac.trim_end_matches('0');

        if frac.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, frac)
        }
    }
}

/// A classified value movement touching the watched address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub direction: Direction,
    /// The other party. `None` only for an outbound contract creation.
    pub counterparty: Option<Address>,
    pub asset: Asset,
    pub amount: Amount,
    pub tx_hash: B256,
    pub block_number: u64,
}

/// The transaction fields the block scanner looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxSummary {
    pub hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
}

/// Lifecycle of the node connection, owned by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Live,
    Disconnected,
    Restarting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Live => "live",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Restarting => "restarting",
        };
        f.write_str(s)
    }
}
