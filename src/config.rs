use alloy::primitives::{keccak256, Address};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use crate::notify::format::MessageStyle;
use crate::watcher::subscriptions::TokenScope;
use crate::watcher::types::WatchedAddress;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub watch: WatchConfig,
    pub node: NodeConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    pub token: Option<TokenConfig>,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WatchConfig {
    pub address: String,
    #[serde(default = "default_explorer_tx_url")]
    pub explorer_tx_url: String,
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
}

fn default_explorer_tx_url() -> String {
    "https://etherscan.io/tx/".to_string()
}

fn default_native_symbol() -> String {
    "ETH".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct NodeConfig {
    pub ws_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifierConfig {
    pub webhook_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 10,
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

// ============================================================
// Single-token narrowing
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    pub address: String,
    #[serde(default = "default_event_signature")]
    pub event_signature: String,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

fn default_event_signature() -> String {
    "Transfer(address,address,uint256)".to_string()
}

// ============================================================
// Supervisor
// ============================================================

/// What to do after the restart delay once the connection is lost.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RestartMode {
    /// Open a fresh connection inside this process.
    #[default]
    InProcess,
    /// Exit non-zero and let an external process supervisor relaunch us.
    Exit,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SupervisorConfig {
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,
    #[serde(default)]
    pub restart_mode: RestartMode,
    /// Restart if no block or log arrives for this long.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Bound on connecting plus issuing every subscription.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_delay_ms: 1000,
            restart_mode: RestartMode::InProcess,
            idle_timeout_secs: 60,
            connect_timeout_secs: 30,
        }
    }
}

fn default_restart_delay_ms() -> u64 {
    1000
}

fn default_idle_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> eyre::Result<()> {
        if !is_hex_address(&self.watch.address) {
            return Err(eyre::eyre!(
                "Invalid watched address '{}'",
                self.watch.address
            ));
        }
        if !(self.node.ws_url.starts_with("ws://") || self.node.ws_url.starts_with("wss://")) {
            return Err(eyre::eyre!(
                "Node URL '{}' must be a ws:// or wss:// endpoint",
                self.node.ws_url
            ));
        }
        if let Some(url) = &self.notifier.webhook_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(eyre::eyre!("Invalid webhook URL '{}'", url));
            }
        }
        if let Some(token) = &self.token {
            if !is_hex_address(&token.address) {
                return Err(eyre::eyre!("Invalid token address '{}'", token.address));
            }
            if token.event_signature.trim().is_empty() {
                return Err(eyre::eyre!("Token event signature must not be empty"));
            }
        }
        if self.supervisor.restart_delay_ms == 0 {
            return Err(eyre::eyre!("supervisor.restart_delay_ms must be at least 1"));
        }
        if self.supervisor.idle_timeout_secs == 0 || self.supervisor.connect_timeout_secs == 0 {
            return Err(eyre::eyre!(
                "supervisor.idle_timeout_secs and connect_timeout_secs must be at least 1"
            ));
        }
        Ok(())
    }

    pub fn watched_address(&self) -> eyre::Result<WatchedAddress> {
        WatchedAddress::parse(&self.watch.address)
    }

    pub fn token_scope(&self) -> eyre::Result<Option<TokenScope>> {
        let Some(token) = &self.token else {
            return Ok(None);
        };
        let address = Address::from_str(&token.address.to_lowercase())
            .map_err(|e| eyre::eyre!("Invalid token address '{}': {}", token.address, e))?;
        Ok(Some(TokenScope {
            address,
            event_signature: keccak256(token.event_signature.trim()),
            decimals: token.decimals,
        }))
    }

    pub fn message_style(&self) -> MessageStyle {
        MessageStyle {
            explorer_tx_url: self.watch.explorer_tx_url.clone(),
            native_symbol: self.watch.native_symbol.clone(),
            token_symbol: self.token.as_ref().and_then(|t| t.symbol.clone()),
        }
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.supervisor.restart_delay_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.supervisor.idle_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.supervisor.connect_timeout_secs)
    }
}

fn is_hex_address(s: &str) -> bool {
    s.starts_with("0x") && s.len() == 42 && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}
