use std::time::Duration;

use crate::watcher::types::{Asset, Direction, TransferEvent, WatchedAddress};

/// Presentation settings for notification text.
#[derive(Debug, Clone)]
pub struct MessageStyle {
    pub explorer_tx_url: String,
    pub native_symbol: String,
    pub token_symbol: Option<String>,
}

impl Default for MessageStyle {
    fn default() -> Self {
        Self {
            explorer_tx_url: "https://etherscan.io/tx/".to_string(),
            native_symbol: "ETH".to_string(),
            token_symbol: None,
        }
    }
}

pub fn transfer(event: &TransferEvent, watched: &WatchedAddress, style: &MessageStyle) -> String {
    let counterparty = event
        .counterparty
        .map(|a| a.to_string())
        .unwrap_or_else(|| "contract".to_string());
    let tx_line = format!("• Tx:     {}{}", style.explorer_tx_url, event.tx_hash);

    let (party_label, you_first) = match event.direction {
        Direction::In => ("From:  ", false),
        Direction::Out => ("To:    ", true),
    };
    let you = format!("• You:    {}", watched);
    let other = format!("• {} {}", party_label, counterparty);
    let (first, second) = if you_first { (you, other) } else { (other, you) };

    let mut lines = Vec::with_capacity(6);
    match event.asset {
        Asset::NativeCoin => {
            lines.push(match event.direction {
                Direction::In => format!("📥 **{} RECEIVED**", style.native_symbol),
                Direction::Out => format!("📤 **{} SENT**", style.native_symbol),
            });
            lines.push(first);
            lines.push(second);
            lines.push(format!(
                "• Amount: {} {}",
                event.amount.display(),
                style.native_symbol
            ));
        }
        Asset::Token(contract) => {
            lines.push(match event.direction {
                Direction::In => "📥 **INCOMING ERC-20**".to_string(),
                Direction::Out => "📤 **OUTGOING ERC-20**".to_string(),
            });
            lines.push(first);
            lines.push(second);
            lines.push(match &style.token_symbol {
                Some(symbol) => format!("• Token:  {} ({})", symbol, contract),
                None => format!("• Token:  {}", contract),
            });
            let unit = if event.amount.decimals.is_some() {
                ""
            } else {
                " (base units)"
            };
            lines.push(format!("• Value:  {}{}", event.amount.display(), unit));
        }
    }
    lines.push(tx_line);

    lines.join("\n")
}

pub fn started(watched: &WatchedAddress) -> String {
    format!("✅ **Watcher Started (ETH + ERC-20)**\nWatching: {}", watched)
}

pub fn reconnecting(reason: &str, delay: Duration) -> String {
    format!(
        "⚠️ **Connection Lost**\n{}\nReconnecting in {} ms",
        reason,
        delay.as_millis()
    )
}

pub fn stopped(watched: &WatchedAddress) -> String {
    format!("🛑 **Watcher Stopped**\nWatched: {}", watched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::classifier::tests::{OTHER, TOKEN, TX, WATCHED};
    use crate::watcher::types::Amount;
    use alloy::primitives::U256;

    fn event(direction: Direction, asset: Asset, amount: Amount) -> TransferEvent {
        TransferEvent {
            direction,
            counterparty: Some(OTHER),
            asset,
            amount,
            tx_hash: TX,
            block_number: 100,
        }
    }

    #[test]
    fn test_native_received_message() {
        let e = event(
            Direction::In,
            Asset::NativeCoin,
            Amount::native(U256::from(1_500_000_000_000_000_000u128)),
        );
        let msg = transfer(&e, &WatchedAddress::new(WATCHED), &MessageStyle::default());

        assert!(msg.starts_with("📥 **ETH RECEIVED**"));
        assert!(msg.contains("• Amount: 1.5 ETH"));
        assert!(msg.contains(&format!("From:   {}", OTHER)));
        assert!(msg.contains(&format!("https://etherscan.io/tx/{}", TX)));
    }

    #[test]
    fn test_outgoing_token_message_shows_raw_units() {
        let e = event(
            Direction::Out,
            Asset::Token(TOKEN),
            Amount::raw(U256::from(1_000_000u64)),
        );
        let msg = transfer(&e, &WatchedAddress::new(WATCHED), &MessageStyle::default());

        assert!(msg.starts_with("📤 **OUTGOING ERC-20**"));
        assert!(msg.contains("• Value:  1000000 (base units)"));
        let you = msg.find("You:").unwrap();
        let to = msg.find("To:").unwrap();
        assert!(you < to);
    }

    #[test]
    fn test_contract_creation_counterparty() {
        let mut e = event(Direction::Out, Asset::NativeCoin, Amount::native(U256::ZERO));
        e.counterparty = None;
        let msg = transfer(&e, &WatchedAddress::new(WATCHED), &MessageStyle::default());
        assert!(msg.contains("contract"));
        assert!(msg.starts_with("📤 **ETH SENT**"));
    }

    #[test]
    fn test_status_messages_name_the_address() {
        let watched = WatchedAddress::new(WATCHED);
        assert!(started(&watched).contains(&watched.to_string()));
        assert!(stopped(&watched).contains(&watched.to_string()));
        assert!(reconnecting("block stream closed", Duration::from_secs(1)).contains("1000 ms"));
    }
}
