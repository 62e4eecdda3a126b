use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::Log;
use alloy::sol;

use super::types::{Amount, Asset, Direction, TransferEvent, TxSummary, WatchedAddress};
use crate::error::DecodeError;

// Generate the Transfer event ABI using alloy's sol! macro.
// This gives us Transfer::SIGNATURE_HASH for the default subscription topic.
sol! {
    event Transfer(address indexed from, address indexed to, uint256 value);
}

/// Decode a Transfer log into an event, with direction taken from the filter
/// that delivered it.
///
/// `decimals` is only known when the operator configured the token; the
/// event itself never carries it, so by default the raw base-unit amount is kept.
pub fn classify_log(
    log: &Log,
    direction: Direction,
    decimals: Option<u8>,
) -> Result<TransferEvent, DecodeError> {
    let (from, to) = decode_parties(log)?;

    let data = log.inner.data.data.as_ref();
    if data.len() != 32 {
        return Err(DecodeError::DataLength(data.len()));
    }
    let value = U256::from_be_slice(data);

    let tx_hash = log
        .transaction_hash
        .ok_or(DecodeError::MissingTransactionHash)?;
    let block_number = log.block_number.ok_or(DecodeError::MissingBlockNumber)?;

    let counterparty = match direction {
        Direction::Out => to,
        Direction::In => from,
    };

    Ok(TransferEvent {
        direction,
        counterparty: Some(counterparty),
        asset: Asset::Token(log.inner.address),
        amount: Amount {
            raw: value,
            decimals,
        },
        tx_hash,
        block_number,
    })
}

/// Extract `(from, to)` from topics 1 and 2.
pub fn decode_parties(log: &Log) -> Result<(Address, Address), DecodeError> {
    let topics = log.inner.data.topics();
    if topics.len() != 3 {
        return Err(DecodeError::TopicCount(topics.len()));
    }
    Ok((topic_address(topics, 1)?, topic_address(topics, 2)?))
}

fn topic_address(topics: &[B256], index: usize) -> Result<Address, DecodeError> {
    let topic = topics[index];
    if topic[..12].iter().any(|b| *b != 0) {
        return Err(DecodeError::MalformedTopic { index, topic });
    }
    Ok(Address::from_word(topic))
}

/// Check a block transaction against the watched address.
///
/// Direction is IN whenever `to` matches, so a self-transfer yields a single IN event.
pub fn classify_transaction(
    tx: &TxSummary,
    watched: &WatchedAddress,
    block_number: u64,
) -> Option<TransferEvent> {
    let to_matches = tx.to.is_some_and(|to| watched.matches(&to));
    let from_matches = watched.matches(&tx.from);

    let (direction, counterparty) = if to_matches {
        (Direction::In, Some(tx.from))
    } else if from_matches {
        (Direction::Out, tx.to)
    } else {
        return None;
    };

    Some(TransferEvent {
        direction,
        counterparty,
        asset: Asset::NativeCoin,
        amount: Amount::native(tx.value),
        tx_hash: tx.hash,
        block_number,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy::primitives::{address, b256, Bytes, Log as PrimitiveLog};
    use alloy::sol_types::SolEvent;

    pub const WATCHED: Address = address!("abc0000000000000000000000000000000000abc");
    pub const OTHER: Address = address!("1111111111111111111111111111111111111111");
    pub const TOKEN: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    pub const TX: B256 = b256!("00000000000000000000000000000000000000000000000000000000deadbeef");

    pub fn transfer_log(from: Address, to: Address, value: U256) -> Log {
        Log {
            inner: PrimitiveLog::new_unchecked(
                TOKEN,
                vec![Transfer::SIGNATURE_HASH, from.into_word(), to.into_word()],
                Bytes::from(value.to_be_bytes::<32>().to_vec()),
            ),
            block_number: Some(100),
            transaction_hash: Some(TX),
            ..Default::default()
        }
    }

    #[test]
    fn test_outbound_token_transfer() {
        let log = transfer_log(WATCHED, OTHER, U256::from(1_000_000u64));
        let event = classify_log(&log, Direction::Out, None).unwrap();

        assert_eq!(event.direction, Direction::Out);
        assert_eq!(event.counterparty, Some(OTHER));
        assert_eq!(event.asset, Asset::Token(TOKEN));
        assert_eq!(event.amount.raw, U256::from(1_000_000u64));
        assert_eq!(event.amount.display(), "1000000");
        assert_eq!(event.tx_hash, TX);
        assert_eq!(event.block_number, 100);
    }

    #[test]
    fn test_inbound_token_transfer_uses_sender() {
        let log = transfer_log(OTHER, WATCHED, U256::from(42u64));
        let event = classify_log(&log, Direction::In, Some(6)).unwrap();

        assert_eq!(event.direction, Direction::In);
        assert_eq!(event.counterparty, Some(OTHER));
        assert_eq!(event.amount.display(), "0.000042");
    }

    #[test]
    fn test_short_data_is_rejected() {
        let mut log = transfer_log(OTHER, WATCHED, U256::from(1u64));
        log.inner.data = alloy::primitives::LogData::new_unchecked(
            log.inner.data.topics().to_vec(),
            Bytes::from(vec![0x01, 0x02]),
        );
        assert_eq!(
            classify_log(&log, Direction::In, None),
            Err(DecodeError::DataLength(2))
        );
    }

    #[test]
    fn test_dirty_topic_padding_is_rejected() {
        let mut log = transfer_log(OTHER, WATCHED, U256::from(1u64));
        let mut topics = log.inner.data.topics().to_vec();
        topics[1].0[0] = 0xff;
        log.inner.data =
            alloy::primitives::LogData::new_unchecked(topics, log.inner.data.data.clone());

        assert!(matches!(
            classify_log(&log, Direction::In, None),
            Err(DecodeError::MalformedTopic { index: 1, .. })
        ));
    }

    #[test]
    fn test_missing_tx_hash_is_rejected() {
        let mut log = transfer_log(OTHER, WATCHED, U256::from(1u64));
        log.transaction_hash = None;
        assert_eq!(
            classify_log(&log, Direction::In, None),
            Err(DecodeError::MissingTransactionHash)
        );
    }

    #[test]
    fn test_native_inbound() {
        let tx = TxSummary {
            hash: TX,
            from: OTHER,
            to: Some(WATCHED),
            value: U256::from(1_500_000_000_000_000_000u128),
        };
        let event = classify_transaction(&tx, &WatchedAddress::new(WATCHED), 100).unwrap();

        assert_eq!(event.direction, Direction::In);
        assert_eq!(event.asset, Asset::NativeCoin);
        assert_eq!(event.counterparty, Some(OTHER));
        assert_eq!(event.amount.raw.to_string(), "1500000000000000000");
        assert_eq!(event.amount.display(), "1.5");
        assert_eq!(event.block_number, 100);
    }

    #[test]
    fn test_native_outbound_contract_creation() {
        let tx = TxSummary {
            hash: TX,
            from: WATCHED,
            to: None,
            value: U256::ZERO,
        };
        let event = classify_transaction(&tx, &WatchedAddress::new(WATCHED), 7).unwrap();
        assert_eq!(event.direction, Direction::Out);
        assert_eq!(event.counterparty, None);
    }

    #[test]
    fn test_native_self_transfer_is_inbound() {
        let tx = TxSummary {
            hash: TX,
            from: WATCHED,
            to: Some(WATCHED),
            value: U256::from(1u64),
        };
        let event = classify_transaction(&tx, &WatchedAddress::new(WATCHED), 7).unwrap();
        assert_eq!(event.direction, Direction::In);
    }

    #[test]
    fn test_unrelated_transaction_ignored() {
        let tx = TxSummary {
            hash: TX,
            from: OTHER,
            to: Some(TOKEN),
            value: U256::from(1u64),
        };
        assert!(classify_transaction(&tx, &WatchedAddress::new(WATCHED), 7).is_none());
    }
}
