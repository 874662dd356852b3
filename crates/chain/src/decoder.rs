use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::Log;

use crate::abi::RoundFactory;

/// The round a successful `createRound` transaction produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRound {
    pub round_id: U256,
    pub round_address: Address,
    pub founder: Address,
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
}

/// Find the `RoundCreated` event among a receipt's logs.
///
/// Only logs emitted by `factory` are considered, so a round contract that
/// happens to emit an identically shaped event cannot be mistaken for it.
pub fn decode_round_created(
    logs: &[Log],
    factory: Address,
    transaction_hash: B256,
) -> Option<CreatedRound> {
    logs.iter()
        .filter(|log| log.address() == factory)
        .find_map(|log| {
            let decoded = log.log_decode::<RoundFactory::RoundCreated>().ok()?;
            let event = decoded.inner.data;
            Some(CreatedRound {
                round_id: event.roundId,
                round_address: event.roundAddress,
                founder: event.founder,
                transaction_hash,
                block_number: log.block_number,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::ERC20;
    use alloy::primitives::address;
    use alloy::sol_types::SolEvent;

    const FACTORY: Address = address!("1000000000000000000000000000000000000001");
    const ROUND: Address = address!("2000000000000000000000000000000000000002");
    const FOUNDER: Address = address!("3000000000000000000000000000000000000003");
    const TOKEN: Address = address!("4000000000000000000000000000000000000004");

    fn rpc_log(emitter: Address, data: alloy::primitives::LogData) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: emitter,
                data,
            },
            block_number: Some(42),
            ..Default::default()
        }
    }

    fn round_created(round_id: u64) -> alloy::primitives::LogData {
        RoundFactory::RoundCreated {
            roundId: U256::from(round_id),
            roundAddress: ROUND,
            founder: FOUNDER,
            fundingToken: TOKEN,
            targetAmount: U256::from(1_000u64),
        }
        .encode_log_data()
    }

    #[test]
    fn extracts_round_id_and_address() {
        let transfer = ERC20::Transfer {
            from: FOUNDER,
            to: ROUND,
            amount: U256::from(5u64),
        }
        .encode_log_data();
        let logs = vec![rpc_log(TOKEN, transfer), rpc_log(FACTORY, round_created(7))];

        let created = decode_round_created(&logs, FACTORY, B256::ZERO).expect("event present");
        assert_eq!(created.round_id, U256::from(7u64));
        assert_eq!(created.round_address, ROUND);
        assert_eq!(created.founder, FOUNDER);
        assert_eq!(created.block_number, Some(42));
    }

    #[test]
    fn ignores_events_from_other_emitters() {
        let logs = vec![rpc_log(ROUND, round_created(7))];
        assert!(decode_round_created(&logs, FACTORY, B256::ZERO).is_none());
    }

    #[test]
    fn missing_event_yields_none() {
        assert!(decode_round_created(&[], FACTORY, B256::ZERO).is_none());
    }
}
