//! Decoding of root chain logs.

use alloy::{
    primitives::{Address, U256},
    rpc::types::Log,
    sol_types::SolEvent,
};
use plasma_primitives::types::{BlockNumber, Slot};

use crate::{
    contract::RootChain,
    errors::{RootChainError, RootChainResult},
};

/// An event emitted by the root chain contract that the operator reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootChainEvent {
    /// A coin entered the child chain.
    Deposit {
        /// The new coin.
        slot: Slot,

        /// The child chain block dictated for the deposit.
        block_number: BlockNumber,

        /// The depositor, who owns the coin.
        from: Address,
    },

    /// An owner started withdrawing a coin.
    StartedExit {
        /// The exiting coin.
        slot: Slot,

        /// Who started the exit.
        owner: Address,
    },

    /// An exit was cancelled by a successful challenge.
    CoinReset {
        /// The coin that is back on the child chain.
        slot: Slot,

        /// Its owner.
        owner: Address,
    },

    /// An exit went through and the coin left the child chain.
    FinalizedExit {
        /// The withdrawn coin.
        slot: Slot,

        /// Who received it.
        owner: Address,
    },

    /// An exit was challenged.
    ChallengedExit {
        /// The challenged coin.
        slot: Slot,
    },

    /// The exiting owner answered a challenge.
    RespondedExitChallenge {
        /// The coin whose exit was defended.
        slot: Slot,
    },
}

impl RootChainEvent {
    /// The coin the event is about.
    pub const fn slot(&self) -> Slot {
        match self {
            Self::Deposit { slot, .. }
            | Self::StartedExit { slot, .. }
            | Self::CoinReset { slot, .. }
            | Self::FinalizedExit { slot, .. }
            | Self::ChallengedExit { slot }
            | Self::RespondedExitChallenge { slot } => *slot,
        }
    }

    /// Decodes a log of the root chain contract.
    ///
    /// Logs of events the operator does not react to decode to [`None`].
    pub fn from_log(log: &Log) -> RootChainResult<Option<Self>> {
        let Some(topic) = log.topic0().copied() else {
            return Ok(None);
        };

        let event = if topic == RootChain::Deposit::SIGNATURE_HASH {
            let event = decode::<RootChain::Deposit>(log)?;
            Self::Deposit {
                slot: event.slot,
                block_number: to_block_number(event.blockNumber)?,
                from: event.from,
            }
        } else if topic == RootChain::StartedExit::SIGNATURE_HASH {
            let event = decode::<RootChain::StartedExit>(log)?;
            Self::StartedExit {
                slot: event.slot,
                owner: event.owner,
            }
        } else if topic == RootChain::CoinReset::SIGNATURE_HASH {
            let event = decode::<RootChain::CoinReset>(log)?;
            Self::CoinReset {
                slot: event.slot,
                owner: event.owner,
            }
        } else if topic == RootChain::FinalizedExit::SIGNATURE_HASH {
            let event = decode::<RootChain::FinalizedExit>(log)?;
            Self::FinalizedExit {
                slot: event.slot,
                owner: event.owner,
            }
        } else if topic == RootChain::ChallengedExit::SIGNATURE_HASH {
            let event = decode::<RootChain::ChallengedExit>(log)?;
            Self::ChallengedExit { slot: event.slot }
        } else if topic == RootChain::RespondedExitChallenge::SIGNATURE_HASH {
            let event = decode::<RootChain::RespondedExitChallenge>(log)?;
            Self::RespondedExitChallenge { slot: event.slot }
        } else {
            return Ok(None);
        };

        Ok(Some(event))
    }
}

fn decode<E: SolEvent>(log: &Log) -> RootChainResult<E> {
    log.log_decode::<E>()
        .map(|decoded| decoded.inner.data)
        .map_err(|e| RootChainError::Decode(e.to_string()))
}

/// Narrows a contract integer to a child chain block number.
pub(crate) fn to_block_number(value: U256) -> RootChainResult<BlockNumber> {
    BlockNumber::try_from(value)
        .map_err(|_| RootChainError::Decode(format!("block number {value} overflows u64")))
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{self, B256};

    use super::*;

    fn to_log(event: &impl SolEvent) -> Log {
        Log {
            inner: primitives::Log {
                address: Address::repeat_byte(0xcc),
                data: event.encode_log_data(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn deposit_log_decodes() {
        let log = to_log(&RootChain::Deposit {
            slot: 7,
            blockNumber: U256::from(3),
            from: Address::repeat_byte(1),
        });

        assert_eq!(
            RootChainEvent::from_log(&log).unwrap(),
            Some(RootChainEvent::Deposit {
                slot: 7,
                block_number: 3,
                from: Address::repeat_byte(1),
            })
        );
    }

    #[test]
    fn exit_logs_decode() {
        let log = to_log(&RootChain::StartedExit {
            slot: 9,
            owner: Address::repeat_byte(2),
        });
        let event = RootChainEvent::from_log(&log).unwrap().unwrap();
        assert_eq!(event.slot(), 9);
        assert!(matches!(event, RootChainEvent::StartedExit { .. }));

        let log = to_log(&RootChain::RespondedExitChallenge { slot: 4 });
        assert_eq!(
            RootChainEvent::from_log(&log).unwrap(),
            Some(RootChainEvent::RespondedExitChallenge { slot: 4 })
        );
    }

    #[test]
    fn unrelated_logs_are_skipped() {
        let log = to_log(&RootChain::SubmittedBlock {
            blockNumber: U256::from(1000),
            root: B256::ZERO,
            timestamp: U256::ZERO,
        });
        assert_eq!(RootChainEvent::from_log(&log).unwrap(), None);

        assert_eq!(RootChainEvent::from_log(&Log::default()).unwrap(), None);
    }

    #[test]
    fn oversized_block_numbers_are_rejected() {
        let log = to_log(&RootChain::Deposit {
            slot: 1,
            blockNumber: U256::MAX,
            from: Address::ZERO,
        });

        assert!(RootChainEvent::from_log(&log).is_err());
    }
}
