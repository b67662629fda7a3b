//! Log-event codecs for stake transfers and bridge exits
//!
//! Log layouts:
//! - Transfer: `topics = [sig, from, to]`, `data = value` (big-endian)
//! - Exit: `topics = [sig, id, sender, receiver]`, `data = payload`

use borsh::{BorshDeserialize, BorshSerialize};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::block::Log;
use crate::error::TypesError;
use crate::primitives::{Address, Hash};

/// Canonical name of the stake transfer event
pub const TRANSFER_EVENT_SIG: &str = "Transfer(address,address,uint256)";

/// Canonical name of the bridge exit event
pub const EXIT_EVENT_SIG: &str = "L2StateSynced(uint256,address,address,bytes)";

/// A typed event that can be recognised in a contract log
pub trait LogEvent: Sized {
    /// Canonical event name; its digest is the first topic
    const SIGNATURE: &'static str;

    /// First topic of every log carrying this event
    fn topic() -> Hash {
        Hash::digest(Self::SIGNATURE.as_bytes())
    }

    /// `Ok(None)` when the log is some other event
    fn parse_log(log: &Log) -> Result<Option<Self>, TypesError>;
}

fn check_topics(log: &Log, event: &'static str, expected: usize) -> Result<(), TypesError> {
    if log.topics.len() != expected {
        return Err(TypesError::TopicCount {
            event,
            expected,
            actual: log.topics.len(),
        });
    }
    Ok(())
}

/// Transfer on the validator-stake contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub from: Address,
    pub to: Address,
    pub value: BigUint,
}

impl TransferEvent {
    /// Mint to a validator
    pub fn is_stake(&self) -> bool {
        self.from.is_zero()
    }

    /// Burn from a validator
    pub fn is_unstake(&self) -> bool {
        self.to.is_zero()
    }

    pub fn to_log(&self, contract: Address) -> Log {
        Log {
            address: contract,
            topics: vec![Self::topic(), self.from.to_topic(), self.to.to_topic()],
            data: self.value.to_bytes_be(),
        }
    }
}

impl LogEvent for TransferEvent {
    const SIGNATURE: &'static str = TRANSFER_EVENT_SIG;

    fn parse_log(log: &Log) -> Result<Option<Self>, TypesError> {
        if log.topics.first() != Some(&Self::topic()) {
            return Ok(None);
        }
        check_topics(log, "Transfer", 3)?;

        Ok(Some(Self {
            from: Address::from_topic(&log.topics[1]),
            to: Address::from_topic(&log.topics[2]),
            value: BigUint::from_bytes_be(&log.data),
        }))
    }
}

/// A cross-chain withdrawal request captured from a finalized block.
///
/// Immutable once stored; `id` order is the Merkle leaf order within an epoch.
#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct ExitEvent {
    pub id: u64,
    pub epoch: u64,
    pub block_number: u64,
    pub sender: Address,
    pub receiver: Address,
    pub data: Vec<u8>,
}

impl ExitEvent {
    /// Canonical leaf encoding
    pub fn encode(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("ExitEvent serialization should not fail")
    }

    /// Attribute a parsed event to its storage bucket
    pub fn with_position(mut self, epoch: u64, block_number: u64) -> Self {
        self.epoch = epoch;
        self.block_number = block_number;
        self
    }

    pub fn to_log(&self, contract: Address) -> Log {
        Log {
            address: contract,
            topics: vec![
                Self::topic(),
                Hash::from_u64(self.id),
                self.sender.to_topic(),
                self.receiver.to_topic(),
            ],
            data: self.data.clone(),
        }
    }
}

impl LogEvent for ExitEvent {
    const SIGNATURE: &'static str = EXIT_EVENT_SIG;

    /// Epoch and block are left at zero; the exit store assigns them.
    fn parse_log(log: &Log) -> Result<Option<Self>, TypesError> {
        if log.topics.first() != Some(&Self::topic()) {
            return Ok(None);
        }
        check_topics(log, "L2StateSynced", 4)?;

        let id = log.topics[1]
            .to_u64()
            .ok_or(TypesError::ExitIdOverflow(log.topics[1]))?;

        Ok(Some(Self {
            id,
            epoch: 0,
            block_number: 0,
            sender: Address::from_topic(&log.topics[2]),
            receiver: Address::from_topic(&log.topics[3]),
            data: log.data.clone(),
        }))
    }
}
