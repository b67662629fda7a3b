//! Block headers, receipts and logs as handed over by the block pipeline

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::primitives::{Address, Hash};
use crate::validator::{Bitmap, ValidatorSetDelta};

/// Checkpoint section of a header's extra data
#[derive(
    Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct CheckpointData {
    /// Consensus round the block was finalized in
    pub block_round: u64,
    /// Epoch the block belongs to
    pub epoch_number: u64,
    /// Exit-event root the proposer committed to
    pub event_root: Hash,
}

/// Aggregated signature of the validators that finalized a block
#[derive(
    Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct CommittedSeal {
    /// Signer positions within the block's active validator set
    pub bitmap: Bitmap,
    pub aggregated_signature: Vec<u8>,
}

/// Consensus-specific header payload
#[derive(
    Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct ExtraData {
    pub checkpoint: CheckpointData,
    pub committed: Option<CommittedSeal>,
    /// Present only on epoch-ending blocks
    pub validators: Option<ValidatorSetDelta>,
}

/// A finalized sidechain block header
#[derive(
    Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Header {
    pub number: u64,
    pub parent_hash: Hash,
    pub extra: ExtraData,
    /// Filled by `compute_hash`
    pub hash: Hash,
}

impl Header {
    pub fn new(number: u64, parent_hash: Hash, extra: ExtraData) -> Self {
        let mut header = Self {
            number,
            parent_hash,
            extra,
            hash: Hash::ZERO,
        };
        header.compute_hash();
        header
    }

    /// Recompute and store the header hash (every field except `hash`)
    pub fn compute_hash(&mut self) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.number.to_be_bytes());
        hasher.update(self.parent_hash.as_ref());
        let extra = borsh::to_vec(&self.extra).expect("ExtraData serialization should not fail");
        hasher.update(&extra);

        self.hash = Hash(*hasher.finalize().as_bytes());
        self.hash
    }

    /// Epoch recorded in the header's checkpoint data
    pub fn epoch(&self) -> u64 {
        self.extra.checkpoint.epoch_number
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum ReceiptStatus {
    Failed,
    Success,
}

/// A single event log emitted by a contract
#[derive(
    Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Log {
    /// Emitting contract
    pub address: Address,
    pub topics: Vec<Hash>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Receipt {
    pub status: ReceiptStatus,
    pub logs: Vec<Log>,
}

impl Receipt {
    pub fn success(logs: Vec<Log>) -> Self {
        Self {
            status: ReceiptStatus::Success,
            logs,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_hash_covers_extra() {
        let mut extra = ExtraData::default();
        extra.checkpoint.epoch_number = 3;
        let a = Header::new(10, Hash::ZERO, extra.clone());

        extra.checkpoint.epoch_number = 4;
        let b = Header::new(10, Hash::ZERO, extra);

        assert_ne!(a.hash, b.hash);
        assert_eq!(a.epoch(), 3);

        let mut again = a.clone();
        assert_eq!(again.compute_hash(), a.hash);
    }
}
