//! Typed root-chain contract calls and their responses
//!
//! ABI encoding is the relayer's concern; inside this workspace every call
//! input and view output is the borsh encoding of the types below.

use borsh::{BorshDeserialize, BorshSerialize};
use chain_types::{AccountSet, Address, Bitmap, Hash};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// A function on one of the root-chain contracts
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum RootChainCall {
    /// Stake manager: validator registration info
    GetValidator { validator: Address },
    /// Checkpoint manager: highest checkpointed sidechain block
    CurrentCheckpointBlockNumber,
    /// Checkpoint manager: checkpoint block covering `block_number`
    GetCheckpointBlock { block_number: u64 },
    /// Checkpoint manager: submit a signed checkpoint
    SubmitCheckpoint(SubmitCheckpoint),
}

impl RootChainCall {
    pub fn name(&self) -> &'static str {
        match self {
            RootChainCall::GetValidator { .. } => "getValidator",
            RootChainCall::CurrentCheckpointBlockNumber => "currentCheckpointBlockNumber",
            RootChainCall::GetCheckpointBlock { .. } => "getCheckpointBlock",
            RootChainCall::SubmitCheckpoint(_) => "submit",
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("RootChainCall serialization should not fail")
    }

    pub fn decode(data: &[u8]) -> Result<Self, borsh::io::Error> {
        borsh::from_slice(data)
    }
}

/// Decode a view-function output
pub(crate) fn decode_output<T: BorshDeserialize>(
    function: &'static str,
    output: &[u8],
) -> Result<T, BridgeError> {
    borsh::from_slice(output).map_err(|source| BridgeError::Decode { function, source })
}

/// Output of `getValidator`
#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ValidatorInfo {
    /// Empty when the validator never registered
    pub bls_key: Vec<u8>,
    /// Big-endian stake on the root chain
    pub stake: Vec<u8>,
    pub is_whitelisted: bool,
    pub is_active: bool,
}

/// Output of `getCheckpointBlock`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CheckpointBlockResponse {
    pub is_found: bool,
    pub checkpoint_block: u64,
}

/// Checkpoint body: which block, which epoch, which exit events
#[derive(
    Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Checkpoint {
    pub epoch: u64,
    pub block_number: u64,
    pub event_root: Hash,
}

/// Block identity the checkpoint is anchored to
#[derive(
    Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct CheckpointMetadata {
    pub block_hash: Hash,
    pub block_round: u64,
    pub current_validator_set_hash: Hash,
}

/// Input of the checkpoint manager's `submit` function
#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SubmitCheckpoint {
    pub metadata: CheckpointMetadata,
    pub checkpoint: Checkpoint,
    /// Aggregated signature from the block's committed seal
    pub signature: Vec<u8>,
    /// Empty unless the block ends an epoch
    pub new_validator_set: AccountSet,
    /// Signer positions within the current validator set
    pub bitmap: Bitmap,
}

impl SubmitCheckpoint {
    /// Digest the validators sign for this checkpoint
    pub fn signing_hash(&self) -> Hash {
        let mut bytes = borsh::to_vec(&self.metadata).expect("metadata serialization should not fail");
        bytes.extend(borsh::to_vec(&self.checkpoint).expect("checkpoint serialization should not fail"));
        Hash::digest(&bytes)
    }
}
