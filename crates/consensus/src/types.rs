//! Core types for the consensus hooks

use chain_types::{AccountSet, Address, Header, Receipt};
use serde::{Deserialize, Serialize};

/// Default maximum number of active validators
pub const DEFAULT_MAX_VALIDATOR_SET_SIZE: usize = 100;

/// Input of the finalized-block hook
#[derive(Debug, Clone)]
pub struct PostBlockRequest {
    /// The finalized block
    pub header: Header,
    /// Receipts of the block's transactions
    pub receipts: Vec<Receipt>,
    /// Epoch the block belongs to
    pub epoch: u64,
    /// Whether this is the last block of `epoch`
    pub is_epoch_ending_block: bool,
}

/// Input of the new-epoch hook
#[derive(Debug, Clone)]
pub struct PostEpochRequest {
    pub new_epoch_id: u64,
    /// Active validator set of the new epoch
    pub validator_set: AccountSet,
}

/// Configuration for the sidechain consensus core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Blocks between interval checkpoints; 0 checkpoints epoch ends only
    pub checkpoint_interval: u64,
    /// Whether this node submits checkpoints to the root chain
    pub submit_checkpoints: bool,
    /// Maximum number of active validators
    pub max_validator_set_size: usize,
    /// Sidechain contract emitting stake `Transfer` events
    pub stake_contract: Address,
    /// Sidechain contract emitting bridge exit events
    pub exit_contract: Address,
    /// Root-chain stake manager (validator registry)
    pub root_stake_manager: Address,
    /// Root-chain checkpoint manager
    pub root_checkpoint_manager: Address,
}

impl ConsensusConfig {
    /// Whether block `number` must be checkpointed
    pub fn is_checkpoint_block(&self, number: u64, is_epoch_ending: bool) -> bool {
        is_epoch_ending || (self.checkpoint_interval > 0 && number % self.checkpoint_interval == 0)
    }
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: 900,
            submit_checkpoints: true,
            max_validator_set_size: DEFAULT_MAX_VALIDATOR_SET_SIZE,
            stake_contract: Address::new([0x10; 20]),
            exit_contract: Address::new([0x11; 20]),
            root_stake_manager: Address::ZERO,
            root_checkpoint_manager: Address::ZERO,
        }
    }
}
