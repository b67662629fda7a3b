//! Consensus core errors

use chain_types::{Address, TypesError};
use rootchain_bridge::BridgeError;
use state_store::StoreError;
use thiserror::Error;

use crate::merkle::MerkleError;

#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("Full validator set not in db")]
    MissingLedger,

    #[error("Could not retrieve validator data. Address: {address}. Error: {source}")]
    UnresolvableKey {
        address: Address,
        source: BridgeError,
    },

    #[error("Could not find any exit event that has an id {0}")]
    ExitEventNotFound(u64),

    #[error("Checkpoint block not found for exit ID {0}")]
    NotYetCheckpointed(u64),

    #[error("Block {0} not found")]
    NoBlock(u64),

    #[error("Failed to {context}: {source}")]
    Collaborator {
        context: String,
        source: anyhow::Error,
    },

    #[error("Invalid event log in block {block}: {source}")]
    InvalidLog { block: u64, source: TypesError },

    #[error("Block {0} has no committed seal to checkpoint")]
    MissingCommittedSeal(u64),

    #[error("Committed seal of block {block} failed verification: {source}")]
    InvalidSeal { block: u64, source: anyhow::Error },

    #[error("Invalid validator set delta in block {block}: {source}")]
    InvalidDelta { block: u64, source: TypesError },

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Merkle(#[from] MerkleError),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ConsensusError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::MissingLedger => ConsensusError::MissingLedger,
            StoreError::ExitEventNotFound(id) => ConsensusError::ExitEventNotFound(id),
            other => ConsensusError::Store(other),
        }
    }
}

impl ConsensusError {
    pub(crate) fn collaborator(context: impl Into<String>, source: anyhow::Error) -> Self {
        ConsensusError::Collaborator {
            context: context.into(),
            source,
        }
    }
}
