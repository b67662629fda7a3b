//! Root-chain bridge - checkpoint submission and root-chain queries
//!
//! Handles communication with the root chain:
//! - Resolving validator signing keys from the stake manager contract
//! - Querying the highest submitted checkpoint and checkpoint coverage
//! - Submitting signed checkpoints
//!
//! Transport and contract ABI encoding live behind [`TxRelayer`]; calls
//! are expressed as borsh-encoded [`RootChainCall`] values.

pub mod committer;
pub mod contracts;
pub mod error;
pub mod registry;
pub mod relayer;

pub use committer::CheckpointCommitter;
pub use contracts::{
    Checkpoint, CheckpointBlockResponse, CheckpointMetadata, RootChainCall, SubmitCheckpoint,
    ValidatorInfo,
};
pub use error::BridgeError;
pub use registry::ValidatorRegistry;
pub use relayer::{RootReceipt, TxRelayer, TxSigner};
