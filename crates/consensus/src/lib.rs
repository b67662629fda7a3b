//! Sidechain consensus core - validator set lifecycle and root-chain checkpoints
//!
//! Architecture:
//! - The stake manager folds stake transfer events into the validator ledger
//!   once per finalized block and derives the validator set delta at epoch
//!   boundaries
//! - The checkpoint manager captures bridge exit events (backfilling missed
//!   blocks), commits to them with a Merkle root, submits due checkpoints to
//!   the root chain and serves exit proofs
//! - Both are driven through the [`ValidatorSetHooks`] the consensus engine
//!   calls, strictly once per block and in block order

pub mod backend;
pub mod checkpoint_manager;
pub mod error;
pub mod events_getter;
pub mod hooks;
pub mod merkle;
pub mod stake_manager;
pub mod types;

#[cfg(test)]
mod tests;

pub use backend::{Blockchain, ConsensusBackend, SignatureVerifier};
pub use checkpoint_manager::{build_exit_proof, event_root, CheckpointManager, ExitProof};
pub use error::ConsensusError;
pub use hooks::{Collaborators, DummyHooks, SidechainCore, SidechainCoreBuilder, ValidatorSetHooks};
pub use merkle::{verify_proof, MerkleError, MerkleTree};
pub use stake_manager::StakeManager;
pub use types::{ConsensusConfig, PostBlockRequest, PostEpochRequest};
