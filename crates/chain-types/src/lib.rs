//! Shared types for the sidechain validator set and root-chain checkpoints
//!
//! This crate holds the data model every other crate agrees on:
//! - Fixed-width identifiers (`Address`, `Hash`) and opaque signing keys
//! - Validator metadata, ordered account sets and the positional delta
//! - Block headers, receipts and logs as delivered by the block pipeline
//! - Log-event codecs for stake transfers and bridge exits

pub mod block;
pub mod error;
pub mod events;
pub mod primitives;
pub mod validator;

pub use block::{CheckpointData, CommittedSeal, ExtraData, Header, Log, Receipt, ReceiptStatus};
pub use error::TypesError;
pub use events::{ExitEvent, LogEvent, TransferEvent, EXIT_EVENT_SIG, TRANSFER_EVENT_SIG};
pub use primitives::{Address, BlsPublicKey, Hash};
pub use validator::{AccountSet, Bitmap, ValidatorMetadata, ValidatorSetDelta};

/// Re-exported so downstream crates share one big-integer type for voting power
pub use num_bigint::BigUint;
