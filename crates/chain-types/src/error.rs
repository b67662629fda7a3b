//! Errors raised while decoding or combining chain types

use thiserror::Error;

use crate::primitives::Hash;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("Invalid length for {kind}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Exit id topic {0} does not fit in 64 bits")]
    ExitIdOverflow(Hash),

    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    #[error("Log has {actual} topics, {event} requires {expected}")]
    TopicCount {
        event: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Removed bit {index} is out of range for a validator set of size {len}")]
    RemovedIndexOutOfRange { index: usize, len: usize },

    #[error("Updated validator {0} is not part of the validator set")]
    UpdatedValidatorMissing(String),

    #[error("Added validator {0} is already part of the validator set")]
    AddedValidatorExists(String),
}
