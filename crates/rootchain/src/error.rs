//! Root-chain bridge errors

use chain_types::Address;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to invoke {function} function on the rootchain: {source}")]
    Call {
        function: &'static str,
        source: anyhow::Error,
    },

    #[error("Failed to send {function} transaction to the rootchain: {source}")]
    Send {
        function: &'static str,
        source: anyhow::Error,
    },

    #[error("Unable to decode {function} response: {source}")]
    Decode {
        function: &'static str,
        source: borsh::io::Error,
    },

    #[error("Validator {0} has no registered signing key on the rootchain")]
    UnregisteredValidator(Address),

    #[error("Checkpoint submission transaction failed for block {0}")]
    SubmissionFailed(u64),
}
