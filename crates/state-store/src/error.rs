//! State store errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Full validator set not in db")]
    MissingLedger,

    #[error("Could not find any exit event that has an id {0}")]
    ExitEventNotFound(u64),

    #[error("Corrupt entry in tree {tree}: {reason}")]
    Corrupt { tree: &'static str, reason: String },

    #[error("Database error: {0}")]
    Db(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Codec(#[from] bincode::Error),
}

impl From<sled::transaction::TransactionError<()>> for StoreError {
    fn from(e: sled::transaction::TransactionError<()>) -> Self {
        match e {
            sled::transaction::TransactionError::Storage(e) => StoreError::Db(e),
            sled::transaction::TransactionError::Abort(()) => StoreError::Corrupt {
                tree: "transaction",
                reason: "aborted".to_string(),
            },
        }
    }
}
