//! Persistence layer for the validator ledger and bridge exit events
//!
//! Uses the sled embedded database. Every record is written either as a
//! single atomic insert (the ledger) or inside one multi-tree transaction
//! per block (exit events), so concurrent readers only ever observe a
//! consistent snapshot.

pub mod error;
pub mod exit_events;
pub mod stake;

use std::path::Path;

use sled::Db;

pub use error::StoreError;
pub use exit_events::ExitEventStore;
pub use stake::{FullValidatorSet, StakeStore, ValidatorStakeMap};

/// Handle over the node's sled database and its typed stores
#[derive(Clone)]
pub struct StateStore {
    db: Db,
    stake: StakeStore,
    exit_events: ExitEventStore,
}

impl StateStore {
    /// Open or create a state store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(&path)?;
        let store = Self::from_db(db)?;

        tracing::info!("Opened state store at {:?}", path.as_ref());

        Ok(store)
    }

    /// Throwaway store that is removed when dropped
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self, StoreError> {
        let stake = StakeStore::new(db.open_tree(stake::VALIDATOR_SET_TREE)?);
        let exit_events = ExitEventStore::new(
            db.open_tree(exit_events::EXIT_EVENTS_TREE)?,
            db.open_tree(exit_events::EXIT_EVENT_IDS_TREE)?,
            db.open_tree(exit_events::EXIT_META_TREE)?,
        );

        Ok(Self {
            db,
            stake,
            exit_events,
        })
    }

    pub fn stake(&self) -> &StakeStore {
        &self.stake
    }

    pub fn exit_events(&self) -> &ExitEventStore {
        &self.exit_events
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}
