//! Bridge exit events, bucketed by epoch and ordered by id
//!
//! Layout:
//! - `exit_events`: `epoch ‖ id` (big-endian) -> bincode `ExitEvent`
//! - `exit_event_ids`: `id` -> `epoch`
//! - `exit_meta`: last block whose exit events were saved

use chain_types::ExitEvent;
use sled::transaction::TransactionResult;
use sled::Transactional;

use crate::error::StoreError;

pub const EXIT_EVENTS_TREE: &str = "exit_events";
pub const EXIT_EVENT_IDS_TREE: &str = "exit_event_ids";
pub const EXIT_META_TREE: &str = "exit_meta";

const LAST_SAVED_KEY: &[u8] = b"last_saved_block";

fn event_key(epoch: u64, id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(16);
    key.extend_from_slice(&epoch.to_be_bytes());
    key.extend_from_slice(&id.to_be_bytes());
    key
}

fn decode_u64(tree: &'static str, bytes: &[u8]) -> Result<u64, StoreError> {
    let arr: [u8; 8] = bytes.try_into().map_err(|_| StoreError::Corrupt {
        tree,
        reason: format!("expected 8 bytes, got {}", bytes.len()),
    })?;
    Ok(u64::from_be_bytes(arr))
}

/// Typed access to the exit-event trees
#[derive(Clone)]
pub struct ExitEventStore {
    events: sled::Tree,
    ids: sled::Tree,
    meta: sled::Tree,
}

impl ExitEventStore {
    pub(crate) fn new(events: sled::Tree, ids: sled::Tree, meta: sled::Tree) -> Self {
        Self { events, ids, meta }
    }

    /// Persist one block's exit events and advance the last-saved marker.
    ///
    /// Runs as a single transaction over all three trees.
    pub fn insert_exit_events(
        &self,
        exit_events: &[ExitEvent],
        last_saved_block: u64,
    ) -> Result<(), StoreError> {
        let mut encoded = Vec::with_capacity(exit_events.len());
        for event in exit_events {
            encoded.push((
                event_key(event.epoch, event.id),
                event.id.to_be_bytes().to_vec(),
                event.epoch.to_be_bytes().to_vec(),
                bincode::serialize(event)?,
            ));
        }
        let last_saved = last_saved_block.to_be_bytes().to_vec();

        let result: TransactionResult<(), ()> =
            (&self.events, &self.ids, &self.meta).transaction(|(events, ids, meta)| {
                for (key, id, epoch, value) in &encoded {
                    events.insert(key.clone(), value.clone())?;
                    ids.insert(id.clone(), epoch.clone())?;
                }
                meta.insert(LAST_SAVED_KEY, last_saved.clone())?;
                Ok(())
            });
        result?;

        tracing::debug!(
            "Saved {} exit events, last saved block {}",
            exit_events.len(),
            last_saved_block
        );

        Ok(())
    }

    /// Exit events of `epoch` accepted by `filter`, ordered by id
    pub fn get_exit_events<F>(&self, epoch: u64, filter: F) -> Result<Vec<ExitEvent>, StoreError>
    where
        F: Fn(&ExitEvent) -> bool,
    {
        let mut events = Vec::new();

        for result in self.events.scan_prefix(epoch.to_be_bytes()) {
            let (_, value) = result?;
            let event: ExitEvent = bincode::deserialize(&value)?;
            if filter(&event) {
                events.push(event);
            }
        }

        Ok(events)
    }

    /// All exit events of `epoch`, ordered by id
    pub fn get_exit_events_for_epoch(&self, epoch: u64) -> Result<Vec<ExitEvent>, StoreError> {
        self.get_exit_events(epoch, |_| true)
    }

    /// Look up a single exit event by id
    pub fn get_exit_event(&self, id: u64) -> Result<ExitEvent, StoreError> {
        let epoch = match self.ids.get(id.to_be_bytes())? {
            Some(bytes) => decode_u64(EXIT_EVENT_IDS_TREE, &bytes)?,
            None => return Err(StoreError::ExitEventNotFound(id)),
        };

        match self.events.get(event_key(epoch, id))? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Err(StoreError::ExitEventNotFound(id)),
        }
    }

    /// Last block whose exit events were saved, 0 if none
    pub fn get_last_saved(&self) -> Result<u64, StoreError> {
        match self.meta.get(LAST_SAVED_KEY)? {
            Some(bytes) => decode_u64(EXIT_META_TREE, &bytes),
            None => Ok(0),
        }
    }

    pub fn update_last_saved(&self, block: u64) -> Result<(), StoreError> {
        self.meta.insert(LAST_SAVED_KEY, block.to_be_bytes().to_vec())?;
        Ok(())
    }

    /// Every stored exit event, ordered by (epoch, id)
    pub fn all_exit_events(&self) -> Result<Vec<ExitEvent>, StoreError> {
        let mut events = Vec::with_capacity(self.events.len());
        for result in self.events.iter() {
            let (_, value) = result?;
            events.push(bincode::deserialize(&value)?);
        }
        Ok(events)
    }
}
