//! Typed contract events from finalized blocks
//!
//! Used by both managers: stake transfers for the ledger, bridge exits for
//! the exit store.

use std::marker::PhantomData;
use std::sync::Arc;

use chain_types::{Address, Header, LogEvent, Receipt};

use crate::backend::Blockchain;
use crate::error::ConsensusError;

/// Collects events of type `T` emitted by one contract
pub struct EventsGetter<T: LogEvent> {
    blockchain: Arc<dyn Blockchain>,
    contract: Address,
    _event: PhantomData<fn() -> T>,
}

impl<T: LogEvent> EventsGetter<T> {
    pub fn new(blockchain: Arc<dyn Blockchain>, contract: Address) -> Self {
        Self {
            blockchain,
            contract,
            _event: PhantomData,
        }
    }

    /// Events of `T` in successful receipts, in log order
    pub fn events_from_receipts(
        &self,
        block: u64,
        receipts: &[Receipt],
    ) -> Result<Vec<T>, ConsensusError> {
        let mut events = Vec::new();

        for receipt in receipts.iter().filter(|r| r.is_success()) {
            for log in receipt.logs.iter().filter(|l| l.address == self.contract) {
                if let Some(event) = T::parse_log(log)
                    .map_err(|source| ConsensusError::InvalidLog { block, source })?
                {
                    events.push(event);
                }
            }
        }

        Ok(events)
    }

    /// Header of a finalized block, `NoBlock` if the chain does not have it
    pub fn header(&self, number: u64) -> Result<Header, ConsensusError> {
        self.blockchain
            .header_by_number(number)
            .ok_or(ConsensusError::NoBlock(number))
    }

    /// Receipts of a finalized block
    pub fn receipts(&self, header: &Header) -> Result<Vec<Receipt>, ConsensusError> {
        self.blockchain
            .receipts_by_hash(&header.hash)
            .map_err(|source| {
                ConsensusError::collaborator(
                    format!("get receipts of block {}", header.number),
                    source,
                )
            })
    }

    /// Events of every block after `last_processed` up to and including
    /// `header`, in block order.
    ///
    /// Blocks strictly between the two are fetched from the chain; the
    /// current block's receipts are passed in.
    pub fn events_from_blocks(
        &self,
        last_processed: u64,
        header: &Header,
        receipts: &[Receipt],
    ) -> Result<Vec<T>, ConsensusError> {
        let mut events = Vec::new();

        for number in last_processed + 1..header.number {
            let missed = self.header(number)?;
            let missed_receipts = self.receipts(&missed)?;
            events.extend(self.events_from_receipts(number, &missed_receipts)?);
        }

        events.extend(self.events_from_receipts(header.number, receipts)?);

        Ok(events)
    }
}
