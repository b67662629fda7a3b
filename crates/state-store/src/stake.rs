//! Validator ledger: the full, address-keyed validator set
//!
//! The ledger is persisted as one bincode record under a single key, so
//! every update is one atomic replace.

use std::collections::BTreeMap;

use chain_types::{AccountSet, Address, BigUint, ValidatorMetadata};
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Tree holding the full validator set
pub const VALIDATOR_SET_TREE: &str = "full_validator_set";

const FULL_VALIDATOR_SET_KEY: &[u8] = b"full_validator_set";

/// Address-keyed validator records.
///
/// `BTreeMap` keeps iteration in address order on every node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorStakeMap(pub BTreeMap<Address, ValidatorMetadata>);

impl ValidatorStakeMap {
    pub fn from_account_set(validators: &AccountSet) -> Self {
        Self(
            validators
                .iter()
                .map(|v| {
                    let mut v = v.clone();
                    v.refresh_active();
                    (v.address, v)
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, address: &Address) -> Option<&ValidatorMetadata> {
        self.0.get(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &ValidatorMetadata)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Address, &mut ValidatorMetadata)> {
        self.0.iter_mut()
    }

    /// Add minted stake, creating the record on first stake
    pub fn add_stake(&mut self, address: Address, amount: &BigUint) {
        let entry = self
            .0
            .entry(address)
            .or_insert_with(|| ValidatorMetadata::new(address, BigUint::zero(), None));
        entry.voting_power += amount;
        entry.refresh_active();
    }

    /// Subtract burned stake.
    ///
    /// Power is clamped at zero; the return value is the part of `amount`
    /// that could not be covered (zero for a well-formed event stream).
    pub fn remove_stake(&mut self, address: Address, amount: &BigUint) -> BigUint {
        let Some(entry) = self.0.get_mut(&address) else {
            return amount.clone();
        };

        let shortfall = if entry.voting_power >= *amount {
            entry.voting_power -= amount;
            BigUint::zero()
        } else {
            let shortfall = amount - &entry.voting_power;
            entry.voting_power = BigUint::zero();
            shortfall
        };
        entry.refresh_active();

        shortfall
    }

    /// Active validators in selection order (power desc, address asc),
    /// truncated to `max_size`.
    pub fn get_sorted(&self, max_size: usize) -> AccountSet {
        let mut active: Vec<ValidatorMetadata> = self
            .0
            .values()
            .filter(|v| !v.voting_power.is_zero())
            .cloned()
            .collect();

        active.sort_by(|a, b| a.selection_cmp(b));
        active.truncate(max_size);

        AccountSet::new(active)
    }

    /// Every record, active or not, in selection order
    pub fn all_sorted(&self) -> AccountSet {
        let mut all: Vec<ValidatorMetadata> = self.0.values().cloned().collect();
        all.sort_by(|a, b| a.selection_cmp(b));
        AccountSet::new(all)
    }
}

/// The persisted ledger record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullValidatorSet {
    /// Last block whose transfer events were applied
    pub block_number: u64,
    pub epoch_id: u64,
    /// Last block in which any transfer event changed the ledger
    pub updated_at_block_number: u64,
    pub validators: ValidatorStakeMap,
}

impl FullValidatorSet {
    /// Genesis ledger built from the epoch-1 active set
    pub fn genesis(validators: &AccountSet) -> Self {
        Self {
            block_number: 0,
            epoch_id: 0,
            updated_at_block_number: 0,
            validators: ValidatorStakeMap::from_account_set(validators),
        }
    }
}

/// Typed access to the ledger tree
#[derive(Clone)]
pub struct StakeStore {
    tree: sled::Tree,
}

impl StakeStore {
    pub(crate) fn new(tree: sled::Tree) -> Self {
        Self { tree }
    }

    /// Insert or replace the full validator set
    pub fn insert_full_validator_set(&self, set: &FullValidatorSet) -> Result<(), StoreError> {
        let bytes = bincode::serialize(set)?;
        self.tree.insert(FULL_VALIDATOR_SET_KEY, bytes)?;
        Ok(())
    }

    /// Load the full validator set.
    ///
    /// Fails with `MissingLedger` until the epoch-1 set has been inserted.
    pub fn get_full_validator_set(&self) -> Result<FullValidatorSet, StoreError> {
        match self.tree.get(FULL_VALIDATOR_SET_KEY)? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Err(StoreError::MissingLedger),
        }
    }

    pub fn has_full_validator_set(&self) -> Result<bool, StoreError> {
        Ok(self.tree.contains_key(FULL_VALIDATOR_SET_KEY)?)
    }

    /// All validators regardless of whether they are active
    pub fn get_all_validators(&self) -> Result<AccountSet, StoreError> {
        Ok(self.get_full_validator_set()?.validators.all_sorted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StateStore;
    use tempfile::tempdir;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    #[test]
    fn test_missing_ledger() {
        let store = StateStore::temporary().unwrap();
        assert!(matches!(
            store.stake().get_full_validator_set(),
            Err(StoreError::MissingLedger)
        ));
        assert!(!store.stake().has_full_validator_set().unwrap());
    }

    #[test]
    fn test_store_and_load_ledger() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path()).unwrap();

        let mut set = FullValidatorSet::default();
        set.validators.add_stake(addr(1), &BigUint::from(100u32));
        set.validators.add_stake(addr(2), &BigUint::from(50u32));
        set.block_number = 7;
        set.epoch_id = 2;

        store.stake().insert_full_validator_set(&set).unwrap();
        store.flush().unwrap();

        let loaded = store.stake().get_full_validator_set().unwrap();
        assert_eq!(loaded, set);
        assert_eq!(loaded.block_number, 7);
    }

    #[test]
    fn test_stake_and_unstake() {
        let mut map = ValidatorStakeMap::default();
        map.add_stake(addr(1), &BigUint::from(10u32));
        map.add_stake(addr(1), &BigUint::from(5u32));
        assert_eq!(map.get(&addr(1)).unwrap().voting_power, BigUint::from(15u32));

        let shortfall = map.remove_stake(addr(1), &BigUint::from(15u32));
        assert!(shortfall.is_zero());
        let v = map.get(&addr(1)).unwrap();
        assert!(v.voting_power.is_zero());
        assert!(!v.is_active);
        // Zeroed entries are kept
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_unstake_clamps_at_zero() {
        let mut map = ValidatorStakeMap::default();
        map.add_stake(addr(1), &BigUint::from(3u32));

        let shortfall = map.remove_stake(addr(1), &BigUint::from(5u32));
        assert_eq!(shortfall, BigUint::from(2u32));
        assert!(map.get(&addr(1)).unwrap().voting_power.is_zero());

        let unknown = map.remove_stake(addr(9), &BigUint::from(4u32));
        assert_eq!(unknown, BigUint::from(4u32));
        assert!(map.get(&addr(9)).is_none());
    }

    #[test]
    fn test_get_sorted_orders_and_truncates() {
        let mut map = ValidatorStakeMap::default();
        map.add_stake(addr(3), &BigUint::from(5u32));
        map.add_stake(addr(2), &BigUint::from(10u32));
        map.add_stake(addr(1), &BigUint::from(10u32));
        map.add_stake(addr(4), &BigUint::zero());

        let sorted = map.get_sorted(2);
        assert_eq!(sorted.addresses(), vec![addr(1), addr(2)]);

        let all = map.all_sorted();
        assert_eq!(all.addresses(), vec![addr(1), addr(2), addr(3), addr(4)]);
    }
}
