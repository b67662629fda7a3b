//! Validator Registry - resolves validator signing keys from the root chain

use std::sync::Arc;

use chain_types::{Address, BlsPublicKey};

use crate::contracts::{decode_output, RootChainCall, ValidatorInfo};
use crate::error::BridgeError;
use crate::relayer::TxRelayer;

/// Reads validator registrations from the root-chain stake manager
#[derive(Clone)]
pub struct ValidatorRegistry {
    relayer: Arc<dyn TxRelayer>,
    /// Account the view calls are made from
    caller: Address,
    /// Root-chain stake manager contract
    stake_manager: Address,
}

impl ValidatorRegistry {
    pub fn new(relayer: Arc<dyn TxRelayer>, caller: Address, stake_manager: Address) -> Self {
        Self {
            relayer,
            caller,
            stake_manager,
        }
    }

    pub fn stake_manager(&self) -> Address {
        self.stake_manager
    }

    /// Fetch the registration record of a validator
    pub fn get_validator(&self, validator: Address) -> Result<ValidatorInfo, BridgeError> {
        let call = RootChainCall::GetValidator { validator };
        let output = self
            .relayer
            .call(self.caller, self.stake_manager, &call.encode())
            .map_err(|source| BridgeError::Call {
                function: call.name(),
                source,
            })?;

        decode_output(call.name(), &output)
    }

    /// Resolve the BLS key a validator registered on the root chain
    pub fn get_bls_key(&self, validator: Address) -> Result<BlsPublicKey, BridgeError> {
        let info = self.get_validator(validator)?;
        if info.bls_key.is_empty() {
            return Err(BridgeError::UnregisteredValidator(validator));
        }

        tracing::debug!("Resolved signing key for validator {}", validator);

        Ok(BlsPublicKey(info.bls_key))
    }
}
