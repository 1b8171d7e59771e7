//! Read back vault state after a command lands.

use log::debug;
use svm_tx::Address;

use crate::codec::{decode_account_data, BoringVaultRecord};
use crate::commands::{derive_address, BASE_SEED_BORING_VAULT_STATE};
use crate::error::VaultError;
use crate::submitter::RpcTransport;

/// Derive `[namespace_seed, vault_id LE]`, fetch that account and decode it.
///
/// A missing account is [`VaultError::AccountNotFound`]; an account with the
/// wrong tag or length fails decoding without returning partial state.
pub fn fetch_and_decode<T: RpcTransport + ?Sized>(
    transport: &T,
    program_id: &Address,
    namespace_seed: &[u8],
    vault_id: u64,
) -> Result<BoringVaultRecord, VaultError> {
    let (address, _bump) = derive_address(program_id, namespace_seed, vault_id)?;

    let data = transport
        .account_data(&address)?
        .ok_or(VaultError::AccountNotFound { address })?;
    debug!("fetched {} bytes from {address}", data.len());

    decode_account_data(&data)
}

/// [`fetch_and_decode`] for the vault state account of `vault_id`.
pub fn fetch_vault_state<T: RpcTransport + ?Sized>(
    transport: &T,
    program_id: &Address,
    vault_id: u64,
) -> Result<BoringVaultRecord, VaultError> {
    fetch_and_decode(transport, program_id, BASE_SEED_BORING_VAULT_STATE, vault_id)
}
