//! Administrative client for Boring Vault programs.
//!
//! Derives vault state addresses, encodes admin commands as instructions,
//! submits them through a caller-supplied [`RpcTransport`], and reads back
//! the resulting vault state for verification. The crate performs no I/O of
//! its own; every network interaction goes through the transport trait.

pub mod codec;
pub mod commands;
pub mod config;
pub mod error;
pub mod submitter;
pub mod verifier;

pub use codec::{
    decode_account_data, decode_account_record, BoringVaultRecord, ManagerConfig, RateBounds,
    TellerConfig, VaultConfig, BORING_VAULT_ACCOUNT_TAG, RECORD_LEN,
};
pub use commands::{
    build_instruction, derive_address, vault_address, vault_state_address, VaultCommand,
    BASE_SEED_BORING_VAULT, BASE_SEED_BORING_VAULT_STATE, BPS_SCALE,
};
pub use config::{ClientConfig, Commitment, BORING_VAULT_PROGRAM_ID};
pub use error::{TransportError, VaultError};
pub use submitter::{
    confirm_transaction, submit, submit_command, ConfirmOptions, RpcTransport, TransactionStatus,
};
pub use verifier::{fetch_and_decode, fetch_vault_state};
