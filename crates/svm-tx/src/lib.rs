//! Ledger-side plumbing for talking to SVM programs.
//!
//! This crate covers addresses, program-derived address search, the
//! signing capability, and the versioned transaction wire format. Like the
//! rest of the workspace it avoids `solana-sdk` (which drags in tokio and
//! 200+ transitive dependencies) and implements the compact binary format by
//! hand, using `ed25519-dalek` for signatures, `curve25519-dalek` for the
//! off-curve check and `bs58` for text forms.

pub mod address;
pub mod error;
pub mod pda;
pub mod signer;
pub mod transaction;

// Re-export key public types for ergonomic imports.
pub use address::{Address, ADDRESS_BYTES};
pub use error::SvmError;
pub use pda::{create_program_address, find_program_address, MAX_SEEDS, MAX_SEED_LEN};
pub use signer::{Keypair, Signature, Signer, SIGNATURE_BYTES};
pub use transaction::{
    decode_compact_u16, encode_compact_u16, AccountMeta, Blockhash, CompiledInstruction,
    Instruction, Message, MessageHeader, VersionedTransaction, MESSAGE_VERSION_PREFIX,
};
