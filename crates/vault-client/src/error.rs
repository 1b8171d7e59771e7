use svm_tx::{Address, Signature, SvmError};
use thiserror::Error;

/// Failures reported by an [`RpcTransport`](crate::submitter::RpcTransport)
/// implementation. Passed through to callers unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The endpoint could not be reached or answered with an RPC error.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The network refused the transaction (bad blockhash, failed preflight,
    /// invalid signature).
    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("transport request timed out")]
    Timeout,
}

/// Vault client errors.
#[derive(Debug, Error)]
pub enum VaultError {
    /// All 256 bump seeds produced on-curve addresses.
    #[error("address derivation exhausted every bump seed")]
    DerivationExhausted,

    /// A caller-supplied value violates the command's encoding rules.
    #[error("encoding constraint violated: {0}")]
    EncodingConstraintViolation(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("account not found: {address}")]
    AccountNotFound { address: Address },

    #[error("malformed account record: {0}")]
    MalformedRecord(String),

    #[error("unexpected account tag {found:02x?}")]
    UnexpectedAccountTag { found: [u8; 8] },

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("transaction build failed: {0}")]
    Transaction(String),

    #[error("transaction {signature} not confirmed before timeout")]
    ConfirmationTimeout { signature: Signature },

    #[error("transaction {signature} failed: {reason}")]
    TransactionFailed { signature: Signature, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<SvmError> for VaultError {
    fn from(e: SvmError) -> Self {
        match e {
            SvmError::NoViableProgramAddress => VaultError::DerivationExhausted,
            SvmError::SigningError(msg) | SvmError::InvalidPrivateKey(msg) => {
                VaultError::Signing(msg)
            }
            other => VaultError::Transaction(other.to_string()),
        }
    }
}
