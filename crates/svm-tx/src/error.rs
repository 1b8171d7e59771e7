use thiserror::Error;

/// Ledger plumbing errors: addresses, derivation, transactions, signing.
#[derive(Debug, Error)]
pub enum SvmError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("max seed length exceeded")]
    MaxSeedLengthExceeded,

    #[error("no viable program address found for the given seeds")]
    NoViableProgramAddress,

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),
}
