//! Signing capability.
//!
//! Transaction code never touches key material directly. It asks a
//! [`Signer`] for its address and for a signature over message bytes, so
//! hardware wallets, remote signers and test doubles all plug in the same
//! way. [`Keypair`] is the in-process Ed25519 implementation.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::Signer as _;
use zeroize::Zeroize;

use crate::address::Address;
use crate::error::SvmError;

/// Length of an Ed25519 signature in bytes.
pub const SIGNATURE_BYTES: usize = 64;

/// An Ed25519 signature. The first signature of a transaction doubles as
/// its tracking identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; SIGNATURE_BYTES]);

impl Signature {
    pub const fn new_from_array(bytes: [u8; SIGNATURE_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_BYTES] {
        self.0
    }

    /// Verify this signature over `message` for the public key `signer`.
    pub fn verify(&self, signer: &Address, message: &[u8]) -> bool {
        let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(signer.as_array()) else {
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(&self.0);
        key.verify_strict(message, &signature).is_ok()
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; SIGNATURE_BYTES])
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Signature {
    type Err = SvmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| SvmError::SerializationError(format!("base58 decode failed: {e}")))?;
        let arr: [u8; SIGNATURE_BYTES] = bytes.try_into().map_err(|v: Vec<u8>| {
            SvmError::SerializationError(format!("expected 64 signature bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

/// Something that can sign transaction messages on behalf of an address.
pub trait Signer {
    /// The address whose signature this signer produces.
    fn address(&self) -> Address;

    /// Sign raw message bytes.
    fn try_sign_message(&self, message: &[u8]) -> Result<Signature, SvmError>;
}

/// An in-memory Ed25519 keypair.
///
/// The secret half is zeroized on drop by `ed25519-dalek`.
pub struct Keypair {
    signing_key: ed25519_dalek::SigningKey,
}

impl Keypair {
    /// Build a keypair from a 32-byte Ed25519 seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let mut seed = *seed;
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed);
        seed.zeroize();
        Self { signing_key }
    }

    /// Build a keypair from the 64-byte `secret || public` layout used by
    /// Solana keypair files.
    ///
    /// Fails if the slice has the wrong length or if the public half does not
    /// match the secret half.
    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, SvmError> {
        if bytes.len() != 64 {
            return Err(SvmError::InvalidPrivateKey(format!(
                "expected 64 keypair bytes, got {}",
                bytes.len()
            )));
        }

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes[..32]);
        let keypair = Self::from_seed(&seed);
        seed.zeroize();

        if keypair.address().as_array()[..] != bytes[32..] {
            return Err(SvmError::InvalidPrivateKey(
                "public key does not match secret key".into(),
            ));
        }

        Ok(keypair)
    }
}

impl Signer for Keypair {
    fn address(&self) -> Address {
        Address::new_from_array(self.signing_key.verifying_key().to_bytes())
    }

    fn try_sign_message(&self, message: &[u8]) -> Result<Signature, SvmError> {
        Ok(Signature(self.signing_key.sign(message).to_bytes()))
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
