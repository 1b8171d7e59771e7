//! The 32-byte account address type.
//!
//! Addresses are raw 32-byte values. Keypair addresses are Ed25519 public
//! keys; program-derived addresses are SHA-256 digests that deliberately
//! fall off the curve. The text form is Base58 (Bitcoin alphabet).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SvmError;

/// Length of an address in bytes.
pub const ADDRESS_BYTES: usize = 32;

/// Longest Base58 string a 32-byte value can encode to.
const MAX_BASE58_LEN: usize = 44;

/// A 32-byte account address.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_BYTES]);

impl Address {
    pub const fn new_from_array(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Self(bytes)
    }

    /// Build an address from a slice, which must be exactly 32 bytes long.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, SvmError> {
        let arr: [u8; ADDRESS_BYTES] = bytes.try_into().map_err(|_| {
            SvmError::InvalidAddress(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    pub fn to_bytes(&self) -> [u8; ADDRESS_BYTES] {
        self.0
    }

    pub fn as_array(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }

    /// Whether these bytes decompress to a point on the Ed25519 curve.
    ///
    /// Keypair addresses are always on the curve. Program-derived
    /// addresses never are, which is what guarantees nobody holds a
    /// private key for them.
    pub fn is_on_curve(&self) -> bool {
        curve25519_dalek::edwards::CompressedEdwardsY(self.0)
            .decompress()
            .is_some()
    }
}

impl From<[u8; ADDRESS_BYTES]> for Address {
    fn from(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = SvmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > MAX_BASE58_LEN {
            return Err(SvmError::InvalidAddress(format!(
                "base58 string too long: {} chars",
                s.len()
            )));
        }
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| SvmError::InvalidAddress(format!("base58 decode failed: {e}")))?;
        Self::try_from_slice(&bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The System Program address is 32 zero bytes, which encodes to
    /// "11111111111111111111111111111111" in Base58.
    #[test]
    fn default_address_is_system_program() {
        assert_eq!(
            Address::default().to_string(),
            "11111111111111111111111111111111"
        );
    }

    #[test]
    fn roundtrip_token_program() {
        let text = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
        let address: Address = text.parse().unwrap();
        assert_eq!(address.to_string(), text);
    }

    #[test]
    fn vault_program_id_decodes() {
        let address: Address = "5ZRnXG4GsUMLaN7w2DtJV1cgLgcXHmuHCmJ2MxoorWCE".parse().unwrap();
        assert_eq!(address.as_array()[0], 0x43);
        assert_eq!(address.as_array()[31], 0xa7);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!("not-a-valid-address!!!".parse::<Address>().is_err());
    }

    #[test]
    fn short_value_is_rejected() {
        // "1" decodes to a single zero byte.
        let err = "1".parse::<Address>().unwrap_err();
        assert!(err.to_string().contains("expected 32 bytes"));
    }

    #[test]
    fn overlong_string_is_rejected() {
        let long = "1".repeat(45);
        assert!(long.parse::<Address>().is_err());
    }

    #[test]
    fn try_from_slice_checks_length() {
        assert!(Address::try_from_slice(&[0u8; 31]).is_err());
        assert!(Address::try_from_slice(&[0u8; 33]).is_err());
        assert_eq!(
            Address::try_from_slice(&[7u8; 32]).unwrap(),
            Address::new_from_array([7u8; 32])
        );
    }

    #[test]
    fn basepoint_is_on_curve() {
        let mut basepoint = [0x66u8; 32];
        basepoint[0] = 0x58;
        assert!(Address::new_from_array(basepoint).is_on_curve());
    }

    #[test]
    fn off_curve_bytes_are_detected() {
        // y = 0x0202..02 has no matching x coordinate.
        assert!(!Address::new_from_array([0x02; 32]).is_on_curve());
    }

    #[test]
    fn serde_uses_base58_text() {
        let address = Address::new_from_array([0xffu8; 32]);
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{address}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }

    #[test]
    fn debug_shows_base58() {
        let debug = format!("{:?}", Address::default());
        assert_eq!(debug, "Address(11111111111111111111111111111111)");
    }
}
