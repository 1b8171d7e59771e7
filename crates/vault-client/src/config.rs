use std::time::Duration;

use serde::{Deserialize, Serialize};
use svm_tx::Address;

use crate::error::VaultError;
use crate::submitter::ConfirmOptions;

/// Deployed vault program: `5ZRnXG4GsUMLaN7w2DtJV1cgLgcXHmuHCmJ2MxoorWCE`
pub const BORING_VAULT_PROGRAM_ID: Address = Address::new_from_array([
    0x43, 0xbd, 0x5b, 0xa0, 0xda, 0x84, 0x0a, 0x05, 0x3d, 0x9a, 0x1e, 0xb5, 0xb7, 0x64, 0x8b,
    0xa7, 0x38, 0x8c, 0x76, 0xcc, 0x64, 0x75, 0x6e, 0x13, 0x9c, 0x14, 0x97, 0x36, 0xb0, 0x03,
    0xc9, 0xa7,
]);

/// How settled a transaction must be before confirmation succeeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

/// Client settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub program_id: Address,
    pub commitment: Commitment,
    pub confirm_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            program_id: BORING_VAULT_PROGRAM_ID,
            commitment: Commitment::Confirmed,
            confirm_timeout_secs: 30,
            poll_interval_ms: 500,
        }
    }
}

impl ClientConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, VaultError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| VaultError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), VaultError> {
        if self.confirm_timeout_secs == 0 {
            return Err(VaultError::Config(
                "confirm_timeout_secs must be > 0".into(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(VaultError::Config("poll_interval_ms must be > 0".into()));
        }
        Ok(())
    }

    /// Confirmation settings for [`confirm_transaction`](crate::submitter::confirm_transaction).
    pub fn confirm_options(&self) -> ConfirmOptions {
        ConfirmOptions {
            commitment: self.commitment,
            timeout: Duration::from_secs(self.confirm_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_id_constant_matches_base58() {
        assert_eq!(
            BORING_VAULT_PROGRAM_ID.to_string(),
            "5ZRnXG4GsUMLaN7w2DtJV1cgLgcXHmuHCmJ2MxoorWCE"
        );
    }

    #[test]
    fn empty_json_gives_defaults() {
        let config = ClientConfig::from_json("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn full_json_is_parsed() {
        let config = ClientConfig::from_json(
            r#"{
                "program_id": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
                "commitment": "finalized",
                "confirm_timeout_secs": 60,
                "poll_interval_ms": 250
            }"#,
        )
        .unwrap();
        assert_eq!(
            config.program_id.to_string(),
            "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"
        );
        assert_eq!(config.commitment, Commitment::Finalized);

        let options = config.confirm_options();
        assert_eq!(options.timeout, Duration::from_secs(60));
        assert_eq!(options.poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn malformed_program_id_is_config_error() {
        let err = ClientConfig::from_json(r#"{"program_id": "not base58!"}"#).unwrap_err();
        assert!(matches!(err, VaultError::Config(_)));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = ClientConfig::from_json(r#"{"poll_interval_ms": 0}"#).unwrap_err();
        assert!(err.to_string().contains("poll_interval_ms"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(ClientConfig::from_json(r#"{"confirm_timeout_secs": 0}"#).is_err());
    }

    #[test]
    fn commitment_levels_are_ordered() {
        assert!(Commitment::Processed < Commitment::Confirmed);
        assert!(Commitment::Confirmed < Commitment::Finalized);
    }

    #[test]
    fn config_serializes_program_id_as_base58() {
        let json = serde_json::to_string(&ClientConfig::default()).unwrap();
        assert!(json.contains("5ZRnXG4GsUMLaN7w2DtJV1cgLgcXHmuHCmJ2MxoorWCE"));
        assert!(json.contains("\"confirmed\""));
    }
}
