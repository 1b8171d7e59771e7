//! Fixed-width packed encoding for vault command arguments and the vault
//! state account.
//!
//! Nothing here is self-describing. Integers are little-endian and unsigned,
//! booleans are one byte (non-zero is `true`), addresses are raw 32 bytes,
//! and fields follow each other with no padding or length prefixes.

use serde::{Deserialize, Serialize};
use svm_tx::{Address, ADDRESS_BYTES};

use crate::error::VaultError;

/// `vault_id` (8) + selector (1).
pub const COMMAND_ARGS_LEN: usize = 9;

/// `vault_id` (8) + address (32).
pub const ADDRESS_ARGS_LEN: usize = 8 + ADDRESS_BYTES;

/// `vault_id` (8) + platform fee (2) + performance fee (2).
pub const FEE_ARGS_LEN: usize = 12;

/// `vault_id` (8) + upper bound (2) + lower bound (2) + minimum delay (4).
pub const RATE_BOUNDS_ARGS_LEN: usize = 16;

/// Leading tag of every vault state account: `sha256("account:BoringVault")[..8]`.
///
/// The tag doubles as the layout version. A change to [`RECORD_LAYOUT`] ships
/// under a new account type, and therefore a new tag, so old buffers are
/// rejected instead of reinterpreted.
pub const BORING_VAULT_ACCOUNT_TAG: [u8; 8] = [0x23, 0x54, 0x2c, 0x59, 0x96, 0x37, 0xec, 0x19];

/// Length of the account tag.
pub const ACCOUNT_TAG_LEN: usize = 8;

/// Field order and widths of the vault state record body.
pub const RECORD_LAYOUT: [(&str, usize); 23] = [
    ("vault_id", 8),
    ("authority", 32),
    ("pending_authority", 32),
    ("paused", 1),
    ("share_mint", 32),
    ("deposit_sub_account", 1),
    ("withdraw_sub_account", 1),
    ("base_asset", 32),
    ("decimals", 1),
    ("exchange_rate_provider", 32),
    ("exchange_rate", 8),
    ("exchange_rate_high_water_mark", 8),
    ("fees_owed", 8),
    ("total_shares_last_update", 8),
    ("last_update_timestamp", 8),
    ("payout_address", 32),
    ("rate_change_upper_bound", 2),
    ("rate_change_lower_bound", 2),
    ("minimum_update_delay", 4),
    ("platform_fee_bps", 2),
    ("performance_fee_bps", 2),
    ("withdraw_authority", 32),
    ("strategist", 32),
];

/// Exact byte length of a record body: the sum of [`RECORD_LAYOUT`] widths.
pub const RECORD_LEN: usize = layout_len(&RECORD_LAYOUT);

const fn layout_len(fields: &[(&str, usize)]) -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < fields.len() {
        total += fields[i].1;
        i += 1;
    }
    total
}

// ---------------------------------------------------------------------------
// Command arguments
// ---------------------------------------------------------------------------

/// Pack `{vault_id, selector}` into 9 bytes.
pub fn encode_command_args(vault_id: u64, selector: u8) -> [u8; COMMAND_ARGS_LEN] {
    let mut out = [0u8; COMMAND_ARGS_LEN];
    out[..8].copy_from_slice(&vault_id.to_le_bytes());
    out[8] = selector;
    out
}

/// Inverse of [`encode_command_args`]. The input must be exactly 9 bytes.
pub fn decode_command_args(data: &[u8]) -> Result<(u64, u8), VaultError> {
    let mut reader = FieldReader::exact(data, COMMAND_ARGS_LEN)?;
    Ok((reader.read_u64()?, reader.read_u8()?))
}

/// Pack `{vault_id, address}` into 40 bytes.
pub fn encode_address_args(vault_id: u64, address: &Address) -> [u8; ADDRESS_ARGS_LEN] {
    let mut out = [0u8; ADDRESS_ARGS_LEN];
    out[..8].copy_from_slice(&vault_id.to_le_bytes());
    out[8..].copy_from_slice(address.as_ref());
    out
}

/// Inverse of [`encode_address_args`]. The input must be exactly 40 bytes.
pub fn decode_address_args(data: &[u8]) -> Result<(u64, Address), VaultError> {
    let mut reader = FieldReader::exact(data, ADDRESS_ARGS_LEN)?;
    Ok((reader.read_u64()?, reader.read_address()?))
}

/// Pack `{vault_id, platform_fee_bps, performance_fee_bps}` into 12 bytes.
pub fn encode_fee_args(
    vault_id: u64,
    platform_fee_bps: u16,
    performance_fee_bps: u16,
) -> [u8; FEE_ARGS_LEN] {
    let mut out = [0u8; FEE_ARGS_LEN];
    out[..8].copy_from_slice(&vault_id.to_le_bytes());
    out[8..10].copy_from_slice(&platform_fee_bps.to_le_bytes());
    out[10..].copy_from_slice(&performance_fee_bps.to_le_bytes());
    out
}

/// Inverse of [`encode_fee_args`].
pub fn decode_fee_args(data: &[u8]) -> Result<(u64, u16, u16), VaultError> {
    let mut reader = FieldReader::exact(data, FEE_ARGS_LEN)?;
    Ok((reader.read_u64()?, reader.read_u16()?, reader.read_u16()?))
}

/// Exchange-rate update bounds as they travel in instruction data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBounds {
    pub upper_bound: u16,
    pub lower_bound: u16,
    pub minimum_update_delay: u32,
}

/// Pack `{vault_id, upper_bound, lower_bound, minimum_update_delay}` into 16 bytes.
pub fn encode_rate_bounds_args(vault_id: u64, bounds: &RateBounds) -> [u8; RATE_BOUNDS_ARGS_LEN] {
    let mut out = [0u8; RATE_BOUNDS_ARGS_LEN];
    out[..8].copy_from_slice(&vault_id.to_le_bytes());
    out[8..10].copy_from_slice(&bounds.upper_bound.to_le_bytes());
    out[10..12].copy_from_slice(&bounds.lower_bound.to_le_bytes());
    out[12..].copy_from_slice(&bounds.minimum_update_delay.to_le_bytes());
    out
}

/// Inverse of [`encode_rate_bounds_args`].
pub fn decode_rate_bounds_args(data: &[u8]) -> Result<(u64, RateBounds), VaultError> {
    let mut reader = FieldReader::exact(data, RATE_BOUNDS_ARGS_LEN)?;
    let vault_id = reader.read_u64()?;
    let bounds = RateBounds {
        upper_bound: reader.read_u16()?,
        lower_bound: reader.read_u16()?,
        minimum_update_delay: reader.read_u32()?,
    };
    Ok((vault_id, bounds))
}

// ---------------------------------------------------------------------------
// Vault state record
// ---------------------------------------------------------------------------

/// Ownership and routing settings of a vault.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    pub vault_id: u64,
    pub authority: Address,
    pub pending_authority: Address,
    pub paused: bool,
    pub share_mint: Address,
    pub deposit_sub_account: u8,
    pub withdraw_sub_account: u8,
}

/// Accounting state: exchange rate, fees and their bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TellerConfig {
    pub base_asset: Address,
    pub decimals: u8,
    pub exchange_rate_provider: Address,
    pub exchange_rate: u64,
    pub exchange_rate_high_water_mark: u64,
    pub fees_owed: u64,
    pub total_shares_last_update: u64,
    pub last_update_timestamp: u64,
    pub payout_address: Address,
    pub rate_change_upper_bound: u16,
    pub rate_change_lower_bound: u16,
    pub minimum_update_delay: u32,
    pub platform_fee_bps: u16,
    pub performance_fee_bps: u16,
    pub withdraw_authority: Address,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    pub strategist: Address,
}

/// Decoded vault state account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoringVaultRecord {
    pub config: VaultConfig,
    pub teller: TellerConfig,
    pub manager: ManagerConfig,
}

/// Decode a record body (tag already stripped).
///
/// All or nothing: a buffer that is not exactly [`RECORD_LEN`] bytes is
/// rejected regardless of content.
pub fn decode_account_record(bytes: &[u8]) -> Result<BoringVaultRecord, VaultError> {
    if bytes.len() != RECORD_LEN {
        return Err(VaultError::MalformedRecord(format!(
            "expected {RECORD_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    let mut r = FieldReader::new(bytes);

    let config = VaultConfig {
        vault_id: r.read_u64()?,
        authority: r.read_address()?,
        pending_authority: r.read_address()?,
        paused: r.read_bool()?,
        share_mint: r.read_address()?,
        deposit_sub_account: r.read_u8()?,
        withdraw_sub_account: r.read_u8()?,
    };

    let teller = TellerConfig {
        base_asset: r.read_address()?,
        decimals: r.read_u8()?,
        exchange_rate_provider: r.read_address()?,
        exchange_rate: r.read_u64()?,
        exchange_rate_high_water_mark: r.read_u64()?,
        fees_owed: r.read_u64()?,
        total_shares_last_update: r.read_u64()?,
        last_update_timestamp: r.read_u64()?,
        payout_address: r.read_address()?,
        rate_change_upper_bound: r.read_u16()?,
        rate_change_lower_bound: r.read_u16()?,
        minimum_update_delay: r.read_u32()?,
        platform_fee_bps: r.read_u16()?,
        performance_fee_bps: r.read_u16()?,
        withdraw_authority: r.read_address()?,
    };

    let manager = ManagerConfig {
        strategist: r.read_address()?,
    };

    Ok(BoringVaultRecord {
        config,
        teller,
        manager,
    })
}

/// Decode raw account data as returned by the RPC: tag, then record body.
///
/// The tag must equal [`BORING_VAULT_ACCOUNT_TAG`].
pub fn decode_account_data(data: &[u8]) -> Result<BoringVaultRecord, VaultError> {
    if data.len() < ACCOUNT_TAG_LEN {
        return Err(VaultError::MalformedRecord(format!(
            "account data shorter than its {ACCOUNT_TAG_LEN}-byte tag: {} bytes",
            data.len()
        )));
    }

    let (tag, body) = data.split_at(ACCOUNT_TAG_LEN);
    if tag != BORING_VAULT_ACCOUNT_TAG {
        let mut found = [0u8; ACCOUNT_TAG_LEN];
        found.copy_from_slice(tag);
        return Err(VaultError::UnexpectedAccountTag { found });
    }

    decode_account_record(body)
}

impl BoringVaultRecord {
    /// Encode the record body in layout order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(RECORD_LEN);
        let c = &self.config;
        let t = &self.teller;

        out.extend_from_slice(&c.vault_id.to_le_bytes());
        out.extend_from_slice(c.authority.as_ref());
        out.extend_from_slice(c.pending_authority.as_ref());
        out.push(c.paused as u8);
        out.extend_from_slice(c.share_mint.as_ref());
        out.push(c.deposit_sub_account);
        out.push(c.withdraw_sub_account);

        out.extend_from_slice(t.base_asset.as_ref());
        out.push(t.decimals);
        out.extend_from_slice(t.exchange_rate_provider.as_ref());
        out.extend_from_slice(&t.exchange_rate.to_le_bytes());
        out.extend_from_slice(&t.exchange_rate_high_water_mark.to_le_bytes());
        out.extend_from_slice(&t.fees_owed.to_le_bytes());
        out.extend_from_slice(&t.total_shares_last_update.to_le_bytes());
        out.extend_from_slice(&t.last_update_timestamp.to_le_bytes());
        out.extend_from_slice(t.payout_address.as_ref());
        out.extend_from_slice(&t.rate_change_upper_bound.to_le_bytes());
        out.extend_from_slice(&t.rate_change_lower_bound.to_le_bytes());
        out.extend_from_slice(&t.minimum_update_delay.to_le_bytes());
        out.extend_from_slice(&t.platform_fee_bps.to_le_bytes());
        out.extend_from_slice(&t.performance_fee_bps.to_le_bytes());
        out.extend_from_slice(t.withdraw_authority.as_ref());

        out.extend_from_slice(self.manager.strategist.as_ref());

        out
    }

    /// Encode as full account data: tag followed by the record body.
    pub fn to_account_data(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ACCOUNT_TAG_LEN + RECORD_LEN);
        out.extend_from_slice(&BORING_VAULT_ACCOUNT_TAG);
        out.extend_from_slice(&self.to_bytes());
        out
    }
}

/// Sequential little-endian reader. Every read is bounds-checked.
struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Reader over argument bytes that must be exactly `len` long.
    fn exact(data: &'a [u8], len: usize) -> Result<Self, VaultError> {
        if data.len() != len {
            return Err(VaultError::EncodingConstraintViolation(format!(
                "expected {len} argument bytes, got {}",
                data.len()
            )));
        }
        Ok(Self::new(data))
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], VaultError> {
        let end = self.pos + N;
        let bytes = self.data.get(self.pos..end).ok_or_else(|| {
            VaultError::MalformedRecord(format!("truncated field at offset {}", self.pos))
        })?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.pos = end;
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8, VaultError> {
        Ok(self.take::<1>()?[0])
    }

    fn read_bool(&mut self) -> Result<bool, VaultError> {
        Ok(self.read_u8()? != 0)
    }

    fn read_u16(&mut self) -> Result<u16, VaultError> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    fn read_u32(&mut self) -> Result<u32, VaultError> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn read_u64(&mut self) -> Result<u64, VaultError> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    fn read_address(&mut self) -> Result<Address, VaultError> {
        Ok(Address::new_from_array(self.take()?))
    }
}
