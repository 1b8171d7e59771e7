//! Administrative vault commands.
//!
//! Every command targets the vault state account of one vault and carries
//! the same two account references: the signing authority (read-only) and
//! the vault state address (writable). Instruction data is the command's
//! 8-byte discriminator followed by its packed arguments.

use log::debug;
use svm_tx::{find_program_address, AccountMeta, Address, Instruction};

use crate::codec::{
    encode_address_args, encode_command_args, encode_fee_args, encode_rate_bounds_args, RateBounds,
};
use crate::error::VaultError;

/// Namespace seed of vault state accounts: `["boring-vault-state", vault_id LE]`.
pub const BASE_SEED_BORING_VAULT_STATE: &[u8] = b"boring-vault-state";

/// Namespace seed of sub-account vaults: `["boring-vault", vault_id LE, sub_account]`.
pub const BASE_SEED_BORING_VAULT: &[u8] = b"boring-vault";

// Discriminators are `sha256("global:<command_name>")[..8]`. They are wire
// constants: never reassign one to a different command.

pub const SET_DEPOSIT_SUB_ACCOUNT_DISCRIMINATOR: [u8; 8] =
    [0x87, 0xee, 0xda, 0x04, 0x78, 0x4d, 0xcf, 0x9c];
pub const SET_WITHDRAW_SUB_ACCOUNT_DISCRIMINATOR: [u8; 8] =
    [0x98, 0xc5, 0x67, 0xf9, 0x38, 0xb4, 0x00, 0xac];
pub const PAUSE_DISCRIMINATOR: [u8; 8] = [0xd3, 0x16, 0xdd, 0xfb, 0x4a, 0x79, 0xc1, 0x2f];
pub const UNPAUSE_DISCRIMINATOR: [u8; 8] = [0xa9, 0x90, 0x04, 0x26, 0x0a, 0x8d, 0xbc, 0xff];
pub const TRANSFER_AUTHORITY_DISCRIMINATOR: [u8; 8] =
    [0x30, 0xa9, 0x4c, 0x48, 0xe5, 0xb4, 0x37, 0xa1];
pub const ACCEPT_AUTHORITY_DISCRIMINATOR: [u8; 8] =
    [0x6b, 0x56, 0xc6, 0x5b, 0x21, 0x0c, 0x6b, 0xa0];
pub const SET_PAYOUT_DISCRIMINATOR: [u8; 8] = [0x37, 0x2b, 0x84, 0x33, 0xe3, 0xa9, 0xf2, 0xc3];
pub const SET_STRATEGIST_DISCRIMINATOR: [u8; 8] =
    [0xb9, 0x67, 0x01, 0x39, 0x0c, 0x98, 0x31, 0x9d];
pub const SET_WITHDRAW_AUTHORITY_DISCRIMINATOR: [u8; 8] =
    [0xc7, 0x92, 0x8c, 0x43, 0x01, 0x5a, 0x08, 0xde];
pub const UPDATE_EXCHANGE_RATE_PROVIDER_DISCRIMINATOR: [u8; 8] =
    [0x4d, 0xb2, 0x47, 0x11, 0xd2, 0xe4, 0xc4, 0xe6];
pub const SET_FEES_DISCRIMINATOR: [u8; 8] = [0x89, 0xb2, 0x31, 0x3a, 0x00, 0xf5, 0xf2, 0xbe];
pub const CONFIGURE_EXCHANGE_RATE_UPDATE_BOUNDS_DISCRIMINATOR: [u8; 8] =
    [0xff, 0x90, 0x35, 0x32, 0xa3, 0xd1, 0x9f, 0x66];

/// 100% in basis points. Fees never exceed it; the rate-change upper bound
/// never falls below it and the lower bound never rises above it.
pub const BPS_SCALE: u16 = 10_000;

/// Derive the vault state address for `vault_id`. Returns `(address, bump)`.
pub fn vault_state_address(program_id: &Address, vault_id: u64) -> Result<(Address, u8), VaultError> {
    derive_address(program_id, BASE_SEED_BORING_VAULT_STATE, vault_id)
}

/// Derive the sub-account vault that holds assets for `(vault_id, sub_account)`.
pub fn vault_address(
    program_id: &Address,
    vault_id: u64,
    sub_account: u8,
) -> Result<(Address, u8), VaultError> {
    let found = find_program_address(
        &[BASE_SEED_BORING_VAULT, &vault_id.to_le_bytes(), &[sub_account]],
        program_id,
    )?;
    Ok(found)
}

/// Derive `[namespace_seed, vault_id LE]` under `program_id`.
pub fn derive_address(
    program_id: &Address,
    namespace_seed: &[u8],
    vault_id: u64,
) -> Result<(Address, u8), VaultError> {
    let (address, bump) =
        find_program_address(&[namespace_seed, &vault_id.to_le_bytes()], program_id)?;
    debug!("derived {address} (bump {bump}) for vault {vault_id}");
    Ok((address, bump))
}

/// A typed administrative command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultCommand {
    SetDepositSubAccount { new_sub_account: u8 },
    SetWithdrawSubAccount { new_sub_account: u8 },
    Pause,
    Unpause,
    /// Nominate a new authority; it takes over once it signs `AcceptAuthority`.
    TransferAuthority { pending_authority: Address },
    AcceptAuthority,
    SetPayout { new_payout: Address },
    SetStrategist { new_strategist: Address },
    SetWithdrawAuthority { new_authority: Address },
    UpdateExchangeRateProvider { new_provider: Address },
    SetFees { platform_fee_bps: u16, performance_fee_bps: u16 },
    /// Limits on how far, and how often, the exchange rate may move.
    ConfigureExchangeRateUpdateBounds { bounds: RateBounds },
}

impl VaultCommand {
    /// Program-side instruction name.
    pub fn name(&self) -> &'static str {
        match self {
            VaultCommand::SetDepositSubAccount { .. } => "set_deposit_sub_account",
            VaultCommand::SetWithdrawSubAccount { .. } => "set_withdraw_sub_account",
            VaultCommand::Pause => "pause",
            VaultCommand::Unpause => "unpause",
            VaultCommand::TransferAuthority { .. } => "transfer_authority",
            VaultCommand::AcceptAuthority => "accept_authority",
            VaultCommand::SetPayout { .. } => "set_payout",
            VaultCommand::SetStrategist { .. } => "set_strategist",
            VaultCommand::SetWithdrawAuthority { .. } => "set_withdraw_authority",
            VaultCommand::UpdateExchangeRateProvider { .. } => "update_exchange_rate_provider",
            VaultCommand::SetFees { .. } => "set_fees",
            VaultCommand::ConfigureExchangeRateUpdateBounds { .. } => {
                "configure_exchange_rate_update_bounds"
            }
        }
    }

    pub fn discriminator(&self) -> [u8; 8] {
        match self {
            VaultCommand::SetDepositSubAccount { .. } => SET_DEPOSIT_SUB_ACCOUNT_DISCRIMINATOR,
            VaultCommand::SetWithdrawSubAccount { .. } => SET_WITHDRAW_SUB_ACCOUNT_DISCRIMINATOR,
            VaultCommand::Pause => PAUSE_DISCRIMINATOR,
            VaultCommand::Unpause => UNPAUSE_DISCRIMINATOR,
            VaultCommand::TransferAuthority { .. } => TRANSFER_AUTHORITY_DISCRIMINATOR,
            VaultCommand::AcceptAuthority => ACCEPT_AUTHORITY_DISCRIMINATOR,
            VaultCommand::SetPayout { .. } => SET_PAYOUT_DISCRIMINATOR,
            VaultCommand::SetStrategist { .. } => SET_STRATEGIST_DISCRIMINATOR,
            VaultCommand::SetWithdrawAuthority { .. } => SET_WITHDRAW_AUTHORITY_DISCRIMINATOR,
            VaultCommand::UpdateExchangeRateProvider { .. } => {
                UPDATE_EXCHANGE_RATE_PROVIDER_DISCRIMINATOR
            }
            VaultCommand::SetFees { .. } => SET_FEES_DISCRIMINATOR,
            VaultCommand::ConfigureExchangeRateUpdateBounds { .. } => {
                CONFIGURE_EXCHANGE_RATE_UPDATE_BOUNDS_DISCRIMINATOR
            }
        }
    }

    /// Reject values the program would refuse, before anything is sent.
    fn validate(&self) -> Result<(), VaultError> {
        match self {
            VaultCommand::SetPayout { new_payout } if *new_payout == Address::default() => {
                Err(VaultError::EncodingConstraintViolation(
                    "payout address must not be the default address".into(),
                ))
            }
            VaultCommand::SetStrategist { new_strategist }
                if *new_strategist == Address::default() =>
            {
                Err(VaultError::EncodingConstraintViolation(
                    "strategist must not be the default address".into(),
                ))
            }
            VaultCommand::SetFees {
                platform_fee_bps,
                performance_fee_bps,
            } => {
                for (name, bps) in [
                    ("platform fee", platform_fee_bps),
                    ("performance fee", performance_fee_bps),
                ] {
                    if *bps > BPS_SCALE {
                        return Err(VaultError::EncodingConstraintViolation(format!(
                            "{name} {bps} bps exceeds {BPS_SCALE}"
                        )));
                    }
                }
                Ok(())
            }
            VaultCommand::ConfigureExchangeRateUpdateBounds { bounds } => {
                if bounds.upper_bound < BPS_SCALE {
                    return Err(VaultError::EncodingConstraintViolation(format!(
                        "upper bound {} bps is below {BPS_SCALE}",
                        bounds.upper_bound
                    )));
                }
                if bounds.lower_bound > BPS_SCALE {
                    return Err(VaultError::EncodingConstraintViolation(format!(
                        "lower bound {} bps is above {BPS_SCALE}",
                        bounds.lower_bound
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Discriminator followed by the packed arguments.
    pub fn instruction_data(&self, vault_id: u64) -> Result<Vec<u8>, VaultError> {
        self.validate()?;

        let mut data = Vec::with_capacity(8 + 40);
        data.extend_from_slice(&self.discriminator());

        match self {
            VaultCommand::SetDepositSubAccount { new_sub_account }
            | VaultCommand::SetWithdrawSubAccount { new_sub_account } => {
                data.extend_from_slice(&encode_command_args(vault_id, *new_sub_account));
            }
            VaultCommand::Pause | VaultCommand::Unpause | VaultCommand::AcceptAuthority => {
                data.extend_from_slice(&vault_id.to_le_bytes());
            }
            VaultCommand::TransferAuthority {
                pending_authority: address,
            }
            | VaultCommand::SetPayout {
                new_payout: address,
            }
            | VaultCommand::SetStrategist {
                new_strategist: address,
            }
            | VaultCommand::SetWithdrawAuthority {
                new_authority: address,
            }
            | VaultCommand::UpdateExchangeRateProvider {
                new_provider: address,
            } => {
                data.extend_from_slice(&encode_address_args(vault_id, address));
            }
            VaultCommand::SetFees {
                platform_fee_bps,
                performance_fee_bps,
            } => {
                data.extend_from_slice(&encode_fee_args(
                    vault_id,
                    *platform_fee_bps,
                    *performance_fee_bps,
                ));
            }
            VaultCommand::ConfigureExchangeRateUpdateBounds { bounds } => {
                data.extend_from_slice(&encode_rate_bounds_args(vault_id, bounds));
            }
        }

        Ok(data)
    }
}

/// Build the instruction for `command` against vault `vault_id`.
///
/// Pure construction, no network access.
pub fn build_instruction(
    program_id: &Address,
    vault_id: u64,
    command: &VaultCommand,
    authority: &Address,
) -> Result<Instruction, VaultError> {
    let (vault_state, _) = vault_state_address(program_id, vault_id)?;
    let data = command.instruction_data(vault_id)?;

    debug!(
        "{} for vault {vault_id}: data {}",
        command.name(),
        hex::encode(&data)
    );

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*authority, true),
            AccountMeta::new(vault_state, false),
        ],
        data,
    })
}

/// Point new deposits of `vault_id` at `new_sub_account`.
pub fn set_deposit_sub_account(
    program_id: &Address,
    vault_id: u64,
    new_sub_account: u8,
    authority: &Address,
) -> Result<Instruction, VaultError> {
    build_instruction(
        program_id,
        vault_id,
        &VaultCommand::SetDepositSubAccount { new_sub_account },
        authority,
    )
}

/// Serve withdrawals of `vault_id` from `new_sub_account`.
pub fn set_withdraw_sub_account(
    program_id: &Address,
    vault_id: u64,
    new_sub_account: u8,
    authority: &Address,
) -> Result<Instruction, VaultError> {
    build_instruction(
        program_id,
        vault_id,
        &VaultCommand::SetWithdrawSubAccount { new_sub_account },
        authority,
    )
}

pub fn pause(program_id: &Address, vault_id: u64, authority: &Address) -> Result<Instruction, VaultError> {
    build_instruction(program_id, vault_id, &VaultCommand::Pause, authority)
}

pub fn unpause(program_id: &Address, vault_id: u64, authority: &Address) -> Result<Instruction, VaultError> {
    build_instruction(program_id, vault_id, &VaultCommand::Unpause, authority)
}

pub fn transfer_authority(
    program_id: &Address,
    vault_id: u64,
    pending_authority: &Address,
    authority: &Address,
) -> Result<Instruction, VaultError> {
    build_instruction(
        program_id,
        vault_id,
        &VaultCommand::TransferAuthority {
            pending_authority: *pending_authority,
        },
        authority,
    )
}

/// Must be signed by the pending authority, not the current one.
pub fn accept_authority(
    program_id: &Address,
    vault_id: u64,
    pending_authority: &Address,
) -> Result<Instruction, VaultError> {
    build_instruction(program_id, vault_id, &VaultCommand::AcceptAuthority, pending_authority)
}

pub fn set_payout(
    program_id: &Address,
    vault_id: u64,
    new_payout: &Address,
    authority: &Address,
) -> Result<Instruction, VaultError> {
    build_instruction(
        program_id,
        vault_id,
        &VaultCommand::SetPayout {
            new_payout: *new_payout,
        },
        authority,
    )
}

pub fn set_strategist(
    program_id: &Address,
    vault_id: u64,
    new_strategist: &Address,
    authority: &Address,
) -> Result<Instruction, VaultError> {
    build_instruction(
        program_id,
        vault_id,
        &VaultCommand::SetStrategist {
            new_strategist: *new_strategist,
        },
        authority,
    )
}

pub fn set_withdraw_authority(
    program_id: &Address,
    vault_id: u64,
    new_authority: &Address,
    authority: &Address,
) -> Result<Instruction, VaultError> {
    build_instruction(
        program_id,
        vault_id,
        &VaultCommand::SetWithdrawAuthority {
            new_authority: *new_authority,
        },
        authority,
    )
}

pub fn update_exchange_rate_provider(
    program_id: &Address,
    vault_id: u64,
    new_provider: &Address,
    authority: &Address,
) -> Result<Instruction, VaultError> {
    build_instruction(
        program_id,
        vault_id,
        &VaultCommand::UpdateExchangeRateProvider {
            new_provider: *new_provider,
        },
        authority,
    )
}

/// Both fees are in basis points and at most [`BPS_SCALE`].
pub fn set_fees(
    program_id: &Address,
    vault_id: u64,
    platform_fee_bps: u16,
    performance_fee_bps: u16,
    authority: &Address,
) -> Result<Instruction, VaultError> {
    build_instruction(
        program_id,
        vault_id,
        &VaultCommand::SetFees {
            platform_fee_bps,
            performance_fee_bps,
        },
        authority,
    )
}

pub fn configure_exchange_rate_update_bounds(
    program_id: &Address,
    vault_id: u64,
    bounds: RateBounds,
    authority: &Address,
) -> Result<Instruction, VaultError> {
    build_instruction(
        program_id,
        vault_id,
        &VaultCommand::ConfigureExchangeRateUpdateBounds { bounds },
        authority,
    )
}
