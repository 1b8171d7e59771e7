//! Program-derived addresses.
//!
//! A program-derived address (PDA) is
//! `SHA-256(seed_0 || ... || seed_n || bump || program_id || "ProgramDerivedAddress")`
//! for the first bump, searched from 255 down to 0, whose digest is NOT a
//! valid Ed25519 point. Only the owning program can sign for it.

use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::error::SvmError;

/// Maximum number of seeds, bump included.
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single seed in bytes.
pub const MAX_SEED_LEN: usize = 32;

/// The string appended to PDA derivation: "ProgramDerivedAddress".
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Find the canonical program-derived address for `seeds` under `program_id`.
///
/// Returns `(address, bump)`. The search is bounded to 256 candidates; running
/// out of bumps yields [`SvmError::NoViableProgramAddress`], which is not
/// expected to happen in practice.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<(Address, u8), SvmError> {
    check_seeds(seeds, 1)?;

    for bump in (0u8..=255).rev() {
        if let Some(address) = hash_seeds(seeds, &[bump], program_id) {
            return Ok((address, bump));
        }
    }

    Err(SvmError::NoViableProgramAddress)
}

/// Create a program address from seeds that already include the bump.
///
/// Fails with [`SvmError::NoViableProgramAddress`] if the digest lands on
/// the curve.
pub fn create_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<Address, SvmError> {
    check_seeds(seeds, 0)?;
    hash_seeds(seeds, &[], program_id).ok_or(SvmError::NoViableProgramAddress)
}

fn check_seeds(seeds: &[&[u8]], reserved: usize) -> Result<(), SvmError> {
    if seeds.len() + reserved > MAX_SEEDS {
        return Err(SvmError::MaxSeedLengthExceeded);
    }
    if seeds.iter().any(|seed| seed.len() > MAX_SEED_LEN) {
        return Err(SvmError::MaxSeedLengthExceeded);
    }
    Ok(())
}

/// Returns `Some(address)` if the digest is OFF the Ed25519 curve,
/// `None` if it falls on the curve.
fn hash_seeds(seeds: &[&[u8]], bump_seed: &[u8], program_id: &Address) -> Option<Address> {
    let mut hasher = Sha256::new();

    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(bump_seed);
    hasher.update(program_id.as_ref());
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();
    let address = Address::new_from_array(hash);

    if address.is_on_curve() {
        return None;
    }

    Some(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
    const ASSOCIATED_TOKEN_PROGRAM: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";

    #[test]
    fn pda_is_not_on_curve() {
        let program_id = Address::new_from_array([0xAA; 32]);
        let (address, _) = find_program_address(&[b"seed", &7u64.to_le_bytes()], &program_id).unwrap();
        assert!(!address.is_on_curve(), "PDA must NOT be on the Ed25519 curve");
    }

    #[test]
    fn derivation_is_deterministic() {
        let program_id = Address::new_from_array([0x11; 32]);
        let a = find_program_address(&[b"boring-vault-state", &1u64.to_le_bytes()], &program_id)
            .unwrap();
        let b = find_program_address(&[b"boring-vault-state", &1u64.to_le_bytes()], &program_id)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn random_inputs_are_deterministic() {
        for _ in 0..32 {
            let program_id = Address::new_from_array(rand::random());
            let id: u64 = rand::random();
            let first = find_program_address(&[b"ns", &id.to_le_bytes()], &program_id).unwrap();
            let second = find_program_address(&[b"ns", &id.to_le_bytes()], &program_id).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn different_seeds_give_different_addresses() {
        let program_id = Address::new_from_array([0x42; 32]);
        let (a, _) = find_program_address(&[b"ns", &1u64.to_le_bytes()], &program_id).unwrap();
        let (b, _) = find_program_address(&[b"ns", &2u64.to_le_bytes()], &program_id).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn different_programs_give_different_addresses() {
        let seeds: &[&[u8]] = &[b"ns", &[9u8; 8]];
        let (a, _) = find_program_address(seeds, &Address::new_from_array([1; 32])).unwrap();
        let (b, _) = find_program_address(seeds, &Address::new_from_array([2; 32])).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn bump_recreates_the_same_address() {
        let program_id = Address::new_from_array([0x33; 32]);
        let id = 99u64.to_le_bytes();
        let (address, bump) = find_program_address(&[b"ns", &id], &program_id).unwrap();
        let recreated = create_program_address(&[b"ns", &id, &[bump]], &program_id).unwrap();
        assert_eq!(address, recreated);
    }

    #[test]
    fn known_associated_token_account() {
        // ATA of wallet 11111111111111111111111111111111 for the wSOL mint.
        let wallet = Address::default();
        let mint: Address = "So11111111111111111111111111111111111111112".parse().unwrap();
        let token_program: Address = TOKEN_PROGRAM.parse().unwrap();
        let ata_program: Address = ASSOCIATED_TOKEN_PROGRAM.parse().unwrap();

        let (ata, bump) = find_program_address(
            &[wallet.as_ref(), token_program.as_ref(), mint.as_ref()],
            &ata_program,
        )
        .unwrap();
        assert_eq!(ata.to_string(), "aqxoAhCwpy3oB1BpNw9hL1HdLYLgPpbPjzxDrrQj3Fs");
        assert_eq!(bump, 254);
        assert!(!ata.is_on_curve());
    }

    #[test]
    fn oversized_seed_is_rejected() {
        let program_id = Address::default();
        let result = find_program_address(&[&[0u8; 33]], &program_id);
        assert!(matches!(result, Err(SvmError::MaxSeedLengthExceeded)));
    }

    #[test]
    fn too_many_seeds_are_rejected() {
        let program_id = Address::default();
        let seeds = vec![b"x".as_slice(); MAX_SEEDS];
        // 16 seeds plus the bump is one too many.
        let result = find_program_address(&seeds, &program_id);
        assert!(matches!(result, Err(SvmError::MaxSeedLengthExceeded)));
    }
}
