//! Versioned (v0) transaction wire format and signing.
//!
//! Transactions are built by hand, no `solana-sdk`. The wire layout:
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     version_prefix        u8 (0x80 | version, always 0x80 here)
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!     num_lookup_tables     compact-u16 (always 0 here)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```

use std::fmt;
use std::str::FromStr;

use crate::address::Address;
use crate::error::SvmError;
use crate::signer::{Signature, Signer, SIGNATURE_BYTES};

/// High bit set on the first message byte marks a versioned message.
pub const MESSAGE_VERSION_PREFIX: u8 = 0x80;

/// Account indices are single bytes.
const MAX_ACCOUNT_KEYS: usize = 256;

/// Program index plus two empty compact-u16 lengths.
const MIN_INSTRUCTION_BYTES: usize = 3;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in Solana's compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 value from a byte slice.
///
/// Returns `(value, bytes_consumed)` or an error if the data is truncated.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), SvmError> {
    let mut value: u32 = 0;
    let mut shift = 0u32;
    let mut consumed = 0usize;

    loop {
        let byte = *data.get(consumed).ok_or_else(|| {
            SvmError::SerializationError(
                "unexpected end of data while decoding compact-u16".into(),
            )
        })?;
        consumed += 1;

        value |= ((byte & 0x7f) as u32) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            break;
        }
        if consumed >= 3 {
            break;
        }
    }

    if value > u16::MAX as u32 {
        return Err(SvmError::SerializationError(
            "compact-u16 value overflow".into(),
        ));
    }

    Ok((value as u16, consumed))
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A recent blockhash: the network checkpoint a transaction is pinned to.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Blockhash([u8; 32]);

impl Blockhash {
    pub const fn new_from_array(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl FromStr for Blockhash {
    type Err = SvmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| SvmError::SerializationError(format!("base58 decode failed: {e}")))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            SvmError::SerializationError(format!("expected 32 blockhash bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blockhash({self})")
    }
}

/// A single account reference in an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta {
    pub address: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    /// A writable account reference.
    pub fn new(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: true,
        }
    }

    /// A read-only account reference.
    pub fn new_readonly(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: false,
        }
    }
}

/// An instruction before it is compiled into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Address,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// The three permission counts at the start of every message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageHeader {
    /// Number of required signatures (first N account keys are signers).
    pub num_required_signatures: u8,
    /// How many of the signing accounts are read-only.
    pub num_readonly_signed_accounts: u8,
    /// How many of the non-signing accounts are read-only.
    pub num_readonly_unsigned_accounts: u8,
}

/// A compiled instruction where account references are replaced by u8 indices
/// into the message's `account_keys` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// A v0 message without address-lookup tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,

    /// All account keys referenced by this message, in canonical order:
    ///   1. writable signers (payer first)
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<Address>,

    pub recent_blockhash: Blockhash,

    pub instructions: Vec<CompiledInstruction>,
}

// ---------------------------------------------------------------------------
// Message compilation
// ---------------------------------------------------------------------------

impl Message {
    /// Compile `instructions` into a message paid for by `payer`.
    ///
    /// The payer is always the first account key and always a writable
    /// signer.
    pub fn compile(
        instructions: &[Instruction],
        payer: &Address,
        recent_blockhash: Blockhash,
    ) -> Result<Self, SvmError> {
        if instructions.is_empty() {
            return Err(SvmError::TransactionBuildError(
                "at least one instruction is required".into(),
            ));
        }

        // Instruction account lists are tiny, a Vec scan beats a map here.
        struct AccountEntry {
            address: Address,
            is_signer: bool,
            is_writable: bool,
        }

        let mut entries: Vec<AccountEntry> = Vec::new();

        let mut upsert = |address: Address, signer: bool, writable: bool| {
            if let Some(entry) = entries.iter_mut().find(|e| e.address == address) {
                entry.is_signer |= signer;
                entry.is_writable |= writable;
            } else {
                entries.push(AccountEntry {
                    address,
                    is_signer: signer,
                    is_writable: writable,
                });
            }
        };

        upsert(*payer, true, true);

        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.address, meta.is_signer, meta.is_writable);
            }
            // Program IDs are non-signer, read-only accounts.
            upsert(ix.program_id, false, false);
        }

        if entries.len() > MAX_ACCOUNT_KEYS {
            return Err(SvmError::TransactionBuildError(format!(
                "too many account keys: {}",
                entries.len()
            )));
        }

        // Stable sort keeps insertion order inside a category, so the payer
        // (inserted first, writable signer) stays at index 0.
        entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
            (true, true) => 0u8,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        });

        let num_signers = entries.iter().filter(|e| e.is_signer).count();
        let num_readonly_signed = entries
            .iter()
            .filter(|e| e.is_signer && !e.is_writable)
            .count();
        let num_readonly_unsigned = entries
            .iter()
            .filter(|e| !e.is_signer && !e.is_writable)
            .count();

        let count_to_u8 = |count: usize| {
            u8::try_from(count).map_err(|_| {
                SvmError::TransactionBuildError(format!("account count {count} exceeds u8"))
            })
        };

        let header = MessageHeader {
            num_required_signatures: count_to_u8(num_signers)?,
            num_readonly_signed_accounts: count_to_u8(num_readonly_signed)?,
            num_readonly_unsigned_accounts: count_to_u8(num_readonly_unsigned)?,
        };

        let account_keys: Vec<Address> = entries.iter().map(|e| e.address).collect();

        let index_of = |address: &Address| {
            account_keys
                .iter()
                .position(|k| k == address)
                .map(|i| i as u8)
                .ok_or_else(|| {
                    SvmError::TransactionBuildError(format!("{address} not in account keys"))
                })
        };

        let mut compiled = Vec::with_capacity(instructions.len());
        for ix in instructions {
            let program_id_index = index_of(&ix.program_id)?;
            let account_indices = ix
                .accounts
                .iter()
                .map(|meta| index_of(&meta.address))
                .collect::<Result<Vec<_>, _>>()?;

            compiled.push(CompiledInstruction {
                program_id_index,
                account_indices,
                data: ix.data.clone(),
            });
        }

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions: compiled,
        })
    }

    /// The account keys that must sign this message, in signature order.
    pub fn signer_keys(&self) -> &[Address] {
        let n = (self.header.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..n]
    }

    /// The fee payer (first account key).
    pub fn payer(&self) -> Option<&Address> {
        self.account_keys.first()
    }

    /// Serialize the message (the bytes that get signed).
    pub fn serialize(&self) -> Result<Vec<u8>, SvmError> {
        let mut buf = Vec::with_capacity(256);

        buf.push(MESSAGE_VERSION_PREFIX);

        buf.push(self.header.num_required_signatures);
        buf.push(self.header.num_readonly_signed_accounts);
        buf.push(self.header.num_readonly_unsigned_accounts);

        buf.extend_from_slice(&encode_compact_u16(compact_len(self.account_keys.len())?));
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_ref());
        }

        buf.extend_from_slice(&self.recent_blockhash.to_bytes());

        buf.extend_from_slice(&encode_compact_u16(compact_len(self.instructions.len())?));
        for ix in &self.instructions {
            buf.push(ix.program_id_index);

            buf.extend_from_slice(&encode_compact_u16(compact_len(ix.account_indices.len())?));
            buf.extend_from_slice(&ix.account_indices);

            buf.extend_from_slice(&encode_compact_u16(compact_len(ix.data.len())?));
            buf.extend_from_slice(&ix.data);
        }

        // Address-table lookups: none.
        buf.extend_from_slice(&encode_compact_u16(0));

        Ok(buf)
    }

    /// Parse a serialized v0 message. Lookup tables are not supported.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, SvmError> {
        let mut reader = WireReader::new(bytes);

        let prefix = reader.read_u8()?;
        if prefix != MESSAGE_VERSION_PREFIX {
            return Err(SvmError::SerializationError(format!(
                "unsupported message version prefix 0x{prefix:02x}"
            )));
        }

        let header = MessageHeader {
            num_required_signatures: reader.read_u8()?,
            num_readonly_signed_accounts: reader.read_u8()?,
            num_readonly_unsigned_accounts: reader.read_u8()?,
        };

        let num_keys = reader.read_compact_u16()? as usize;
        // Counts are untrusted; never reserve more than the input could hold.
        let mut account_keys = Vec::with_capacity(num_keys.min(reader.remaining() / 32));
        for _ in 0..num_keys {
            account_keys.push(Address::try_from_slice(reader.take(32)?)?);
        }

        let blockhash: [u8; 32] = reader
            .take(32)?
            .try_into()
            .map_err(|_| SvmError::SerializationError("truncated blockhash".into()))?;

        let num_instructions = reader.read_compact_u16()? as usize;
        let mut instructions =
            Vec::with_capacity(num_instructions.min(reader.remaining() / MIN_INSTRUCTION_BYTES));
        for _ in 0..num_instructions {
            let program_id_index = reader.read_u8()?;
            let n = reader.read_compact_u16()? as usize;
            let account_indices = reader.take(n)?.to_vec();
            let len = reader.read_compact_u16()? as usize;
            let data = reader.take(len)?.to_vec();

            let out_of_range = std::iter::once(program_id_index)
                .chain(account_indices.iter().copied())
                .any(|i| i as usize >= account_keys.len());
            if out_of_range {
                return Err(SvmError::SerializationError(
                    "instruction references an unknown account index".into(),
                ));
            }

            instructions.push(CompiledInstruction {
                program_id_index,
                account_indices,
                data,
            });
        }

        if reader.read_compact_u16()? != 0 {
            return Err(SvmError::SerializationError(
                "address table lookups are not supported".into(),
            ));
        }
        if reader.remaining() != 0 {
            return Err(SvmError::SerializationError(format!(
                "{} trailing bytes after message",
                reader.remaining()
            )));
        }

        Ok(Self {
            header,
            account_keys,
            recent_blockhash: Blockhash::new_from_array(blockhash),
            instructions,
        })
    }
}

// ---------------------------------------------------------------------------
// Signed transactions
// ---------------------------------------------------------------------------

/// A signed v0 transaction. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedTransaction {
    pub signatures: Vec<Signature>,
    pub message: Message,
}

impl VersionedTransaction {
    /// Sign `message` with `signers`.
    ///
    /// Every required signer (payer included) must be present, and every
    /// supplied signer must be required by the message.
    pub fn try_new(message: Message, signers: &[&dyn Signer]) -> Result<Self, SvmError> {
        let message_bytes = message.serialize()?;
        let required = message.signer_keys();

        for signer in signers {
            let address = signer.address();
            if !required.contains(&address) {
                return Err(SvmError::SigningError(format!(
                    "{address} is not a required signer"
                )));
            }
        }

        let mut signatures = Vec::with_capacity(required.len());
        for key in required {
            let signer = signers
                .iter()
                .find(|s| s.address() == *key)
                .ok_or_else(|| SvmError::SigningError(format!("missing signature for {key}")))?;
            signatures.push(signer.try_sign_message(&message_bytes)?);
        }

        Ok(Self {
            signatures,
            message,
        })
    }

    /// The first signature, which identifies the transaction on the network.
    pub fn signature(&self) -> Option<&Signature> {
        self.signatures.first()
    }

    /// Serialize into the wire format accepted by `sendTransaction`.
    pub fn to_wire(&self) -> Result<Vec<u8>, SvmError> {
        let message_bytes = self.message.serialize()?;
        let mut wire =
            Vec::with_capacity(3 + SIGNATURE_BYTES * self.signatures.len() + message_bytes.len());

        wire.extend_from_slice(&encode_compact_u16(compact_len(self.signatures.len())?));
        for signature in &self.signatures {
            wire.extend_from_slice(signature.as_ref());
        }
        wire.extend_from_slice(&message_bytes);

        Ok(wire)
    }

    /// Parse wire bytes back into a transaction. Signatures are not checked,
    /// see [`VersionedTransaction::verify`].
    pub fn from_wire(raw_tx: &[u8]) -> Result<Self, SvmError> {
        let mut reader = WireReader::new(raw_tx);

        let num_sigs = reader.read_compact_u16()? as usize;
        if num_sigs == 0 {
            return Err(SvmError::SerializationError(
                "transaction has zero signatures".into(),
            ));
        }

        let mut signatures =
            Vec::with_capacity(num_sigs.min(reader.remaining() / SIGNATURE_BYTES));
        for _ in 0..num_sigs {
            let bytes: [u8; SIGNATURE_BYTES] = reader
                .take(SIGNATURE_BYTES)?
                .try_into()
                .map_err(|_| SvmError::SerializationError("truncated signature".into()))?;
            signatures.push(Signature::new_from_array(bytes));
        }

        let message = Message::deserialize(reader.rest())?;
        if message.header.num_required_signatures as usize != num_sigs {
            return Err(SvmError::SerializationError(format!(
                "message requires {} signatures, transaction carries {num_sigs}",
                message.header.num_required_signatures
            )));
        }

        Ok(Self {
            signatures,
            message,
        })
    }

    /// Check every signature against its signer key.
    pub fn verify(&self) -> Result<(), SvmError> {
        let message_bytes = self.message.serialize()?;
        let keys = self.message.signer_keys();
        if keys.len() != self.signatures.len() {
            return Err(SvmError::SigningError(
                "signature count does not match required signers".into(),
            ));
        }
        for (key, signature) in keys.iter().zip(&self.signatures) {
            if !signature.verify(key, &message_bytes) {
                return Err(SvmError::SigningError(format!(
                    "signature verification failed for {key}"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn compact_len(len: usize) -> Result<u16, SvmError> {
    u16::try_from(len)
        .map_err(|_| SvmError::SerializationError(format!("length {len} exceeds compact-u16")))
}

/// Bounds-checked cursor over wire bytes.
struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], SvmError> {
        if n > self.remaining() {
            return Err(SvmError::SerializationError(format!(
                "unexpected end of data: wanted {n} bytes at offset {}, {} left",
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8, SvmError> {
        Ok(self.take(1)?[0])
    }

    fn read_compact_u16(&mut self) -> Result<u16, SvmError> {
        let (value, consumed) = decode_compact_u16(&self.data[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }

    fn rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }
}
