//! Recipient addresses and the tags that stand in for them on the ledger
//!
//! A transfer never publishes the recipient address itself. It publishes a
//! `RecipientTag`, and the pending transfer is keyed by that tag. Two
//! bindings exist:
//!
//! ```text
//! Legacy:   tag = address as a 160-bit integer
//! Blinded:  tag = PoseidonHash(domain_separator, address, blinding)
//! ```
//!
//! The legacy binding is what deployed clients compute. It is a reversible
//! encoding, not a hash: anyone holding the tag learns the address. The
//! blinded binding is a real one-way commitment with a fresh per-transfer
//! blinding factor that the sender hands to the recipient out-of-band.
//! Which binding a deployment uses is a configuration choice
//! (`RecipientBinding`), never a silent default change.

use ff::PrimeField;
use halo2_proofs::pasta::Fp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::commitment::poseidon_hash_chain;
use crate::constants::{domains, ADDRESS_SIZE};
use crate::field;

/// Errors parsing a recipient address
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must be 0x followed by 40 hex digits, got {0:?}")]
    Malformed(String),
}

/// A 20-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    inner: [u8; ADDRESS_SIZE],
}

impl Address {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self { inner: bytes }
    }

    /// Get the raw bytes
    pub fn to_bytes(&self) -> [u8; ADDRESS_SIZE] {
        self.inner
    }

    /// The address read as a big-endian integer, embedded in the field.
    /// 160 bits always fit below the modulus, so this never wraps.
    pub fn to_field(&self) -> Fp {
        let radix = Fp::from(256u64);
        self.inner
            .iter()
            .fold(Fp::zero(), |acc, b| acc * radix + Fp::from(u64::from(*b)))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || AddressError::Malformed(s.to_string());
        let digits = s.strip_prefix("0x").ok_or_else(malformed)?;
        if digits.len() != ADDRESS_SIZE * 2 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(malformed());
        }
        let mut inner = [0u8; ADDRESS_SIZE];
        hex::decode_to_slice(digits, &mut inner).map_err(|_| malformed())?;
        Ok(Self { inner })
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.inner))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

/// How recipient addresses are bound into the public recipient tag
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientBinding {
    /// Reversible integer encoding of the address (compatible with
    /// existing clients, provides no hiding)
    #[default]
    Legacy,
    /// One-way Poseidon commitment with a per-transfer blinding factor
    Blinded,
}

/// The public stand-in for a recipient
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecipientTag {
    inner: Fp,
}

impl std::hash::Hash for RecipientTag {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.to_repr().hash(state);
    }
}

impl RecipientTag {
    /// Legacy binding: the address itself, as an integer
    pub fn legacy(address: &Address) -> Self {
        Self {
            inner: address.to_field(),
        }
    }

    /// Blinded binding: a hiding commitment to the address
    pub fn blinded(address: &Address, blinding: Fp) -> Self {
        let domain = field::domain_separator(domains::RECIPIENT_TAG);
        Self {
            inner: poseidon_hash_chain([domain, address.to_field()], &[blinding]),
        }
    }

    /// Create from a raw field element
    pub fn from_field(f: Fp) -> Self {
        Self { inner: f }
    }

    /// Get the inner field element
    pub fn to_field(&self) -> Fp {
        self.inner
    }

    /// Hex form, as shared with the recipient
    pub fn to_hex(&self) -> String {
        field::to_hex(&self.inner)
    }
}

impl fmt::Debug for RecipientTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.inner.to_repr();
        write!(f, "RecipientTag({:02x}{:02x}...)", bytes[31], bytes[30])
    }
}

/// What a claimant presents to prove a tag is theirs
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecipientOpening {
    pub address: Address,
    /// Present only for blinded tags
    pub blinding: Option<Fp>,
}

impl RecipientOpening {
    /// Opening of a legacy tag
    pub fn legacy(address: Address) -> Self {
        Self {
            address,
            blinding: None,
        }
    }

    /// Opening of a blinded tag
    pub fn blinded(address: Address, blinding: Fp) -> Self {
        Self {
            address,
            blinding: Some(blinding),
        }
    }

    /// The tag this opening commits to
    pub fn tag(&self) -> RecipientTag {
        match self.blinding {
            None => RecipientTag::legacy(&self.address),
            Some(blinding) => RecipientTag::blinded(&self.address, blinding),
        }
    }
}

impl fmt::Debug for RecipientOpening {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecipientOpening")
            .field("address", &self.address)
            .field("blinding", &self.blinding.map(|_| "[REDACTED]"))
            .finish()
    }
}
