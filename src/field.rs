//! Field element helpers over the Pallas base field
//!
//! All protocol values live in `Fp`. At the API boundary field elements are
//! written as `0x`-prefixed big-endian hex of the canonical representation,
//! and settlement words are the canonical 32-byte little-endian repr.

use blake2::{Blake2b512, Digest};
use ff::{FromUniformBytes, PrimeField};
use halo2_proofs::pasta::Fp;
use rand::{CryptoRng, RngCore};
use thiserror::Error;

/// Errors when decoding a field element from external input
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("field element must be 0x-prefixed hex")]
    MissingPrefix,
    #[error("field element hex is malformed: {0}")]
    InvalidHex(String),
    #[error("field element must be at most 32 bytes, got {0}")]
    TooLong(usize),
    #[error("value is not a canonical field element")]
    NonCanonical,
}

/// Sample a uniformly random field element.
///
/// Draws 64 bytes and reduces them, which keeps the bias negligible.
pub fn random_fp<R: RngCore + CryptoRng>(rng: &mut R) -> Fp {
    let mut wide = [0u8; 64];
    rng.fill_bytes(&mut wide);
    Fp::from_uniform_bytes(&wide)
}

/// Hash a domain tag into a field element
pub fn domain_separator(domain: &[u8]) -> Fp {
    let mut hasher = Blake2b512::new();
    hasher.update(domain);
    let hash = hasher.finalize();

    let mut wide = [0u8; 64];
    wide.copy_from_slice(&hash);
    Fp::from_uniform_bytes(&wide)
}

/// Decode a canonical little-endian word
pub fn from_word(word: &[u8; 32]) -> Result<Fp, FieldError> {
    Option::from(Fp::from_repr(*word)).ok_or(FieldError::NonCanonical)
}

/// Encode as a canonical little-endian word
pub fn to_word(f: &Fp) -> [u8; 32] {
    f.to_repr()
}

/// Parse `0x`-prefixed big-endian hex. Leading zero bytes may be omitted.
pub fn from_hex(s: &str) -> Result<Fp, FieldError> {
    let digits = s.strip_prefix("0x").ok_or(FieldError::MissingPrefix)?;
    if digits.is_empty() {
        return Err(FieldError::InvalidHex("no digits after 0x".to_string()));
    }
    let padded = if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    let bytes = hex::decode(&padded).map_err(|e| FieldError::InvalidHex(e.to_string()))?;
    if bytes.len() > 32 {
        return Err(FieldError::TooLong(bytes.len()));
    }

    let mut repr = [0u8; 32];
    for (i, b) in bytes.iter().rev().enumerate() {
        repr[i] = *b;
    }
    from_word(&repr)
}

/// Format as `0x`-prefixed big-endian hex (always 64 digits)
pub fn to_hex(f: &Fp) -> String {
    let mut repr = f.to_repr();
    repr.reverse();
    format!("0x{}", hex::encode(repr))
}

/// Interpret a field element as a `u64`, if it is one
pub fn to_u64(f: &Fp) -> Option<u64> {
    let repr = f.to_repr();
    if repr[8..].iter().any(|b| *b != 0) {
        return None;
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&repr[..8]);
    Some(u64::from_le_bytes(low))
}
