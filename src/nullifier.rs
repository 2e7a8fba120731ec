//! Nullifier derivation
//!
//! The nullifier marks a specific commitment opening as spent. It is
//! published with every transfer proof; settlement refuses any nullifier it
//! has already consumed.
//!
//! nf = PoseidonHash(domain_separator, C, salt)
//!
//! Properties:
//! - Deterministic: the same `(C, salt)` always yields the same nullifier,
//!   so a resubmitted proof is detected as a replay
//! - Bound to the opening, not the balance: two salts for the same balance
//!   give unrelated nullifiers
//! - Does not reveal the balance or the salt

use ff::PrimeField;
use halo2_proofs::pasta::Fp;
use std::collections::HashSet;
use std::fmt;

use crate::commitment::{poseidon_hash_chain, BalanceCommitment};
use crate::constants::domains;
use crate::field;
use crate::salt::Salt;

/// A nullifier - revealed when a committed balance is spent
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Nullifier {
    inner: Fp,
}

// Fp does not implement Hash
impl std::hash::Hash for Nullifier {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

impl Nullifier {
    /// Derive the nullifier of the opening `(commitment, salt)`
    pub fn derive(commitment: &BalanceCommitment, salt: &Salt) -> Self {
        let inner = poseidon_hash_chain([domain(), commitment.to_field()], &[salt.to_field()]);
        Self { inner }
    }

    /// Create from a raw field element
    pub fn from_field(f: Fp) -> Self {
        Self { inner: f }
    }

    /// Get the inner field element
    pub fn to_field(&self) -> Fp {
        self.inner
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_repr()
    }
}

impl fmt::Debug for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        write!(f, "Nullifier({:02x}{:02x}...)", bytes[31], bytes[30])
    }
}

/// Domain separator for nullifier derivation, as a field element.
/// The circuit loads the same value as a fixed constant.
pub fn domain() -> Fp {
    field::domain_separator(domains::NULLIFIER)
}

/// An append-only set of consumed nullifiers
#[derive(Default, Clone, Debug)]
pub struct NullifierSet {
    nullifiers: HashSet<Nullifier>,
}

impl NullifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a nullifier has been consumed
    pub fn contains(&self, nf: &Nullifier) -> bool {
        self.nullifiers.contains(nf)
    }

    /// Insert-if-absent. Returns false if the nullifier was already
    /// consumed (replay attempt); the set is unchanged in that case.
    pub fn insert(&mut self, nf: Nullifier) -> bool {
        self.nullifiers.insert(nf)
    }

    /// Number of consumed nullifiers
    pub fn len(&self) -> usize {
        self.nullifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nullifiers.is_empty()
    }
}
