//! Commitment salts
//!
//! A salt is the blinding factor of a balance commitment. It is drawn fresh
//! for every transfer and consumed once: it opens the spent commitment,
//! derives the nullifier, and blinds the new balance commitment. After the
//! transfer it is either discarded or handed to the recipient out-of-band.

use halo2_proofs::pasta::Fp;
use rand::{CryptoRng, RngCore};
use std::fmt;
use std::str::FromStr;

use crate::field::{self, FieldError};

/// A commitment salt (a uniformly random field element)
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Salt {
    inner: Fp,
}

impl Salt {
    /// Draw a fresh salt
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            inner: field::random_fp(rng),
        }
    }

    /// Use a caller-chosen salt. Reusing a salt across transfers links them,
    /// so this is for deterministic replays and tests.
    pub fn from_field(f: Fp) -> Self {
        Self { inner: f }
    }

    /// Get the inner field element
    pub fn to_field(&self) -> Fp {
        self.inner
    }

    /// Hex form, for handing the salt to its owner
    pub fn to_hex(&self) -> String {
        field::to_hex(&self.inner)
    }
}

impl FromStr for Salt {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        field::from_hex(s).map(Self::from_field)
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Salt").field("inner", &"[REDACTED]").finish()
    }
}
