//! Proving backends
//!
//! The orchestrator and the settlement ledger only see these two traits.
//! Every implementation must be interchangeable: a proof produced by
//! `ProofBackend::prove` over a witness verifies under `ProofVerifier::verify`
//! against exactly the public signals it returned.
//!
//! - [`Halo2Backend`]: real halo2 IPA proofs over Pasta with the transfer circuit
//! - [`MockBackend`]: deterministic keyed transcript with a fixed 24-word
//!   layout. Transparent, NO zero knowledge. For tests and local runs.

pub mod halo2;
pub mod mock;

use std::fmt;
use thiserror::Error;

use crate::transfer::{IntegrityError, PublicSignals, TransferWitness};

pub use self::halo2::{ArtifactError, ArtifactManifest, Halo2Backend, ProvingArtifacts};
pub use self::mock::MockBackend;

/// Opaque proof bytes
#[derive(Clone, PartialEq, Eq)]
pub struct Proof(Vec<u8>);

impl Proof {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Proof({} bytes)", self.0.len())
    }
}

/// Errors raised by a proving backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("witness rejected: {0}")]
    Integrity(#[from] IntegrityError),
    #[error("proof synthesis failed: {0}")]
    Synthesis(String),
    #[error("proving artifacts unavailable: {0}")]
    Artifacts(#[from] ArtifactError),
}

impl BackendError {
    /// Whether the same request may succeed on a later attempt.
    /// Integrity and artifact failures are permanent for a given
    /// witness and deployment.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Synthesis(_))
    }
}

/// Checks a proof against its public signals
pub trait ProofVerifier: Send + Sync {
    /// `Ok(false)` for a proof that does not verify; `Err` only when the
    /// backend itself cannot run.
    fn verify(&self, signals: &PublicSignals, proof: &Proof) -> Result<bool, BackendError>;

    /// Exact proof length in 32-byte words, if the backend has a fixed layout
    fn proof_words(&self) -> Option<usize> {
        None
    }
}

/// Produces proofs over transfer witnesses
pub trait ProofBackend: ProofVerifier {
    /// Prove the transfer predicate over `witness`, returning the proof and
    /// the public signals it commits to
    fn prove(&self, witness: &TransferWitness) -> Result<(Proof, PublicSignals), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(BackendError::Synthesis("rng".into()).is_retryable());
        assert!(!BackendError::Integrity(IntegrityError).is_retryable());
        assert!(!BackendError::Artifacts(ArtifactError::Missing("params.bin".into())).is_retryable());
    }

    #[test]
    fn test_proof_debug_hides_bytes() {
        let proof = Proof::from_bytes(vec![0xab; 64]);
        assert_eq!(format!("{:?}", proof), "Proof(64 bytes)");
    }
}
