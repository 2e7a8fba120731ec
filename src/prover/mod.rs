//! Proof orchestration: requests in, settlement-ready proofs out

pub mod orchestrator;
pub mod payload;
pub mod pool;
pub mod request;
pub mod stats;

use std::time::Duration;
use thiserror::Error;

use crate::backend::BackendError;
use crate::transfer::IntegrityError;

pub use orchestrator::{ProofOrchestrator, TransferProof};
pub use payload::{format_for_settlement, HexPayload, PayloadError, SettlementPayload};
pub use pool::ProverPool;
pub use request::{InputError, TransferRequest};
pub use stats::{ProofStats, StatsSnapshot};

/// Errors from proof generation
#[derive(Debug, Error)]
pub enum ProverError {
    #[error("invalid request: {0}")]
    Input(#[from] InputError),
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    #[error("backend failure: {0}")]
    Backend(#[from] BackendError),
    #[error("malformed settlement payload: {0}")]
    Payload(#[from] PayloadError),
    #[error("backend produced a proof that does not verify against its own signals")]
    Inconsistent,
    #[error("proof generation exceeded {0:?}")]
    Timeout(Duration),
    #[error("prover pool is at capacity")]
    Busy,
    #[error("prover task failed: {0}")]
    Task(String),
}

impl ProverError {
    /// Whether resubmitting the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ProverError::Backend(e) => e.is_retryable(),
            ProverError::Timeout(_) | ProverError::Busy => true,
            _ => false,
        }
    }
}
