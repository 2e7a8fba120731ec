//! Async front-end over a shared orchestrator
//!
//! Proving is CPU-bound and blocking. The pool runs each request on the
//! blocking thread pool, admits at most `workers` requests at once and
//! bounds the wait for each one.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

use super::orchestrator::{ProofOrchestrator, TransferProof};
use super::request::TransferRequest;
use super::ProverError;
use crate::backend::ProofBackend;

/// Number of cores, or 1 if that cannot be determined
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

pub struct ProverPool<B> {
    orchestrator: Arc<ProofOrchestrator<B>>,
    permits: Arc<Semaphore>,
    max_generation_time: Duration,
}

impl<B: ProofBackend + 'static> ProverPool<B> {
    pub fn new(
        orchestrator: Arc<ProofOrchestrator<B>>,
        workers: Option<usize>,
        max_generation_time: Duration,
    ) -> Self {
        let workers = workers.unwrap_or_else(default_workers).max(1);
        Self {
            orchestrator,
            permits: Arc::new(Semaphore::new(workers)),
            max_generation_time,
        }
    }

    pub fn orchestrator(&self) -> &Arc<ProofOrchestrator<B>> {
        &self.orchestrator
    }

    /// Free worker slots
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Generate a proof, waiting for a free worker
    pub async fn generate(&self, request: TransferRequest) -> Result<TransferProof, ProverError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ProverError::Task("prover pool closed".to_string()))?;
        self.run(permit, request).await
    }

    /// Generate a proof only if a worker is free right now
    pub async fn try_generate(&self, request: TransferRequest) -> Result<TransferProof, ProverError> {
        let permit = Arc::clone(&self.permits)
            .try_acquire_owned()
            .map_err(|_| ProverError::Busy)?;
        self.run(permit, request).await
    }

    async fn run(
        &self,
        permit: OwnedSemaphorePermit,
        request: TransferRequest,
    ) -> Result<TransferProof, ProverError> {
        let orchestrator = Arc::clone(&self.orchestrator);
        // The permit travels with the blocking task: a timed-out proof keeps
        // its slot until it actually finishes.
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            orchestrator.generate_proof(&request)
        });

        match tokio::time::timeout(self.max_generation_time, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(ProverError::Task(join.to_string())),
            Err(_) => {
                warn!(
                    limit_ms = self.max_generation_time.as_millis() as u64,
                    "proof generation timed out"
                );
                Err(ProverError::Timeout(self.max_generation_time))
            }
        }
    }
}
