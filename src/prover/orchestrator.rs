//! Proof orchestration
//!
//! Turns a [`TransferRequest`] into a verified [`TransferProof`]:
//!
//! 1. Validate the request (no cryptographic work on bad input)
//! 2. Pick the salt, the balance commitment and the recipient tag
//! 3. Check that the commitment opens to the balance (hard abort)
//! 4. Prove with the backend
//! 5. Verify the fresh proof with the same backend; a proof that does not
//!    verify is never handed out

use halo2_proofs::pasta::Fp;
use rand::rngs::OsRng;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::payload::{format_for_settlement, proof_from_words, PayloadError, SettlementPayload};
use super::request::{TransferRequest, ValidatedRequest};
use super::stats::{ProofStats, StatsSnapshot};
use super::ProverError;
use crate::backend::{Proof, ProofBackend};
use crate::commitment::BalanceCommitment;
use crate::field;
use crate::recipient::{Address, RecipientBinding, RecipientOpening, RecipientTag};
use crate::salt::Salt;
use crate::transfer::{PublicSignals, TransferWitness};

/// A verified transfer proof and what the caller needs to hand over
pub struct TransferProof {
    pub proof: Proof,
    pub public_signals: PublicSignals,
    /// Opens both the spent and the new balance commitment
    pub salt: Salt,
    pub recipient: Address,
    /// Set only under [`RecipientBinding::Blinded`]; the recipient needs it
    /// to claim
    pub recipient_blinding: Option<Fp>,
    pub generation_time: Duration,
    pub stats: StatsSnapshot,
}

impl TransferProof {
    /// What the recipient presents to claim this transfer
    pub fn recipient_opening(&self) -> RecipientOpening {
        match self.recipient_blinding {
            Some(blinding) => RecipientOpening::blinded(self.recipient, blinding),
            None => RecipientOpening::legacy(self.recipient),
        }
    }
}

impl fmt::Debug for TransferProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferProof")
            .field("proof", &self.proof)
            .field("public_signals", &self.public_signals)
            .field("generation_time", &self.generation_time)
            .finish_non_exhaustive()
    }
}

/// A witness together with the recipient secrets used to build it
struct Prepared {
    witness: TransferWitness,
    recipient: Address,
    blinding: Option<Fp>,
}

/// Drives a proving backend
pub struct ProofOrchestrator<B> {
    backend: Arc<B>,
    binding: RecipientBinding,
    stats: ProofStats,
}

impl<B: ProofBackend> ProofOrchestrator<B> {
    pub fn new(backend: Arc<B>, binding: RecipientBinding) -> Self {
        Self {
            backend,
            binding,
            stats: ProofStats::new(),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn binding(&self) -> RecipientBinding {
        self.binding
    }

    /// Draw a fresh salt
    pub fn generate_salt(&self) -> Salt {
        Salt::random(&mut OsRng)
    }

    /// Validate `request` and build the witness it describes
    pub fn build_witness(&self, request: &TransferRequest) -> Result<TransferWitness, ProverError> {
        let validated = request.validate()?;
        Ok(self.prepare(validated).witness)
    }

    fn prepare(&self, request: ValidatedRequest) -> Prepared {
        let salt = request.salt.unwrap_or_else(|| self.generate_salt());
        let balance_commitment = request
            .balance_commitment
            .unwrap_or_else(|| BalanceCommitment::commit(request.sender_balance, &salt));

        let (recipient_tag, blinding) = match self.binding {
            RecipientBinding::Legacy => (RecipientTag::legacy(&request.recipient), None),
            RecipientBinding::Blinded => {
                let blinding = field::random_fp(&mut OsRng);
                (RecipientTag::blinded(&request.recipient, blinding), Some(blinding))
            }
        };

        Prepared {
            witness: TransferWitness {
                sender_balance: request.sender_balance,
                transfer_amount: request.transfer_amount,
                recipient_tag,
                salt,
                asset_id: request.asset_id,
                max_amount: request.max_amount,
                balance_commitment,
            },
            recipient: request.recipient,
            blinding,
        }
    }

    /// Generate and self-verify a transfer proof
    pub fn generate_proof(&self, request: &TransferRequest) -> Result<TransferProof, ProverError> {
        let started = Instant::now();

        match self.prove_request(request) {
            Ok((proof, public_signals, prepared)) => {
                let generation_time = started.elapsed();
                self.stats.record_success(generation_time);
                info!(
                    valid = public_signals.valid,
                    asset_id = public_signals.asset_id,
                    nullifier = ?public_signals.nullifier,
                    proof_len = proof.len(),
                    elapsed_ms = generation_time.as_millis() as u64,
                    "transfer proof generated"
                );
                Ok(TransferProof {
                    proof,
                    public_signals,
                    salt: prepared.witness.salt,
                    recipient: prepared.recipient,
                    recipient_blinding: prepared.blinding,
                    generation_time,
                    stats: self.stats.snapshot(),
                })
            }
            Err(e) => {
                self.stats.record_failure();
                error!(error = %e, retryable = e.is_retryable(), "proof generation failed");
                Err(e)
            }
        }
    }

    fn prove_request(
        &self,
        request: &TransferRequest,
    ) -> Result<(Proof, PublicSignals, Prepared), ProverError> {
        let prepared = self.prepare(request.validate()?);
        let expected = prepared.witness.public_signals()?;

        let (proof, public_signals) = self.backend.prove(&prepared.witness)?;
        debug!(proof_len = proof.len(), "backend returned proof");

        if public_signals != expected {
            error!("backend signals disagree with the witness");
            return Err(ProverError::Inconsistent);
        }
        if !self.backend.verify(&public_signals, &proof)? {
            error!(nullifier = ?public_signals.nullifier, "fresh proof failed verification");
            return Err(ProverError::Inconsistent);
        }

        Ok((proof, public_signals, prepared))
    }

    /// Lay out a proof for settlement under this backend's proof shape
    pub fn format_for_settlement(
        &self,
        proof: &Proof,
        public_signals: &PublicSignals,
    ) -> Result<SettlementPayload, PayloadError> {
        format_for_settlement(proof, public_signals, self.backend.proof_words())
    }

    /// Check a settlement payload off-ledger. No state is touched, so a
    /// payload that verifies here may still be refused at settlement.
    pub fn verify_payload(&self, payload: &SettlementPayload) -> Result<bool, ProverError> {
        if payload.proof.is_empty() {
            return Err(PayloadError::Empty.into());
        }
        if let Some(expected) = self.backend.proof_words() {
            if payload.proof.len() != expected {
                return Err(PayloadError::WrongLength {
                    expected,
                    actual: payload.proof.len(),
                }
                .into());
            }
        }

        let signals = payload.signals()?;
        let verified = self
            .backend
            .verify(&signals, &proof_from_words(&payload.proof))?;
        if verified {
            info!(
                valid = signals.valid,
                nullifier = ?signals.nullifier,
                "payload verified"
            );
        } else {
            warn!(nullifier = ?signals.nullifier, "payload failed verification");
        }
        Ok(verified)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}
