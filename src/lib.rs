//! Private balance transfers with exactly-once settlement
//!
//! A sender proves, without revealing their balance, that a transfer is
//! allowed:
//! - Poseidon balance commitments over the Pasta field
//! - Nullifiers that make every committed balance spendable once
//! - A Halo2 circuit for the transfer rules (balance, cap, asset, amount)
//! - An orchestrator that builds witnesses, proves and self-verifies
//! - A settlement ledger that consumes nullifiers and holds pending
//!   transfers until their recipient claims them
//!
//! Invalid transfers still prove: the proof carries `valid = 0` and an
//! unchanged balance, and settlement refuses it.

pub mod backend;
pub mod circuit;
pub mod commitment;
pub mod config;
pub mod constants;
pub mod field;
pub mod nullifier;
pub mod prover;
pub mod recipient;
pub mod salt;
pub mod settlement;
pub mod transfer;

// Re-exports for convenience
pub use backend::{Halo2Backend, MockBackend, Proof, ProofBackend, ProofVerifier, ProvingArtifacts};
pub use commitment::{commit, BalanceCommitment};
pub use config::{Config, ProverConfig, SettlementConfig};
pub use constants::*;
pub use nullifier::{Nullifier, NullifierSet};
pub use prover::{ProofOrchestrator, ProverError, ProverPool, SettlementPayload, TransferProof, TransferRequest};
pub use recipient::{Address, RecipientBinding, RecipientOpening, RecipientTag};
pub use salt::Salt;
pub use settlement::{SettlementError, SettlementLedger};
pub use transfer::{evaluate_transfer, PublicSignals, TransferWitness};
