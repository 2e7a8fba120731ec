//! Fixed-layout transcript backend
//!
//! A deterministic, transparent stand-in for a proof system. The "proof" is
//! 24 keyed Blake2b words over the public signals:
//!
//! ```text
//! word[i] = Blake2b512(domain || key || i || signals)[..32]
//! ```
//!
//! It enforces the same transfer predicate as the circuit (the signals are
//! computed from the witness, and an integrity failure aborts), and it
//! binds every signal, so tampering any signal word breaks verification.
//! It provides NO zero-knowledge and NO soundness against anyone holding
//! the key.

use blake2::{Blake2b512, Digest};
use rand::{CryptoRng, RngCore};
use tracing::debug;

use super::{BackendError, Proof, ProofBackend, ProofVerifier};
use crate::constants::{domains, FIXED_PROOF_WORDS, WORD_SIZE};
use crate::transfer::{PublicSignals, TransferWitness};

/// Keyed transcript backend
#[derive(Clone, Default)]
pub struct MockBackend {
    key: [u8; 32],
}

impl MockBackend {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Backend with a fresh random key
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut key = [0u8; 32];
        rng.fill_bytes(&mut key);
        Self { key }
    }

    fn transcript(&self, signals: &PublicSignals) -> Vec<u8> {
        let words = signals.to_words();
        let mut out = Vec::with_capacity(FIXED_PROOF_WORDS * WORD_SIZE);
        for i in 0..FIXED_PROOF_WORDS {
            let mut hasher = Blake2b512::new()
                .chain_update(domains::MOCK_TRANSCRIPT)
                .chain_update(self.key)
                .chain_update((i as u32).to_le_bytes());
            for word in &words {
                hasher.update(word);
            }
            out.extend_from_slice(&hasher.finalize()[..WORD_SIZE]);
        }
        out
    }
}

impl ProofVerifier for MockBackend {
    fn verify(&self, signals: &PublicSignals, proof: &Proof) -> Result<bool, BackendError> {
        let ok = proof.as_bytes() == self.transcript(signals).as_slice();
        if !ok {
            debug!(proof_len = proof.len(), "transcript mismatch");
        }
        Ok(ok)
    }

    fn proof_words(&self) -> Option<usize> {
        Some(FIXED_PROOF_WORDS)
    }
}

impl ProofBackend for MockBackend {
    fn prove(&self, witness: &TransferWitness) -> Result<(Proof, PublicSignals), BackendError> {
        let signals = witness.public_signals()?;
        Ok((Proof::from_bytes(self.transcript(&signals)), signals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::commit;
    use crate::recipient::RecipientTag;
    use crate::salt::Salt;
    use crate::transfer::IntegrityError;
    use halo2_proofs::pasta::Fp;
    use rand::rngs::OsRng;

    fn witness(balance: u64, amount: u64) -> TransferWitness {
        let salt = Salt::random(&mut OsRng);
        TransferWitness {
            sender_balance: balance,
            transfer_amount: amount,
            recipient_tag: RecipientTag::from_field(Fp::from(99u64)),
            salt,
            asset_id: 1998,
            max_amount: 12000,
            balance_commitment: commit(balance, &salt),
        }
    }

    #[test]
    fn test_prove_then_verify() {
        let backend = MockBackend::random(&mut OsRng);
        let (proof, signals) = backend.prove(&witness(6000, 95)).unwrap();

        assert_eq!(proof.len(), FIXED_PROOF_WORDS * WORD_SIZE);
        assert!(signals.valid);
        assert!(backend.verify(&signals, &proof).unwrap());
    }

    #[test]
    fn test_deterministic() {
        let backend = MockBackend::default();
        let w = witness(6000, 95);
        let (p1, _) = backend.prove(&w).unwrap();
        let (p2, _) = backend.prove(&w).unwrap();
        assert_eq!(p1, p2);
    }

    #[test]
    fn test_signals_are_bound() {
        let backend = MockBackend::default();
        let (proof, signals) = backend.prove(&witness(6000, 95)).unwrap();

        let mut forged = signals;
        forged.new_balance += 1;
        assert!(!backend.verify(&forged, &proof).unwrap());
    }

    #[test]
    fn test_wrong_key_rejects() {
        let (proof, signals) = MockBackend::random(&mut OsRng).prove(&witness(6000, 95)).unwrap();
        let other = MockBackend::random(&mut OsRng);
        assert!(!other.verify(&signals, &proof).unwrap());
    }

    #[test]
    fn test_integrity_failure_aborts() {
        let mut w = witness(6000, 95);
        w.sender_balance = 7000;
        let err = MockBackend::default().prove(&w).unwrap_err();
        assert!(matches!(err, BackendError::Integrity(IntegrityError)));
    }
}
