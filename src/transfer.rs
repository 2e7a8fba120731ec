//! The transfer predicate
//!
//! This is the rule the transfer circuit enforces, written natively. The
//! witness side (orchestrator, backends) and the circuit must agree on it
//! bit-for-bit.
//!
//! A transfer is `valid` iff all of:
//! - transfer_amount > 0
//! - transfer_amount <= sender_balance
//! - transfer_amount <= max_amount
//! - asset_id != 0
//!
//! Failing one of these is a business outcome, not an error: the proof is
//! still produced with `valid = 0` and `new_balance = sender_balance`.
//!
//! Separately, the claimed `balance_commitment` must open to
//! `(sender_balance, salt)`. That is an integrity rule: a witness that lies
//! about its own opening has no meaningful proof, so evaluation aborts.

use halo2_proofs::pasta::Fp;
use std::fmt;
use thiserror::Error;

use crate::commitment::BalanceCommitment;
use crate::constants::{signal, PUBLIC_SIGNAL_COUNT};
use crate::field;
use crate::nullifier::Nullifier;
use crate::recipient::RecipientTag;
use crate::salt::Salt;

/// The claimed commitment does not open to the supplied balance and salt
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("balance commitment does not open to the supplied balance and salt")]
pub struct IntegrityError;

/// Errors decoding a public signal vector
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignalError {
    #[error("expected {expected} public signals, got {actual}")]
    WrongCount { expected: usize, actual: usize },
    #[error("public signal {index} is not a canonical field element")]
    NonCanonical { index: usize },
    #[error("validity flag must be 0 or 1")]
    InvalidFlag,
    #[error("public signal {index} does not fit in 64 bits")]
    OutOfRange { index: usize },
}

/// Result of evaluating the transfer predicate
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TransferEvaluation {
    pub valid: bool,
    pub new_balance: u64,
    pub new_commitment: BalanceCommitment,
    pub nullifier: Nullifier,
}

/// Evaluate the transfer predicate
pub fn evaluate_transfer(
    sender_balance: u64,
    transfer_amount: u64,
    asset_id: u64,
    max_amount: u64,
    balance_commitment: &BalanceCommitment,
    salt: &Salt,
) -> Result<TransferEvaluation, IntegrityError> {
    if !balance_commitment.opens_to(sender_balance, salt) {
        return Err(IntegrityError);
    }

    let valid = transfer_amount > 0
        && transfer_amount <= sender_balance
        && transfer_amount <= max_amount
        && asset_id != 0;

    // No silent mutation on failure
    let new_balance = if valid {
        sender_balance - transfer_amount
    } else {
        sender_balance
    };

    Ok(TransferEvaluation {
        valid,
        new_balance,
        new_commitment: BalanceCommitment::commit(new_balance, salt),
        nullifier: Nullifier::derive(balance_commitment, salt),
    })
}

/// The private inputs of a transfer proof.
///
/// Lives only in the memory of the process generating the proof.
#[derive(Clone)]
pub struct TransferWitness {
    pub sender_balance: u64,
    pub transfer_amount: u64,
    pub recipient_tag: RecipientTag,
    pub salt: Salt,
    pub asset_id: u64,
    pub max_amount: u64,
    pub balance_commitment: BalanceCommitment,
}

impl TransferWitness {
    /// Run the transfer predicate over this witness
    pub fn evaluate(&self) -> Result<TransferEvaluation, IntegrityError> {
        evaluate_transfer(
            self.sender_balance,
            self.transfer_amount,
            self.asset_id,
            self.max_amount,
            &self.balance_commitment,
            &self.salt,
        )
    }

    /// The public signals a proof over this witness exposes
    pub fn public_signals(&self) -> Result<PublicSignals, IntegrityError> {
        let eval = self.evaluate()?;
        Ok(PublicSignals {
            valid: eval.valid,
            new_balance: eval.new_balance,
            new_balance_commitment: eval.new_commitment,
            recipient_tag: self.recipient_tag,
            nullifier: eval.nullifier,
            asset_id: self.asset_id,
            max_amount: self.max_amount,
            balance_commitment: self.balance_commitment,
        })
    }
}

impl fmt::Debug for TransferWitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TransferWitness([REDACTED])")
    }
}

/// The public outputs of a transfer proof, in signal order
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PublicSignals {
    pub valid: bool,
    pub new_balance: u64,
    pub new_balance_commitment: BalanceCommitment,
    pub recipient_tag: RecipientTag,
    pub nullifier: Nullifier,
    pub asset_id: u64,
    pub max_amount: u64,
    pub balance_commitment: BalanceCommitment,
}

impl PublicSignals {
    /// Flatten to the ordered field tuple the circuit exposes
    pub fn to_fields(&self) -> [Fp; PUBLIC_SIGNAL_COUNT] {
        let mut out = [Fp::zero(); PUBLIC_SIGNAL_COUNT];
        out[signal::VALID] = Fp::from(u64::from(self.valid));
        out[signal::NEW_BALANCE] = Fp::from(self.new_balance);
        out[signal::NEW_BALANCE_COMMITMENT] = self.new_balance_commitment.to_field();
        out[signal::RECIPIENT_TAG] = self.recipient_tag.to_field();
        out[signal::NULLIFIER] = self.nullifier.to_field();
        out[signal::ASSET_ID] = Fp::from(self.asset_id);
        out[signal::MAX_AMOUNT] = Fp::from(self.max_amount);
        out[signal::BALANCE_COMMITMENT] = self.balance_commitment.to_field();
        out
    }

    /// Rebuild from the ordered field tuple, rejecting any other shape
    pub fn from_fields(fields: &[Fp]) -> Result<Self, SignalError> {
        if fields.len() != PUBLIC_SIGNAL_COUNT {
            return Err(SignalError::WrongCount {
                expected: PUBLIC_SIGNAL_COUNT,
                actual: fields.len(),
            });
        }

        let small = |index: usize| {
            field::to_u64(&fields[index]).ok_or(SignalError::OutOfRange { index })
        };

        let valid = match small(signal::VALID) {
            Ok(0) => false,
            Ok(1) => true,
            _ => return Err(SignalError::InvalidFlag),
        };

        Ok(Self {
            valid,
            new_balance: small(signal::NEW_BALANCE)?,
            new_balance_commitment: BalanceCommitment::from_field(
                fields[signal::NEW_BALANCE_COMMITMENT],
            ),
            recipient_tag: RecipientTag::from_field(fields[signal::RECIPIENT_TAG]),
            nullifier: Nullifier::from_field(fields[signal::NULLIFIER]),
            asset_id: small(signal::ASSET_ID)?,
            max_amount: small(signal::MAX_AMOUNT)?,
            balance_commitment: BalanceCommitment::from_field(fields[signal::BALANCE_COMMITMENT]),
        })
    }

    /// Encode as canonical 32-byte words
    pub fn to_words(&self) -> [[u8; 32]; PUBLIC_SIGNAL_COUNT] {
        self.to_fields().map(|f| field::to_word(&f))
    }

    /// Decode canonical 32-byte words
    pub fn from_words(words: &[[u8; 32]]) -> Result<Self, SignalError> {
        let fields = words
            .iter()
            .enumerate()
            .map(|(index, w)| field::from_word(w).map_err(|_| SignalError::NonCanonical { index }))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_fields(&fields)
    }
}
