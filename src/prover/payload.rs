//! Settlement payload formatting

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::Proof;
use crate::constants::{PUBLIC_SIGNAL_COUNT, WORD_SIZE};
use crate::transfer::{PublicSignals, SignalError};

/// A proof that cannot be laid out as settlement words
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("proof is empty")]
    Empty,
    #[error("proof is {0} bytes, not a whole number of 32-byte words")]
    Unaligned(usize),
    #[error("proof is {actual} words, backend layout requires {expected}")]
    WrongLength { expected: usize, actual: usize },
    #[error("word {index} is not 0x-prefixed 32-byte hex: {reason}")]
    InvalidWord { index: usize, reason: String },
    #[error("expected {} public signal words, got {0}", PUBLIC_SIGNAL_COUNT)]
    SignalCount(usize),
    #[error(transparent)]
    Signals(#[from] SignalError),
}

/// What settlement accepts: proof words plus exactly eight signal words
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementPayload {
    pub proof: Vec<[u8; WORD_SIZE]>,
    pub public_signals: [[u8; WORD_SIZE]; PUBLIC_SIGNAL_COUNT],
}

/// Hex rendering of a [`SettlementPayload`], one `0x` string per word
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HexPayload {
    pub proof: Vec<String>,
    pub public_signals: Vec<String>,
}

impl SettlementPayload {
    pub fn to_hex(&self) -> HexPayload {
        let render = |w: &[u8; WORD_SIZE]| format!("0x{}", hex::encode(w));
        HexPayload {
            proof: self.proof.iter().map(render).collect(),
            public_signals: self.public_signals.iter().map(render).collect(),
        }
    }

    /// Parse the hex rendering produced by [`Self::to_hex`]
    pub fn from_hex(payload: &HexPayload) -> Result<Self, PayloadError> {
        if payload.proof.is_empty() {
            return Err(PayloadError::Empty);
        }
        let proof = payload
            .proof
            .iter()
            .enumerate()
            .map(|(index, w)| parse_word(index, w))
            .collect::<Result<Vec<_>, _>>()?;

        let signals = payload
            .public_signals
            .iter()
            .enumerate()
            .map(|(index, w)| parse_word(index, w))
            .collect::<Result<Vec<_>, _>>()?;
        let public_signals: [[u8; WORD_SIZE]; PUBLIC_SIGNAL_COUNT] = signals
            .try_into()
            .map_err(|words: Vec<_>| PayloadError::SignalCount(words.len()))?;

        Ok(Self {
            proof,
            public_signals,
        })
    }

    /// Decode the signal words
    pub fn signals(&self) -> Result<PublicSignals, PayloadError> {
        Ok(PublicSignals::from_words(&self.public_signals)?)
    }
}

fn parse_word(index: usize, s: &str) -> Result<[u8; WORD_SIZE], PayloadError> {
    let invalid = |reason: String| PayloadError::InvalidWord { index, reason };
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| invalid("missing 0x prefix".to_string()))?;
    let bytes = hex::decode(digits).map_err(|e| invalid(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| invalid(format!("{} bytes", bytes.len())))
}

/// Lay out a proof and its signals as settlement words.
///
/// `expected_words` is the backend's fixed layout, if it has one.
pub fn format_for_settlement(
    proof: &Proof,
    public_signals: &PublicSignals,
    expected_words: Option<usize>,
) -> Result<SettlementPayload, PayloadError> {
    let bytes = proof.as_bytes();
    if bytes.is_empty() {
        return Err(PayloadError::Empty);
    }
    if bytes.len() % WORD_SIZE != 0 {
        return Err(PayloadError::Unaligned(bytes.len()));
    }

    let words: Vec<[u8; WORD_SIZE]> = bytes
        .chunks_exact(WORD_SIZE)
        .map(|chunk| {
            let mut word = [0u8; WORD_SIZE];
            word.copy_from_slice(chunk);
            word
        })
        .collect();

    if let Some(expected) = expected_words {
        if words.len() != expected {
            return Err(PayloadError::WrongLength {
                expected,
                actual: words.len(),
            });
        }
    }

    Ok(SettlementPayload {
        proof: words,
        public_signals: public_signals.to_words(),
    })
}

/// Flatten proof words back to proof bytes
pub fn proof_from_words(words: &[[u8; WORD_SIZE]]) -> Proof {
    Proof::from_bytes(words.concat())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, ProofBackend};
    use crate::commitment::commit;
    use crate::constants::FIXED_PROOF_WORDS;
    use crate::recipient::RecipientTag;
    use crate::salt::Salt;
    use crate::transfer::TransferWitness;
    use halo2_proofs::pasta::Fp;
    use rand::rngs::OsRng;

    fn signals() -> (Proof, PublicSignals) {
        let salt = Salt::random(&mut OsRng);
        MockBackend::default()
            .prove(&TransferWitness {
                sender_balance: 6000,
                transfer_amount: 95,
                recipient_tag: RecipientTag::from_field(Fp::from(1u64)),
                salt,
                asset_id: 1998,
                max_amount: 12000,
                balance_commitment: commit(6000, &salt),
            })
            .unwrap()
    }

    #[test]
    fn test_fixed_layout() {
        let (proof, s) = signals();
        let payload = format_for_settlement(&proof, &s, Some(FIXED_PROOF_WORDS)).unwrap();
        assert_eq!(payload.proof.len(), FIXED_PROOF_WORDS);
        assert_eq!(PublicSignals::from_words(&payload.public_signals).unwrap(), s);
        assert_eq!(proof_from_words(&payload.proof), proof);
    }

    #[test]
    fn test_shape_errors() {
        let (_, s) = signals();
        assert_eq!(
            format_for_settlement(&Proof::from_bytes(vec![]), &s, None),
            Err(PayloadError::Empty)
        );
        assert_eq!(
            format_for_settlement(&Proof::from_bytes(vec![1; 33]), &s, None),
            Err(PayloadError::Unaligned(33))
        );
        assert_eq!(
            format_for_settlement(&Proof::from_bytes(vec![1; 64]), &s, Some(FIXED_PROOF_WORDS)),
            Err(PayloadError::WrongLength {
                expected: FIXED_PROOF_WORDS,
                actual: 2
            })
        );
    }

    #[test]
    fn test_hex_parse() {
        let (proof, s) = signals();
        let payload = format_for_settlement(&proof, &s, None).unwrap();
        let json = serde_json::to_string(&payload.to_hex()).unwrap();
        let parsed: HexPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(SettlementPayload::from_hex(&parsed).unwrap(), payload);
        assert_eq!(payload.signals().unwrap(), s);

        let mut short = payload.to_hex();
        short.public_signals.pop();
        assert_eq!(
            SettlementPayload::from_hex(&short),
            Err(PayloadError::SignalCount(7))
        );

        let mut bad = payload.to_hex();
        bad.proof[3] = "0x1234".to_string();
        assert!(matches!(
            SettlementPayload::from_hex(&bad),
            Err(PayloadError::InvalidWord { index: 3, .. })
        ));
    }

    #[test]
    fn test_hex_rendering() {
        let (proof, s) = signals();
        let hex = format_for_settlement(&proof, &s, None).unwrap().to_hex();
        assert_eq!(hex.public_signals.len(), 8);
        assert!(hex.proof.iter().all(|w| w.len() == 66 && w.starts_with("0x")));
    }
}
