//! Balance commitments
//!
//! A balance commitment hides a holder's balance while binding them to it:
//!
//! C = PoseidonHash(balance, salt)
//!
//! The same `(balance, salt)` always produces the same commitment; a fresh
//! salt makes two commitments to the same balance unlinkable. The transfer
//! circuit recomputes this hash in-circuit with the same Poseidon
//! parameters, so the two sides cannot drift apart.

use ff::PrimeField;
use halo2_gadgets::poseidon::primitives::{self as poseidon, ConstantLength, P128Pow5T3};
use halo2_proofs::pasta::Fp;
use std::fmt;

use crate::salt::Salt;

/// A commitment to a balance under a salt
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BalanceCommitment {
    inner: Fp,
}

impl BalanceCommitment {
    /// Commit to `balance` under `salt`
    pub fn commit(balance: u64, salt: &Salt) -> Self {
        Self {
            inner: poseidon_hash([Fp::from(balance), salt.to_field()]),
        }
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

    /// Check whether this commitment opens to `(balance, salt)`
    pub fn opens_to(&self, balance: u64, salt: &Salt) -> bool {
        *self == Self::commit(balance, salt)
    }
}

impl fmt::Debug for BalanceCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        write!(f, "BalanceCommitment({:02x}{:02x}...)", bytes[31], bytes[30])
    }
}

/// Commit to `balance` under `salt`
pub fn commit(balance: u64, salt: &Salt) -> BalanceCommitment {
    BalanceCommitment::commit(balance, salt)
}

/// Poseidon over the Pasta field (P128Pow5T3: width 3, rate 2)
pub fn poseidon_hash(inputs: [Fp; 2]) -> Fp {
    poseidon::Hash::<_, P128Pow5T3, ConstantLength<2>, 3, 2>::init().hash(inputs)
}

/// Hash more than two elements by chaining: `H(H(H(x0, x1), x2), x3)`.
///
/// The circuit uses the same chaining. The first pair is a fixed-size
/// array so that no input is ever padded.
pub fn poseidon_hash_chain(first: [Fp; 2], rest: &[Fp]) -> Fp {
    rest.iter()
        .fold(poseidon_hash(first), |acc, next| poseidon_hash([acc, *next]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_commitment_deterministic() {
        let salt = Salt::random(&mut OsRng);

        let cm1 = commit(6000, &salt);
        let cm2 = commit(6000, &salt);

        assert_eq!(cm1, cm2);
        assert!(cm1.opens_to(6000, &salt));
    }

    #[test]
    fn test_different_salts_different_commitments() {
        let salt1 = Salt::random(&mut OsRng);
        let salt2 = Salt::random(&mut OsRng);

        // Same balance, fresh salt: unlinkable
        assert_ne!(commit(1000, &salt1), commit(1000, &salt2));
    }

    #[test]
    fn test_commitment_binds_balance() {
        let salt = Salt::random(&mut OsRng);
        let cm = commit(1000, &salt);

        assert!(!cm.opens_to(1001, &salt));
        assert!(!cm.opens_to(1000, &Salt::random(&mut OsRng)));
    }

    #[test]
    fn test_poseidon_hash() {
        let a = Fp::from(123u64);
        let b = Fp::from(456u64);
        let c = Fp::from(789u64);

        assert_eq!(poseidon_hash([a, b]), poseidon_hash([a, b]));
        assert_ne!(poseidon_hash([a, b]), poseidon_hash([b, a]));

        // Chaining is explicit
        assert_eq!(
            poseidon_hash_chain([a, b], &[c]),
            poseidon_hash([poseidon_hash([a, b]), c])
        );
        assert_eq!(poseidon_hash_chain([a, b], &[]), poseidon_hash([a, b]));
        assert_ne!(poseidon_hash_chain([a, b], &[Fp::zero()]), poseidon_hash([a, b]));
    }
}
