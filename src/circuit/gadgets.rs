//! Circuit gadgets for the transfer circuit
//!
//! Everything the transfer predicate needs beyond Poseidon:
//! - bit decomposition (range checks and the sign bit of a difference)
//! - `a <= b` for 64-bit values
//! - non-zero flags
//! - products of boolean flags
//! - `base - flag * delta` for the conditional balance update
//!
//! All gadgets share the three Poseidon state columns; each gate is behind
//! its own selector, so regions never constrain one another.

use ff::{Field, PrimeField};
use halo2_proofs::{
    circuit::{AssignedCell, Layouter, Value},
    pasta::Fp,
    plonk::{Advice, Column, ConstraintSystem, Error, Expression, Selector},
    poly::Rotation,
};

use crate::constants::AMOUNT_BITS;

/// An assigned field element
pub type Cell = AssignedCell<Fp, Fp>;

/// 2^n as a field element
pub fn two_pow(n: usize) -> Fp {
    (0..n).fold(Fp::one(), |acc, _| acc.double())
}

/// The low `num_bits` bits of `v`, most significant first
fn bits_msb_first(v: &Fp, num_bits: usize) -> Vec<bool> {
    let repr = v.to_repr();
    (0..num_bits)
        .rev()
        .map(|j| (repr[j / 8] >> (j % 8)) & 1 == 1)
        .collect()
}

/// Configuration for the arithmetic gates
#[derive(Clone, Debug)]
pub struct ArithmeticConfig {
    advice: [Column<Advice>; 3],
    s_bit: Selector,
    s_diff: Selector,
    s_nonzero: Selector,
    s_mul: Selector,
    s_cond_sub: Selector,
}

impl ArithmeticConfig {
    /// Configure the arithmetic gates over three equality-enabled columns
    pub fn configure(meta: &mut ConstraintSystem<Fp>, advice: [Column<Advice>; 3]) -> Self {
        let s_bit = meta.selector();
        let s_diff = meta.selector();
        let s_nonzero = meta.selector();
        let s_mul = meta.selector();
        let s_cond_sub = meta.selector();

        let one = || Expression::Constant(Fp::one());

        // Running sum, most significant bit first:
        // acc[i + 1] = 2 * acc[i] + bit[i], bit[i] in {0, 1}
        meta.create_gate("bit decomposition", |meta| {
            let s = meta.query_selector(s_bit);
            let acc = meta.query_advice(advice[0], Rotation::cur());
            let acc_next = meta.query_advice(advice[0], Rotation::next());
            let bit = meta.query_advice(advice[1], Rotation::cur());

            vec![
                s.clone() * bit.clone() * (one() - bit.clone()),
                s * (acc_next - acc * Expression::Constant(Fp::from(2u64)) - bit),
            ]
        });

        // diff = b - a + 2^64; its top bit is set iff a <= b
        meta.create_gate("offset difference", |meta| {
            let s = meta.query_selector(s_diff);
            let a = meta.query_advice(advice[0], Rotation::cur());
            let b = meta.query_advice(advice[1], Rotation::cur());
            let diff = meta.query_advice(advice[2], Rotation::cur());

            vec![s * (diff - b + a - Expression::Constant(two_pow(AMOUNT_BITS)))]
        });

        // flag = x * inv and x * (1 - flag) = 0, so flag = (x != 0)
        meta.create_gate("non-zero flag", |meta| {
            let s = meta.query_selector(s_nonzero);
            let x = meta.query_advice(advice[0], Rotation::cur());
            let inv = meta.query_advice(advice[1], Rotation::cur());
            let flag = meta.query_advice(advice[2], Rotation::cur());

            vec![
                s.clone() * (flag.clone() - x.clone() * inv),
                s * x * (one() - flag),
            ]
        });

        meta.create_gate("product", |meta| {
            let s = meta.query_selector(s_mul);
            let a = meta.query_advice(advice[0], Rotation::cur());
            let b = meta.query_advice(advice[1], Rotation::cur());
            let c = meta.query_advice(advice[2], Rotation::cur());

            vec![s * (c - a * b)]
        });

        // out (next row) = base - flag * delta
        meta.create_gate("conditional subtract", |meta| {
            let s = meta.query_selector(s_cond_sub);
            let base = meta.query_advice(advice[0], Rotation::cur());
            let delta = meta.query_advice(advice[1], Rotation::cur());
            let flag = meta.query_advice(advice[2], Rotation::cur());
            let out = meta.query_advice(advice[0], Rotation::next());

            vec![s * (out - base + flag * delta)]
        });

        Self {
            advice,
            s_bit,
            s_diff,
            s_nonzero,
            s_mul,
            s_cond_sub,
        }
    }
}

/// Chip for the transfer arithmetic
pub struct ArithmeticChip {
    config: ArithmeticConfig,
}

impl ArithmeticChip {
    pub fn construct(config: ArithmeticConfig) -> Self {
        Self { config }
    }

    /// Decompose `value` into `num_bits` bits and constrain the recomposition
    /// to equal it. Doubles as a range check. Returns the most significant bit.
    pub fn decompose(
        &self,
        mut layouter: impl Layouter<Fp>,
        value: &Cell,
        num_bits: usize,
    ) -> Result<Cell, Error> {
        layouter.assign_region(
            || format!("decompose into {} bits", num_bits),
            |mut region| {
                let bits = value.value().map(|v| bits_msb_first(v, num_bits));

                let mut acc = region.assign_advice_from_constant(
                    || "acc 0",
                    self.config.advice[0],
                    0,
                    Fp::zero(),
                )?;
                let mut acc_value = Value::known(Fp::zero());
                let mut msb = None;

                for i in 0..num_bits {
                    self.config.s_bit.enable(&mut region, i)?;

                    let bit = bits.as_ref().map(|bits| Fp::from(u64::from(bits[i])));
                    let bit_cell = region.assign_advice(
                        || format!("bit {}", i),
                        self.config.advice[1],
                        i,
                        || bit,
                    )?;
                    if i == 0 {
                        msb = Some(bit_cell);
                    }

                    acc_value = acc_value.zip(bit).map(|(acc, bit)| acc.double() + bit);
                    acc = region.assign_advice(
                        || format!("acc {}", i + 1),
                        self.config.advice[0],
                        i + 1,
                        || acc_value,
                    )?;
                }

                region.constrain_equal(acc.cell(), value.cell())?;
                msb.ok_or(Error::Synthesis)
            },
        )
    }

    /// Boolean flag for `a <= b`. Both inputs must already be range-checked
    /// to `AMOUNT_BITS`.
    pub fn less_or_equal(
        &self,
        mut layouter: impl Layouter<Fp>,
        a: &Cell,
        b: &Cell,
    ) -> Result<Cell, Error> {
        let diff = layouter.assign_region(
            || "offset difference",
            |mut region| {
                self.config.s_diff.enable(&mut region, 0)?;
                a.copy_advice(|| "a", &mut region, self.config.advice[0], 0)?;
                b.copy_advice(|| "b", &mut region, self.config.advice[1], 0)?;

                let offset = two_pow(AMOUNT_BITS);
                let diff = a.value().zip(b.value()).map(|(a, b)| *b - *a + offset);
                region.assign_advice(|| "diff", self.config.advice[2], 0, || diff)
            },
        )?;

        // diff lies in [1, 2^65), so 65 bits hold it and bit 64 is the sign
        self.decompose(layouter.namespace(|| "diff bits"), &diff, AMOUNT_BITS + 1)
    }

    /// Boolean flag for `x != 0`
    pub fn is_nonzero(&self, mut layouter: impl Layouter<Fp>, x: &Cell) -> Result<Cell, Error> {
        layouter.assign_region(
            || "non-zero flag",
            |mut region| {
                self.config.s_nonzero.enable(&mut region, 0)?;
                x.copy_advice(|| "x", &mut region, self.config.advice[0], 0)?;

                let inv = x.value().map(|x| x.invert().unwrap_or(Fp::zero()));
                region.assign_advice(|| "inverse", self.config.advice[1], 0, || inv)?;

                let flag = x.value().zip(inv).map(|(x, inv)| *x * inv);
                region.assign_advice(|| "flag", self.config.advice[2], 0, || flag)
            },
        )
    }

    /// `a * b`
    pub fn mul(&self, mut layouter: impl Layouter<Fp>, a: &Cell, b: &Cell) -> Result<Cell, Error> {
        layouter.assign_region(
            || "product",
            |mut region| {
                self.config.s_mul.enable(&mut region, 0)?;
                a.copy_advice(|| "a", &mut region, self.config.advice[0], 0)?;
                b.copy_advice(|| "b", &mut region, self.config.advice[1], 0)?;

                let c = a.value().zip(b.value()).map(|(a, b)| *a * *b);
                region.assign_advice(|| "a * b", self.config.advice[2], 0, || c)
            },
        )
    }

    /// `base - flag * delta`
    pub fn conditional_sub(
        &self,
        mut layouter: impl Layouter<Fp>,
        base: &Cell,
        delta: &Cell,
        flag: &Cell,
    ) -> Result<Cell, Error> {
        layouter.assign_region(
            || "conditional subtract",
            |mut region| {
                self.config.s_cond_sub.enable(&mut region, 0)?;
                base.copy_advice(|| "base", &mut region, self.config.advice[0], 0)?;
                delta.copy_advice(|| "delta", &mut region, self.config.advice[1], 0)?;
                flag.copy_advice(|| "flag", &mut region, self.config.advice[2], 0)?;

                let out = base
                    .value()
                    .zip(delta.value())
                    .zip(flag.value())
                    .map(|((base, delta), flag)| *base - *flag * *delta);
                region.assign_advice(|| "out", self.config.advice[0], 1, || out)
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_msb_first() {
        assert_eq!(bits_msb_first(&Fp::from(5u64), 4), vec![false, true, false, true]);
        assert_eq!(bits_msb_first(&two_pow(64), 65)[0], true);
        assert!(bits_msb_first(&Fp::from(u64::MAX), 64).iter().all(|b| *b));
    }

    #[test]
    fn test_two_pow() {
        assert_eq!(two_pow(0), Fp::one());
        assert_eq!(two_pow(10), Fp::from(1024u64));
        assert_eq!(two_pow(64), Fp::from(u64::MAX) + Fp::one());
    }
}
