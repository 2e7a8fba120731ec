//! Transfer Circuit - the ZK circuit behind every private transfer
//!
//! The circuit enforces IN-CIRCUIT:
//! - Every numeric input fits in 64 bits
//! - `valid = (amount <= balance) * (amount <= max) * (amount != 0) * (asset != 0)`
//! - `new_balance = balance - valid * amount`
//! - `balance_commitment = Poseidon(balance, salt)`
//! - `new_balance_commitment = Poseidon(new_balance, salt)`
//! - `nullifier = Poseidon(Poseidon(domain, balance_commitment), salt)`
//! - The recipient tag is carried through to the public signals
//!
//! Public signals are exposed in order on a single instance column, see
//! [`crate::constants::signal`].

use halo2_gadgets::poseidon::{
    primitives::{ConstantLength, P128Pow5T3},
    Hash, Pow5Chip, Pow5Config,
};
use halo2_proofs::{
    circuit::{Layouter, SimpleFloorPlanner, Value},
    pasta::Fp,
    plonk::{Advice, Circuit, Column, ConstraintSystem, Error, Fixed, Instance},
};

use super::gadgets::{ArithmeticChip, ArithmeticConfig, Cell};
use crate::constants::{signal, AMOUNT_BITS};
use crate::nullifier;
use crate::transfer::TransferWitness;

/// Poseidon parameters: P128Pow5T3 over the Pasta field
/// - Width: 3 (state size)
/// - Rate: 2 (input rate)
type PoseidonSpec = P128Pow5T3;
const WIDTH: usize = 3;
const RATE: usize = 2;

/// Configuration for the transfer circuit
#[derive(Clone, Debug)]
pub struct TransferConfig {
    advice: [Column<Advice>; WIDTH],
    instance: Column<Instance>,
    poseidon_config: Pow5Config<Fp, WIDTH, RATE>,
    arithmetic: ArithmeticConfig,
}

/// The transfer circuit
#[derive(Clone, Default)]
pub struct TransferCircuit {
    /// The witness data (private inputs)
    pub witness: Option<TransferWitness>,
}

impl TransferCircuit {
    /// Create a new circuit with witness data
    pub fn new(witness: TransferWitness) -> Self {
        Self {
            witness: Some(witness),
        }
    }

    /// Create a circuit without witness (for key generation)
    pub fn empty() -> Self {
        Self { witness: None }
    }

    fn poseidon_hash_2(
        config: &Pow5Config<Fp, WIDTH, RATE>,
        mut layouter: impl Layouter<Fp>,
        a: Cell,
        b: Cell,
    ) -> Result<Cell, Error> {
        let chip = Pow5Chip::construct(config.clone());
        let hasher = Hash::<_, _, PoseidonSpec, ConstantLength<2>, WIDTH, RATE>::init(
            chip,
            layouter.namespace(|| "poseidon init"),
        )?;
        hasher.hash(layouter.namespace(|| "poseidon"), [a, b])
    }
}

impl Circuit<Fp> for TransferCircuit {
    type Config = TransferConfig;
    type FloorPlanner = SimpleFloorPlanner;

    fn without_witnesses(&self) -> Self {
        Self::empty()
    }

    fn configure(meta: &mut ConstraintSystem<Fp>) -> Self::Config {
        let advice: [Column<Advice>; WIDTH] = [
            meta.advice_column(),
            meta.advice_column(),
            meta.advice_column(),
        ];
        for col in &advice {
            meta.enable_equality(*col);
        }

        let partial_sbox = meta.advice_column();
        meta.enable_equality(partial_sbox);

        let instance = meta.instance_column();
        meta.enable_equality(instance);

        // Fixed columns for Poseidon round constants
        let rc_a: [Column<Fixed>; WIDTH] = [
            meta.fixed_column(),
            meta.fixed_column(),
            meta.fixed_column(),
        ];
        let rc_b: [Column<Fixed>; WIDTH] = [
            meta.fixed_column(),
            meta.fixed_column(),
            meta.fixed_column(),
        ];

        // Holds the nullifier domain and the zero that seeds each decomposition
        meta.enable_constant(rc_b[0]);

        let poseidon_config =
            Pow5Chip::configure::<PoseidonSpec>(meta, advice, partial_sbox, rc_a, rc_b);
        let arithmetic = ArithmeticConfig::configure(meta, advice);

        TransferConfig {
            advice,
            instance,
            poseidon_config,
            arithmetic,
        }
    }

    fn synthesize(&self, config: Self::Config, mut layouter: impl Layouter<Fp>) -> Result<(), Error> {
        let witness = self.witness.as_ref().map_or(Value::unknown(), Value::known);
        let poseidon_config = &config.poseidon_config;
        let chip = ArithmeticChip::construct(config.arithmetic.clone());
        let nullifier_domain = nullifier::domain();

        // ===== Assign private inputs =====
        let (balance, amount, max_amount, asset_id, salt, recipient_tag, domain) = layouter
            .assign_region(
                || "assign witness",
                |mut region| {
                    let balance = region.assign_advice(
                        || "sender balance",
                        config.advice[0],
                        0,
                        || witness.map(|w| Fp::from(w.sender_balance)),
                    )?;
                    let amount = region.assign_advice(
                        || "transfer amount",
                        config.advice[1],
                        0,
                        || witness.map(|w| Fp::from(w.transfer_amount)),
                    )?;
                    let max_amount = region.assign_advice(
                        || "max amount",
                        config.advice[2],
                        0,
                        || witness.map(|w| Fp::from(w.max_amount)),
                    )?;
                    let asset_id = region.assign_advice(
                        || "asset id",
                        config.advice[0],
                        1,
                        || witness.map(|w| Fp::from(w.asset_id)),
                    )?;
                    let salt = region.assign_advice(
                        || "salt",
                        config.advice[1],
                        1,
                        || witness.map(|w| w.salt.to_field()),
                    )?;
                    let recipient_tag = region.assign_advice(
                        || "recipient tag",
                        config.advice[2],
                        1,
                        || witness.map(|w| w.recipient_tag.to_field()),
                    )?;
                    let domain = region.assign_advice_from_constant(
                        || "nullifier domain",
                        config.advice[0],
                        2,
                        nullifier_domain,
                    )?;
                    Ok((balance, amount, max_amount, asset_id, salt, recipient_tag, domain))
                },
            )?;

        // ===== Range checks =====
        // Without these, field wraparound would let an overdraft pass the
        // comparison below.
        for (name, cell) in [
            ("balance", &balance),
            ("amount", &amount),
            ("max amount", &max_amount),
            ("asset id", &asset_id),
        ] {
            chip.decompose(
                layouter.namespace(|| format!("range check {}", name)),
                cell,
                AMOUNT_BITS,
            )?;
        }

        // ===== Validity flag =====
        let within_balance =
            chip.less_or_equal(layouter.namespace(|| "amount <= balance"), &amount, &balance)?;
        let within_cap =
            chip.less_or_equal(layouter.namespace(|| "amount <= max"), &amount, &max_amount)?;
        let amount_nonzero = chip.is_nonzero(layouter.namespace(|| "amount != 0"), &amount)?;
        let asset_nonzero = chip.is_nonzero(layouter.namespace(|| "asset != 0"), &asset_id)?;

        let valid = chip.mul(layouter.namespace(|| "valid 1"), &within_balance, &within_cap)?;
        let valid = chip.mul(layouter.namespace(|| "valid 2"), &valid, &amount_nonzero)?;
        let valid = chip.mul(layouter.namespace(|| "valid 3"), &valid, &asset_nonzero)?;

        // ===== Balance update =====
        let new_balance = chip.conditional_sub(
            layouter.namespace(|| "new balance"),
            &balance,
            &amount,
            &valid,
        )?;

        // ===== Commitments and nullifier =====
        let balance_commitment = Self::poseidon_hash_2(
            poseidon_config,
            layouter.namespace(|| "balance commitment"),
            balance,
            salt.clone(),
        )?;

        let new_balance_commitment = Self::poseidon_hash_2(
            poseidon_config,
            layouter.namespace(|| "new balance commitment"),
            new_balance.clone(),
            salt.clone(),
        )?;

        let nullifier_inner = Self::poseidon_hash_2(
            poseidon_config,
            layouter.namespace(|| "nullifier step 1"),
            domain,
            balance_commitment.clone(),
        )?;
        let nullifier = Self::poseidon_hash_2(
            poseidon_config,
            layouter.namespace(|| "nullifier step 2"),
            nullifier_inner,
            salt,
        )?;

        // ===== Constrain public signals =====
        layouter.constrain_instance(valid.cell(), config.instance, signal::VALID)?;
        layouter.constrain_instance(new_balance.cell(), config.instance, signal::NEW_BALANCE)?;
        layouter.constrain_instance(
            new_balance_commitment.cell(),
            config.instance,
            signal::NEW_BALANCE_COMMITMENT,
        )?;
        layouter.constrain_instance(recipient_tag.cell(), config.instance, signal::RECIPIENT_TAG)?;
        layouter.constrain_instance(nullifier.cell(), config.instance, signal::NULLIFIER)?;
        layouter.constrain_instance(asset_id.cell(), config.instance, signal::ASSET_ID)?;
        layouter.constrain_instance(max_amount.cell(), config.instance, signal::MAX_AMOUNT)?;
        layouter.constrain_instance(
            balance_commitment.cell(),
            config.instance,
            signal::BALANCE_COMMITMENT,
        )?;

        Ok(())
    }
}
