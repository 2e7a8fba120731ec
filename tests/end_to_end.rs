//! Real Halo2 proofs through orchestration and settlement

use std::sync::{Arc, OnceLock};

use private_transfer::{
    prover::ProverError, settlement::SettlementError, Address, Halo2Backend, ProofOrchestrator,
    ProofVerifier, ProvingArtifacts, RecipientBinding, SettlementLedger, TransferRequest,
    DEFAULT_CIRCUIT_K,
};

const OWNER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
const SENDER: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";
const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
const ASSET: u64 = 1998;

fn artifacts() -> Arc<ProvingArtifacts> {
    static ARTIFACTS: OnceLock<Arc<ProvingArtifacts>> = OnceLock::new();
    ARTIFACTS
        .get_or_init(|| Arc::new(ProvingArtifacts::setup(DEFAULT_CIRCUIT_K).unwrap()))
        .clone()
}

fn addr(s: &str) -> Address {
    s.parse().unwrap()
}

fn request(balance: u64, amount: u64) -> TransferRequest {
    TransferRequest {
        sender_balance: balance,
        transfer_amount: amount,
        recipient: RECIPIENT.to_string(),
        asset_id: ASSET,
        max_amount: 12000,
        salt: None,
        balance_commitment: None,
    }
}

fn setup(binding: RecipientBinding) -> (ProofOrchestrator<Halo2Backend>, SettlementLedger) {
    let backend = Arc::new(Halo2Backend::new(artifacts()));
    let verifier: Arc<dyn ProofVerifier> = backend.clone();
    let ledger = SettlementLedger::new(addr(OWNER), verifier);
    ledger.set_asset_whitelist(&addr(OWNER), ASSET, true).unwrap();
    (ProofOrchestrator::new(backend, binding), ledger)
}

#[test]
fn test_transfer_settle_replay_claim() {
    let (orchestrator, ledger) = setup(RecipientBinding::Legacy);

    let proof = orchestrator.generate_proof(&request(6000, 95)).unwrap();
    assert!(proof.public_signals.valid);
    assert_eq!(proof.public_signals.new_balance, 5905);
    assert_eq!(proof.proof.len() % 32, 0);

    let payload = orchestrator
        .format_for_settlement(&proof.proof, &proof.public_signals)
        .unwrap();

    let pending = ledger
        .submit_transfer(addr(SENDER), &payload.proof, &payload.public_signals)
        .unwrap();
    assert_eq!(pending.amount, 5905);

    // Replay
    assert_eq!(
        ledger.submit_transfer(addr(SENDER), &payload.proof, &payload.public_signals),
        Err(SettlementError::NullifierAlreadyUsed)
    );

    let tag = proof.public_signals.recipient_tag;
    assert_eq!(ledger.claim_transfer(&tag, &proof.recipient_opening()), Ok(5905));
    assert_eq!(ledger.released_balance(&addr(RECIPIENT), ASSET), 5905);
}

#[test]
fn test_invalid_transfer_proves_but_does_not_settle() {
    let (orchestrator, ledger) = setup(RecipientBinding::Legacy);

    let proof = orchestrator.generate_proof(&request(1000, 2000)).unwrap();
    assert!(!proof.public_signals.valid);
    assert_eq!(proof.public_signals.new_balance, 1000);

    let payload = orchestrator
        .format_for_settlement(&proof.proof, &proof.public_signals)
        .unwrap();
    assert_eq!(
        ledger.submit_transfer(addr(SENDER), &payload.proof, &payload.public_signals),
        Err(SettlementError::TransferNotValid)
    );
    assert!(!ledger.is_nullifier_used(&proof.public_signals.nullifier));
}

#[test]
fn test_tampered_signal_rejected() {
    let (orchestrator, ledger) = setup(RecipientBinding::Legacy);

    let proof = orchestrator.generate_proof(&request(6000, 95)).unwrap();
    let mut payload = orchestrator
        .format_for_settlement(&proof.proof, &proof.public_signals)
        .unwrap();

    // Claim a larger remaining balance
    payload.public_signals[1][0] ^= 0x01;
    assert_eq!(
        ledger.submit_transfer(addr(SENDER), &payload.proof, &payload.public_signals),
        Err(SettlementError::InvalidProof)
    );
}

#[test]
fn test_blinded_recipient() {
    let (orchestrator, ledger) = setup(RecipientBinding::Blinded);

    let proof = orchestrator.generate_proof(&request(6000, 95)).unwrap();
    let payload = orchestrator
        .format_for_settlement(&proof.proof, &proof.public_signals)
        .unwrap();
    ledger
        .submit_transfer(addr(SENDER), &payload.proof, &payload.public_signals)
        .unwrap();

    assert_eq!(
        ledger.claim_transfer(&proof.public_signals.recipient_tag, &proof.recipient_opening()),
        Ok(5905)
    );
}

#[test]
fn test_integrity_violation_is_not_proved() {
    let (orchestrator, _) = setup(RecipientBinding::Legacy);
    let salt = orchestrator.generate_salt();

    let mut r = request(6000, 95);
    r.salt = Some(salt.to_hex());
    r.balance_commitment = Some(private_transfer::field::to_hex(
        &private_transfer::commit(5000, &salt).to_field(),
    ));

    assert!(matches!(
        orchestrator.generate_proof(&r),
        Err(ProverError::Integrity(_))
    ));
}

#[test]
fn test_verify_payload_off_ledger() {
    let (orchestrator, ledger) = setup(RecipientBinding::Legacy);

    let proof = orchestrator.generate_proof(&request(6000, 95)).unwrap();
    let payload = orchestrator
        .format_for_settlement(&proof.proof, &proof.public_signals)
        .unwrap();
    assert!(orchestrator.verify_payload(&payload).unwrap());

    let mut tampered = payload.clone();
    tampered.public_signals[6][0] ^= 0x01;
    assert!(!orchestrator.verify_payload(&tampered).unwrap());

    // Verification alone consumes nothing
    assert!(!ledger.is_nullifier_used(&proof.public_signals.nullifier));
}

#[test]
fn test_recipient_receives_again_after_claim() {
    let (orchestrator, ledger) = setup(RecipientBinding::Legacy);
    let tag = {
        let proof = orchestrator.generate_proof(&request(6000, 95)).unwrap();
        let payload = orchestrator
            .format_for_settlement(&proof.proof, &proof.public_signals)
            .unwrap();
        ledger
            .submit_transfer(addr(SENDER), &payload.proof, &payload.public_signals)
            .unwrap();
        let tag = proof.public_signals.recipient_tag;
        assert_eq!(ledger.claim_transfer(&tag, &proof.recipient_opening()), Ok(5905));
        tag
    };

    let proof = orchestrator.generate_proof(&request(5905, 905)).unwrap();
    let payload = orchestrator
        .format_for_settlement(&proof.proof, &proof.public_signals)
        .unwrap();
    ledger
        .submit_transfer(addr(SENDER), &payload.proof, &payload.public_signals)
        .unwrap();
    assert_eq!(ledger.claim_transfer(&tag, &proof.recipient_opening()), Ok(5000));
    assert_eq!(ledger.transfer_history(&tag).len(), 2);
    assert_eq!(ledger.released_balance(&addr(RECIPIENT), ASSET), 10905);
}
