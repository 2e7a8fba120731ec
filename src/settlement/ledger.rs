//! The settlement ledger
//!
//! State machines:
//!
//! ```text
//! nullifier:         Unused  --submit-->  Consumed
//! pending transfer:  Created --claim--->  Claimed
//! ```
//!
//! Records are never deleted. Each tag keeps its history; the newest record
//! is the current one, and a new transfer to the tag is accepted once the
//! current record is claimed.
//!
//! Two accounting layers are kept apart. `escrow` is plaintext value
//! deposited by accounts and withdrawable by them. `released` is what
//! claims credit, keyed by `(account, asset)`. A claim never credits
//! escrow, so protocol amounts cannot be withdrawn as escrowed funds.
//!
//! Every state-changing operation validates first and mutates last under a
//! single write guard, so a refused operation leaves no trace.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::SettlementError;
use super::events::{EventRecord, SettlementEvent};
use crate::backend::ProofVerifier;
use crate::config::SettlementConfig;
use crate::constants::{PUBLIC_SIGNAL_COUNT, WORD_SIZE};
use crate::nullifier::{Nullifier, NullifierSet};
use crate::prover::payload::proof_from_words;
use crate::recipient::{Address, RecipientOpening, RecipientTag};
use crate::transfer::PublicSignals;

/// A transfer awaiting its recipient
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PendingTransfer {
    pub amount: u64,
    pub asset_id: u64,
    pub created_at: DateTime<Utc>,
    pub claimed: bool,
}

/// Ledger-wide totals
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    /// Cumulative deposits
    pub total_deposited: u64,
    pub total_transfers: u64,
    /// Escrow currently held
    pub escrow_held: u64,
}

struct LedgerState {
    owner: Address,
    paused: bool,
    whitelist: HashMap<u64, bool>,
    nullifiers: NullifierSet,
    pending: HashMap<RecipientTag, Vec<PendingTransfer>>,
    escrow: HashMap<Address, u64>,
    released: HashMap<(Address, u64), u64>,
    stats: LedgerStats,
    events: Vec<EventRecord>,
}

impl LedgerState {
    fn emit(&mut self, event: SettlementEvent) {
        self.events.push(EventRecord::now(event));
    }

    fn ensure_active(&self) -> Result<(), SettlementError> {
        if self.paused {
            Err(SettlementError::Paused)
        } else {
            Ok(())
        }
    }

    fn ensure_owner(&self, caller: &Address) -> Result<(), SettlementError> {
        if *caller == self.owner {
            Ok(())
        } else {
            Err(SettlementError::Unauthorized)
        }
    }

    fn is_whitelisted(&self, asset_id: u64) -> bool {
        self.whitelist.get(&asset_id).copied().unwrap_or(false)
    }

    /// Newest record under `tag`; zero-amount records read as absent
    fn current(&self, tag: &RecipientTag) -> Option<&PendingTransfer> {
        self.pending
            .get(tag)
            .and_then(|history| history.last())
            .filter(|p| p.amount > 0)
    }

    /// An unclaimed record blocks further transfers to its tag
    fn is_tag_live(&self, tag: &RecipientTag) -> bool {
        self.current(tag).map_or(false, |p| !p.claimed)
    }
}

/// Exactly-once settlement of transfer proofs
pub struct SettlementLedger {
    verifier: Arc<dyn ProofVerifier>,
    state: RwLock<LedgerState>,
}

impl SettlementLedger {
    pub fn new(owner: Address, verifier: Arc<dyn ProofVerifier>) -> Self {
        Self {
            verifier,
            state: RwLock::new(LedgerState {
                owner,
                paused: false,
                whitelist: HashMap::new(),
                nullifiers: NullifierSet::new(),
                pending: HashMap::new(),
                escrow: HashMap::new(),
                released: HashMap::new(),
                stats: LedgerStats::default(),
                events: Vec::new(),
            }),
        }
    }

    /// Ledger owned by `config.owner` with `config.whitelist` pre-approved
    pub fn from_config(
        config: &SettlementConfig,
        verifier: Arc<dyn ProofVerifier>,
    ) -> Result<Self, SettlementError> {
        let ledger = Self::new(config.owner, verifier);
        for asset_id in &config.whitelist {
            ledger.set_asset_whitelist(&config.owner, *asset_id, true)?;
        }
        Ok(ledger)
    }

    // ===== Transfers =====

    /// Settle a transfer proof.
    ///
    /// On success the nullifier is consumed and a pending transfer is
    /// recorded under the recipient tag, atomically.
    pub fn submit_transfer(
        &self,
        submitter: Address,
        proof_words: &[[u8; WORD_SIZE]],
        signal_words: &[[u8; WORD_SIZE]],
    ) -> Result<PendingTransfer, SettlementError> {
        if signal_words.len() != PUBLIC_SIGNAL_COUNT {
            return Err(SettlementError::MalformedPayload(format!(
                "expected {} signal words, got {}",
                PUBLIC_SIGNAL_COUNT,
                signal_words.len()
            )));
        }
        if proof_words.is_empty() {
            return Err(SettlementError::MalformedPayload("empty proof".to_string()));
        }
        if let Some(expected) = self.verifier.proof_words() {
            if proof_words.len() != expected {
                return Err(SettlementError::MalformedPayload(format!(
                    "expected {} proof words, got {}",
                    expected,
                    proof_words.len()
                )));
            }
        }

        let signals = PublicSignals::from_words(signal_words)
            .map_err(|e| SettlementError::MalformedPayload(e.to_string()))?;

        // Re-checked under the write guard below
        self.state.read().ensure_active()?;

        // Verification runs outside the lock; it is the expensive part.
        match self.verifier.verify(&signals, &proof_from_words(proof_words)) {
            Ok(true) => {}
            Ok(false) => {
                debug!(nullifier = ?signals.nullifier, "rejected proof");
                return Err(SettlementError::InvalidProof);
            }
            Err(e) => {
                warn!(error = %e, "verifier failed");
                return Err(SettlementError::InvalidProof);
            }
        }

        if !signals.valid {
            return Err(SettlementError::TransferNotValid);
        }

        let mut state = self.state.write();
        state.ensure_active()?;
        if !state.is_whitelisted(signals.asset_id) {
            return Err(SettlementError::AssetNotWhitelisted(signals.asset_id));
        }
        if state.nullifiers.contains(&signals.nullifier) {
            warn!(nullifier = ?signals.nullifier, "replayed nullifier");
            return Err(SettlementError::NullifierAlreadyUsed);
        }
        if state.is_tag_live(&signals.recipient_tag) {
            return Err(SettlementError::RecipientTagInUse);
        }
        let total_transfers = state
            .stats
            .total_transfers
            .checked_add(1)
            .ok_or(SettlementError::Overflow)?;

        // ===== Commit =====
        state.nullifiers.insert(signals.nullifier);
        let record = PendingTransfer {
            amount: signals.new_balance,
            asset_id: signals.asset_id,
            created_at: Utc::now(),
            claimed: false,
        };
        state
            .pending
            .entry(signals.recipient_tag)
            .or_default()
            .push(record);
        state.stats.total_transfers = total_transfers;
        state.emit(SettlementEvent::NullifierUsed {
            nullifier: signals.nullifier,
        });
        state.emit(SettlementEvent::PrivateTransfer {
            submitter,
            recipient_tag: signals.recipient_tag,
            asset_id: signals.asset_id,
        });

        info!(
            submitter = %submitter,
            recipient_tag = ?signals.recipient_tag,
            nullifier = ?signals.nullifier,
            asset_id = signals.asset_id,
            "private transfer settled"
        );
        Ok(record)
    }

    /// Claim the pending transfer under `tag`. Returns the released amount.
    pub fn claim_transfer(
        &self,
        tag: &RecipientTag,
        opening: &RecipientOpening,
    ) -> Result<u64, SettlementError> {
        let opened = opening.tag();

        let mut guard = self.state.write();
        guard.ensure_active()?;
        let state = &mut *guard;

        let record = state
            .pending
            .get_mut(tag)
            .and_then(|history| history.last_mut())
            .filter(|p| p.amount > 0)
            .ok_or(SettlementError::TransferNotFound)?;
        if record.claimed {
            return Err(SettlementError::AlreadyClaimed);
        }
        if opened != *tag {
            return Err(SettlementError::ClaimantMismatch);
        }

        let key = (opening.address, record.asset_id);
        let credited = state
            .released
            .get(&key)
            .copied()
            .unwrap_or(0)
            .checked_add(record.amount)
            .ok_or(SettlementError::Overflow)?;

        record.claimed = true;
        let (amount, asset_id) = (record.amount, record.asset_id);
        state.released.insert(key, credited);
        state.emit(SettlementEvent::TransferClaimed {
            recipient_tag: *tag,
            claimant: opening.address,
            asset_id,
            amount,
        });

        info!(claimant = %opening.address, asset_id, amount, "transfer claimed");
        Ok(amount)
    }

    // ===== Escrow =====

    pub fn deposit(&self, account: Address, amount: u64) -> Result<(), SettlementError> {
        if amount == 0 {
            return Err(SettlementError::InvalidAmount);
        }

        let mut state = self.state.write();
        state.ensure_active()?;

        let balance = state.escrow.get(&account).copied().unwrap_or(0);
        let balance = balance.checked_add(amount).ok_or(SettlementError::Overflow)?;
        let total_deposited = state
            .stats
            .total_deposited
            .checked_add(amount)
            .ok_or(SettlementError::Overflow)?;
        let escrow_held = state
            .stats
            .escrow_held
            .checked_add(amount)
            .ok_or(SettlementError::Overflow)?;

        state.escrow.insert(account, balance);
        state.stats.total_deposited = total_deposited;
        state.stats.escrow_held = escrow_held;
        state.emit(SettlementEvent::Deposited { account, amount });

        debug!(account = %account, amount, "deposit");
        Ok(())
    }

    pub fn withdraw(
        &self,
        account: Address,
        amount: u64,
        recipient: Address,
    ) -> Result<(), SettlementError> {
        if amount == 0 {
            return Err(SettlementError::InvalidAmount);
        }

        let mut state = self.state.write();
        state.ensure_active()?;

        let available = state.escrow.get(&account).copied().unwrap_or(0);
        if available < amount {
            return Err(SettlementError::InsufficientFunds {
                available,
                requested: amount,
            });
        }

        state.escrow.insert(account, available - amount);
        state.stats.escrow_held = state.stats.escrow_held.saturating_sub(amount);
        state.emit(SettlementEvent::Withdrawn {
            account,
            recipient,
            amount,
        });

        debug!(account = %account, recipient = %recipient, amount, "withdrawal");
        Ok(())
    }

    // ===== Administration =====

    pub fn set_asset_whitelist(
        &self,
        caller: &Address,
        asset_id: u64,
        allowed: bool,
    ) -> Result<(), SettlementError> {
        let mut state = self.state.write();
        state.ensure_owner(caller)?;
        state.whitelist.insert(asset_id, allowed);
        state.emit(SettlementEvent::AssetWhitelistUpdated { asset_id, allowed });
        info!(asset_id, allowed, "asset whitelist updated");
        Ok(())
    }

    pub fn pause(&self, caller: &Address) -> Result<(), SettlementError> {
        let mut state = self.state.write();
        state.ensure_owner(caller)?;
        if !state.paused {
            state.paused = true;
            state.emit(SettlementEvent::Paused { by: *caller });
            warn!(by = %caller, "ledger paused");
        }
        Ok(())
    }

    pub fn unpause(&self, caller: &Address) -> Result<(), SettlementError> {
        let mut state = self.state.write();
        state.ensure_owner(caller)?;
        if state.paused {
            state.paused = false;
            state.emit(SettlementEvent::Unpaused { by: *caller });
            info!(by = %caller, "ledger unpaused");
        }
        Ok(())
    }

    // ===== Queries =====

    pub fn owner(&self) -> Address {
        self.state.read().owner
    }

    pub fn is_paused(&self) -> bool {
        self.state.read().paused
    }

    pub fn is_asset_whitelisted(&self, asset_id: u64) -> bool {
        self.state.read().is_whitelisted(asset_id)
    }

    pub fn is_nullifier_used(&self, nullifier: &Nullifier) -> bool {
        self.state.read().nullifiers.contains(nullifier)
    }

    /// The current transfer under `tag`, if it has a non-zero amount
    pub fn pending_transfer(&self, tag: &RecipientTag) -> Option<PendingTransfer> {
        self.state.read().current(tag).copied()
    }

    /// Every record ever created under `tag`, oldest first
    pub fn transfer_history(&self, tag: &RecipientTag) -> Vec<PendingTransfer> {
        self.state
            .read()
            .pending
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }

    /// Escrowed balance of `account`
    pub fn balance(&self, account: &Address) -> u64 {
        self.state.read().escrow.get(account).copied().unwrap_or(0)
    }

    /// Amount of `asset_id` released to `account` by claims
    pub fn released_balance(&self, account: &Address, asset_id: u64) -> u64 {
        self.state
            .read()
            .released
            .get(&(*account, asset_id))
            .copied()
            .unwrap_or(0)
    }

    pub fn stats(&self) -> LedgerStats {
        self.state.read().stats
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.state.read().events.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::prover::{ProofOrchestrator, SettlementPayload, TransferProof, TransferRequest};
    use crate::recipient::RecipientBinding;

    const OWNER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const SENDER: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";
    const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    const ASSET: u64 = 1998;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    struct Fixture {
        orchestrator: ProofOrchestrator<MockBackend>,
        ledger: SettlementLedger,
    }

    fn fixture(binding: RecipientBinding) -> Fixture {
        let backend = Arc::new(MockBackend::default());
        let ledger = SettlementLedger::new(addr(OWNER), backend.clone());
        ledger.set_asset_whitelist(&addr(OWNER), ASSET, true).unwrap();
        Fixture {
            orchestrator: ProofOrchestrator::new(backend, binding),
            ledger,
        }
    }

    fn request(balance: u64, amount: u64, recipient: &str) -> TransferRequest {
        TransferRequest {
            sender_balance: balance,
            transfer_amount: amount,
            recipient: recipient.to_string(),
            asset_id: ASSET,
            max_amount: 12000,
            salt: None,
            balance_commitment: None,
        }
    }

    impl Fixture {
        fn prove(&self, r: &TransferRequest) -> (TransferProof, SettlementPayload) {
            let proof = self.orchestrator.generate_proof(r).unwrap();
            let payload = self
                .orchestrator
                .format_for_settlement(&proof.proof, &proof.public_signals)
                .unwrap();
            (proof, payload)
        }

        fn submit(&self, payload: &SettlementPayload) -> Result<PendingTransfer, SettlementError> {
            self.ledger
                .submit_transfer(addr(SENDER), &payload.proof, &payload.public_signals)
        }
    }

    #[test]
    fn test_submit_records_pending_transfer() {
        let f = fixture(RecipientBinding::Legacy);
        let (proof, payload) = f.prove(&request(6000, 95, RECIPIENT));

        let record = f.submit(&payload).unwrap();
        assert_eq!(record.amount, 5905);
        assert_eq!(record.asset_id, ASSET);
        assert!(!record.claimed);

        let tag = proof.public_signals.recipient_tag;
        assert_eq!(f.ledger.pending_transfer(&tag), Some(record));
        assert!(f.ledger.is_nullifier_used(&proof.public_signals.nullifier));
        assert_eq!(f.ledger.stats().total_transfers, 1);
    }

    #[test]
    fn test_replay_rejected() {
        let f = fixture(RecipientBinding::Legacy);
        let (_, payload) = f.prove(&request(6000, 95, RECIPIENT));

        f.submit(&payload).unwrap();
        let events_before = f.ledger.events().len();

        assert_eq!(f.submit(&payload), Err(SettlementError::NullifierAlreadyUsed));
        assert_eq!(f.ledger.events().len(), events_before);
        assert_eq!(f.ledger.stats().total_transfers, 1);
    }

    #[test]
    fn test_concurrent_double_submission() {
        let f = fixture(RecipientBinding::Legacy);
        let (_, payload) = f.prove(&request(6000, 95, RECIPIENT));

        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| f.submit(&payload))).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == SettlementError::NullifierAlreadyUsed));
    }

    #[test]
    fn test_tampered_signals_rejected() {
        let f = fixture(RecipientBinding::Legacy);
        let (_, payload) = f.prove(&request(6000, 95, RECIPIENT));

        for index in 0..PUBLIC_SIGNAL_COUNT {
            let mut tampered = payload.clone();
            // Flip a low bit; the value stays canonical
            tampered.public_signals[index][0] ^= 0x02;
            let err = f.submit(&tampered).unwrap_err();
            assert!(
                matches!(
                    err,
                    SettlementError::InvalidProof | SettlementError::MalformedPayload(_)
                ),
                "signal {} accepted: {:?}",
                index,
                err
            );
        }
        assert_eq!(f.ledger.stats().total_transfers, 0);
    }

    #[test]
    fn test_malformed_shapes_rejected() {
        let f = fixture(RecipientBinding::Legacy);
        let (_, payload) = f.prove(&request(6000, 95, RECIPIENT));

        let err = f
            .ledger
            .submit_transfer(addr(SENDER), &payload.proof, &payload.public_signals[..7])
            .unwrap_err();
        assert!(matches!(err, SettlementError::MalformedPayload(_)));

        let err = f
            .ledger
            .submit_transfer(addr(SENDER), &payload.proof[..23], &payload.public_signals)
            .unwrap_err();
        assert!(matches!(err, SettlementError::MalformedPayload(_)));
    }

    #[test]
    fn test_invalid_transfer_rejected() {
        let f = fixture(RecipientBinding::Legacy);
        let (_, payload) = f.prove(&request(1000, 2000, RECIPIENT));
        assert_eq!(f.submit(&payload), Err(SettlementError::TransferNotValid));
    }

    #[test]
    fn test_asset_must_be_whitelisted() {
        let f = fixture(RecipientBinding::Legacy);
        let mut r = request(6000, 95, RECIPIENT);
        r.asset_id = 7;
        let (_, payload) = f.prove(&r);
        assert_eq!(f.submit(&payload), Err(SettlementError::AssetNotWhitelisted(7)));
    }

    #[test]
    fn test_recipient_tag_in_use() {
        let f = fixture(RecipientBinding::Legacy);
        let (_, first) = f.prove(&request(6000, 95, RECIPIENT));
        let (_, second) = f.prove(&request(4000, 10, RECIPIENT));

        f.submit(&first).unwrap();
        assert_eq!(f.submit(&second), Err(SettlementError::RecipientTagInUse));
    }

    #[test]
    fn test_claim_flow() {
        let f = fixture(RecipientBinding::Legacy);
        let (proof, payload) = f.prove(&request(6000, 95, RECIPIENT));
        f.submit(&payload).unwrap();

        let tag = proof.public_signals.recipient_tag;
        let opening = proof.recipient_opening();

        // Someone else cannot claim
        let thief = RecipientOpening::legacy(addr(SENDER));
        assert_eq!(f.ledger.claim_transfer(&tag, &thief), Err(SettlementError::ClaimantMismatch));

        assert_eq!(f.ledger.claim_transfer(&tag, &opening), Ok(5905));
        assert_eq!(f.ledger.released_balance(&addr(RECIPIENT), ASSET), 5905);
        assert_eq!(f.ledger.balance(&addr(RECIPIENT)), 0);

        assert_eq!(f.ledger.claim_transfer(&tag, &opening), Err(SettlementError::AlreadyClaimed));
        assert_eq!(f.ledger.released_balance(&addr(RECIPIENT), ASSET), 5905);
    }

    #[test]
    fn test_blinded_claim() {
        let f = fixture(RecipientBinding::Blinded);
        let (proof, payload) = f.prove(&request(6000, 95, RECIPIENT));
        f.submit(&payload).unwrap();

        let tag = proof.public_signals.recipient_tag;

        // The bare address does not open a blinded tag
        let bare = RecipientOpening::legacy(addr(RECIPIENT));
        assert_eq!(f.ledger.claim_transfer(&tag, &bare), Err(SettlementError::ClaimantMismatch));

        assert_eq!(f.ledger.claim_transfer(&tag, &proof.recipient_opening()), Ok(5905));
    }

    #[test]
    fn test_claim_unknown_tag() {
        let f = fixture(RecipientBinding::Legacy);
        let opening = RecipientOpening::legacy(addr(RECIPIENT));
        assert_eq!(
            f.ledger.claim_transfer(&opening.tag(), &opening),
            Err(SettlementError::TransferNotFound)
        );
    }

    #[test]
    fn test_zero_amount_record_reads_absent() {
        let f = fixture(RecipientBinding::Legacy);
        let (proof, payload) = f.prove(&request(500, 500, RECIPIENT));
        let record = f.submit(&payload).unwrap();
        assert_eq!(record.amount, 0);

        let tag = proof.public_signals.recipient_tag;
        assert_eq!(f.ledger.pending_transfer(&tag), None);
        assert_eq!(
            f.ledger.claim_transfer(&tag, &proof.recipient_opening()),
            Err(SettlementError::TransferNotFound)
        );
    }

    #[test]
    fn test_deposit_and_withdraw() {
        let f = fixture(RecipientBinding::Legacy);
        let alice = addr(SENDER);

        assert_eq!(f.ledger.deposit(alice, 0), Err(SettlementError::InvalidAmount));
        f.ledger.deposit(alice, 1000).unwrap();
        assert_eq!(f.ledger.balance(&alice), 1000);

        assert_eq!(
            f.ledger.withdraw(alice, 1500, addr(RECIPIENT)),
            Err(SettlementError::InsufficientFunds {
                available: 1000,
                requested: 1500
            })
        );
        f.ledger.withdraw(alice, 400, addr(RECIPIENT)).unwrap();
        assert_eq!(f.ledger.balance(&alice), 600);

        let stats = f.ledger.stats();
        assert_eq!(stats.total_deposited, 1000);
        assert_eq!(stats.escrow_held, 600);
    }

    #[test]
    fn test_deposit_overflow() {
        let f = fixture(RecipientBinding::Legacy);
        let alice = addr(SENDER);
        f.ledger.deposit(alice, u64::MAX).unwrap();
        assert_eq!(f.ledger.deposit(alice, 1), Err(SettlementError::Overflow));
        assert_eq!(f.ledger.balance(&alice), u64::MAX);
    }

    #[test]
    fn test_admin_is_owner_only() {
        let f = fixture(RecipientBinding::Legacy);
        let stranger = addr(SENDER);

        assert_eq!(
            f.ledger.set_asset_whitelist(&stranger, 5, true),
            Err(SettlementError::Unauthorized)
        );
        assert_eq!(f.ledger.pause(&stranger), Err(SettlementError::Unauthorized));
        assert!(!f.ledger.is_asset_whitelisted(5));

        f.ledger.set_asset_whitelist(&addr(OWNER), ASSET, false).unwrap();
        assert!(!f.ledger.is_asset_whitelisted(ASSET));
    }

    #[test]
    fn test_paused_ledger_rejects() {
        let f = fixture(RecipientBinding::Legacy);
        let (settled, settled_payload) = f.prove(&request(6000, 95, RECIPIENT));
        let (_, payload) = f.prove(&request(3000, 20, OWNER));
        f.submit(&settled_payload).unwrap();
        f.ledger.deposit(addr(SENDER), 100).unwrap();

        let tag = settled.public_signals.recipient_tag;
        f.ledger.pause(&addr(OWNER)).unwrap();
        assert!(f.ledger.is_paused());
        let events_before = f.ledger.events().len();

        assert_eq!(f.submit(&payload), Err(SettlementError::Paused));
        assert_eq!(
            f.ledger.claim_transfer(&tag, &settled.recipient_opening()),
            Err(SettlementError::Paused)
        );
        assert_eq!(f.ledger.deposit(addr(SENDER), 10), Err(SettlementError::Paused));
        assert_eq!(
            f.ledger.withdraw(addr(SENDER), 50, addr(RECIPIENT)),
            Err(SettlementError::Paused)
        );

        assert_eq!(f.ledger.balance(&addr(SENDER)), 100);
        assert_eq!(f.ledger.released_balance(&addr(RECIPIENT), ASSET), 0);
        assert!(!f.ledger.pending_transfer(&tag).unwrap().claimed);
        assert_eq!(f.ledger.stats().total_transfers, 1);
        assert_eq!(f.ledger.events().len(), events_before);

        f.ledger.unpause(&addr(OWNER)).unwrap();
        assert!(f.submit(&payload).is_ok());
        assert_eq!(f.ledger.claim_transfer(&tag, &settled.recipient_opening()), Ok(5905));
    }

    #[test]
    fn test_paused_ledger_reports_paused_before_proof_errors() {
        let f = fixture(RecipientBinding::Legacy);
        let (_, mut payload) = f.prove(&request(6000, 95, RECIPIENT));
        payload.proof[0][0] ^= 0x01;
        let (_, invalid) = f.prove(&request(1000, 2000, RECIPIENT));

        f.ledger.pause(&addr(OWNER)).unwrap();
        assert_eq!(f.submit(&payload), Err(SettlementError::Paused));
        assert_eq!(f.submit(&invalid), Err(SettlementError::Paused));
    }

    #[test]
    fn test_tag_reusable_after_claim() {
        let f = fixture(RecipientBinding::Legacy);
        let (first, first_payload) = f.prove(&request(6000, 95, RECIPIENT));
        let (_, second_payload) = f.prove(&request(4000, 10, RECIPIENT));

        f.submit(&first_payload).unwrap();
        let tag = first.public_signals.recipient_tag;
        assert_eq!(f.ledger.claim_transfer(&tag, &first.recipient_opening()), Ok(5905));

        let second = f.submit(&second_payload).unwrap();
        assert_eq!(second.amount, 3990);
        assert_eq!(f.ledger.pending_transfer(&tag), Some(second));

        let history = f.ledger.transfer_history(&tag);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].amount, 5905);
        assert!(history[0].claimed);
        assert_eq!(history[1], second);

        let opening = RecipientOpening::legacy(addr(RECIPIENT));
        assert_eq!(f.ledger.claim_transfer(&tag, &opening), Ok(3990));
        assert_eq!(f.ledger.released_balance(&addr(RECIPIENT), ASSET), 5905 + 3990);
        assert_eq!(f.ledger.stats().total_transfers, 2);
    }

    #[test]
    fn test_events_recorded() {
        let f = fixture(RecipientBinding::Legacy);
        let (proof, payload) = f.prove(&request(6000, 95, RECIPIENT));
        f.submit(&payload).unwrap();

        let events: Vec<_> = f.ledger.events().into_iter().map(|r| r.event).collect();
        assert_eq!(
            events,
            vec![
                SettlementEvent::AssetWhitelistUpdated {
                    asset_id: ASSET,
                    allowed: true
                },
                SettlementEvent::NullifierUsed {
                    nullifier: proof.public_signals.nullifier
                },
                SettlementEvent::PrivateTransfer {
                    submitter: addr(SENDER),
                    recipient_tag: proof.public_signals.recipient_tag,
                    asset_id: ASSET
                },
            ]
        );
    }

    #[test]
    fn test_from_config() {
        let config = SettlementConfig {
            owner: addr(OWNER),
            whitelist: vec![1, 2],
        };
        let ledger = SettlementLedger::from_config(&config, Arc::new(MockBackend::default())).unwrap();
        assert!(ledger.is_asset_whitelisted(1));
        assert!(ledger.is_asset_whitelisted(2));
        assert!(!ledger.is_asset_whitelisted(3));
        assert_eq!(ledger.owner(), addr(OWNER));
    }
}
