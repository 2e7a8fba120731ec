use chrono::{DateTime, Utc};

use crate::nullifier::Nullifier;
use crate::recipient::{Address, RecipientTag};

/// A successful ledger transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettlementEvent {
    Deposited {
        account: Address,
        amount: u64,
    },
    Withdrawn {
        account: Address,
        recipient: Address,
        amount: u64,
    },
    PrivateTransfer {
        submitter: Address,
        recipient_tag: RecipientTag,
        asset_id: u64,
    },
    NullifierUsed {
        nullifier: Nullifier,
    },
    TransferClaimed {
        recipient_tag: RecipientTag,
        claimant: Address,
        asset_id: u64,
        amount: u64,
    },
    AssetWhitelistUpdated {
        asset_id: u64,
        allowed: bool,
    },
    Paused {
        by: Address,
    },
    Unpaused {
        by: Address,
    },
}

/// An event with the time it was recorded
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRecord {
    pub at: DateTime<Utc>,
    pub event: SettlementEvent,
}

impl EventRecord {
    pub fn now(event: SettlementEvent) -> Self {
        Self {
            at: Utc::now(),
            event,
        }
    }
}
