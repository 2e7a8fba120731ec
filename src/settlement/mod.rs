//! Exactly-once settlement of transfer proofs
//!
//! The ledger accepts proof words and public signal words, verifies them,
//! consumes the nullifier and records a pending transfer that the holder
//! of the recipient tag can later claim.

pub mod error;
pub mod events;
pub mod ledger;

pub use error::SettlementError;
pub use events::{EventRecord, SettlementEvent};
pub use ledger::{LedgerStats, PendingTransfer, SettlementLedger};
