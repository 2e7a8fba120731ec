//! Halo2 circuit for private transfers
//!
//! This module contains the zero-knowledge circuit that proves:
//! 1. The balance commitment opens to the sender's balance under the salt
//! 2. The validity flag follows from the transfer rules
//! 3. The new balance and its commitment follow from the flag
//! 4. The nullifier is correctly derived from the spent commitment
//!
//! Circuit Public Inputs (one instance column, in order):
//! - valid, new_balance, new_balance_commitment, recipient_tag,
//!   nullifier, asset_id, max_amount, balance_commitment
//!
//! Circuit Private Inputs (Witness):
//! - sender_balance, transfer_amount, salt
//! - asset_id, max_amount and recipient_tag are witnessed and then exposed

pub mod gadgets;
pub mod transfer;

pub use transfer::TransferCircuit;
