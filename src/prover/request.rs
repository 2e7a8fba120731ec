//! Transfer requests: the caller-facing input of the orchestrator

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::warn;

use crate::commitment::BalanceCommitment;
use crate::field::{self, FieldError};
use crate::recipient::{Address, AddressError};
use crate::salt::Salt;

/// Rejected before any cryptographic work
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("invalid recipient: {0}")]
    InvalidRecipient(#[from] AddressError),
    #[error("transfer amount must be positive")]
    ZeroAmount,
    #[error("asset id must be positive")]
    ZeroAsset,
    #[error("max amount must be positive")]
    ZeroMaxAmount,
    #[error("invalid salt: {0}")]
    InvalidSalt(FieldError),
    #[error("invalid balance commitment: {0}")]
    InvalidCommitment(FieldError),
}

/// A caller's intent to transfer.
///
/// Field elements (`salt`, `balance_commitment`) are `0x`-prefixed
/// big-endian hex. Both are optional: a missing salt is drawn fresh, a
/// missing commitment is computed from the balance and salt.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub sender_balance: u64,
    pub transfer_amount: u64,
    #[serde(alias = "recipientAddress")]
    pub recipient: String,
    pub asset_id: u64,
    pub max_amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_commitment: Option<String>,
}

impl fmt::Debug for TransferRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferRequest")
            .field("recipient", &self.recipient)
            .field("asset_id", &self.asset_id)
            .field("max_amount", &self.max_amount)
            .finish_non_exhaustive()
    }
}

/// A request that passed validation
#[derive(Clone)]
pub(crate) struct ValidatedRequest {
    pub sender_balance: u64,
    pub transfer_amount: u64,
    pub recipient: Address,
    pub asset_id: u64,
    pub max_amount: u64,
    pub salt: Option<Salt>,
    pub balance_commitment: Option<BalanceCommitment>,
}

impl TransferRequest {
    /// Check shape and ranges.
    ///
    /// Overdraft and over-cap requests pass: they prove with `valid = 0`.
    pub(crate) fn validate(&self) -> Result<ValidatedRequest, InputError> {
        let recipient: Address = self.recipient.parse()?;

        if self.transfer_amount == 0 {
            return Err(InputError::ZeroAmount);
        }
        if self.asset_id == 0 {
            return Err(InputError::ZeroAsset);
        }
        if self.max_amount == 0 {
            return Err(InputError::ZeroMaxAmount);
        }

        let salt = self
            .salt
            .as_deref()
            .map(|s| s.parse::<Salt>().map_err(InputError::InvalidSalt))
            .transpose()?;
        let balance_commitment = self
            .balance_commitment
            .as_deref()
            .map(|s| {
                field::from_hex(s)
                    .map(BalanceCommitment::from_field)
                    .map_err(InputError::InvalidCommitment)
            })
            .transpose()?;

        if self.transfer_amount > self.sender_balance {
            warn!(asset_id = self.asset_id, "transfer amount exceeds balance, proof will carry valid = 0");
        }
        if self.transfer_amount > self.max_amount {
            warn!(asset_id = self.asset_id, "transfer amount exceeds max amount, proof will carry valid = 0");
        }

        Ok(ValidatedRequest {
            sender_balance: self.sender_balance,
            transfer_amount: self.transfer_amount,
            recipient,
            asset_id: self.asset_id,
            max_amount: self.max_amount,
            salt,
            balance_commitment,
        })
    }
}
