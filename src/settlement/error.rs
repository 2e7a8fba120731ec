use thiserror::Error;

/// Reasons a settlement operation is refused.
///
/// A refused operation never changes ledger state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettlementError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("proof does not verify against the submitted signals")]
    InvalidProof,
    #[error("proof attests an invalid transfer")]
    TransferNotValid,
    #[error("asset {0} is not whitelisted")]
    AssetNotWhitelisted(u64),
    #[error("nullifier already used")]
    NullifierAlreadyUsed,
    #[error("recipient tag already holds a pending transfer")]
    RecipientTagInUse,
    #[error("no pending transfer for this recipient tag")]
    TransferNotFound,
    #[error("transfer already claimed")]
    AlreadyClaimed,
    #[error("claimant does not open the recipient tag")]
    ClaimantMismatch,
    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: u64, requested: u64 },
    #[error("amount must be positive")]
    InvalidAmount,
    #[error("caller is not the ledger owner")]
    Unauthorized,
    #[error("ledger is paused")]
    Paused,
    #[error("arithmetic overflow")]
    Overflow,
}
