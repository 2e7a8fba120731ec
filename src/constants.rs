//! Protocol constants for the private transfer circuit and settlement layer

/// Number of public signals exposed by a transfer proof:
/// `[valid, newBalance, newBalanceCommitment, recipientTag, nullifier,
/// assetId, maxAmount, balanceCommitment]`
pub const PUBLIC_SIGNAL_COUNT: usize = 8;

/// Positions of each public signal in the ordered tuple
pub mod signal {
    pub const VALID: usize = 0;
    pub const NEW_BALANCE: usize = 1;
    pub const NEW_BALANCE_COMMITMENT: usize = 2;
    pub const RECIPIENT_TAG: usize = 3;
    pub const NULLIFIER: usize = 4;
    pub const ASSET_ID: usize = 5;
    pub const MAX_AMOUNT: usize = 6;
    pub const BALANCE_COMMITMENT: usize = 7;
}

/// Width of a settlement word (one uint256 slot)
pub const WORD_SIZE: usize = 32;

/// Proof length, in words, of the fixed-layout transcript backend.
/// Matches the `uint256[24]` proof slot of the settlement interface.
pub const FIXED_PROOF_WORDS: usize = 24;

/// Bit width of every numeric input (balance, amount, cap, asset id).
/// The circuit range-checks each input to this width so that modular
/// wraparound cannot satisfy the overdraft comparison.
pub const AMOUNT_BITS: usize = 64;

/// Circuit size parameter: the transfer circuit fits in 2^11 rows
pub const DEFAULT_CIRCUIT_K: u32 = 11;

/// Bumped whenever the constraint system changes shape
pub const CIRCUIT_VERSION: u32 = 1;

/// Hex-encoded Ethereum addresses are 20 bytes
pub const ADDRESS_SIZE: usize = 20;

/// Domain separators for hash functions
pub mod domains {
    /// Domain separator for nullifier derivation
    pub const NULLIFIER: &[u8] = b"PrivateTransfer_Nullifier";

    /// Domain separator for blinded recipient tags
    pub const RECIPIENT_TAG: &[u8] = b"PrivateTransfer_RecipientTag";

    /// Domain separator for the transcript backend
    pub const MOCK_TRANSCRIPT: &[u8] = b"PrivateTransfer_MockTranscript";

    /// Domain separator for artifact digests
    pub const ARTIFACT: &[u8] = b"PrivateTransfer_Artifact";
}
