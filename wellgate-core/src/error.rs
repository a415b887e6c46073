//! Wellgate Core Error Types
//!
//! Error definitions for payment gating, XP accounting and reward
//! distribution operations.

use thiserror::Error;

/// Wellgate Core Error
#[derive(Error, Debug)]
pub enum CoreError {
    /// Chain RPC connection error
    #[error("Chain RPC connection failed: {0}")]
    RpcConnection(String),

    /// Chain RPC request error
    #[error("Chain RPC request failed: {0}")]
    RpcRequest(String),

    /// Chain RPC response error
    #[error("Chain RPC response error: {message}")]
    RpcResponse { code: i32, message: String },

    /// Chain RPC timed out
    #[error("Chain RPC timed out: {0}")]
    RpcTimeout(String),

    /// Transaction is not yet visible on the chain
    #[error("Transaction not indexed yet: {0}")]
    TxNotIndexed(String),

    /// Transaction executed but reverted on chain
    #[error("Transaction failed on chain: {0}")]
    TxFailed(String),

    /// Transfer went to an unexpected recipient
    #[error("Wrong recipient: expected {expected}, got {actual}")]
    WrongRecipient { expected: String, actual: String },

    /// Transfer amount below the required minimum
    #[error("Amount below minimum: required {required}, got {actual}")]
    AmountBelowMinimum { required: u128, actual: u128 },

    /// No matching transfer to the configured recipient
    #[error("No transfer to recipient found in transaction {0}")]
    NoTransferToRecipient(String),

    /// Transaction hash already used to settle a payment
    #[error("Transaction already consumed: {0}")]
    AlreadyConsumed(String),

    /// Payment request expired before proof submission
    #[error("Payment request expired: {0}")]
    RequestExpired(String),

    /// Payment request does not exist
    #[error("Payment request not found: {0}")]
    RequestNotFound(String),

    /// Payment request already settled
    #[error("Payment request already settled: {0}")]
    RequestAlreadySettled(String),

    /// On-chain transfer predates the payment request beyond tolerance
    #[error("Stale proof: transfer mined at {mined_at}, request created at {requested_at}")]
    StaleProof { mined_at: u64, requested_at: u64 },

    /// Proof timestamp falls outside the freshness window
    #[error("Proof outside freshness window: signed at {signed_at}, verified at {verified_at}")]
    ProofOutOfWindow { signed_at: u64, verified_at: u64 },

    /// Proof names a different chain than the request was issued for
    #[error("Wrong chain: request issued for chain {expected}, proof names {got}")]
    WrongChain { expected: u64, got: u64 },

    /// Not enough spendable XP for the redemption
    #[error("Insufficient XP: required {required}, available {available}")]
    InsufficientXp { required: u64, available: u64 },

    /// Redemption below the minimum XP threshold
    #[error("Redemption below minimum: minimum {minimum} XP, got {actual}")]
    BelowMinimumRedeem { minimum: u64, actual: u64 },

    /// Daily token cap would be exceeded; rejected in full
    #[error("Daily cap exceeded: requested {requested} tokens, {available} available")]
    DailyCapExceeded { requested: u64, available: u64 },

    /// Weekly pool already distributed for the window
    #[error("Pool already distributed for week {0}")]
    AlreadyDistributed(u64),

    /// Weekly pool window has not fully elapsed yet
    #[error("Pool window {0} has not elapsed yet")]
    WindowNotElapsed(u64),

    /// Another worker currently holds the distribution lease
    #[error("Pool {week_index} distribution in progress, lease held by {owner}")]
    DistributionBusy { week_index: u64, owner: String },

    /// Malformed transaction hash
    #[error("Malformed transaction hash: {0}")]
    MalformedTxHash(String),

    /// Invalid address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Whether the failure is worth retrying with the same inputs.
    ///
    /// Transient errors cover connectivity and indexing lag; everything
    /// else is a definitive verdict about the inputs themselves.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::RpcConnection(_)
                | CoreError::RpcRequest(_)
                | CoreError::RpcTimeout(_)
                | CoreError::TxNotIndexed(_)
                | CoreError::DistributionBusy { .. }
        )
    }

    /// Stable machine-readable reason code for API responses and logs.
    pub fn reason_code(&self) -> &'static str {
        match self {
            CoreError::RpcConnection(_) => "RPC_CONNECTION",
            CoreError::RpcRequest(_) => "RPC_REQUEST",
            CoreError::RpcResponse { .. } => "RPC_RESPONSE",
            CoreError::RpcTimeout(_) => "RPC_TIMEOUT",
            CoreError::TxNotIndexed(_) => "TX_NOT_INDEXED",
            CoreError::TxFailed(_) => "TX_FAILED",
            CoreError::WrongRecipient { .. } => "WRONG_RECIPIENT",
            CoreError::AmountBelowMinimum { .. } => "AMOUNT_BELOW_MINIMUM",
            CoreError::NoTransferToRecipient(_) => "NO_TRANSFER_TO_RECIPIENT",
            CoreError::AlreadyConsumed(_) => "ALREADY_CONSUMED",
            CoreError::RequestExpired(_) => "REQUEST_EXPIRED",
            CoreError::RequestNotFound(_) => "REQUEST_NOT_FOUND",
            CoreError::RequestAlreadySettled(_) => "REQUEST_ALREADY_SETTLED",
            CoreError::StaleProof { .. } => "STALE_PROOF",
            CoreError::ProofOutOfWindow { .. } => "PROOF_OUT_OF_WINDOW",
            CoreError::WrongChain { .. } => "WRONG_CHAIN",
            CoreError::InsufficientXp { .. } => "INSUFFICIENT_XP",
            CoreError::BelowMinimumRedeem { .. } => "BELOW_MINIMUM_REDEEM",
            CoreError::DailyCapExceeded { .. } => "DAILY_CAP_EXCEEDED",
            CoreError::AlreadyDistributed(_) => "ALREADY_DISTRIBUTED",
            CoreError::WindowNotElapsed(_) => "WINDOW_NOT_ELAPSED",
            CoreError::DistributionBusy { .. } => "DISTRIBUTION_BUSY",
            CoreError::MalformedTxHash(_) => "MALFORMED_TX_HASH",
            CoreError::InvalidAddress(_) => "INVALID_ADDRESS",
            CoreError::InvalidInput(_) => "INVALID_INPUT",
            CoreError::Configuration(_) => "CONFIGURATION",
            CoreError::Storage(_) => "STORAGE",
            CoreError::Serialization(_) => "SERIALIZATION",
        }
    }
}

/// Wellgate Result type
pub type CoreResult<T> = Result<T, CoreError>;

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CoreError::RpcTimeout(e.to_string())
        } else if e.is_connect() {
            CoreError::RpcConnection(e.to_string())
        } else {
            CoreError::RpcRequest(e.to_string())
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<hex::FromHexError> for CoreError {
    fn from(e: hex::FromHexError) -> Self {
        CoreError::Serialization(format!("Hex decode error: {}", e))
    }
}
