//! Error type shared by every engine component.
//!
//! All variants are recoverable at the caller: an operation that returns one of
//! these has applied none of its ledger, pool or market updates.

use serde::{Deserialize, Serialize};

/// Result type for engine operations
pub type MarketResult<T> = Result<T, MarketError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum MarketError {
    #[error("Invalid trade: {0}")]
    InvalidTrade(String),

    #[error("Slippage exceeded: quoted {quoted} < min_out {min_out}")]
    SlippageExceeded { quoted: u128, min_out: u128 },

    #[error("Market {0} has expired")]
    MarketExpired(String),

    #[error("Market {0} has not expired yet")]
    MarketNotExpired(String),

    #[error("Market {0} is not settled")]
    MarketNotSettled(String),

    #[error("No oracle result available for market {0}")]
    ResultNotAvailable(String),

    #[error("Oracle result already published for market {0}")]
    AlreadyPublished(String),

    #[error("Too early: market {market_id} resolves at {resolve_timestamp}, now {now}")]
    TooEarly {
        market_id: String,
        resolve_timestamp: u64,
        now: u64,
    },

    #[error("Market {0} is already settled")]
    AlreadySettled(String),

    #[error("Insufficient balance: {available} < {required}")]
    InsufficientBalance { available: u128, required: u128 },

    #[error("Pool underfunded: {0}")]
    PoolUnderfunded(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid resolve time: {resolve_timestamp} <= now {now}")]
    InvalidResolveTime { resolve_timestamp: u64, now: u64 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error("Market not found: {0}")]
    MarketNotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl MarketError {
    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            MarketError::InvalidTrade(_) => "InvalidTrade",
            MarketError::SlippageExceeded { .. } => "SlippageExceeded",
            MarketError::MarketExpired(_) => "MarketExpired",
            MarketError::MarketNotExpired(_) => "MarketNotExpired",
            MarketError::MarketNotSettled(_) => "MarketNotSettled",
            MarketError::ResultNotAvailable(_) => "ResultNotAvailable",
            MarketError::AlreadyPublished(_) => "AlreadyPublished",
            MarketError::TooEarly { .. } => "TooEarly",
            MarketError::AlreadySettled(_) => "AlreadySettled",
            MarketError::InsufficientBalance { .. } => "InsufficientBalance",
            MarketError::PoolUnderfunded(_) => "PoolUnderfunded",
            MarketError::Unauthorized(_) => "Unauthorized",
            MarketError::InvalidResolveTime { .. } => "InvalidResolveTime",
            MarketError::InvalidAmount(_) => "InvalidAmount",
            MarketError::InvalidQuestion(_) => "InvalidQuestion",
            MarketError::MarketNotFound(_) => "MarketNotFound",
            MarketError::Persistence(_) => "Persistence",
        }
    }
}
