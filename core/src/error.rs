//! Ledger error types

use thiserror::Error;

use crate::config::ConfigError;

/// Errors returned by ledger operations.
///
/// A failed call never leaves a partial mutation behind.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u64, available: u64 },

    #[error("Not approved: {0}")]
    NotApproved(String),

    #[error("Account is blocked: {0}")]
    AccountBlocked(String),

    #[error("Income account is not configured")]
    IncomeAccountNotSet,

    #[error("Invalid operator: {0}")]
    InvalidOperator(String),

    #[error("Invalid referral relation: {0}")]
    InvalidReferral(String),

    #[error("Supply overflow")]
    SupplyOverflow,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
