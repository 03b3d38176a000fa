//! The errors the engine can return.
//!
//! Business-rule rejections ([`InsufficientFunds`], [`InvalidTransition`],
//! [`Validation`]) are surfaced to the caller verbatim. An
//! [`InvariantViolation`] means the engine was about to break conservation or
//! drive a balance negative outside the normal debit path; the enclosing
//! database transaction is aborted and nothing is persisted.
//!
//! [`InsufficientFunds`]: EngineError::InsufficientFunds
//! [`InvalidTransition`]: EngineError::InvalidTransition
//! [`Validation`]: EngineError::Validation
//! [`InvariantViolation`]: EngineError::InvariantViolation
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Unknown account: {0}")]
    UnknownAccount(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Invalid hold state: {0}")]
    InvalidHoldState(String),
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::UnknownAccount(a), Self::UnknownAccount(b)) => a == b,
            (Self::InvalidTransition(a), Self::InvalidTransition(b)) => a == b,
            (Self::InvalidHoldState(a), Self::InvalidHoldState(b)) => a == b,
            (Self::ConcurrentModification(a), Self::ConcurrentModification(b)) => a == b,
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::InvariantViolation(a), Self::InvariantViolation(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
