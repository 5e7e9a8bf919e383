//! Error types for the escrow ledger
//!
//! One variant per reportable condition so callers can distinguish a missing
//! record from a lifecycle violation from a funds check, without string
//! matching on messages.

use thiserror::Error;

/// Main error type for ledger operations
#[derive(Error, Debug)]
pub enum EscrowError {
    /// Gig, request, active gig, user, or balance missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation attempted outside the required lifecycle state
    #[error("Invalid state ({current}): {reason}")]
    InvalidState { current: String, reason: String },

    /// Milestone index out of range, or sequential-order rule violated
    #[error("Invalid milestone index: {0}")]
    InvalidIndex(String),

    /// Duplicate application, or milestone already approved
    #[error("Already processed: {0}")]
    AlreadyProcessed(String),

    /// Employer balance too low for the required escrow payment
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Company escrow account too low for the milestone payout
    #[error("Insufficient company funds: {0}")]
    InsufficientCompanyFunds(String),

    /// Caller must re-confirm the payment instrument before proceeding
    #[error("Payment verification required: {0}")]
    PaymentVerificationRequired(String),

    /// Gig-creation input errors (milestone shape, payment totals)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Artifact store failures
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EscrowError {
    /// Create a not-found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid-state error
    pub fn invalid_state<S: Into<String>>(current: S, reason: S) -> Self {
        Self::InvalidState {
            current: current.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-index error
    pub fn invalid_index<S: Into<String>>(msg: S) -> Self {
        Self::InvalidIndex(msg.into())
    }

    /// Create an already-processed error
    pub fn already_processed<S: Into<String>>(msg: S) -> Self {
        Self::AlreadyProcessed(msg.into())
    }

    /// Create an insufficient-funds error
    pub fn insufficient_funds<S: Into<String>>(msg: S) -> Self {
        Self::InsufficientFunds(msg.into())
    }

    /// Create an insufficient-company-funds error
    pub fn insufficient_company_funds<S: Into<String>>(msg: S) -> Self {
        Self::InsufficientCompanyFunds(msg.into())
    }

    /// Create a payment-verification-required error
    pub fn payment_verification_required<S: Into<String>>(msg: S) -> Self {
        Self::PaymentVerificationRequired(msg.into())
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<config::ConfigError> for EscrowError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
