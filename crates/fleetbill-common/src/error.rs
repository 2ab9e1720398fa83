//! Error types for FleetBill
//!
//! Provides the billing error taxonomy shared by the engine and its callers

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias using BillingError
pub type Result<T> = std::result::Result<T, BillingError>;

/// Unified error type for billing operations
#[derive(Debug, Error)]
pub enum BillingError {
    // Trip absent, or owned by another tenant. Both render the same message.
    #[error("Trip {trip_id} not found")]
    TripNotFound { trip_id: String },

    // No rule document valid at the requested instant
    #[error("No active contract for client {client_id} at {at}")]
    ContractNotFound {
        client_id: String,
        at: DateTime<Utc>,
    },

    // Rule document field missing, non-numeric or out of range
    #[error("Invalid rule configuration: {0}")]
    InvalidRuleConfig(String),

    // Caller-supplied trip fields violate domain constraints
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BillingError {
    /// True for the variants a transport layer maps to "not found"
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BillingError::TripNotFound { .. } | BillingError::ContractNotFound { .. }
        )
    }

    /// True for the classified engine errors (as opposed to plumbing failures)
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            BillingError::TripNotFound { .. }
                | BillingError::ContractNotFound { .. }
                | BillingError::InvalidRuleConfig(_)
                | BillingError::InvalidInput(_)
        )
    }
}

// Implement From for common external error types
impl From<serde_json::Error> for BillingError {
    fn from(err: serde_json::Error) -> Self {
        BillingError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for BillingError {
    fn from(err: std::io::Error) -> Self {
        BillingError::Storage(err.to_string())
    }
}

impl From<anyhow::Error> for BillingError {
    fn from(err: anyhow::Error) -> Self {
        BillingError::Internal(err.to_string())
    }
}
