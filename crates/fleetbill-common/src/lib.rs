//! # FleetBill Common
//!
//! Shared types and errors for the FleetBill trip billing engine.
//!
//! ## Core Types
//!
//! - [`TripData`]: Immutable record of a completed trip
//! - [`RuleDocument`]: One time-bounded contract version
//! - [`BillingModel`]: Tag selecting the cost computation
//! - [`CalculationResult`]: Rounded cost with an audit breakdown
//!
//! ## Errors
//!
//! - [`BillingError`]: Trip/contract not found, invalid rule config,
//!   invalid input, and plumbing failures

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{BillingError, Result};
pub use types::{
    calculation::{
        clamp_money, round_money, Breakdown, BreakdownValue, CalculationResult, MONEY_SCALE,
    },
    rules::{ActiveContract, BillingModel, RuleDocument, RuleFields},
    trip::{NewTrip, TripData},
};

/// FleetBill version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default number of tenants kept by the contract cache
pub const DEFAULT_CONTRACT_CACHE_CAPACITY: usize = 128;
