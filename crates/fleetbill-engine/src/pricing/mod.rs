//! Pricing module
//!
//! Provides trip cost calculation with:
//! - One strategy per billing model (HYBRID, PER_TRIP, FIXED_PACKAGE)
//! - Tag-based strategy selection over a closed set
//! - Bounded LRU cache of active contracts per tenant

pub mod cache;
pub mod selector;
pub mod strategy;

pub use cache::{CacheStats, Clock, ContractCache, FixedClock, SystemClock};
pub use selector::{select, Strategy};
pub use strategy::{BillingStrategy, FixedPackageStrategy, HybridStrategy, PerTripStrategy};
