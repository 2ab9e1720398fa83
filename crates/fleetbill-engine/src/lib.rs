//! # FleetBill Engine
//!
//! Contract resolution and trip cost calculation for corporate fleet
//! tenants.
//!
//! ## Pricing Models
//!
//! ```text
//! HYBRID        base = max(0, package + extra_km × rate - carpool discount) + night surcharge
//! PER_TRIP      base = max(base_fare + km × rate, min_trip_charge)
//! FIXED_PACKAGE base = fixed_fee
//! total = round(base) + round(base × tax_rate)
//! ```
//!
//! ## Flow
//!
//! ```text
//! trip_id, client_id
//!        │
//!        ▼
//! TripRepository ──► resolve (version valid at trip start)
//!        │
//!        ▼
//! select(billing_model) ──► BillingStrategy::calculate_cost
//!        │
//!        ▼
//! CalculationResult
//! ```

pub mod config;
pub mod contracts;
pub mod pricing;
pub mod reporting;
pub mod service;

pub use config::FleetBillConfig;
pub use contracts::{InMemoryTripRepository, SeedData, TripContext, TripRepository};
pub use pricing::{
    select, BillingStrategy, CacheStats, Clock, ContractCache, FixedClock, Strategy, SystemClock,
};
pub use reporting::ClientBillingReport;
pub use service::BillingService;

/// Engine version
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
