//! Strategy selection
//!
//! Maps a billing model tag to its strategy. The set of models is closed:
//! adding one means adding a `BillingModel` variant, and every match below
//! stops compiling until it is handled.

use super::strategy::{BillingStrategy, FixedPackageStrategy, HybridStrategy, PerTripStrategy};
use fleetbill_common::{BillingModel, CalculationResult, Result, RuleFields, TripData};

/// One of the supported billing strategies
#[derive(Debug, Clone, Copy)]
pub enum Strategy {
    Hybrid(HybridStrategy),
    PerTrip(PerTripStrategy),
    FixedPackage(FixedPackageStrategy),
}

impl Strategy {
    /// Strategy for a parsed billing model
    pub fn for_model(model: BillingModel) -> Self {
        match model {
            BillingModel::Hybrid => Strategy::Hybrid(HybridStrategy),
            BillingModel::PerTrip => Strategy::PerTrip(PerTripStrategy),
            BillingModel::FixedPackage => Strategy::FixedPackage(FixedPackageStrategy),
        }
    }
}

impl BillingStrategy for Strategy {
    fn model(&self) -> BillingModel {
        match self {
            Strategy::Hybrid(s) => s.model(),
            Strategy::PerTrip(s) => s.model(),
            Strategy::FixedPackage(s) => s.model(),
        }
    }

    fn compute(&self, trip: &TripData, rules: &RuleFields) -> Result<CalculationResult> {
        match self {
            Strategy::Hybrid(s) => s.compute(trip, rules),
            Strategy::PerTrip(s) => s.compute(trip, rules),
            Strategy::FixedPackage(s) => s.compute(trip, rules),
        }
    }
}

/// Select the strategy for a persisted billing model tag.
///
/// Unknown tags fail with `InvalidRuleConfig`; there is no default model.
pub fn select(billing_model_tag: &str) -> Result<Strategy> {
    let model: BillingModel = billing_model_tag.parse()?;
    Ok(Strategy::for_model(model))
}
