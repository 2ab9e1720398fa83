//! Billing strategies
//!
//! One cost computation per billing model:
//!
//! ```text
//! HYBRID        base = max(0, package + overage - carpool discount) + night surcharge
//! PER_TRIP      base = max(base_fare + km * base_rate_km, min_trip_charge)
//! FIXED_PACKAGE base = fixed_fee
//!
//! tax   = base * tax_rate
//! total = base + tax            (each rounded to 2 dp)
//! ```
//!
//! Strategies are pure: they never mutate their inputs and perform no I/O.

use fleetbill_common::{
    round_money, BillingError, BillingModel, Breakdown, CalculationResult, Result, RuleDocument,
    RuleFields, TripData,
};
use rust_decimal::Decimal;

/// Common contract for all billing models
pub trait BillingStrategy: Send + Sync {
    /// Billing model this strategy implements
    fn model(&self) -> BillingModel;

    /// Model-specific computation of base cost, tax and breakdown
    fn compute(&self, trip: &TripData, rules: &RuleFields) -> Result<CalculationResult>;

    /// Validate the trip, run the model computation and attach any
    /// employee incentive.
    fn calculate_cost(&self, trip: &TripData, rules: &RuleDocument) -> Result<CalculationResult> {
        trip.validate()?;
        let result = self.compute(trip, &rules.fields)?;
        apply_incentive(result, trip, &rules.fields)
    }
}

/// Unwrap a checked `Decimal` operation, reporting overflow as a rule
/// configuration fault
fn checked(value: Option<Decimal>, what: &str) -> Result<Decimal> {
    value.ok_or_else(|| BillingError::InvalidRuleConfig(format!("{what} overflows")))
}

/// Tax on an already-final base cost.
///
/// Also guarantees the rounded total is representable.
fn apply_tax(base_cost: Decimal, rules: &RuleFields) -> Result<(Decimal, Decimal)> {
    let tax_rate = rules.rate("tax_rate")?;
    let tax_amount = checked(base_cost.checked_mul(tax_rate), "tax_amount")?;
    checked(
        round_money(base_cost).checked_add(round_money(tax_amount)),
        "total_cost",
    )?;
    Ok((tax_rate, tax_amount))
}

/// Carpool bonus paid to the employee. Reported beside the bill, never
/// added to it.
fn apply_incentive(
    result: CalculationResult,
    trip: &TripData,
    rules: &RuleFields,
) -> Result<CalculationResult> {
    let Some(incentive) = rules.nested("incentive_rules")? else {
        return Ok(result);
    };
    let Some(bonus) = incentive.decimal("carpool_bonus")? else {
        return Ok(result);
    };
    if bonus < Decimal::ZERO {
        return Err(BillingError::InvalidRuleConfig(format!(
            "incentive_rules.carpool_bonus cannot be negative, got {bonus}"
        )));
    }
    if !trip.is_carpool {
        return Ok(result);
    }

    let mut breakdown = Breakdown::new();
    breakdown.amount("carpool_bonus", bonus);
    Ok(result.with_incentive(bonus, breakdown))
}

/// Package allowance + overage + carpool discount + night-shift surcharge
#[derive(Debug, Clone, Copy, Default)]
pub struct HybridStrategy;

impl HybridStrategy {
    /// Trips starting at or after this UTC hour are night shift
    pub const NIGHT_SHIFT_START_HOUR: u32 = 20;
    /// Trips starting before this UTC hour are night shift
    pub const NIGHT_SHIFT_END_HOUR: u32 = 6;

    pub fn is_night_shift(trip: &TripData) -> bool {
        let hour = trip.start_hour();
        hour >= Self::NIGHT_SHIFT_START_HOUR || hour < Self::NIGHT_SHIFT_END_HOUR
    }
}

impl BillingStrategy for HybridStrategy {
    fn model(&self) -> BillingModel {
        BillingModel::Hybrid
    }

    fn compute(&self, trip: &TripData, rules: &RuleFields) -> Result<CalculationResult> {
        let package_base_cost = rules.non_negative("package_base_cost")?;
        let package_km_limit = rules.positive("package_km_limit")?;
        let overage_rate = rules.non_negative("per_km_rate_after_limit")?;
        let discount_rate = rules.rate_or_zero("carpool_discount_rate")?;
        let night_surcharge = rules.non_negative_or_zero("night_shift_surcharge")?;

        let distance = trip.distance_km;
        let package_unit_cost = checked(
            package_base_cost.checked_div(package_km_limit),
            "package_unit_cost",
        )?;
        let package_km = distance.min(package_km_limit);
        let extra_km = (distance - package_km_limit).max(Decimal::ZERO);
        let extra_cost = checked(extra_km.checked_mul(overage_rate), "extra_cost")?;
        let subtotal = if distance.is_zero() {
            Decimal::ZERO
        } else {
            checked(
                package_unit_cost
                    .checked_mul(package_km)
                    .and_then(|cost| cost.checked_add(extra_cost)),
                "distance_cost",
            )?
        };

        let discount = if trip.is_carpool {
            checked(subtotal.checked_mul(discount_rate), "carpool_discount")?
        } else {
            Decimal::ZERO
        };

        let mut breakdown = Breakdown::new();
        let surcharge = if Self::is_night_shift(trip) {
            breakdown.amount("night_shift_surcharge", night_surcharge);
            night_surcharge
        } else {
            breakdown
                .amount("night_shift_surcharge", Decimal::ZERO)
                .text("note", "Not a night shift trip");
            Decimal::ZERO
        };

        breakdown
            .amount("package_unit_cost", package_unit_cost)
            .amount("package_km", package_km)
            .amount("extra_km", extra_km)
            .amount("extra_cost", extra_cost)
            .amount("distance_cost", subtotal)
            .amount("rate_per_km", overage_rate)
            .amount("carpool_discount", discount);
        if discount.is_zero() {
            breakdown.text("discount_note", "No carpool discount applied");
        } else {
            breakdown.amount("carpool_discount_rate", discount_rate);
        }

        let base_cost = checked(
            (subtotal - discount).max(Decimal::ZERO).checked_add(surcharge),
            "base_cost",
        )?;
        let (tax_rate, tax_amount) = apply_tax(base_cost, rules)?;
        breakdown.amount("tax_rate", tax_rate);

        Ok(CalculationResult::new(
            &trip.trip_id,
            self.model(),
            base_cost,
            tax_amount,
            breakdown,
        ))
    }
}

/// Flat fare + distance with a contractual floor
#[derive(Debug, Clone, Copy, Default)]
pub struct PerTripStrategy;

impl BillingStrategy for PerTripStrategy {
    fn model(&self) -> BillingModel {
        BillingModel::PerTrip
    }

    fn compute(&self, trip: &TripData, rules: &RuleFields) -> Result<CalculationResult> {
        let base_fare = rules.non_negative("base_fare")?;
        let rate_per_km = rules.non_negative("base_rate_km")?;
        let min_trip_charge = rules.non_negative_or_zero("min_trip_charge")?;

        let distance_cost = checked(trip.distance_km.checked_mul(rate_per_km), "distance_cost")?;
        let raw_cost = checked(base_fare.checked_add(distance_cost), "raw_cost")?;
        let base_cost = raw_cost.max(min_trip_charge);

        let mut breakdown = Breakdown::new();
        breakdown
            .amount("base_fare", base_fare)
            .amount("distance_cost", distance_cost)
            .amount("rate_per_km", rate_per_km)
            .amount("raw_cost", raw_cost)
            .amount("min_trip_charge", min_trip_charge);
        if raw_cost < min_trip_charge {
            breakdown.text("note", "Minimum trip charge applied");
        }

        let (tax_rate, tax_amount) = apply_tax(base_cost, rules)?;
        breakdown.amount("tax_rate", tax_rate);

        Ok(CalculationResult::new(
            &trip.trip_id,
            self.model(),
            base_cost,
            tax_amount,
            breakdown,
        ))
    }
}

/// Flat recurring fee; distance and carpool flag do not affect cost
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPackageStrategy;

impl BillingStrategy for FixedPackageStrategy {
    fn model(&self) -> BillingModel {
        BillingModel::FixedPackage
    }

    fn compute(&self, trip: &TripData, rules: &RuleFields) -> Result<CalculationResult> {
        let fixed_fee = rules.non_negative("fixed_fee")?;

        let mut breakdown = Breakdown::new();
        breakdown
            .amount("fixed_fee", fixed_fee)
            .amount("km_consumed", trip.distance_km)
            .text("note", "Covered by fixed package fee");

        let (tax_rate, tax_amount) = apply_tax(fixed_fee, rules)?;
        breakdown.amount("tax_rate", tax_rate);

        Ok(CalculationResult::new(
            &trip.trip_id,
            self.model(),
            fixed_fee,
            tax_amount,
            breakdown,
        ))
    }
}
