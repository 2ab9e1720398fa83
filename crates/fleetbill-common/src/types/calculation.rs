//! Calculation results
//!
//! Amounts are rounded to 2 fractional digits (midpoint away from zero).
//! `total_cost` is always exactly `base_cost + tax_amount` after rounding.

use super::rules::BillingModel;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Number of fractional digits kept on billed amounts
pub const MONEY_SCALE: u32 = 2;

/// Round to billing precision
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Clamp to zero, then round to billing precision
pub fn clamp_money(value: Decimal) -> Decimal {
    round_money(value.max(Decimal::ZERO))
}

/// Single audit entry value.
///
/// Untagged, so amounts and notes sit side by side as plain JSON values.
/// Deserialization tries `Amount` first: a note whose text parses as a
/// decimal (`"150"`) comes back as `Amount`. Notes written by the engine
/// are never numeric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BreakdownValue {
    Amount(Decimal),
    Text(String),
}

/// Ordered audit trail of how a total was derived.
///
/// Serialized as a JSON object whose keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Breakdown(Vec<BreakdownEntry>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakdownEntry {
    pub key: String,
    pub value: BreakdownValue,
}

impl Breakdown {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Record an amount. Re-recording a key replaces it in place.
    pub fn amount(&mut self, key: &str, value: Decimal) -> &mut Self {
        self.set(key, BreakdownValue::Amount(value))
    }

    /// Record a human-readable note
    pub fn text(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.set(key, BreakdownValue::Text(value.into()))
    }

    fn set(&mut self, key: &str, value: BreakdownValue) -> &mut Self {
        match self.0.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.value = value,
            None => self.0.push(BreakdownEntry {
                key: key.to_string(),
                value,
            }),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&BreakdownValue> {
        self.0.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    /// Amount recorded under `key`, if it is numeric
    pub fn get_amount(&self, key: &str) -> Option<Decimal> {
        match self.get(key) {
            Some(BreakdownValue::Amount(v)) => Some(*v),
            _ => None,
        }
    }

    /// Note recorded under `key`, if it is text
    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(BreakdownValue::Text(t)) => Some(t.as_str()),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|e| e.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Breakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in &self.0 {
            map.serialize_entry(&entry.key, &entry.value)?;
        }
        map.end()
    }
}

struct BreakdownVisitor;

impl<'de> Visitor<'de> for BreakdownVisitor {
    type Value = Breakdown;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of breakdown entries")
    }

    fn visit_map<A: MapAccess<'de>>(
        self,
        mut access: A,
    ) -> std::result::Result<Breakdown, A::Error> {
        let mut breakdown = Breakdown::new();
        while let Some((key, value)) = access.next_entry::<String, BreakdownValue>()? {
            breakdown.set(&key, value);
        }
        Ok(breakdown)
    }
}

impl<'de> Deserialize<'de> for Breakdown {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(BreakdownVisitor)
    }
}

/// Output of a single cost computation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub trip_id: String,
    pub billing_model: BillingModel,
    pub base_cost: Decimal,
    pub tax_amount: Decimal,
    /// base_cost + tax_amount
    pub total_cost: Decimal,
    pub breakdown: Breakdown,
    /// Paid to the employee by the client, not part of total_cost
    #[serde(default)]
    pub employee_incentive: Decimal,
    #[serde(default)]
    pub incentive_breakdown: Breakdown,
}

impl CalculationResult {
    /// Build a result from unrounded amounts.
    ///
    /// Negative inputs are clamped to zero before rounding and the total
    /// is derived from the rounded parts.
    pub fn new(
        trip_id: impl Into<String>,
        billing_model: BillingModel,
        base_cost: Decimal,
        tax_amount: Decimal,
        breakdown: Breakdown,
    ) -> Self {
        let base_cost = clamp_money(base_cost);
        let tax_amount = clamp_money(tax_amount);
        Self {
            trip_id: trip_id.into(),
            billing_model,
            base_cost,
            tax_amount,
            total_cost: base_cost + tax_amount,
            breakdown,
            employee_incentive: Decimal::ZERO,
            incentive_breakdown: Breakdown::new(),
        }
    }

    /// Attach an employee incentive
    pub fn with_incentive(mut self, amount: Decimal, breakdown: Breakdown) -> Self {
        self.employee_incentive = clamp_money(amount);
        self.incentive_breakdown = breakdown;
        self
    }
}
