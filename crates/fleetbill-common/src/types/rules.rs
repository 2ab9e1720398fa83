//! Contract versions (rule documents)
//!
//! A contract is a sequence of immutable rule documents. Each document
//! governs billing over a half-open validity window `[valid_from, valid_until)`.
//! Renewal closes the current window and appends a new version; documents
//! are never edited in place, so past calculations stay reproducible.
//!
//! The numeric pricing fields are kept as a schema-flexible key/value
//! document. Each billing model reads only the keys it needs.

use crate::error::{BillingError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Billing model tag selecting the cost computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingModel {
    /// Package allowance + overage + carpool discount + night surcharge
    Hybrid,
    /// Flat fare + distance, with a minimum charge
    PerTrip,
    /// Flat fee independent of the trip
    FixedPackage,
}

impl BillingModel {
    /// Persisted tag for this model
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingModel::Hybrid => "HYBRID",
            BillingModel::PerTrip => "PER_TRIP",
            BillingModel::FixedPackage => "FIXED_PACKAGE",
        }
    }
}

impl fmt::Display for BillingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingModel {
    type Err = BillingError;

    fn from_str(tag: &str) -> Result<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "HYBRID" => Ok(BillingModel::Hybrid),
            "PER_TRIP" => Ok(BillingModel::PerTrip),
            "FIXED_PACKAGE" => Ok(BillingModel::FixedPackage),
            other => Err(BillingError::InvalidRuleConfig(format!(
                "unknown billing model: {other:?}"
            ))),
        }
    }
}

/// Semi-structured rule field document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleFields(Map<String, Value>);

impl RuleFields {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Set a field, returning self for chaining
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Set a decimal field (stored as a JSON string to keep exact precision)
    pub fn with_decimal(self, key: impl Into<String>, value: Decimal) -> Self {
        self.with(key, value.to_string())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.get(key).map_or(false, |v| !v.is_null())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Nested document, e.g. `incentive_rules`
    pub fn nested(&self, key: &str) -> Result<Option<RuleFields>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => Ok(Some(RuleFields(map.clone()))),
            Some(other) => Err(BillingError::InvalidRuleConfig(format!(
                "{key} must be an object, got {other}"
            ))),
        }
    }

    /// Numeric field, `None` when absent or null
    pub fn decimal(&self, key: &str) -> Result<Option<Decimal>> {
        let parsed = match self.0.get(key) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Number(n)) => parse_decimal(&n.to_string()),
            Some(Value::String(s)) => parse_decimal(s.trim()),
            Some(_) => None,
        };
        parsed.map(Some).ok_or_else(|| {
            BillingError::InvalidRuleConfig(format!("{key} is not numeric"))
        })
    }

    /// Numeric field that must be present
    pub fn require_decimal(&self, key: &str) -> Result<Decimal> {
        self.decimal(key)?
            .ok_or_else(|| BillingError::InvalidRuleConfig(format!("{key} is required")))
    }

    /// Required field that must be >= 0
    pub fn non_negative(&self, key: &str) -> Result<Decimal> {
        let value = self.require_decimal(key)?;
        check_non_negative(key, value)
    }

    /// Optional field that must be >= 0 when present, zero when absent
    pub fn non_negative_or_zero(&self, key: &str) -> Result<Decimal> {
        match self.decimal(key)? {
            Some(value) => check_non_negative(key, value),
            None => Ok(Decimal::ZERO),
        }
    }

    /// Required field that must be > 0 (used as a denominator)
    pub fn positive(&self, key: &str) -> Result<Decimal> {
        let value = self.require_decimal(key)?;
        if value <= Decimal::ZERO {
            return Err(BillingError::InvalidRuleConfig(format!(
                "{key} must be greater than zero, got {value}"
            )));
        }
        Ok(value)
    }

    /// Required proportion within [0, 1]
    pub fn rate(&self, key: &str) -> Result<Decimal> {
        let value = self.require_decimal(key)?;
        check_rate(key, value)
    }

    /// Optional proportion within [0, 1], zero when absent
    pub fn rate_or_zero(&self, key: &str) -> Result<Decimal> {
        match self.decimal(key)? {
            Some(value) => check_rate(key, value),
            None => Ok(Decimal::ZERO),
        }
    }
}

impl From<Map<String, Value>> for RuleFields {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

fn check_non_negative(key: &str, value: Decimal) -> Result<Decimal> {
    if value < Decimal::ZERO {
        return Err(BillingError::InvalidRuleConfig(format!(
            "{key} cannot be negative, got {value}"
        )));
    }
    Ok(value)
}

fn check_rate(key: &str, value: Decimal) -> Result<Decimal> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(BillingError::InvalidRuleConfig(format!(
            "{key} must be within [0, 1], got {value}"
        )));
    }
    Ok(value)
}

/// One immutable contract version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDocument {
    pub contract_id: String,
    pub client_id: String,
    pub vendor_id: String,
    /// Monotonically increasing per contract
    pub version_number: u32,
    /// Raw billing model tag as persisted
    pub billing_model: String,
    /// Pricing fields, schema depends on the billing model
    #[serde(default)]
    pub fields: RuleFields,
    /// Inclusive start of validity
    pub valid_from: DateTime<Utc>,
    /// Exclusive end of validity, `None` = open-ended
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
}

impl RuleDocument {
    /// Half-open window check
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && self.valid_until.map_or(true, |until| at < until)
    }

    /// Parse the billing model tag
    pub fn model(&self) -> Result<BillingModel> {
        self.billing_model.parse()
    }

    /// True when the two windows share at least one instant
    pub fn overlaps(&self, other: &RuleDocument) -> bool {
        let self_before_other = self.valid_until.map_or(false, |end| end <= other.valid_from);
        let other_before_self = other.valid_until.map_or(false, |end| end <= self.valid_from);
        !(self_before_other || other_before_self)
    }
}

/// Read-only view of the contract currently governing a tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveContract {
    pub contract_id: String,
    pub vendor_id: String,
    pub billing_model: String,
    pub rules_config: RuleFields,
    pub version_number: u32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl From<&RuleDocument> for ActiveContract {
    fn from(doc: &RuleDocument) -> Self {
        Self {
            contract_id: doc.contract_id.clone(),
            vendor_id: doc.vendor_id.clone(),
            billing_model: doc.billing_model.to_ascii_uppercase(),
            rules_config: doc.fields.clone(),
            version_number: doc.version_number,
            valid_from: doc.valid_from,
            valid_until: doc.valid_until,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn doc(from_day: u32, until_day: Option<u32>) -> RuleDocument {
        RuleDocument {
            contract_id: "k1".into(),
            client_id: "client-a".into(),
            vendor_id: "vendor-1".into(),
            version_number: 1,
            billing_model: "HYBRID".into(),
            fields: RuleFields::new(),
            valid_from: Utc.with_ymd_and_hms(2025, 1, from_day, 0, 0, 0).unwrap(),
            valid_until: until_day.map(|d| Utc.with_ymd_and_hms(2025, 1, d, 0, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_billing_model_tags() {
        assert_eq!("hybrid".parse::<BillingModel>().unwrap(), BillingModel::Hybrid);
        assert_eq!("PER_TRIP".parse::<BillingModel>().unwrap(), BillingModel::PerTrip);
        assert_eq!(
            " fixed_package ".parse::<BillingModel>().unwrap(),
            BillingModel::FixedPackage
        );
        assert!(matches!(
            "SUBSCRIPTION".parse::<BillingModel>(),
            Err(BillingError::InvalidRuleConfig(_))
        ));
        assert_eq!(
            serde_json::to_value(BillingModel::FixedPackage).unwrap(),
            json!("FIXED_PACKAGE")
        );
    }

    #[test]
    fn test_validity_window_is_half_open() {
        let d = doc(10, Some(20));
        assert!(!d.is_valid_at(Utc.with_ymd_and_hms(2025, 1, 9, 23, 59, 59).unwrap()));
        assert!(d.is_valid_at(Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap()));
        assert!(d.is_valid_at(Utc.with_ymd_and_hms(2025, 1, 19, 23, 59, 59).unwrap()));
        assert!(!d.is_valid_at(Utc.with_ymd_and_hms(2025, 1, 20, 0, 0, 0).unwrap()));

        let open = doc(10, None);
        assert!(open.is_valid_at(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_overlap_detection() {
        assert!(!doc(1, Some(10)).overlaps(&doc(10, None)));
        assert!(doc(1, Some(11)).overlaps(&doc(10, None)));
        assert!(doc(5, None).overlaps(&doc(10, None)));
    }

    #[test]
    fn test_numeric_fields_accept_numbers_and_strings() {
        let fields: RuleFields = serde_json::from_value(json!({
            "tax_rate": 0.18,
            "package_base_cost": "12000",
            "per_km_rate_after_limit": 10,
            "label": "gold",
        }))
        .unwrap();

        assert_eq!(fields.rate("tax_rate").unwrap(), dec!(0.18));
        assert_eq!(fields.non_negative("package_base_cost").unwrap(), dec!(12000));
        assert_eq!(fields.require_decimal("per_km_rate_after_limit").unwrap(), dec!(10));
        assert!(fields.decimal("label").is_err());
        assert_eq!(fields.decimal("missing").unwrap(), None);
        assert_eq!(fields.non_negative_or_zero("missing").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_domain_checks() {
        let fields = RuleFields::new()
            .with("tax_rate", 1.5)
            .with("package_km_limit", 0)
            .with("base_fare", -3);

        assert!(fields.rate("tax_rate").is_err());
        assert!(fields.positive("package_km_limit").is_err());
        assert!(fields.non_negative("base_fare").is_err());
        assert!(fields.require_decimal("fixed_fee").is_err());
    }

    #[test]
    fn test_nested_incentive_rules() {
        let fields = RuleFields::new().with("incentive_rules", json!({"carpool_bonus": 50}));
        let incentive = fields.nested("incentive_rules").unwrap().unwrap();
        assert_eq!(incentive.non_negative("carpool_bonus").unwrap(), dec!(50));

        let bad = RuleFields::new().with("incentive_rules", 5);
        assert!(bad.nested("incentive_rules").is_err());
    }

    #[test]
    fn test_active_contract_view() {
        let mut d = doc(1, None);
        d.billing_model = "per_trip".into();
        let view = ActiveContract::from(&d);
        assert_eq!(view.billing_model, "PER_TRIP");
        assert_eq!(view.contract_id, "k1");
        assert_eq!(view.vendor_id, "vendor-1");
    }
}
