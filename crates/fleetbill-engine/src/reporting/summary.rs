//! Client billing report
//!
//! Aggregates per-trip calculations for a tenant into spend totals. Trips
//! whose calculation fails with a classified billing error are listed with
//! the error and left out of the totals.

use chrono::{DateTime, NaiveDate, Utc};
use fleetbill_common::{round_money, BillingError, BillingModel, CalculationResult, TripData};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of billing one trip in a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LineOutcome {
    Billed {
        billing_model: BillingModel,
        base_cost: Decimal,
        tax_amount: Decimal,
        total_cost: Decimal,
        employee_incentive: Decimal,
    },
    Failed {
        error: String,
    },
}

/// One trip in a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportLine {
    pub trip_id: String,
    pub vendor_id: String,
    pub start_time: DateTime<Utc>,
    pub distance_km: Decimal,
    pub is_carpool: bool,
    #[serde(flatten)]
    pub outcome: LineOutcome,
}

/// Totals over billed trips
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub trip_count: u64,
    pub billed_count: u64,
    pub failed_count: u64,
    pub total_distance_km: Decimal,
    pub total_base_cost: Decimal,
    pub total_tax: Decimal,
    pub total_spend: Decimal,
    pub average_cost: Decimal,
    pub total_employee_incentive: Decimal,
}

/// Spend report for one tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientBillingReport {
    pub client_id: String,
    pub generated_at: DateTime<Utc>,
    /// Newest trip first
    pub lines: Vec<ReportLine>,
    pub totals: ReportTotals,
    /// Spend per UTC calendar day of trip start
    pub daily_spend: BTreeMap<NaiveDate, Decimal>,
}

/// Incremental report builder
#[derive(Debug)]
pub struct ReportBuilder {
    client_id: String,
    lines: Vec<ReportLine>,
    totals: ReportTotals,
    daily_spend: BTreeMap<NaiveDate, Decimal>,
}

impl ReportBuilder {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            lines: Vec::new(),
            totals: ReportTotals::default(),
            daily_spend: BTreeMap::new(),
        }
    }

    /// Record a successfully billed trip
    pub fn add_billed(&mut self, trip: &TripData, result: &CalculationResult) {
        self.totals.trip_count += 1;
        self.totals.billed_count += 1;
        self.totals.total_distance_km += trip.distance_km;
        self.totals.total_base_cost += result.base_cost;
        self.totals.total_tax += result.tax_amount;
        self.totals.total_spend += result.total_cost;
        self.totals.total_employee_incentive += result.employee_incentive;

        *self
            .daily_spend
            .entry(trip.start_time.date_naive())
            .or_insert(Decimal::ZERO) += result.total_cost;

        self.lines.push(Self::line(
            trip,
            LineOutcome::Billed {
                billing_model: result.billing_model,
                base_cost: result.base_cost,
                tax_amount: result.tax_amount,
                total_cost: result.total_cost,
                employee_incentive: result.employee_incentive,
            },
        ));
    }

    /// Record a trip whose calculation failed
    pub fn add_failed(&mut self, trip: &TripData, error: &BillingError) {
        self.totals.trip_count += 1;
        self.totals.failed_count += 1;
        self.lines.push(Self::line(
            trip,
            LineOutcome::Failed {
                error: error.to_string(),
            },
        ));
    }

    fn line(trip: &TripData, outcome: LineOutcome) -> ReportLine {
        ReportLine {
            trip_id: trip.trip_id.clone(),
            vendor_id: trip.vendor_id.clone(),
            start_time: trip.start_time,
            distance_km: trip.distance_km,
            is_carpool: trip.is_carpool,
            outcome,
        }
    }

    pub fn build(mut self, generated_at: DateTime<Utc>) -> ClientBillingReport {
        if self.totals.billed_count > 0 {
            self.totals.average_cost =
                round_money(self.totals.total_spend / Decimal::from(self.totals.billed_count));
        }
        ClientBillingReport {
            client_id: self.client_id,
            generated_at,
            lines: self.lines,
            totals: self.totals,
            daily_spend: self.daily_spend,
        }
    }
}
