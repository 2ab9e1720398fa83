//! Trip records
//!
//! A trip is created by the ingestion side and is read-only to the billing
//! engine. Cost is never stored on the trip; it is computed on demand.

use crate::error::{BillingError, Result};
use chrono::{DateTime, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Immutable record of a completed trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripData {
    /// Trip identifier
    pub trip_id: String,
    /// Owning tenant
    pub client_id: String,
    /// Vendor that operated the trip
    pub vendor_id: String,
    /// Distance travelled in kilometres
    pub distance_km: Decimal,
    /// Trip start
    pub start_time: DateTime<Utc>,
    /// Trip end
    pub end_time: DateTime<Utc>,
    /// Shared ride flag, drives carpool discount and incentive
    #[serde(default)]
    pub is_carpool: bool,
}

impl TripData {
    /// Check the basic domain constraints on the trip fields
    pub fn validate(&self) -> Result<()> {
        if self.trip_id.is_empty() {
            return Err(BillingError::InvalidInput("trip_id is required".into()));
        }
        if self.client_id.is_empty() {
            return Err(BillingError::InvalidInput("client_id is required".into()));
        }
        if self.vendor_id.is_empty() {
            return Err(BillingError::InvalidInput("vendor_id is required".into()));
        }
        if self.distance_km < Decimal::ZERO {
            return Err(BillingError::InvalidInput(format!(
                "distance_km cannot be negative: {}",
                self.distance_km
            )));
        }
        if self.end_time < self.start_time {
            return Err(BillingError::InvalidInput(format!(
                "end_time {} is before start_time {}",
                self.end_time, self.start_time
            )));
        }
        Ok(())
    }

    /// Trip duration in minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// UTC hour the trip started in (0-23)
    pub fn start_hour(&self) -> u32 {
        self.start_time.hour()
    }
}

/// Caller-supplied fields for logging a new trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrip {
    pub vendor_id: String,
    pub distance_km: Decimal,
    pub start_time: DateTime<Utc>,
    /// Missing end time means a zero-duration trip
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_carpool: bool,
}

impl NewTrip {
    pub fn new(
        vendor_id: impl Into<String>,
        distance_km: Decimal,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            vendor_id: vendor_id.into(),
            distance_km,
            start_time,
            end_time: None,
            is_carpool: false,
        }
    }

    /// Set the end time
    pub fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    /// Mark as a carpool trip
    pub fn with_carpool(mut self, is_carpool: bool) -> Self {
        self.is_carpool = is_carpool;
        self
    }

    /// Bind the fields to a tenant and trip id, validating the result
    pub fn into_trip(
        self,
        trip_id: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Result<TripData> {
        let trip = TripData {
            trip_id: trip_id.into(),
            client_id: client_id.into(),
            vendor_id: self.vendor_id,
            distance_km: self.distance_km,
            start_time: self.start_time,
            end_time: self.end_time.unwrap_or(self.start_time),
            is_carpool: self.is_carpool,
        };
        trip.validate()?;
        Ok(trip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sample_trip() -> TripData {
        TripData {
            trip_id: "d0001".into(),
            client_id: "client-a".into(),
            vendor_id: "vendor-1".into(),
            distance_km: dec!(25.5),
            start_time: Utc.with_ymd_and_hms(2025, 11, 23, 10, 30, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 11, 23, 10, 45, 0).unwrap(),
            is_carpool: false,
        }
    }

    #[test]
    fn test_valid_trip() {
        let trip = sample_trip();
        assert!(trip.validate().is_ok());
        assert_eq!(trip.duration_minutes(), 15);
        assert_eq!(trip.start_hour(), 10);
    }

    #[test]
    fn test_negative_distance_rejected() {
        let mut trip = sample_trip();
        trip.distance_km = dec!(-1);
        assert!(matches!(trip.validate(), Err(BillingError::InvalidInput(_))));
    }

    #[test]
    fn test_end_before_start_rejected() {
        let mut trip = sample_trip();
        trip.end_time = trip.start_time - chrono::Duration::minutes(1);
        assert!(matches!(trip.validate(), Err(BillingError::InvalidInput(_))));
    }

    #[test]
    fn test_new_trip_without_end_time() {
        let start = Utc.with_ymd_and_hms(2025, 11, 23, 10, 30, 0).unwrap();
        let trip = NewTrip::new("vendor-1", dec!(10.5), start)
            .with_carpool(true)
            .into_trip("t-1", "client-a")
            .unwrap();

        assert_eq!(trip.end_time, start);
        assert!(trip.is_carpool);
        assert_eq!(trip.duration_minutes(), 0);
    }
}
