//! Trip context repository
//!
//! The narrow read/write interface the engine consumes. Implementations own
//! all I/O; the engine never talks to storage directly.

use async_trait::async_trait;
use fleetbill_common::{Result, RuleDocument, TripData};
use serde::{Deserialize, Serialize};

/// A trip joined to the contract version that governs it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripContext {
    pub trip: TripData,
    /// Raw billing model tag of the governing version
    pub billing_model: String,
    /// Governing version, valid at the trip's start time
    pub rules: RuleDocument,
}

impl TripContext {
    pub fn new(trip: TripData, rules: RuleDocument) -> Self {
        Self {
            trip,
            billing_model: rules.billing_model.clone(),
            rules,
        }
    }
}

/// Storage seam for trips and contract versions
#[async_trait]
pub trait TripRepository: Send + Sync {
    /// Tenant-scoped lookup of a trip and its governing contract version.
    ///
    /// Must fail with `TripNotFound` when the trip is absent or belongs to
    /// another tenant. The scoping happens in the lookup itself.
    async fn fetch_trip_context(&self, trip_id: &str, client_id: &str) -> Result<TripContext>;

    /// All contract versions for a tenant, optionally narrowed to one vendor
    async fn fetch_candidate_rule_documents(
        &self,
        client_id: &str,
        vendor_id: Option<&str>,
    ) -> Result<Vec<RuleDocument>>;

    /// Full trip history for a tenant, newest first
    async fn fetch_client_trips(&self, client_id: &str) -> Result<Vec<TripData>>;

    /// Persist a newly logged trip, returning its id
    async fn insert_trip(&self, trip: TripData) -> Result<String>;
}
