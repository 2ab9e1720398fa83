//! Billing service
//!
//! Composes the repository, resolver, strategy selector and contract cache
//! to answer "what does this trip cost". Errors from any stage propagate
//! unchanged.

use crate::contracts::TripRepository;
use crate::pricing::{select, BillingStrategy, CacheStats, Clock, ContractCache, SystemClock};
use crate::reporting::{ClientBillingReport, ReportBuilder};
use fleetbill_common::{
    ActiveContract, CalculationResult, NewTrip, Result, RuleDocument, TripData,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Trip billing orchestrator
pub struct BillingService<C: Clock = SystemClock> {
    repository: Arc<dyn TripRepository>,
    cache: ContractCache<C>,
}

impl BillingService<SystemClock> {
    /// Create a service with a wall-clock contract cache
    pub fn new(repository: Arc<dyn TripRepository>, cache_capacity: usize) -> Result<Self> {
        Ok(Self::with_cache(repository, ContractCache::new(cache_capacity)?))
    }
}

impl<C: Clock> BillingService<C> {
    pub fn with_cache(repository: Arc<dyn TripRepository>, cache: ContractCache<C>) -> Self {
        Self { repository, cache }
    }

    /// Cost of a trip under the contract version governing its start time.
    ///
    /// The lookup is scoped to `client_id`: another tenant's trip yields
    /// `TripNotFound`, exactly as an absent one does.
    #[instrument(skip(self))]
    pub async fn calculate_trip_cost(
        &self,
        trip_id: &str,
        client_id: &str,
    ) -> Result<CalculationResult> {
        let context = self
            .repository
            .fetch_trip_context(trip_id, client_id)
            .await?;

        let strategy = select(&context.billing_model)?;
        debug!(
            contract_id = %context.rules.contract_id,
            version = context.rules.version_number,
            model = %strategy.model(),
            "Resolved contract for trip"
        );

        strategy.calculate_cost(&context.trip, &context.rules)
    }

    /// Contract version currently governing a tenant, served from cache
    #[instrument(skip(self))]
    pub async fn get_active_contract(&self, client_id: &str) -> Result<ActiveContract> {
        let document = self.active_rule_document(client_id).await?;
        Ok(ActiveContract::from(document.as_ref()))
    }

    /// Raw rule document behind `get_active_contract`
    pub async fn active_rule_document(&self, client_id: &str) -> Result<Arc<RuleDocument>> {
        self.cache
            .get_or_resolve(client_id, self.repository.as_ref())
            .await
    }

    /// Forget a tenant's cached contract so the next read re-resolves
    pub fn invalidate_contract(&self, client_id: &str) -> bool {
        self.cache.invalidate(client_id)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Log a completed trip. No cost is computed at insert time.
    #[instrument(skip(self, new_trip), fields(vendor_id = %new_trip.vendor_id))]
    pub async fn insert_new_trip(&self, new_trip: NewTrip, client_id: &str) -> Result<String> {
        let trip = new_trip.into_trip(Uuid::new_v4().to_string(), client_id)?;
        let trip_id = self.repository.insert_trip(trip).await?;
        info!(trip_id = %trip_id, "Logged new trip");
        Ok(trip_id)
    }

    /// Trip history for a tenant, newest first
    pub async fn client_trips(&self, client_id: &str) -> Result<Vec<TripData>> {
        self.repository.fetch_client_trips(client_id).await
    }

    /// Bill every trip of a tenant and aggregate the spend.
    ///
    /// Classified billing errors on a single trip are recorded on its line;
    /// anything else aborts the report.
    #[instrument(skip(self))]
    pub async fn client_report(&self, client_id: &str) -> Result<ClientBillingReport> {
        let trips = self.repository.fetch_client_trips(client_id).await?;
        let mut builder = ReportBuilder::new(client_id);

        for trip in &trips {
            match self.calculate_trip_cost(&trip.trip_id, client_id).await {
                Ok(result) => builder.add_billed(trip, &result),
                Err(err) if err.is_domain() => {
                    debug!(trip_id = %trip.trip_id, error = %err, "Trip excluded from report");
                    builder.add_failed(trip, &err);
                }
                Err(err) => return Err(err),
            }
        }

        let report = builder.build(self.cache.clock().now());
        info!(
            trips = report.totals.trip_count,
            billed = report.totals.billed_count,
            total_spend = %report.totals.total_spend,
            "Built client billing report"
        );
        Ok(report)
    }
}
