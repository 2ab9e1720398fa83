//! In-memory trip repository
//!
//! Contract versions live in an append-only arena indexed by tenant. The
//! only change ever made to a stored version is closing its window when a
//! renewal supersedes it. Trips are keyed by (tenant, trip id) so every
//! lookup is tenant-scoped.

use super::repository::{TripContext, TripRepository};
use super::resolver::{ensure_no_overlap, resolve};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fleetbill_common::{BillingError, Result, RuleDocument, RuleFields, TripData};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Fixture format for seeding a repository
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub contracts: Vec<RuleDocument>,
    #[serde(default)]
    pub trips: Vec<TripData>,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct TripKey {
    client_id: String,
    trip_id: String,
}

impl TripKey {
    fn new(client_id: &str, trip_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            trip_id: trip_id.to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct ContractArena {
    documents: Vec<RuleDocument>,
    by_client: HashMap<String, Vec<usize>>,
}

impl ContractArena {
    fn for_client(&self, client_id: &str) -> impl Iterator<Item = &RuleDocument> {
        self.by_client
            .get(client_id)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.documents[idx])
    }

    fn versions_of(&self, contract_id: &str) -> Vec<RuleDocument> {
        self.documents
            .iter()
            .filter(|doc| doc.contract_id == contract_id)
            .cloned()
            .collect()
    }

    fn push(&mut self, doc: RuleDocument) {
        let idx = self.documents.len();
        self.by_client
            .entry(doc.client_id.clone())
            .or_default()
            .push(idx);
        self.documents.push(doc);
    }
}

/// Reference repository backed by process memory
#[derive(Debug, Default)]
pub struct InMemoryTripRepository {
    trips: DashMap<TripKey, TripData>,
    contracts: RwLock<ContractArena>,
}

impl InMemoryTripRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository from fixture data
    pub fn from_seed(seed: SeedData) -> Result<Self> {
        let repo = Self::new();
        for doc in seed.contracts {
            repo.add_contract_version(doc)?;
        }
        for trip in seed.trips {
            repo.store_trip(trip)?;
        }
        Ok(repo)
    }

    /// Load fixture data from a JSON file
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let seed: SeedData = serde_json::from_str(&content)?;
        let repo = Self::from_seed(seed)?;
        info!(
            path = %path.as_ref().display(),
            trips = repo.trip_count(),
            contract_versions = repo.contract_version_count(),
            "Loaded seed data"
        );
        Ok(repo)
    }

    /// Append a contract version.
    ///
    /// Versions of one contract must have strictly increasing numbers and
    /// non-overlapping windows.
    pub fn add_contract_version(&self, doc: RuleDocument) -> Result<()> {
        let mut arena = self.contracts.write();
        let existing = arena.versions_of(&doc.contract_id);
        validate_version(&existing, &doc)?;

        debug!(
            contract_id = %doc.contract_id,
            version = doc.version_number,
            client_id = %doc.client_id,
            "Stored contract version"
        );
        arena.push(doc);
        Ok(())
    }

    /// Renew a contract: close the open version at `at` and append the
    /// next version starting at `at`.
    #[instrument(skip(self, fields))]
    pub fn supersede(
        &self,
        contract_id: &str,
        at: DateTime<Utc>,
        billing_model: &str,
        fields: RuleFields,
    ) -> Result<RuleDocument> {
        let mut arena = self.contracts.write();

        let open_idx = arena
            .documents
            .iter()
            .position(|d| d.contract_id == contract_id && d.valid_until.is_none())
            .ok_or_else(|| {
                BillingError::InvalidRuleConfig(format!(
                    "contract {contract_id} has no open version to supersede"
                ))
            })?;

        let current = arena.documents[open_idx].clone();
        if at <= current.valid_from {
            return Err(BillingError::InvalidRuleConfig(format!(
                "renewal at {at} must be after version {} start {}",
                current.version_number, current.valid_from
            )));
        }

        // Versions as they will stand once the open one is closed
        let existing: Vec<RuleDocument> = arena
            .versions_of(contract_id)
            .into_iter()
            .map(|mut doc| {
                if doc.version_number == current.version_number {
                    doc.valid_until = Some(at);
                }
                doc
            })
            .collect();
        let latest = existing
            .iter()
            .map(|d| d.version_number)
            .max()
            .unwrap_or(current.version_number);
        let version_number = latest.checked_add(1).ok_or_else(|| {
            BillingError::InvalidRuleConfig(format!(
                "contract {contract_id} has exhausted its version numbers"
            ))
        })?;

        let next = RuleDocument {
            contract_id: current.contract_id.clone(),
            client_id: current.client_id.clone(),
            vendor_id: current.vendor_id.clone(),
            version_number,
            billing_model: billing_model.to_string(),
            fields,
            valid_from: at,
            valid_until: None,
        };
        validate_version(&existing, &next)?;

        arena.documents[open_idx].valid_until = Some(at);
        arena.push(next.clone());

        info!(
            contract_id,
            previous = current.version_number,
            version = next.version_number,
            %at,
            "Contract superseded"
        );
        Ok(next)
    }

    fn store_trip(&self, trip: TripData) -> Result<String> {
        trip.validate()?;
        let key = TripKey::new(&trip.client_id, &trip.trip_id);
        match self.trips.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(BillingError::Storage(format!(
                "trip {} already exists",
                trip.trip_id
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let trip_id = trip.trip_id.clone();
                slot.insert(trip);
                Ok(trip_id)
            }
        }
    }

    pub fn trip_count(&self) -> usize {
        self.trips.len()
    }

    pub fn contract_version_count(&self) -> usize {
        self.contracts.read().documents.len()
    }
}

/// Checks a new version against the stored versions of its contract:
/// non-empty window, same owning tenant, strictly newer number, and no
/// overlap.
fn validate_version(existing: &[RuleDocument], doc: &RuleDocument) -> Result<()> {
    if doc.valid_until.map_or(false, |until| until <= doc.valid_from) {
        return Err(BillingError::InvalidRuleConfig(format!(
            "version {} of contract {} has an empty validity window",
            doc.version_number, doc.contract_id
        )));
    }
    if let Some(owner) = existing.iter().find(|d| d.client_id != doc.client_id) {
        return Err(BillingError::InvalidRuleConfig(format!(
            "contract {} already belongs to client {}",
            doc.contract_id, owner.client_id
        )));
    }
    if let Some(latest) = existing.iter().map(|d| d.version_number).max() {
        if doc.version_number <= latest {
            return Err(BillingError::InvalidRuleConfig(format!(
                "version {} of contract {} is not newer than version {}",
                doc.version_number, doc.contract_id, latest
            )));
        }
    }
    ensure_no_overlap(existing, doc)
}

#[async_trait]
impl TripRepository for InMemoryTripRepository {
    async fn fetch_trip_context(&self, trip_id: &str, client_id: &str) -> Result<TripContext> {
        let trip = self
            .trips
            .get(&TripKey::new(client_id, trip_id))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BillingError::TripNotFound {
                trip_id: trip_id.to_string(),
            })?;

        let arena = self.contracts.read();
        let candidates: Vec<RuleDocument> = arena
            .for_client(client_id)
            .filter(|doc| doc.vendor_id == trip.vendor_id)
            .cloned()
            .collect();
        drop(arena);

        let rules = resolve(client_id, &candidates, trip.start_time)?.clone();
        Ok(TripContext::new(trip, rules))
    }

    async fn fetch_candidate_rule_documents(
        &self,
        client_id: &str,
        vendor_id: Option<&str>,
    ) -> Result<Vec<RuleDocument>> {
        let arena = self.contracts.read();
        let documents = arena
            .for_client(client_id)
            .filter(|doc| vendor_id.map_or(true, |v| doc.vendor_id == v))
            .cloned()
            .collect();
        Ok(documents)
    }

    async fn fetch_client_trips(&self, client_id: &str) -> Result<Vec<TripData>> {
        let mut trips: Vec<TripData> = self
            .trips
            .iter()
            .filter(|entry| entry.key().client_id == client_id)
            .map(|entry| entry.value().clone())
            .collect();

        trips.sort_by(|a, b| {
            b.start_time
                .cmp(&a.start_time)
                .then_with(|| a.trip_id.cmp(&b.trip_id))
        });
        Ok(trips)
    }

    async fn insert_trip(&self, trip: TripData) -> Result<String> {
        let trip_id = self.store_trip(trip)?;
        info!(trip_id = %trip_id, "Trip inserted");
        Ok(trip_id)
    }
}
