//! Contract version resolution
//!
//! Picks the single rule document whose validity window contains an
//! instant. Pure function, no I/O.

use chrono::{DateTime, Utc};
use fleetbill_common::{BillingError, Result, RuleDocument};
use tracing::{debug, warn};

/// Select the rule document valid at `at`.
///
/// Candidates are filtered on `valid_from <= at < valid_until` (open-ended
/// when `valid_until` is `None`). Version numbers only order versions of
/// the same contract: overlapping versions of one contract are a
/// data-quality fault resolved by the highest `version_number`, then the
/// latest `valid_from`. Across distinct contracts the one that started
/// most recently governs, ties going to the greatest `contract_id`.
pub fn resolve<'a>(
    client_id: &str,
    candidates: &'a [RuleDocument],
    at: DateTime<Utc>,
) -> Result<&'a RuleDocument> {
    let mut per_contract: Vec<&'a RuleDocument> = Vec::new();
    for doc in candidates.iter().filter(|doc| doc.is_valid_at(at)) {
        match per_contract
            .iter_mut()
            .find(|winner| winner.contract_id == doc.contract_id)
        {
            Some(winner) => {
                warn!(
                    client_id,
                    %at,
                    contract_id = %doc.contract_id,
                    versions = ?(winner.version_number, doc.version_number),
                    "Overlapping contract versions, preferring highest version"
                );
                if version_precedence(doc) > version_precedence(*winner) {
                    *winner = doc;
                }
            }
            None => per_contract.push(doc),
        }
    }

    if per_contract.len() > 1 {
        debug!(
            client_id,
            %at,
            contracts = per_contract.len(),
            "Several contracts valid, preferring the most recent start"
        );
    }

    per_contract
        .into_iter()
        .max_by(|a, b| {
            a.valid_from
                .cmp(&b.valid_from)
                .then_with(|| a.contract_id.cmp(&b.contract_id))
        })
        .ok_or_else(|| BillingError::ContractNotFound {
            client_id: client_id.to_string(),
            at,
        })
}

fn version_precedence(doc: &RuleDocument) -> (u32, DateTime<Utc>) {
    (doc.version_number, doc.valid_from)
}

/// Reject a new version whose window overlaps an existing version of the
/// same contract.
pub fn ensure_no_overlap(existing: &[RuleDocument], candidate: &RuleDocument) -> Result<()> {
    let clash = existing
        .iter()
        .filter(|doc| doc.contract_id == candidate.contract_id)
        .find(|doc| doc.overlaps(candidate));

    match clash {
        Some(doc) => Err(BillingError::InvalidRuleConfig(format!(
            "version {} of contract {} overlaps version {}",
            candidate.version_number, candidate.contract_id, doc.version_number
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fleetbill_common::RuleFields;
    use proptest::prelude::*;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 0, 0, 0).unwrap()
    }

    fn version(n: u32, from: u32, until: Option<u32>) -> RuleDocument {
        RuleDocument {
            contract_id: "k1".into(),
            client_id: "client-a".into(),
            vendor_id: "vendor-1".into(),
            version_number: n,
            billing_model: "HYBRID".into(),
            fields: RuleFields::new(),
            valid_from: ts(from),
            valid_until: until.map(ts),
        }
    }

    #[test]
    fn test_picks_version_covering_instant() {
        let docs = vec![version(1, 1, Some(10)), version(2, 10, Some(20)), version(3, 20, None)];

        assert_eq!(resolve("client-a", &docs, ts(5)).unwrap().version_number, 1);
        assert_eq!(resolve("client-a", &docs, ts(10)).unwrap().version_number, 2);
        assert_eq!(resolve("client-a", &docs, ts(25)).unwrap().version_number, 3);
    }

    #[test]
    fn test_no_valid_version_is_contract_not_found() {
        let docs = vec![version(1, 10, None)];
        let err = resolve("client-a", &docs, ts(5)).unwrap_err();
        assert!(matches!(
            err,
            BillingError::ContractNotFound { ref client_id, .. } if client_id == "client-a"
        ));

        let err = resolve("client-a", &[], ts(5)).unwrap_err();
        assert!(matches!(err, BillingError::ContractNotFound { .. }));
    }

    #[test]
    fn test_overlap_prefers_highest_version() {
        let docs = vec![version(3, 1, None), version(1, 1, None), version(2, 5, None)];
        let chosen = resolve("client-a", &docs, ts(6)).unwrap();
        assert_eq!(chosen.version_number, 3);
    }

    #[test]
    fn test_latest_start_wins_across_contracts() {
        let mut renewed = version(5, 2, None);
        renewed.vendor_id = "vendor-a".into();
        let mut other = version(1, 20, None);
        other.contract_id = "k2".into();
        other.vendor_id = "vendor-b".into();
        let docs = vec![version(1, 1, Some(2)), renewed, other];

        let chosen = resolve("client-a", &docs, ts(25)).unwrap();
        assert_eq!(chosen.contract_id, "k2");
        assert_eq!(chosen.version_number, 1);

        let chosen = resolve("client-a", &docs, ts(10)).unwrap();
        assert_eq!((chosen.contract_id.as_str(), chosen.version_number), ("k1", 5));
    }

    #[test]
    fn test_overlap_rejected_on_insert() {
        let existing = vec![version(1, 1, Some(10))];
        assert!(ensure_no_overlap(&existing, &version(2, 10, None)).is_ok());
        assert!(ensure_no_overlap(&existing, &version(2, 9, None)).is_err());

        let mut other_contract = version(2, 5, None);
        other_contract.contract_id = "k2".into();
        assert!(ensure_no_overlap(&existing, &other_contract).is_ok());
    }

    proptest! {
        #[test]
        fn prop_resolved_version_contains_instant(
            bounds in proptest::collection::vec((1u32..28, 0u32..10, any::<bool>()), 1..8),
            day in 1u32..28,
        ) {
            let docs: Vec<RuleDocument> = bounds
                .iter()
                .enumerate()
                .map(|(i, (from, len, open))| {
                    let until = if *open { None } else { Some((from + len).min(28)) };
                    version(i as u32 + 1, *from, until)
                })
                .collect();

            match resolve("client-a", &docs, ts(day)) {
                Ok(doc) => {
                    prop_assert!(doc.valid_from <= ts(day));
                    prop_assert!(doc.valid_until.map_or(true, |u| ts(day) < u));
                }
                Err(BillingError::ContractNotFound { .. }) => {
                    prop_assert!(docs.iter().all(|d| !d.is_valid_at(ts(day))));
                }
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }
        }
    }
}
