//! FleetBill Performance Benchmarks
//!
//! - Strategy computation per billing model
//! - Contract resolution over growing version histories
//! - Contract cache hit path

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fleetbill_common::{RuleDocument, RuleFields, TripData};
use fleetbill_engine::contracts::resolve;
use fleetbill_engine::{select, BillingStrategy, ContractCache, FixedClock, InMemoryTripRepository};
use rust_decimal::Decimal;
use std::time::Duration;

fn trip(distance_km: i64, hour: u32, is_carpool: bool) -> TripData {
    let start = Utc.with_ymd_and_hms(2025, 3, 10, hour, 0, 0).unwrap();
    TripData {
        trip_id: "bench-trip".into(),
        client_id: "client-bench".into(),
        vendor_id: "vendor-bench".into(),
        distance_km: Decimal::from(distance_km),
        start_time: start,
        end_time: start + ChronoDuration::minutes(40),
        is_carpool,
    }
}

fn document(model: &str, fields: RuleFields, version: u32, from_day: i64) -> RuleDocument {
    let epoch = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    RuleDocument {
        contract_id: "ctr-bench".into(),
        client_id: "client-bench".into(),
        vendor_id: "vendor-bench".into(),
        version_number: version,
        billing_model: model.into(),
        fields,
        valid_from: epoch + ChronoDuration::days(from_day),
        valid_until: Some(epoch + ChronoDuration::days(from_day + 1)),
    }
}

fn hybrid_fields() -> RuleFields {
    RuleFields::new()
        .with("package_base_cost", 12000)
        .with("package_km_limit", 1000)
        .with("per_km_rate_after_limit", 10)
        .with("carpool_discount_rate", 0.15)
        .with("night_shift_surcharge", 200)
        .with("tax_rate", 0.18)
        .with("incentive_rules", serde_json::json!({ "carpool_bonus": 50 }))
}

// ============ STRATEGY BENCHMARKS ============

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategies");
    group.measurement_time(Duration::from_secs(5));

    let cases = [
        ("HYBRID", hybrid_fields()),
        (
            "PER_TRIP",
            RuleFields::new()
                .with("base_fare", 100)
                .with("base_rate_km", 10)
                .with("min_trip_charge", 150)
                .with("tax_rate", 0.18),
        ),
        (
            "FIXED_PACKAGE",
            RuleFields::new()
                .with("fixed_fee", 5000)
                .with("tax_rate", 0.18),
        ),
    ];

    for (model, fields) in cases {
        let rules = document(model, fields, 1, 0);
        let strategy = select(model).unwrap();
        let t = trip(1200, 22, true);
        group.bench_function(BenchmarkId::new("calculate_cost", model), |b| {
            b.iter(|| strategy.calculate_cost(black_box(&t), black_box(&rules)).unwrap())
        });
    }

    group.finish();
}

// ============ RESOLUTION BENCHMARKS ============

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    for versions in [1u32, 12, 120, 1200].iter() {
        let candidates: Vec<RuleDocument> = (0..*versions)
            .map(|v| document("FIXED_PACKAGE", RuleFields::new(), v + 1, v as i64))
            .collect();
        let at = candidates[(*versions / 2) as usize].valid_from;

        group.throughput(Throughput::Elements(*versions as u64));
        group.bench_with_input(
            BenchmarkId::new("versions", versions),
            &candidates,
            |b, candidates| {
                b.iter(|| resolve("client-bench", black_box(candidates), black_box(at)).unwrap())
            },
        );
    }

    group.finish();
}

// ============ CACHE BENCHMARKS ============

fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("contract_cache");
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let repo = InMemoryTripRepository::new();
    let mut open = document("HYBRID", hybrid_fields(), 1, 0);
    open.valid_until = None;
    repo.add_contract_version(open).unwrap();

    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let cache = ContractCache::with_clock(128, FixedClock::new(now)).unwrap();
    runtime
        .block_on(cache.get_or_resolve("client-bench", &repo))
        .unwrap();

    group.bench_function("hit", |b| {
        b.iter(|| {
            runtime
                .block_on(cache.get_or_resolve(black_box("client-bench"), &repo))
                .unwrap()
        })
    });

    group.bench_function("miss", |b| {
        b.iter(|| {
            cache.invalidate("client-bench");
            runtime
                .block_on(cache.get_or_resolve(black_box("client-bench"), &repo))
                .unwrap()
        })
    });

    group.finish();
}

criterion_group!(strategies, bench_strategies);

criterion_group!(resolution, bench_resolution);

criterion_group!(cache, bench_cache);

criterion_main!(strategies, resolution, cache);
