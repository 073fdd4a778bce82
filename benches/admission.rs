use std::collections::BTreeMap;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use loadgate::{AdmissionGateway, Config, FeatureVector, NullEventSink, SystemClock, WorkUnit};
use loadgate::{ComplexityScorer, StructureAuditor, WeightProfile};
use serde_json::json;

fn gateway() -> AdmissionGateway {
    AdmissionGateway::from_config(
        &Config::default(),
        Arc::new(SystemClock),
        Arc::new(NullEventSink),
    )
    .unwrap()
}

fn features(width: usize) -> FeatureVector {
    (0..width).fold(FeatureVector::new(), |v, i| {
        v.with(format!("feature_{i}"), 0.01 * i as f64)
    })
}

/// Benchmark scoring for growing feature vectors
fn bench_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring");
    let weights: BTreeMap<String, f64> = (0..64).map(|i| (format!("feature_{i}"), 1.0)).collect();
    let profile = WeightProfile::new("bench", 7, weights).unwrap();

    for width in [4, 16, 64] {
        let vector = features(width);
        group.bench_with_input(BenchmarkId::from_parameter(width), &vector, |b, vector| {
            b.iter(|| ComplexityScorer::score(black_box(vector), &profile));
        });
    }
    group.finish();
}

/// Benchmark the full evaluate path on a fresh phase
fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    group.bench_function("light_unit", |b| {
        let gateway = gateway();
        let unit = WorkUnit::new("default", FeatureVector::new().with("questions", 0.0));
        let id = gateway.begin_phase_for("bench", "default").unwrap().session_id;
        b.iter(|| gateway.evaluate(&id, black_box(&unit)).unwrap());
    });

    group.bench_function("phase_lifecycle", |b| {
        let gateway = gateway();
        let unit = WorkUnit::new("default", features(8));
        b.iter(|| {
            let id = gateway.begin_phase_for("bench", "default").unwrap().session_id;
            for _ in 0..5 {
                black_box(gateway.evaluate(&id, &unit).unwrap());
            }
            gateway.scheduler().end_phase(&id).unwrap()
        });
    });

    group.finish();
}

/// Benchmark auditing a moderately nested document
fn bench_audit(c: &mut Criterion) {
    let document = json!({
        "governor": { "default_capacity": 7, "history_limit": 50 },
        "profiles": (0..20).map(|i| json!({ "name": format!("p{i}"), "weights": { "a": 1.0, "b": 2.0 } })).collect::<Vec<_>>(),
    });
    let auditor = StructureAuditor::default();

    c.bench_function("audit_document", |b| {
        b.iter(|| auditor.audit(black_box(&document)));
    });
}

criterion_group!(benches, bench_scoring, bench_evaluate, bench_audit);
criterion_main!(benches);
