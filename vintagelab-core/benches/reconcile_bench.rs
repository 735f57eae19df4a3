//! Criterion benchmarks for VintageLab hot paths.
//!
//! 1. Revision-history ingest (parse + sort + dedup)
//! 2. Full reconciliation over a synthetic survey history
//! 3. Shock regression

use chrono::Duration;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use vintagelab_core::data::RawObservation;
use vintagelab_core::domain::{IndicatorId, Quarter, RespondentId, RoundKey, SurveyResponse};
use vintagelab_core::shocks::fit_ols;
use vintagelab_core::vintage::{reconcile, ResolverPolicy, RevisionHistoryStore, SurveyRoundIndex};

// ── Helpers ──────────────────────────────────────────────────────────

/// Quarterly history 1992..=last_year, each period revised `vintages` times.
fn make_observations(last_year: i32, vintages: usize) -> Vec<RawObservation> {
    let mut out = Vec::new();
    for year in 1992..=last_year {
        for q in Quarter::quarters_of_year(year) {
            let base = 8000.0 + (year - 1992) as f64 * 200.0 + q.quarter() as f64 * 40.0;
            for v in 0..vintages {
                out.push(RawObservation {
                    period: q.first_day().to_string(),
                    value: format!("{:.1}", base + v as f64 * 0.7),
                    publication_date: (q.next().first_day() + Duration::days(30 + 90 * v as i64))
                        .to_string(),
                });
            }
        }
    }
    out
}

fn make_index(last_year: i32, respondents: usize) -> SurveyRoundIndex {
    let mut index = SurveyRoundIndex::new();
    for year in 1993..=last_year {
        for quarter in 1..=4u8 {
            let round = RoundKey::new(year, quarter).unwrap();
            let reference = round.reference_period();
            let base = 8000.0 + (reference.year() - 1992) as f64 * 200.0
                + reference.quarter() as f64 * 40.0;
            for r in 0..respondents {
                index.push(SurveyResponse {
                    round,
                    respondent: RespondentId(r.to_string()),
                    stated_value: Some(base + (r % 3) as f64),
                });
            }
        }
    }
    index
}

// ── 1. Ingest ────────────────────────────────────────────────────────

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");
    for vintages in [4usize, 16, 64] {
        let observations = make_observations(2024, vintages);
        group.bench_with_input(BenchmarkId::from_parameter(vintages), &observations, |b, obs| {
            b.iter(|| {
                let mut store = RevisionHistoryStore::new();
                store.ingest(&IndicatorId::new("GDPC1"), black_box(obs));
                store
            })
        });
    }
    group.finish();
}

// ── 2. Reconcile ─────────────────────────────────────────────────────

fn bench_reconcile(c: &mut Criterion) {
    let mut store = RevisionHistoryStore::new();
    store.ingest(&IndicatorId::new("GDPC1"), &make_observations(2024, 16));
    let policy = ResolverPolicy::default();

    let mut group = c.benchmark_group("reconcile");
    for respondents in [10usize, 40] {
        let index = make_index(2024, respondents);
        group.bench_with_input(BenchmarkId::from_parameter(respondents), &index, |b, index| {
            b.iter(|| reconcile(&store, black_box(index), &policy).enriched_rows())
        });
    }
    group.finish();
}

// ── 3. Shock regression ──────────────────────────────────────────────

fn bench_ols(c: &mut Criterion) {
    let n = 60;
    let k = 18;
    let columns: Vec<Vec<f64>> = (0..k)
        .map(|j| (0..n).map(|i| ((i * (j + 3)) as f64 * 0.37).sin()).collect())
        .collect();
    let y: Vec<f64> = (0..n).map(|i| (i as f64 * 0.11).cos()).collect();

    c.bench_function("ols_60x18", |b| {
        b.iter(|| fit_ols(black_box(&y), black_box(&columns)))
    });
}

criterion_group!(benches, bench_ingest, bench_reconcile, bench_ols);
criterion_main!(benches);
