//! Property tests for reconciliation invariants.
//!
//! 1. Quarter navigation: `prev` and `next` are inverse
//! 2. Mode: result is one of the inputs and is never less frequent than any other
//! 3. As-of lookup: never returns a value published after the as-of date
//! 4. Enrichment: output length and order equal the input, independent of round order

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use vintagelab_core::data::RawObservation;
use vintagelab_core::domain::{IndicatorId, Quarter, RespondentId, RoundKey, SurveyResponse};
use vintagelab_core::vintage::{mode, reconcile, ResolverPolicy, RevisionHistoryStore, SurveyRoundIndex};

// ── Strategies ───────────────────────────────────────────────────────

fn arb_quarter() -> impl Strategy<Value = Quarter> {
    (1950i32..2100, 1u8..=4).prop_map(|(y, q)| Quarter::new(y, q).unwrap())
}

/// Survey-like values: a few distinct rounded figures so ties and repeats happen.
fn arb_values() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((0i32..6).prop_map(|v| 9000.0 + v as f64), 0..20)
}

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2002, 1, 1).unwrap()
}

// ── 1. Quarter navigation ────────────────────────────────────────────

proptest! {
    #[test]
    fn prev_and_next_are_inverse(q in arb_quarter()) {
        prop_assert_eq!(q.prev().next(), q);
        prop_assert_eq!(q.next().prev(), q);
        prop_assert!(q.prev() < q);
    }

    #[test]
    fn first_day_round_trips(q in arb_quarter()) {
        prop_assert_eq!(Quarter::from_period_date(q.first_day()).unwrap(), q);
    }
}

// ── 2. Mode ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn mode_is_most_frequent_and_earliest_on_ties(values in arb_values()) {
        match mode(&values) {
            None => prop_assert!(values.is_empty()),
            Some(m) => {
                let count = |x: f64| values.iter().filter(|v| **v == x).count();
                let best = count(m);
                for v in &values {
                    prop_assert!(count(*v) <= best);
                }
                // Any other value with the same count appears later.
                let first_m = values.iter().position(|v| *v == m).unwrap();
                for (i, v) in values.iter().enumerate() {
                    if count(*v) == best && *v != m {
                        prop_assert!(i > first_m);
                    }
                }
            }
        }
    }
}

// ── 3. As-of lookup ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn value_as_of_never_looks_ahead(
        offsets in prop::collection::vec(0i64..400, 1..10),
        query in 0i64..450,
    ) {
        let indicator = IndicatorId::new("GDPC1");
        let observations: Vec<RawObservation> = offsets
            .iter()
            .map(|o| RawObservation {
                period: "2001-10-01".into(),
                value: format!("{o}"),
                publication_date: (base_date() + Duration::days(*o)).to_string(),
            })
            .collect();
        let mut store = RevisionHistoryStore::new();
        store.ingest(&indicator, &observations);

        let period = Quarter::new(2001, 4).unwrap();
        let as_of = base_date() + Duration::days(query);
        match store.value_as_of(&indicator, period, as_of) {
            // Values encode their own publication offset.
            Some(v) => {
                prop_assert!(v as i64 <= query);
                prop_assert_eq!(v as i64, *offsets.iter().filter(|o| **o <= query).max().unwrap());
            }
            None => prop_assert!(offsets.iter().all(|o| *o > query)),
        }
    }
}

// ── 4. Enrichment ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn enrichment_preserves_rows_regardless_of_round_order(
        rounds in prop::collection::vec((2000i32..2004, 1u8..=4, 0i32..3), 0..30),
    ) {
        let indicator = IndicatorId::new("GDPC1");
        let mut store = RevisionHistoryStore::new();
        let mut observations = Vec::new();
        for year in 1999..2004 {
            for q in Quarter::quarters_of_year(year) {
                observations.push(RawObservation {
                    period: q.first_day().to_string(),
                    value: "100".into(),
                    publication_date: (q.next().first_day() + Duration::days(30)).to_string(),
                });
            }
        }
        store.ingest(&indicator, &observations);

        let build = |rows: &[(i32, u8, i32)]| {
            let mut index = SurveyRoundIndex::new();
            for (i, (y, q, v)) in rows.iter().enumerate() {
                index.push(SurveyResponse {
                    round: RoundKey::new(*y, *q).unwrap(),
                    respondent: RespondentId(i.to_string()),
                    stated_value: Some(99.5 + 0.25 * *v as f64),
                });
            }
            index
        };

        let forward = build(&rounds);
        let mut reversed_rows = rounds.clone();
        reversed_rows.reverse();
        let reversed = build(&reversed_rows);

        let policy = ResolverPolicy::default();
        let a = reconcile(&store, &forward, &policy);
        let b = reconcile(&store, &reversed, &policy);

        let rows = a.enriched_rows();
        prop_assert_eq!(rows.len(), rounds.len());
        for (row, (y, q, _)) in rows.iter().zip(&rounds) {
            prop_assert_eq!(row.response.round, RoundKey::new(*y, *q).unwrap());
        }
        prop_assert_eq!(a.aggregates(), b.aggregates());
    }
}
