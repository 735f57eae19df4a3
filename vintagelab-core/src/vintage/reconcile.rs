//! Single-pass reconciliation of every survey round against the revision store.
//!
//! Each round moves `unresolved → consensus → vintage → aggregate | skipped`
//! exactly once. The result is a pure `RoundKey → RoundOutcome` map; it is
//! merged into the response table only when the caller asks for enriched rows,
//! so no round's result depends on the order rounds are processed in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::domain::{EnrichedResponse, RoundKey};

use super::aggregate::{LaggedAggregate, LaggedAggregateComputer};
use super::consensus::{ConsensusVintageResolver, ResolvedVintage, ResolverPolicy, RoundConsensus, SkipReason};
use super::rounds::SurveyRoundIndex;
use super::store::RevisionHistoryStore;

/// Placeholder written to `RGDPL` for rounds that could not be resolved.
pub const UNRESOLVED_RGDPL: f64 = 0.0;

/// Terminal state of one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RoundOutcome {
    Computed {
        consensus: RoundConsensus,
        vintage: ResolvedVintage,
        aggregate: LaggedAggregate,
    },
    Skipped {
        reason: SkipReason,
        /// Present when the round got past the consensus step.
        consensus: Option<RoundConsensus>,
        vintage: Option<ResolvedVintage>,
    },
}

impl RoundOutcome {
    pub fn aggregate_value(&self) -> Option<f64> {
        match self {
            Self::Computed { aggregate, .. } => Some(aggregate.value),
            Self::Skipped { .. } => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Computed { .. } => None,
            Self::Skipped { reason, .. } => Some(*reason),
        }
    }

    pub fn consensus(&self) -> Option<&RoundConsensus> {
        match self {
            Self::Computed { consensus, .. } => Some(consensus),
            Self::Skipped { consensus, .. } => consensus.as_ref(),
        }
    }

    pub fn vintage(&self) -> Option<&ResolvedVintage> {
        match self {
            Self::Computed { vintage, .. } => Some(vintage),
            Self::Skipped { vintage, .. } => vintage.as_ref(),
        }
    }
}

/// Counts by terminal state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub rounds: usize,
    pub computed: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
    pub responses: usize,
    pub responses_enriched: usize,
}

impl ReconciliationSummary {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

/// Outcome of every round plus the responses they apply to.
#[derive(Debug, Clone)]
pub struct Reconciliation<'a> {
    index: &'a SurveyRoundIndex,
    outcomes: BTreeMap<RoundKey, RoundOutcome>,
}

impl<'a> Reconciliation<'a> {
    pub fn outcomes(&self) -> &BTreeMap<RoundKey, RoundOutcome> {
        &self.outcomes
    }

    pub fn outcome(&self, round: RoundKey) -> Option<&RoundOutcome> {
        self.outcomes.get(&round)
    }

    /// `RGDPL` per resolved round.
    pub fn aggregates(&self) -> BTreeMap<RoundKey, f64> {
        self.outcomes
            .iter()
            .filter_map(|(k, o)| o.aggregate_value().map(|v| (*k, v)))
            .collect()
    }

    /// Every response in input order with its round's `RGDPL` attached
    /// (the [`UNRESOLVED_RGDPL`] placeholder for skipped rounds).
    pub fn enriched_rows(&self) -> Vec<EnrichedResponse> {
        let aggregates = self.aggregates();
        self.index
            .responses()
            .iter()
            .map(|r| EnrichedResponse {
                response: r.clone(),
                rgdpl: aggregates
                    .get(&r.round)
                    .copied()
                    .unwrap_or(UNRESOLVED_RGDPL),
            })
            .collect()
    }

    pub fn summary(&self) -> ReconciliationSummary {
        let mut summary = ReconciliationSummary {
            rounds: self.outcomes.len(),
            responses: self.index.len(),
            ..Default::default()
        };
        for outcome in self.outcomes.values() {
            match outcome.skip_reason() {
                None => summary.computed += 1,
                Some(reason) => *summary.skipped.entry(reason).or_default() += 1,
            }
        }
        summary.responses_enriched = self
            .index
            .responses()
            .iter()
            .filter(|r| {
                self.outcomes
                    .get(&r.round)
                    .is_some_and(|o| o.aggregate_value().is_some())
            })
            .count();
        summary
    }
}

/// Resolve one round to its terminal state.
pub fn reconcile_round(
    resolver: &ConsensusVintageResolver<'_>,
    computer: &LaggedAggregateComputer<'_>,
    index: &SurveyRoundIndex,
    round: RoundKey,
) -> RoundOutcome {
    let consensus = match resolver.consensus(index, round) {
        Ok(c) => c,
        Err(reason) => {
            return RoundOutcome::Skipped {
                reason,
                consensus: None,
                vintage: None,
            }
        }
    };

    let vintage = match resolver.resolve(&consensus) {
        Ok(v) => v,
        Err(reason) => {
            return RoundOutcome::Skipped {
                reason,
                consensus: Some(consensus),
                vintage: None,
            }
        }
    };

    match computer.compute(&vintage) {
        Some(aggregate) => RoundOutcome::Computed {
            consensus,
            vintage,
            aggregate,
        },
        None => RoundOutcome::Skipped {
            reason: SkipReason::NoPriorYearData,
            consensus: Some(consensus),
            vintage: Some(vintage),
        },
    }
}

/// Reconcile every round in the index.
pub fn reconcile<'a>(
    store: &RevisionHistoryStore,
    index: &'a SurveyRoundIndex,
    policy: &ResolverPolicy,
) -> Reconciliation<'a> {
    let resolver = ConsensusVintageResolver::new(store, policy);
    let computer = LaggedAggregateComputer::new(store, policy.year_basis);

    let outcomes: BTreeMap<RoundKey, RoundOutcome> = index
        .all_rounds()
        .into_iter()
        .map(|round| {
            let outcome = reconcile_round(&resolver, &computer, index, round);
            if let Some(reason) = outcome.skip_reason() {
                debug!(round = %round, reason = reason.as_str(), "round skipped");
            }
            (round, outcome)
        })
        .collect();

    let reconciliation = Reconciliation { index, outcomes };
    let summary = reconciliation.summary();
    info!(
        rounds = summary.rounds,
        computed = summary.computed,
        skipped = summary.skipped_total(),
        "reconciliation complete"
    );
    reconciliation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::RawObservation;
    use crate::domain::{IndicatorId, IndicatorRegime, RespondentId, SurveyResponse};
    use crate::vintage::consensus::YearBasis;

    fn obs(period: &str, value: &str, published: &str) -> RawObservation {
        RawObservation {
            period: period.into(),
            value: value.into(),
            publication_date: published.into(),
        }
    }

    fn response(year: i32, quarter: u8, id: &str, value: Option<f64>) -> SurveyResponse {
        SurveyResponse {
            round: RoundKey::new(year, quarter).unwrap(),
            respondent: RespondentId(id.into()),
            stated_value: value,
        }
    }

    fn policy() -> ResolverPolicy {
        ResolverPolicy {
            tolerance: 1.0,
            regime: IndicatorRegime::new("A_OLD", "A", 1992),
            year_basis: YearBasis::ReferencePeriod,
        }
    }

    fn store() -> RevisionHistoryStore {
        let mut store = RevisionHistoryStore::new();
        store.ingest(
            &IndicatorId::new("A"),
            &[
                obs("2001-10-01", "100.0", "2002-01-15"),
                obs("2001-10-01", "100.5", "2002-04-15"),
                obs("2000-01-01", "90", "2001-01-31"),
                obs("2000-04-01", "92", "2002-01-15"),
                obs("2000-07-01", "94", "2001-10-31"),
                obs("2000-10-01", "96", "2002-01-15"),
            ],
        );
        store
    }

    #[test]
    fn computed_round_enriches_every_respondent() {
        let store = store();
        let mut index = SurveyRoundIndex::new();
        index.push(response(2002, 1, "1", Some(100.0)));
        index.push(response(2002, 1, "2", Some(100.0)));
        index.push(response(2002, 1, "3", Some(101.0)));
        index.push(response(2002, 1, "4", None));

        let rec = reconcile(&store, &index, &policy());
        let rows = rec.enriched_rows();

        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.rgdpl == 93.0));

        let outcome = rec.outcome(RoundKey::new(2002, 1).unwrap()).unwrap();
        assert_eq!(
            outcome.vintage().unwrap().publication_date.to_string(),
            "2002-01-15"
        );
    }

    #[test]
    fn skipped_rounds_keep_placeholder() {
        let store = store();
        let mut index = SurveyRoundIndex::new();
        index.push(response(2002, 1, "1", Some(250.0)));
        index.push(response(2003, 2, "1", None));

        let rec = reconcile(&store, &index, &policy());
        let rows = rec.enriched_rows();
        assert!(rows.iter().all(|r| r.rgdpl == UNRESOLVED_RGDPL));

        let summary = rec.summary();
        assert_eq!(summary.rounds, 2);
        assert_eq!(summary.computed, 0);
        assert_eq!(summary.skipped[&SkipReason::NoVintageWithinTolerance], 1);
        assert_eq!(summary.skipped[&SkipReason::NoResponses], 1);
        assert_eq!(summary.responses_enriched, 0);
    }

    #[test]
    fn results_do_not_depend_on_input_order() {
        let store = store();
        let mut forward = SurveyRoundIndex::new();
        let mut backward = SurveyRoundIndex::new();
        let rows = vec![
            response(2002, 1, "1", Some(100.0)),
            response(2002, 2, "1", Some(100.5)),
            response(2001, 4, "1", Some(7.0)),
        ];
        for r in rows.iter().cloned() {
            forward.push(r);
        }
        for r in rows.into_iter().rev() {
            backward.push(r);
        }

        let a = reconcile(&store, &forward, &policy()).aggregates();
        let b = reconcile(&store, &backward, &policy()).aggregates();
        assert_eq!(a, b);
    }

    #[test]
    fn round_with_vintage_but_no_prior_year_data() {
        let mut store = RevisionHistoryStore::new();
        store.ingest(&IndicatorId::new("A"), &[obs("2001-10-01", "100.0", "2002-01-15")]);
        let mut index = SurveyRoundIndex::new();
        index.push(response(2002, 1, "1", Some(100.0)));

        let rec = reconcile(&store, &index, &policy());
        let outcome = rec.outcome(RoundKey::new(2002, 1).unwrap()).unwrap();
        assert_eq!(outcome.skip_reason(), Some(SkipReason::NoPriorYearData));
        assert!(outcome.vintage().is_some());
    }
}
