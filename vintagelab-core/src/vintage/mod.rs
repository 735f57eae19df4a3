//! Vintage reconciliation: revision store, survey rounds, consensus vintage, lagged aggregate.

pub mod aggregate;
pub mod consensus;
pub mod reconcile;
pub mod rounds;
pub mod store;

pub use aggregate::{LaggedAggregate, LaggedAggregateComputer, QuarterSource, QuarterValue};
pub use consensus::{
    mode, ConsensusVintageResolver, ResolvedVintage, ResolverPolicy, RoundConsensus, SkipReason,
    YearBasis, DEFAULT_TOLERANCE,
};
pub use reconcile::{
    reconcile, reconcile_round, Reconciliation, ReconciliationSummary, RoundOutcome,
    UNRESOLVED_RGDPL,
};
pub use rounds::{
    parse_stated_value, RawSurveyRow, SurveyError, SurveyFilter, SurveyIngestReport,
    SurveyRoundIndex,
};
pub use store::{IngestStats, RevisionHistoryStore};
