//! Consensus vintage resolution.
//!
//! A round's respondents all report the most recent published level of real
//! output for the reference quarter. Most of them copied it from the same
//! release, so the modal response identifies which vintage the panel saw.
//!
//! Tie-break rules:
//! - mode ties go to the value encountered first in input order;
//! - the vintage match is the *earliest* publication date within tolerance.
//!   Later revisions can land close to the mode by coincidence; the earliest
//!   one is the release respondents could actually have seen. Reordering
//!   records before the scan would change the answer, which is why
//!   [`RevisionHistoryStore::records_for_period`] guarantees ascending order.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{IndicatorId, IndicatorRegime, Quarter, RoundKey};

use super::rounds::SurveyRoundIndex;
use super::store::RevisionHistoryStore;

/// Default absolute tolerance between the modal response and a published value.
/// Covers display rounding in the survey spreadsheet.
pub const DEFAULT_TOLERANCE: f64 = 1.0;

/// Most frequent value; ties go to the first value seen. `None` for empty input.
///
/// Values compare by exact equality, which is what the survey's rounded
/// figures need. NaN never matches anything, including itself.
pub fn mode(values: &[f64]) -> Option<f64> {
    // (value, count) in first-seen order; rounds are small so linear scan is fine.
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for &v in values {
        if v.is_nan() {
            continue;
        }
        match counts.iter_mut().find(|(seen, _)| *seen == v) {
            Some((_, n)) => *n += 1,
            None => counts.push((v, 1)),
        }
    }

    let mut best: Option<(f64, usize)> = None;
    for (v, n) in counts {
        // Strictly greater keeps the earliest value on ties.
        if best.map_or(true, |(_, best_n)| n > best_n) {
            best = Some((v, n));
        }
    }
    best.map(|(v, _)| v)
}

/// Which year anchors regime selection and the prior-year window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearBasis {
    /// The reference period's year (a 2002Q1 round refers to 2001Q4, so the
    /// regime is picked by 2001 and the prior year is 2000).
    #[default]
    ReferencePeriod,
    /// The round's own year (a 2002Q1 round averages 2001).
    Round,
}

impl YearBasis {
    /// The quarter whose year drives the decision.
    pub fn anchor(&self, round: RoundKey, reference_period: Quarter) -> Quarter {
        match self {
            Self::ReferencePeriod => reference_period,
            Self::Round => round.0,
        }
    }
}

/// Policy knobs for resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverPolicy {
    pub tolerance: f64,
    pub regime: IndicatorRegime,
    #[serde(default)]
    pub year_basis: YearBasis,
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            regime: IndicatorRegime::default(),
            year_basis: YearBasis::default(),
        }
    }
}

/// Modal response of a round and the quarter it refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundConsensus {
    pub round: RoundKey,
    pub mode_value: f64,
    pub respondent_count: usize,
    pub reference_period: Quarter,
}

/// The vintage a round was matched to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedVintage {
    pub round: RoundKey,
    pub indicator: IndicatorId,
    pub reference_period: Quarter,
    pub publication_date: NaiveDate,
    /// The published value that matched the mode.
    pub matched_value: f64,
}

/// Why a round could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No numeric responses in the round.
    NoResponses,
    /// The indicator has no records for the reference period.
    NoRevisionData,
    /// Records exist but none is within tolerance of the mode.
    NoVintageWithinTolerance,
    /// Vintage resolved but none of the prior-year quarters were known as of it.
    NoPriorYearData,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoResponses => "no_responses",
            Self::NoRevisionData => "no_revision_data",
            Self::NoVintageWithinTolerance => "no_vintage_within_tolerance",
            Self::NoPriorYearData => "no_prior_year_data",
        }
    }
}

/// Resolves the vintage each round's panel was looking at.
pub struct ConsensusVintageResolver<'a> {
    store: &'a RevisionHistoryStore,
    policy: &'a ResolverPolicy,
}

impl<'a> ConsensusVintageResolver<'a> {
    pub fn new(store: &'a RevisionHistoryStore, policy: &'a ResolverPolicy) -> Self {
        Self { store, policy }
    }

    /// Modal response and reference period.
    pub fn consensus(&self, index: &SurveyRoundIndex, round: RoundKey) -> Result<RoundConsensus, SkipReason> {
        let values = index.responses_for_round(round);
        let mode_value = mode(&values).ok_or(SkipReason::NoResponses)?;
        Ok(RoundConsensus {
            round,
            mode_value,
            respondent_count: values.len(),
            reference_period: round.reference_period(),
        })
    }

    /// Pick the regime's indicator and scan its vintages of the
    /// reference period, earliest first.
    pub fn resolve(&self, consensus: &RoundConsensus) -> Result<ResolvedVintage, SkipReason> {
        let anchor = self
            .policy
            .year_basis
            .anchor(consensus.round, consensus.reference_period);
        let indicator = self.policy.regime.indicator_for(anchor);
        let records = self
            .store
            .records_for_period(indicator, consensus.reference_period);
        if records.is_empty() {
            return Err(SkipReason::NoRevisionData);
        }

        records
            .iter()
            .find(|p| (p.value - consensus.mode_value).abs() <= self.policy.tolerance)
            .map(|p| ResolvedVintage {
                round: consensus.round,
                indicator: indicator.clone(),
                reference_period: consensus.reference_period,
                publication_date: p.publication_date,
                matched_value: p.value,
            })
            .ok_or(SkipReason::NoVintageWithinTolerance)
    }

    pub fn policy(&self) -> &ResolverPolicy {
        self.policy
    }

    pub fn store(&self) -> &RevisionHistoryStore {
        self.store
    }
}
