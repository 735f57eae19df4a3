//! Prior-year average as of a resolved vintage (`RGDPL`).

use serde::{Deserialize, Serialize};

use crate::domain::Quarter;

use super::consensus::{ResolvedVintage, YearBasis};
use super::store::RevisionHistoryStore;

/// How a quarter's value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarterSource {
    /// A record was published on the vintage date itself.
    Exact,
    /// Carried forward from the latest earlier publication.
    BackFilled,
    /// Nothing published for that quarter on or before the vintage date.
    Missing,
}

/// One of the four prior-year quarters feeding the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuarterValue {
    pub period: Quarter,
    pub value: Option<f64>,
    pub source: QuarterSource,
}

/// Reconstructed prior-year average for one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaggedAggregate {
    pub value: f64,
    /// Calendar year averaged over (the year before the anchor quarter).
    pub year: i32,
    pub quarters: [QuarterValue; 4],
}

impl LaggedAggregate {
    /// How many of the four quarters contributed to the mean.
    pub fn quarters_used(&self) -> usize {
        self.quarters.iter().filter(|q| q.value.is_some()).count()
    }
}

/// Computes the lagged aggregate from the store as it stood on a vintage date.
pub struct LaggedAggregateComputer<'a> {
    store: &'a RevisionHistoryStore,
    year_basis: YearBasis,
}

impl<'a> LaggedAggregateComputer<'a> {
    pub fn new(store: &'a RevisionHistoryStore, year_basis: YearBasis) -> Self {
        Self { store, year_basis }
    }

    /// Value of one quarter as known on the vintage date: an exact-date record
    /// if there is one, otherwise the latest record published before it.
    pub fn quarter_value(&self, vintage: &ResolvedVintage, period: Quarter) -> QuarterValue {
        let indicator = &vintage.indicator;
        let date = vintage.publication_date;

        if let Some(value) = self.store.value_at(indicator, period, date) {
            return QuarterValue {
                period,
                value: Some(value),
                source: QuarterSource::Exact,
            };
        }
        match self.store.value_as_of(indicator, period, date) {
            Some(value) => QuarterValue {
                period,
                value: Some(value),
                source: QuarterSource::BackFilled,
            },
            None => QuarterValue {
                period,
                value: None,
                source: QuarterSource::Missing,
            },
        }
    }

    /// Mean over whichever prior-year quarters are known (zero to four of them).
    /// `None` when none are.
    ///
    /// The quarters are read from the same indicator the vintage was matched
    /// on, even when the prior year falls on the other side of the regime cutover.
    pub fn compute(&self, vintage: &ResolvedVintage) -> Option<LaggedAggregate> {
        let year = self
            .year_basis
            .anchor(vintage.round, vintage.reference_period)
            .year()
            - 1;
        let quarters = Quarter::quarters_of_year(year).map(|p| self.quarter_value(vintage, p));

        let known: Vec<f64> = quarters.iter().filter_map(|q| q.value).collect();
        if known.is_empty() {
            return None;
        }
        let value = known.iter().sum::<f64>() / known.len() as f64;

        Some(LaggedAggregate {
            value,
            year,
            quarters,
        })
    }
}
