//! In-memory revision history, keyed by `(indicator, period)`.
//!
//! The source omits a vintage row when a revision left the value unchanged,
//! so "no record at date d" means "whatever was last published before d".
//! [`RevisionHistoryStore::value_as_of`] is the single place that encodes
//! that convention.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::data::provider::RawObservation;
use crate::domain::{IndicatorId, Quarter, RevisionRecord, VintagePoint};

/// Counts from one ingestion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IngestStats {
    pub accepted: usize,
    /// Value was not a finite number (e.g. FRED's `"."` placeholder).
    pub non_numeric: usize,
    /// Period or publication date did not parse, or the period is not a quarter start.
    pub bad_date: usize,
}

/// Per-indicator vintage histories. Each `(indicator, period)` sequence is
/// kept sorted ascending by publication date with unique dates.
#[derive(Debug, Clone, Default)]
pub struct RevisionHistoryStore {
    histories: HashMap<IndicatorId, BTreeMap<Quarter, Vec<VintagePoint>>>,
}

impl RevisionHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an indicator with no observations. Lookups against it return
    /// nothing rather than failing.
    pub fn register_empty(&mut self, indicator: &IndicatorId) {
        self.histories.entry(indicator.clone()).or_default();
    }

    /// Ingest raw `(period, value, publication_date)` triples for one indicator.
    ///
    /// Non-numeric values and malformed dates are discarded, never errors.
    /// When the same `(period, publication_date)` appears twice the later row wins.
    pub fn ingest(&mut self, indicator: &IndicatorId, observations: &[RawObservation]) -> IngestStats {
        let mut stats = IngestStats::default();
        let history = self.histories.entry(indicator.clone()).or_default();

        for obs in observations {
            let Some(value) = parse_value(&obs.value) else {
                stats.non_numeric += 1;
                continue;
            };
            let period = parse_date(&obs.period).and_then(|d| Quarter::from_period_date(d).ok());
            let published = parse_date(&obs.publication_date);
            let (Some(period), Some(publication_date)) = (period, published) else {
                stats.bad_date += 1;
                continue;
            };
            history.entry(period).or_default().push(VintagePoint {
                publication_date,
                value,
            });
            stats.accepted += 1;
        }

        for points in history.values_mut() {
            normalize(points);
        }

        debug!(
            indicator = %indicator,
            accepted = stats.accepted,
            non_numeric = stats.non_numeric,
            bad_date = stats.bad_date,
            "ingested revision history"
        );
        stats
    }

    /// All vintages of one period, ascending by publication date.
    /// Empty when the indicator or period is unknown.
    pub fn records_for_period(&self, indicator: &IndicatorId, period: Quarter) -> &[VintagePoint] {
        self.histories
            .get(indicator)
            .and_then(|h| h.get(&period))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The value published exactly on `date`, if a record exists for that date.
    pub fn value_at(&self, indicator: &IndicatorId, period: Quarter, date: NaiveDate) -> Option<f64> {
        let points = self.records_for_period(indicator, period);
        points
            .binary_search_by_key(&date, |p| p.publication_date)
            .ok()
            .map(|i| points[i].value)
    }

    /// The value as known on `as_of`: the latest record published on or before it.
    pub fn value_as_of(&self, indicator: &IndicatorId, period: Quarter, as_of: NaiveDate) -> Option<f64> {
        self.point_as_of(indicator, period, as_of).map(|p| p.value)
    }

    /// Like [`value_as_of`](Self::value_as_of) but returns the whole record.
    pub fn point_as_of(
        &self,
        indicator: &IndicatorId,
        period: Quarter,
        as_of: NaiveDate,
    ) -> Option<&VintagePoint> {
        let points = self.records_for_period(indicator, period);
        let idx = points.partition_point(|p| p.publication_date <= as_of);
        idx.checked_sub(1).map(|i| &points[i])
    }

    /// Indicators known to the store, sorted.
    pub fn indicators(&self) -> Vec<&IndicatorId> {
        let mut ids: Vec<&IndicatorId> = self.histories.keys().collect();
        ids.sort();
        ids
    }

    pub fn has_data(&self, indicator: &IndicatorId) -> bool {
        self.histories
            .get(indicator)
            .is_some_and(|h| h.values().any(|p| !p.is_empty()))
    }

    pub fn period_count(&self, indicator: &IndicatorId) -> usize {
        self.histories.get(indicator).map_or(0, BTreeMap::len)
    }

    /// Total number of vintage points across all indicators.
    pub fn len(&self) -> usize {
        self.histories
            .values()
            .flat_map(|h| h.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate every record in (indicator, period, publication_date) order.
    pub fn records(&self) -> impl Iterator<Item = RevisionRecord> + '_ {
        self.indicators().into_iter().flat_map(move |indicator| {
            self.histories[indicator].iter().flat_map(move |(period, points)| {
                points.iter().map(move |p| RevisionRecord {
                    indicator: indicator.clone(),
                    period: *period,
                    publication_date: p.publication_date,
                    value: p.value,
                })
            })
        })
    }
}

/// Sort by publication date (stable) and collapse duplicate dates, last one wins.
fn normalize(points: &mut Vec<VintagePoint>) {
    points.sort_by_key(|p| p.publication_date);
    let mut out: Vec<VintagePoint> = Vec::with_capacity(points.len());
    for p in points.drain(..) {
        match out.last_mut() {
            Some(last) if last.publication_date == p.publication_date => *last = p,
            _ => out.push(p),
        }
    }
    *points = out;
}

fn parse_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}
