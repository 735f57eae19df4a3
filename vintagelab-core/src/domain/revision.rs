//! Revision-history records and indicator regimes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ids::IndicatorId;
use super::quarter::Quarter;

/// One published value of an indicator for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionRecord {
    pub indicator: IndicatorId,
    pub period: Quarter,
    pub publication_date: NaiveDate,
    pub value: f64,
}

/// A `(publication_date, value)` pair within a single `(indicator, period)` history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VintagePoint {
    pub publication_date: NaiveDate,
    pub value: f64,
}

/// Which indicator measures a given period.
///
/// National accounts switched headline aggregate in the early 1990s, so older
/// periods are measured by a legacy series. A period whose year is strictly
/// before `cutover_year` uses `legacy`; everything else uses `current`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorRegime {
    pub legacy: IndicatorId,
    pub current: IndicatorId,
    pub cutover_year: i32,
}

impl IndicatorRegime {
    pub fn new(legacy: impl Into<IndicatorId>, current: impl Into<IndicatorId>, cutover_year: i32) -> Self {
        Self {
            legacy: legacy.into(),
            current: current.into(),
            cutover_year,
        }
    }

    pub fn indicator_for(&self, period: Quarter) -> &IndicatorId {
        if period.year() < self.cutover_year {
            &self.legacy
        } else {
            &self.current
        }
    }

    /// Both series ids, legacy first.
    pub fn series_ids(&self) -> [&IndicatorId; 2] {
        [&self.legacy, &self.current]
    }
}

impl Default for IndicatorRegime {
    /// Real GNP (GNPC96) before 1992, real GDP (GDPC1) from 1992.
    fn default() -> Self {
        Self::new("GNPC96", "GDPC1", 1992)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutover_is_inclusive_on_the_new_side() {
        let regime = IndicatorRegime::default();
        let q1991 = Quarter::new(1991, 4).unwrap();
        let q1992 = Quarter::new(1992, 1).unwrap();

        assert_eq!(regime.indicator_for(q1991).as_str(), "GNPC96");
        assert_eq!(regime.indicator_for(q1992).as_str(), "GDPC1");
    }

    #[test]
    fn custom_cutover() {
        let regime = IndicatorRegime::new("OLD", "NEW", 2000);
        assert_eq!(regime.indicator_for(Quarter::new(1999, 4).unwrap()).as_str(), "OLD");
        assert_eq!(regime.indicator_for(Quarter::new(2000, 1).unwrap()).as_str(), "NEW");
    }
}
