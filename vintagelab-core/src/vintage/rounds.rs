//! Survey rounds: typed, grouped view of the panel's individual responses.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{RespondentId, RoundKey, SurveyResponse};

/// Cell values that mean "no forecast".
const NOT_AVAILABLE: [&str; 5] = ["#N/A", "NA", "N/A", "NAN", "."];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurveyError {
    #[error("row {row}: cannot parse YEAR '{value}'")]
    BadYear { row: usize, value: String },

    #[error("row {row}: cannot parse QUARTER '{value}'")]
    BadQuarter { row: usize, value: String },

    #[error("row {row}: empty respondent ID")]
    MissingRespondent { row: usize },

    #[error("survey file is missing required column '{0}'")]
    MissingColumn(String),

    #[error("survey I/O error: {0}")]
    Io(String),
}

/// One untyped survey row, as read from the spreadsheet export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSurveyRow {
    pub year: String,
    pub quarter: String,
    pub id: String,
    pub rgdp1: String,
}

/// Coerce a survey cell to a number: trims, strips thousands separators and
/// maps the "not available" sentinels and blanks to `None`.
pub fn parse_stated_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || NOT_AVAILABLE
            .iter()
            .any(|s| trimmed.eq_ignore_ascii_case(s))
    {
        return None;
    }
    trimmed
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parse an integer cell that spreadsheets may have exported as `1992.0`.
fn parse_int_cell(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v);
    }
    let f = trimmed.parse::<f64>().ok()?;
    (f.fract() == 0.0 && f.is_finite()).then_some(f as i64)
}

/// Ingestion options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyFilter {
    /// Drop rounds whose year is before this.
    pub min_year: Option<i32>,
}

/// Counts from building an index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyIngestReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    /// Rows kept whose forecast value was absent.
    pub absent_values: usize,
    pub filtered_out: usize,
    pub rejected: Vec<SurveyError>,
}

/// All survey responses, in input order, grouped by round.
#[derive(Debug, Clone, Default)]
pub struct SurveyRoundIndex {
    responses: Vec<SurveyResponse>,
    /// Row indices into `responses` per round, input order preserved.
    by_round: BTreeMap<RoundKey, Vec<usize>>,
}

impl SurveyRoundIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from raw rows. Rows with malformed keys are rejected and
    /// reported; rows with a non-numeric forecast are kept with `stated_value = None`.
    pub fn from_raw_rows(
        rows: impl IntoIterator<Item = RawSurveyRow>,
        filter: SurveyFilter,
    ) -> (Self, SurveyIngestReport) {
        let mut index = Self::new();
        let mut report = SurveyIngestReport::default();

        for (i, row) in rows.into_iter().enumerate() {
            report.rows_read += 1;
            // 1-based, header is row 1.
            let line = i + 2;
            match type_row(line, &row) {
                Ok(response) => {
                    if filter.min_year.is_some_and(|min| response.round.year() < min) {
                        report.filtered_out += 1;
                        continue;
                    }
                    if response.stated_value.is_none() {
                        report.absent_values += 1;
                    }
                    index.push(response);
                    report.rows_kept += 1;
                }
                Err(e) => {
                    debug!(error = %e, "rejected survey row");
                    report.rejected.push(e);
                }
            }
        }

        if !report.rejected.is_empty() {
            warn!(
                rejected = report.rejected.len(),
                "survey rows with malformed YEAR/QUARTER/ID were skipped"
            );
        }
        (index, report)
    }

    pub fn push(&mut self, response: SurveyResponse) {
        let idx = self.responses.len();
        self.by_round.entry(response.round).or_default().push(idx);
        self.responses.push(response);
    }

    /// Numeric forecasts of one round, in input order. Absent values are skipped.
    pub fn responses_for_round(&self, round: RoundKey) -> Vec<f64> {
        self.by_round
            .get(&round)
            .map(|rows| {
                rows.iter()
                    .filter_map(|&i| self.responses[i].stated_value)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn all_rounds(&self) -> BTreeSet<RoundKey> {
        self.by_round.keys().copied().collect()
    }

    pub fn responses(&self) -> &[SurveyResponse] {
        &self.responses
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

fn type_row(line: usize, row: &RawSurveyRow) -> Result<SurveyResponse, SurveyError> {
    let year = parse_int_cell(&row.year)
        .and_then(|y| i32::try_from(y).ok())
        .ok_or_else(|| SurveyError::BadYear {
            row: line,
            value: row.year.clone(),
        })?;
    let bad_quarter = || SurveyError::BadQuarter {
        row: line,
        value: row.quarter.clone(),
    };
    let quarter = parse_int_cell(&row.quarter)
        .and_then(|q| u8::try_from(q).ok())
        .ok_or_else(bad_quarter)?;
    let round = RoundKey::new(year, quarter).map_err(|_| bad_quarter())?;

    let id = row.id.trim();
    if id.is_empty() {
        return Err(SurveyError::MissingRespondent { row: line });
    }
    // IDs come through as `65.0` when the sheet stored them as numbers.
    let id = match parse_int_cell(id) {
        Some(n) => n.to_string(),
        None => id.to_string(),
    };

    Ok(SurveyResponse {
        round,
        respondent: RespondentId(id),
        stated_value: parse_stated_value(&row.rgdp1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(year: &str, quarter: &str, id: &str, value: &str) -> RawSurveyRow {
        RawSurveyRow {
            year: year.into(),
            quarter: quarter.into(),
            id: id.into(),
            rgdp1: value.into(),
        }
    }

    #[test]
    fn stated_value_coercion() {
        assert_eq!(parse_stated_value("9,317.4"), Some(9317.4));
        assert_eq!(parse_stated_value(" 100 "), Some(100.0));
        assert_eq!(parse_stated_value("#N/A"), None);
        assert_eq!(parse_stated_value("n/a"), None);
        assert_eq!(parse_stated_value(""), None);
        assert_eq!(parse_stated_value("abc"), None);
    }

    #[test]
    fn non_numeric_rows_are_kept_but_not_aggregated() {
        let (index, report) = SurveyRoundIndex::from_raw_rows(
            vec![
                raw("2002", "1", "1", "100"),
                raw("2002", "1", "2", "#N/A"),
                raw("2002", "1", "3", "1,01"),
            ],
            SurveyFilter::default(),
        );

        assert_eq!(index.len(), 3);
        assert_eq!(report.absent_values, 1);
        let round = RoundKey::new(2002, 1).unwrap();
        assert_eq!(index.responses_for_round(round), vec![100.0, 101.0]);
        assert_eq!(index.responses()[1].respondent.0, "2");
    }

    #[test]
    fn malformed_keys_are_rejected() {
        let (index, report) = SurveyRoundIndex::from_raw_rows(
            vec![
                raw("x", "1", "1", "100"),
                raw("2002", "5", "1", "100"),
                raw("2002", "1", "", "100"),
                raw("2002.0", "2.0", "65.0", "100"),
            ],
            SurveyFilter::default(),
        );

        assert_eq!(index.len(), 1);
        assert_eq!(report.rejected.len(), 3);
        assert!(matches!(report.rejected[0], SurveyError::BadYear { row: 2, .. }));
        assert!(matches!(report.rejected[1], SurveyError::BadQuarter { row: 3, .. }));
        assert_eq!(index.responses()[0].respondent.0, "65");
    }

    #[test]
    fn min_year_filter() {
        let (index, report) = SurveyRoundIndex::from_raw_rows(
            vec![raw("1973", "4", "1", "1"), raw("1974", "1", "1", "1")],
            SurveyFilter { min_year: Some(1974) },
        );
        assert_eq!(report.filtered_out, 1);
        assert_eq!(
            index.all_rounds().into_iter().collect::<Vec<_>>(),
            vec![RoundKey::new(1974, 1).unwrap()]
        );
    }

    #[test]
    fn unknown_round_has_no_responses() {
        let index = SurveyRoundIndex::new();
        assert!(index
            .responses_for_round(RoundKey::new(2000, 1).unwrap())
            .is_empty());
    }
}
