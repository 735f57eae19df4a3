//! Survey table reader.
//!
//! Reads a CSV export of the panel's individual-response sheet. Only the
//! `YEAR`, `QUARTER`, `ID` and `RGDP1` columns are used; header matching is
//! case-insensitive and any other columns are ignored. Records are read as
//! bytes and only the used cells are decoded (lossily), so stray encodings in
//! other columns never fail the read. Cells stay strings here; typing happens in [`SurveyRoundIndex::from_raw_rows`].
//!
//! [`SurveyRoundIndex::from_raw_rows`]: crate::vintage::SurveyRoundIndex::from_raw_rows

use std::io::Read;
use std::path::Path;

use crate::vintage::rounds::{RawSurveyRow, SurveyError};

pub const REQUIRED_COLUMNS: [&str; 4] = ["YEAR", "QUARTER", "ID", "RGDP1"];

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

/// Read raw survey rows from any reader.
pub fn read_survey_rows<R: Read>(reader: R) -> Result<Vec<RawSurveyRow>, SurveyError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .byte_headers()
        .map_err(|e| SurveyError::Io(format!("header: {e}")))?
        .iter()
        .map(decode)
        .collect();

    let mut positions = [0usize; 4];
    for (slot, name) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
            .ok_or_else(|| SurveyError::MissingColumn(name.to_string()))?;
    }
    let [year, quarter, id, rgdp1] = positions;

    let mut rows = Vec::new();
    for record in rdr.byte_records() {
        let record = record.map_err(|e| SurveyError::Io(format!("record: {e}")))?;
        let cell = |i: usize| record.get(i).map(decode).unwrap_or_default();
        rows.push(RawSurveyRow {
            year: cell(year),
            quarter: cell(quarter),
            id: cell(id),
            rgdp1: cell(rgdp1),
        });
    }
    Ok(rows)
}

/// Read raw survey rows from a CSV file.
pub fn read_survey_csv(path: &Path) -> Result<Vec<RawSurveyRow>, SurveyError> {
    let file = std::fs::File::open(path)
        .map_err(|e| SurveyError::Io(format!("{}: {e}", path.display())))?;
    read_survey_rows(file)
}
