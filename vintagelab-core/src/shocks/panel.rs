//! Dated panel of numeric columns, backed by a polars `DataFrame`.
//!
//! CSV input is read with every column as text, the date column is parsed
//! row by row, and the remaining columns are cast to `Float64` (cells that do
//! not parse become null, as do NaN).

use chrono::NaiveDate;
use polars::prelude::*;
use std::io::{Cursor, Read};
use std::path::Path;

use super::ShockError;

/// Name given to the date column of panels built with [`Panel::new`].
pub const DEFAULT_DATE_COLUMN: &str = "date";

/// Date column plus `Float64` columns. Missing cells are null.
#[derive(Debug, Clone)]
pub struct Panel {
    df: DataFrame,
    date_column: String,
}

impl Panel {
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        let dates = DateChunked::from_naive_date(DEFAULT_DATE_COLUMN.into(), dates);
        let df = DataFrame::new(vec![Column::from(dates.into_series())]).unwrap_or_default();
        Self {
            df,
            date_column: DEFAULT_DATE_COLUMN.to_string(),
        }
    }

    /// Wrap a frame whose `date_column` is already of `Date` type.
    pub fn from_frame(df: DataFrame, date_column: &str) -> Result<Self, ShockError> {
        let dtype = df
            .column(date_column)
            .map_err(|_| ShockError::MissingColumn(date_column.to_string()))?
            .dtype();
        if *dtype != DataType::Date {
            return Err(ShockError::Frame(format!(
                "column '{date_column}' has type {dtype}, expected date"
            )));
        }
        Ok(Self {
            df,
            date_column: date_column.to_string(),
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn lazy(&self) -> LazyFrame {
        self.df.clone().lazy()
    }

    pub fn date_column(&self) -> &str {
        &self.date_column
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.df
            .column(&self.date_column)
            .and_then(|c| c.date().map(|d| d.as_date_iter().flatten().collect()))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Value column names in frame order (the date column excluded).
    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .filter(|n| n.as_str() != self.date_column)
            .map(|n| n.to_string())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let values = self.df.column(name).ok()?.f64().ok()?;
        Some(values.into_iter().collect())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.column(name).is_ok()
    }

    /// Add or replace a column. Length must match the date axis.
    pub fn insert(&mut self, name: &str, values: Vec<Option<f64>>) -> Result<(), ShockError> {
        if values.len() != self.df.height() {
            return Err(ShockError::LengthMismatch {
                column: name.to_string(),
                expected: self.df.height(),
                actual: values.len(),
            });
        }
        self.df.with_column(Column::new(name.into(), values))?;
        Ok(())
    }

    /// Rows ascending by date, stable for equal dates.
    pub fn sorted(&self) -> Result<Self, ShockError> {
        let df = self
            .lazy()
            .sort(
                [self.date_column.as_str()],
                SortMultipleOptions::default().with_maintain_order(true),
            )
            .collect()?;
        Ok(Self {
            df,
            date_column: self.date_column.clone(),
        })
    }
}

/// Accepts ISO dates, ISO datetimes (time part ignored) and US `m/d/Y`.
pub fn parse_panel_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let iso = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(iso, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
}

/// Read a panel from CSV. The date column is found by name (case-insensitive)
/// and renamed to `date_column`; every other column is read as numeric.
pub fn read_panel<R: Read>(mut reader: R, date_column: &str) -> Result<Panel, ShockError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| ShockError::Io(e.to_string()))?;
    let raw = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| {
            opts.with_encoding(CsvEncoding::LossyUtf8)
                .with_truncate_ragged_lines(true)
        })
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;
    panel_from_text_frame(raw, date_column)
}

pub fn read_panel_csv(path: &Path, date_column: &str) -> Result<Panel, ShockError> {
    if !path.exists() {
        return Err(ShockError::Io(format!("{}: file not found", path.display())));
    }
    let raw = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_encoding(CsvEncoding::LossyUtf8)
        .with_truncate_ragged_lines(true)
        .finish()?
        .collect()?;
    panel_from_text_frame(raw, date_column)
}

/// All-text frame → typed panel.
fn panel_from_text_frame(raw: DataFrame, date_column: &str) -> Result<Panel, ShockError> {
    let names: Vec<String> = raw
        .get_column_names()
        .into_iter()
        .map(|n| n.to_string())
        .collect();
    let raw_date = names
        .iter()
        .find(|n| n.trim().eq_ignore_ascii_case(date_column))
        .ok_or_else(|| ShockError::MissingColumn(date_column.to_string()))?;

    let mut dates = Vec::with_capacity(raw.height());
    for (i, cell) in raw.column(raw_date)?.str()?.into_iter().enumerate() {
        let cell = cell.unwrap_or("");
        let date = parse_panel_date(cell).ok_or_else(|| ShockError::BadDate {
            row: i + 2,
            value: cell.to_string(),
        })?;
        dates.push(date);
    }

    let numeric: Vec<Expr> = names
        .iter()
        .filter(|n| *n != raw_date)
        .map(|n| {
            col(n.as_str())
                .cast(DataType::Float64)
                .fill_nan(lit(NULL))
                .alias(n.trim())
        })
        .collect();
    let mut df = raw.lazy().select(numeric).collect()?;
    let dates = DateChunked::from_naive_date(date_column.into(), dates);
    df.insert_column(0, Column::from(dates.into_series()))?;
    Panel::from_frame(df, date_column)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn reads_numeric_columns_with_gaps() {
        let csv = "date,DFFR,UNRATEMD0\n2016-03-01,0.25,\n2015-12-01,0.12,5.0\n";
        let panel = read_panel(csv.as_bytes(), "date").unwrap();

        assert_eq!(panel.len(), 2);
        assert_eq!(panel.column_names(), vec!["DFFR".to_string(), "UNRATEMD0".to_string()]);
        assert_eq!(panel.column("UNRATEMD0").unwrap(), vec![None, Some(5.0)]);
    }

    #[test]
    fn non_numeric_and_nan_cells_are_missing() {
        let csv = "date,x\n2016-03-01,n/a\n2016-06-01,NaN\n2016-09-01,1.5\n";
        let panel = read_panel(csv.as_bytes(), "date").unwrap();
        assert_eq!(panel.column("x").unwrap(), vec![None, None, Some(1.5)]);
    }

    #[test]
    fn invalid_utf8_in_a_cell_does_not_fail_the_read() {
        let mut csv = b"date,x,NOTE\n2016-03-01,2,caf".to_vec();
        csv.push(0xE9);
        csv.extend_from_slice(b"\n2016-06-01,3,ok\n");
        let panel = read_panel(csv.as_slice(), "date").unwrap();
        assert_eq!(panel.column("x").unwrap(), vec![Some(2.0), Some(3.0)]);
    }

    #[test]
    fn sorted_keeps_columns_aligned() {
        let csv = "Date,x\n2016-03-01,2\n2015-12-01,1\n2020-03-01,3\n";
        let panel = read_panel(csv.as_bytes(), "date").unwrap().sorted().unwrap();
        assert_eq!(panel.date_column(), "date");
        assert_eq!(panel.dates()[0], d("2015-12-01"));
        assert_eq!(panel.column("x").unwrap(), vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn bad_date_is_reported_with_row() {
        let csv = "date,x\nnope,1\n";
        assert!(matches!(
            read_panel(csv.as_bytes(), "date"),
            Err(ShockError::BadDate { row: 2, .. })
        ));
    }

    #[test]
    fn missing_date_column() {
        let csv = "when,x\n2016-03-01,1\n";
        assert!(matches!(
            read_panel(csv.as_bytes(), "date"),
            Err(ShockError::MissingColumn(_))
        ));
    }

    #[test]
    fn date_formats() {
        assert_eq!(parse_panel_date("2015-09-01"), Some(d("2015-09-01")));
        assert_eq!(parse_panel_date("2015-09-01 00:00:00"), Some(d("2015-09-01")));
        assert_eq!(parse_panel_date("9/1/2015"), Some(d("2015-09-01")));
    }

    #[test]
    fn insert_rejects_wrong_length() {
        let mut panel = Panel::new(vec![d("2015-09-01")]);
        assert!(panel.insert("x", vec![]).is_err());
    }
}
