//! Monetary policy shocks from a panel of SEP projections.
//!
//! - `panel`: dated numeric table (polars frame) read from CSV
//! - `features`: lag and revision columns with the March horizon roll
//! - `ols`: least squares with an intercept
//! - `extract`: sample filtering, regression, zero-filled placeholder dates

pub mod config;
pub mod extract;
pub mod features;
pub mod ols;
pub mod panel;

pub use config::ShockConfig;
pub use extract::{extract_shocks, write_shocks_csv, Shock, ShockExtraction};
pub use features::build_features;
pub use ols::{fit_ols, OlsFit};
pub use panel::{parse_panel_date, read_panel, read_panel_csv, Panel, DEFAULT_DATE_COLUMN};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShockError {
    #[error("column '{column}' has {actual} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("required column '{0}' not found")]
    MissingColumn(String),

    #[error("row {row}: unparseable date '{value}'")]
    BadDate { row: usize, value: String },

    #[error("regression needs at least {required} complete rows, found {rows}")]
    NotEnoughRows { rows: usize, required: usize },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("dataframe error: {0}")]
    Frame(String),
}

impl From<polars::prelude::PolarsError> for ShockError {
    fn from(e: polars::prelude::PolarsError) -> Self {
        ShockError::Frame(e.to_string())
    }
}
