use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Settings for monetary-shock extraction. Defaults reproduce the standard
/// SEP projection regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShockConfig {
    /// Name of the date column in the input panel.
    pub date_column: String,
    /// Dependent variable (policy-rate change).
    pub target: String,
    /// Forecast series that carry a horizon suffix.
    pub prefixes: Vec<String>,
    pub horizons: Vec<u8>,
    /// Series that get lag/difference columns without horizon handling.
    pub plain_series: Vec<String>,
    /// Columns with these suffixes are removed after feature construction.
    pub drop_suffixes: Vec<String>,
    /// Columns never used as regressors besides the date and target.
    pub excluded_regressors: Vec<String>,
    /// Month in which forecast horizons roll forward (day 1 of that month).
    pub roll_month: u32,
    /// Rows before this date are excluded from the sample.
    pub sample_start: NaiveDate,
    pub excluded_years: Vec<i32>,
    /// Dates appended to the output with a zero residual.
    pub zero_fill_dates: Vec<NaiveDate>,
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

impl Default for ShockConfig {
    fn default() -> Self {
        Self {
            date_column: "date".into(),
            target: "DFFR".into(),
            prefixes: vec!["UNRATEMD".into(), "GDPC1MD".into(), "PCECTPIMD".into()],
            horizons: vec![0, 1, 2],
            plain_series: vec!["FEDTARMDLR".into()],
            drop_suffixes: vec!["3".into()],
            excluded_regressors: vec!["UNRATEMD1".into(), "UNRATEMD2".into()],
            roll_month: 3,
            sample_start: ymd(2015, 9, 1),
            excluded_years: vec![2020],
            zero_fill_dates: vec![
                ymd(2020, 3, 1),
                ymd(2020, 6, 1),
                ymd(2020, 9, 1),
                ymd(2020, 12, 1),
            ],
        }
    }
}
