//! Monetary shock extraction: regress the policy-rate change on projection
//! levels, lags and revisions, and keep the residual as the shock.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::{debug, info};

use super::config::ShockConfig;
use super::features::build_features;
use super::ols::{fit_ols, OlsFit};
use super::panel::Panel;
use super::ShockError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shock {
    pub date: NaiveDate,
    #[serde(rename = "residuals")]
    pub residual: f64,
}

/// Result of a shock extraction: the shock series plus regression metadata.
#[derive(Debug, Clone)]
pub struct ShockExtraction {
    pub shocks: Vec<Shock>,
    pub regressors: Vec<String>,
    pub fit: OlsFit,
    /// Rows in the filtered sample before dropping incomplete ones.
    pub sample_rows: usize,
}

impl ShockExtraction {
    /// Names of regressors dropped as collinear.
    pub fn dropped_regressors(&self) -> Vec<&str> {
        self.fit
            .dropped
            .iter()
            .filter_map(|&i| self.regressors.get(i).map(String::as_str))
            .collect()
    }
}

fn regressor_names(panel: &Panel, config: &ShockConfig) -> Vec<String> {
    panel
        .column_names()
        .into_iter()
        .filter(|name| {
            *name != config.target
                && !name.eq_ignore_ascii_case(&config.date_column)
                && !config.excluded_regressors.contains(name)
        })
        .collect()
}

/// `Date` literal for comparisons against the date column.
fn date_lit(date: NaiveDate) -> Expr {
    let days = date.signed_duration_since(NaiveDate::default()).num_days();
    lit(days as i32).cast(DataType::Date)
}

fn sample_filter(date_column: &str, config: &ShockConfig) -> Expr {
    let year = col(date_column).dt().year();
    config.excluded_years.iter().fold(
        col(date_column).gt_eq(date_lit(config.sample_start)),
        |keep, y| keep.and(year.clone().neq(lit(*y))),
    )
}

fn float_values(df: &DataFrame, name: &str) -> Result<Vec<f64>, ShockError> {
    Ok(df.column(name)?.f64()?.into_no_null_iter().collect())
}

/// Run the full pipeline on a raw panel.
pub fn extract_shocks(panel: &Panel, config: &ShockConfig) -> Result<ShockExtraction, ShockError> {
    if !panel.has_column(&config.target) {
        return Err(ShockError::MissingColumn(config.target.clone()));
    }

    let features = build_features(&panel.sorted()?, config)?;
    let date_column = features.date_column().to_string();
    let sample = features
        .lazy()
        .filter(sample_filter(&date_column, config))
        .collect()?;
    let sample_rows = sample.height();

    let regressors = regressor_names(&features, config);
    let selected: Vec<Expr> = [&date_column, &config.target]
        .into_iter()
        .chain(&regressors)
        .map(|name| col(name.as_str()))
        .collect();
    // Complete cases only.
    let complete = sample.lazy().select(selected).drop_nulls(None).collect()?;

    let required = regressors.len() + 1;
    if complete.height() < required {
        return Err(ShockError::NotEnoughRows {
            rows: complete.height(),
            required,
        });
    }

    let y = float_values(&complete, &config.target)?;
    let x = regressors
        .iter()
        .map(|name| float_values(&complete, name))
        .collect::<Result<Vec<_>, _>>()?;
    let fit = fit_ols(&y, &x)?;

    debug!(
        regressors = regressors.len(),
        dropped = fit.dropped.len(),
        "shock regression fitted"
    );

    let dates = Panel::from_frame(complete, &date_column)?.dates();
    let mut shocks: Vec<Shock> = dates
        .into_iter()
        .zip(&fit.residuals)
        .map(|(date, &residual)| Shock { date, residual })
        .collect();
    let observations = shocks.len();
    shocks.extend(config.zero_fill_dates.iter().map(|&date| Shock {
        date,
        residual: 0.0,
    }));
    shocks.sort_by_key(|s| s.date);

    info!(
        sample_rows,
        observations,
        shocks = shocks.len(),
        "extracted monetary shocks"
    );

    Ok(ShockExtraction {
        shocks,
        regressors,
        fit,
        sample_rows,
    })
}

/// Write `date,residuals` CSV.
pub fn write_shocks_csv<W: Write>(writer: W, shocks: &[Shock]) -> Result<(), ShockError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for shock in shocks {
        wtr.serialize(shock)
            .map_err(|e| ShockError::Io(format!("write shock: {e}")))?;
    }
    wtr.flush().map_err(|e| ShockError::Io(e.to_string()))?;
    Ok(())
}
