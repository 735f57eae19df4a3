//! Lag and revision features for the shock regression.
//!
//! For every forecast column `{prefix}{h}`:
//! - `L.{prefix}{h}`: the previous row's value;
//! - `D.{prefix}{h}`: the change from the previous row. On rows dated March 1
//!   the nowcast (`h = 0`) is compared with the previous row's one-quarter-ahead
//!   forecast `{prefix}1` instead, because the forecast horizons roll forward
//!   by a quarter at that meeting.

use polars::prelude::*;

use super::config::ShockConfig;
use super::panel::Panel;
use super::ShockError;

fn lag(name: &str) -> Expr {
    col(name).shift(lit(1))
}

fn diff(name: &str) -> Expr {
    col(name) - lag(name)
}

/// True on rows dated day 1 of the roll month.
fn is_roll_date(date_column: &str, config: &ShockConfig) -> Expr {
    let date = col(date_column);
    date.clone()
        .dt()
        .month()
        .eq(lit(config.roll_month))
        .and(date.dt().day().eq(lit(1u32)))
}

/// Add `L.` / `D.` columns for every configured series present in the panel,
/// then drop every column ending in one of `config.drop_suffixes`.
///
/// The panel must already be sorted by date.
pub fn build_features(panel: &Panel, config: &ShockConfig) -> Result<Panel, ShockError> {
    let roll = is_roll_date(panel.date_column(), config);
    let mut names = panel.column_names();
    let mut exprs = Vec::new();

    for prefix in &config.prefixes {
        for h in &config.horizons {
            let var = format!("{prefix}{h}");
            if !panel.has_column(&var) {
                continue;
            }
            let revision = if *h == 0 {
                // Horizon roll: compare against last meeting's h=1 forecast.
                let next_horizon = format!("{prefix}1");
                let rolled = if panel.has_column(&next_horizon) {
                    col(var.as_str()) - lag(&next_horizon)
                } else {
                    lit(NULL).cast(DataType::Float64)
                };
                when(roll.clone()).then(rolled).otherwise(diff(&var))
            } else {
                diff(&var)
            };
            exprs.push(lag(&var).alias(format!("L.{var}")));
            exprs.push(revision.alias(format!("D.{var}")));
            names.extend([format!("L.{var}"), format!("D.{var}")]);
        }
    }

    for var in &config.plain_series {
        if panel.has_column(var) {
            exprs.push(lag(var).alias(format!("L.{var}")));
            exprs.push(diff(var).alias(format!("D.{var}")));
            names.extend([format!("L.{var}"), format!("D.{var}")]);
        }
    }

    let kept: Vec<Expr> = std::iter::once(panel.date_column().to_string())
        .chain(
            names
                .into_iter()
                .filter(|name| !config.drop_suffixes.iter().any(|s| name.ends_with(s.as_str()))),
        )
        .map(|name| col(name.as_str()))
        .collect();

    let df = panel.lazy().with_columns(exprs).select(kept).collect()?;
    Panel::from_frame(df, panel.date_column())
}
