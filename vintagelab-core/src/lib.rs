//! VintageLab Core: real-time data reconciliation for survey forecasts.
//!
//! - Domain types (quarters, indicators, revision records, survey rounds)
//! - Revision-history store with as-of lookups
//! - Consensus vintage resolution and the lagged annual aggregate
//! - FRED/ALFRED provider with Parquet cache
//! - Monetary shock extraction from SEP projections

pub mod data;
pub mod domain;
pub mod fingerprint;
pub mod shocks;
pub mod vintage;
