//! Parquet cache for fetched revision histories.
//!
//! Layout: `{cache_dir}/series={ID}/vintages.parquet` plus `meta.json`.
//!
//! A full-history fetch is a single large request per series, so the raw
//! observations are cached verbatim (strings, before numeric coercion) and
//! re-ingested on every run. Writes are atomic (write to .tmp, rename into
//! place) and corrupt files are quarantined on load.

use super::provider::{DataError, RawObservation};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const VINTAGES_FILE: &str = "vintages.parquet";
const COLUMNS: [&str; 3] = ["period", "value", "publication_date"];

/// Metadata sidecar for a cached series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub series_id: String,
    pub observation_count: usize,
    pub first_period: String,
    pub last_period: String,
    pub latest_publication: String,
    pub data_hash: String,
    pub source: String,
    pub cached_at: chrono::NaiveDateTime,
}

/// The Parquet cache.
pub struct ParquetCache {
    cache_dir: PathBuf,
}

impl ParquetCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn series_dir(&self, series_id: &str) -> PathBuf {
        self.cache_dir.join(format!("series={series_id}"))
    }

    fn data_path(&self, series_id: &str) -> PathBuf {
        self.series_dir(series_id).join(VINTAGES_FILE)
    }

    fn meta_path(&self, series_id: &str) -> PathBuf {
        self.series_dir(series_id).join("meta.json")
    }

    /// Write the full observation list for a series, replacing any previous copy.
    pub fn write(
        &self,
        series_id: &str,
        observations: &[RawObservation],
        source: &str,
    ) -> Result<CacheMeta, DataError> {
        if observations.is_empty() {
            return Err(DataError::CacheError("no observations to cache".into()));
        }

        let dir = self.series_dir(series_id);
        fs::create_dir_all(&dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let df = observations_to_dataframe(observations)?;
        let path = self.data_path(series_id);
        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&df, &tmp_path)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        let meta = build_meta(series_id, observations, source)?;
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(series_id), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        debug!(series = series_id, rows = observations.len(), "cached revision history");
        Ok(meta)
    }

    /// Load the cached observations for a series in their original order.
    pub fn load(&self, series_id: &str) -> Result<Vec<RawObservation>, DataError> {
        let path = self.data_path(series_id);
        if !path.exists() {
            return Err(DataError::NoCachedData {
                series_id: series_id.to_string(),
            });
        }

        match load_and_validate_parquet(&path) {
            Ok(observations) => Ok(observations),
            Err(e) => {
                let quarantine = path.with_extension("parquet.quarantined");
                warn!(
                    path = %path.display(),
                    error = %e,
                    "quarantining corrupt cache file"
                );
                let _ = fs::rename(&path, &quarantine);
                let _ = fs::remove_file(self.meta_path(series_id));
                Err(DataError::NoCachedData {
                    series_id: series_id.to_string(),
                })
            }
        }
    }

    pub fn get_meta(&self, series_id: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(series_id)).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn status(&self, series_ids: &[&str]) -> Vec<CacheStatus> {
        series_ids
            .iter()
            .map(|id| {
                let meta = self.get_meta(id);
                CacheStatus {
                    series_id: id.to_string(),
                    cached: meta.is_some(),
                    observation_count: meta.as_ref().map(|m| m.observation_count),
                    latest_publication: meta.as_ref().map(|m| m.latest_publication.clone()),
                    cached_at: meta.as_ref().map(|m| m.cached_at),
                }
            })
            .collect()
    }

    /// Every series id that has a `series=` directory under the cache root.
    pub fn cached_series(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };
        let mut ids: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|name| name.strip_prefix("series="))
                    .map(str::to_string)
            })
            .collect();
        ids.sort();
        ids
    }
}

/// Cache status for a single series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub series_id: String,
    pub cached: bool,
    pub observation_count: Option<usize>,
    pub latest_publication: Option<String>,
    pub cached_at: Option<chrono::NaiveDateTime>,
}

fn build_meta(
    series_id: &str,
    observations: &[RawObservation],
    source: &str,
) -> Result<CacheMeta, DataError> {
    let hash_input = serde_json::to_vec(observations)
        .map_err(|e| DataError::CacheError(format!("hash serialization: {e}")))?;

    // ISO dates order lexicographically.
    let first_period = observations.iter().map(|o| &o.period).min();
    let last_period = observations.iter().map(|o| &o.period).max();
    let latest_publication = observations.iter().map(|o| &o.publication_date).max();

    Ok(CacheMeta {
        series_id: series_id.to_string(),
        observation_count: observations.len(),
        first_period: first_period.cloned().unwrap_or_default(),
        last_period: last_period.cloned().unwrap_or_default(),
        latest_publication: latest_publication.cloned().unwrap_or_default(),
        data_hash: blake3::hash(&hash_input).to_hex().to_string(),
        source: source.to_string(),
        cached_at: chrono::Local::now().naive_local(),
    })
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn observations_to_dataframe(observations: &[RawObservation]) -> Result<DataFrame, DataError> {
    let periods: Vec<&str> = observations.iter().map(|o| o.period.as_str()).collect();
    let values: Vec<&str> = observations.iter().map(|o| o.value.as_str()).collect();
    let published: Vec<&str> = observations
        .iter()
        .map(|o| o.publication_date.as_str())
        .collect();

    DataFrame::new(vec![
        Column::new("period".into(), periods),
        Column::new("value".into(), values),
        Column::new("publication_date".into(), published),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path) -> Result<Vec<RawObservation>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::ValidationError("empty parquet file".into()));
    }
    for col_name in &COLUMNS {
        if df.column(col_name).is_err() {
            return Err(DataError::ValidationError(format!(
                "missing column '{col_name}'"
            )));
        }
    }

    dataframe_to_observations(&df)
}

fn dataframe_to_observations(df: &DataFrame) -> Result<Vec<RawObservation>, DataError> {
    let string_column = |name: &str| -> Result<StringChunked, DataError> {
        df.column(name)
            .and_then(|c| c.str().cloned())
            .map_err(|e| DataError::ParquetError(format!("{name} column: {e}")))
    };

    let periods = string_column("period")?;
    let values = string_column("value")?;
    let published = string_column("publication_date")?;

    let mut observations = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let period = periods
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null period at row {i}")))?;
        let publication_date = published
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null publication_date at row {i}")))?;
        observations.push(RawObservation {
            period: period.to_string(),
            value: values.get(i).unwrap_or("").to_string(),
            publication_date: publication_date.to_string(),
        });
    }

    Ok(observations)
}
