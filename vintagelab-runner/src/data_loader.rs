//! Revision-history loading for the runner.
//!
//! For each series the fallback policy is:
//! 1. If cached data exists (and `force` is off) → use it
//! 2. If not cached and a provider is available → fetch and cache
//! 3. If a forced fetch fails → fall back to the cached copy
//! 4. Otherwise → treat the series as empty and log a warning
//!
//! A single unavailable series never aborts the run. Only when every
//! requested series comes back empty is loading an error.

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

use vintagelab_core::data::{
    CacheMeta, DataError, DataSource, FetchProgress, ParquetCache, RawObservation,
    RevisionProvider,
};
use vintagelab_core::domain::IndicatorId;
use vintagelab_core::vintage::{IngestStats, RevisionHistoryStore};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no revision data for any of: {}", .series.join(", "))]
    NoRevisionData { series: Vec<String> },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Options controlling how histories are loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Never make network requests.
    pub offline: bool,
    /// Re-fetch even if cached.
    pub force: bool,
}

/// Loaded histories plus per-series provenance.
#[derive(Debug)]
pub struct LoadedHistories {
    pub store: RevisionHistoryStore,
    pub sources: BTreeMap<String, DataSource>,
    pub ingest: BTreeMap<String, IngestStats>,
}

impl LoadedHistories {
    /// Series that ended up with no data.
    pub fn unavailable(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|(_, s)| **s == DataSource::Unavailable)
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

/// Fetch from the provider and write through to the cache.
/// A cache write failure is logged; the fetched data is still returned.
fn fetch_and_cache(
    series_id: &str,
    cache: &ParquetCache,
    provider: &dyn RevisionProvider,
) -> Result<Vec<RawObservation>, DataError> {
    let fetched = provider.fetch(series_id)?;
    if fetched.observations.is_empty() {
        return Err(DataError::ValidationError(format!(
            "{series_id}: provider returned no observations"
        )));
    }
    if let Err(e) = cache.write(series_id, &fetched.observations, provider.name()) {
        warn!(series = series_id, error = %e, "failed to cache revision history");
    }
    Ok(fetched.observations)
}

/// Load every series into one store, applying the fallback policy.
pub fn load_histories(
    series_ids: &[&str],
    cache: &ParquetCache,
    provider: Option<&dyn RevisionProvider>,
    progress: Option<&dyn FetchProgress>,
    opts: &LoadOptions,
) -> Result<LoadedHistories, LoadError> {
    let mut store = RevisionHistoryStore::new();
    let mut sources = BTreeMap::new();
    let mut ingest = BTreeMap::new();
    let total = series_ids.len();

    for (i, &series_id) in series_ids.iter().enumerate() {
        let indicator = IndicatorId::new(series_id);

        // Step 1: cache
        let cached = if opts.force {
            None
        } else {
            cache.load(series_id).ok()
        };

        // Step 2: fetch, falling back to the cache a forced fetch bypassed
        let (observations, source) = match cached {
            Some(obs) => (obs, DataSource::Cache),
            None => {
                let fetched = match provider.filter(|p| !opts.offline && p.is_available()) {
                    Some(provider) => {
                        if let Some(p) = progress {
                            p.on_start(series_id, i, total);
                        }
                        let result = fetch_and_cache(series_id, cache, provider);
                        if let Some(p) = progress {
                            let summary = result.as_ref().map(Vec::len).map_err(Clone::clone);
                            p.on_complete(series_id, i, total, &summary);
                        }
                        match result {
                            Ok(obs) => Some(obs),
                            Err(e) => {
                                warn!(series = series_id, error = %e, "fetch failed");
                                None
                            }
                        }
                    }
                    None => None,
                };
                match fetched {
                    Some(obs) => (obs, DataSource::Fred),
                    None if opts.force => match cache.load(series_id) {
                        Ok(obs) => {
                            warn!(series = series_id, "forced fetch failed; using cached history");
                            (obs, DataSource::Cache)
                        }
                        Err(_) => (Vec::new(), DataSource::Unavailable),
                    },
                    None => (Vec::new(), DataSource::Unavailable),
                }
            }
        };

        // Step 3: degrade
        if source == DataSource::Unavailable {
            warn!(
                series = series_id,
                offline = opts.offline,
                "no revision history available; indicator treated as empty"
            );
            store.register_empty(&indicator);
        } else {
            let stats = store.ingest(&indicator, &observations);
            ingest.insert(series_id.to_string(), stats);
        }
        sources.insert(series_id.to_string(), source);
    }

    if let Some(p) = progress {
        let failed = sources
            .values()
            .filter(|s| **s == DataSource::Unavailable)
            .count();
        p.on_batch_complete(total - failed, failed, total);
    }

    if !series_ids.is_empty() && series_ids.iter().all(|id| !store.has_data(&IndicatorId::new(*id))) {
        return Err(LoadError::NoRevisionData {
            series: series_ids.iter().map(|s| s.to_string()).collect(),
        });
    }

    Ok(LoadedHistories {
        store,
        sources,
        ingest,
    })
}

/// Re-fetch series from the provider into the cache (the `fetch` command).
/// Returns one result per series, in input order.
pub fn refresh_cache(
    series_ids: &[&str],
    cache: &ParquetCache,
    provider: &dyn RevisionProvider,
    progress: Option<&dyn FetchProgress>,
) -> Vec<(String, Result<CacheMeta, DataError>)> {
    let total = series_ids.len();
    let mut results = Vec::with_capacity(total);

    for (i, &series_id) in series_ids.iter().enumerate() {
        if let Some(p) = progress {
            p.on_start(series_id, i, total);
        }
        let result = provider
            .fetch(series_id)
            .and_then(|f| cache.write(series_id, &f.observations, provider.name()));
        if let Some(p) = progress {
            let summary = result
                .as_ref()
                .map(|m| m.observation_count)
                .map_err(Clone::clone);
            p.on_complete(series_id, i, total, &summary);
        }
        results.push((series_id.to_string(), result));
    }

    if let Some(p) = progress {
        let ok = results.iter().filter(|(_, r)| r.is_ok()).count();
        p.on_batch_complete(ok, total - ok, total);
    }
    results
}
