//! Revision provider trait and structured error types.
//!
//! The RevisionProvider trait abstracts over revision-history sources (the
//! FRED/ALFRED API today) so the cache and loader can be exercised with
//! in-memory fakes in tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Raw observation exactly as the source reports it (before numeric coercion).
///
/// `value` stays a string: the source uses `"."` for "no value", and the
/// revision store is responsible for discarding non-numeric entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Economic period the value measures (`YYYY-MM-DD`, first day of the quarter).
    pub period: String,
    pub value: String,
    /// Date the value became public (`realtime_start`).
    pub publication_date: String,
}

/// Structured error types for data operations.
///
/// These are designed to be displayable in CLI output and log lines alike.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("series not found: {series_id}")]
    SeriesNotFound { series_id: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("no cached data for series '{series_id}'; run `vintagelab fetch` first")]
    NoCachedData { series_id: String },

    #[error("data error: {0}")]
    Other(String),
}

/// Result of a successful fetch for a single series.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub series_id: String,
    pub observations: Vec<RawObservation>,
    pub source: DataSource,
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Fred,
    Cache,
    /// Fetch failed and nothing was cached; the indicator is treated as empty.
    Unavailable,
}

/// Trait for revision-history providers.
///
/// Implementations fetch the complete vintage history of one series in a
/// single call. The cache layer sits above this trait.
pub trait RevisionProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch every (period, value, publication_date) observation ever published for a series.
    fn fetch(&self, series_id: &str) -> Result<FetchResult, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}

/// Progress callback for multi-series operations.
pub trait FetchProgress: Send {
    fn on_start(&self, series_id: &str, index: usize, total: usize);

    fn on_complete(&self, series_id: &str, index: usize, total: usize, result: &Result<usize, DataError>);

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that emits `tracing` events.
pub struct LogProgress;

impl FetchProgress for LogProgress {
    fn on_start(&self, series_id: &str, index: usize, total: usize) {
        info!("[{}/{}] fetching {series_id}", index + 1, total);
    }

    fn on_complete(
        &self,
        series_id: &str,
        _index: usize,
        _total: usize,
        result: &Result<usize, DataError>,
    ) {
        match result {
            Ok(count) => info!(series = series_id, observations = count, "fetch ok"),
            Err(e) => warn!(series = series_id, error = %e, "fetch failed"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        info!("fetch complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}
