//! Revision-history acquisition and caching, plus the survey table reader.

pub mod cache;
pub mod circuit_breaker;
pub mod fred;
pub mod provider;
pub mod survey;

pub use cache::{CacheMeta, CacheStatus, ParquetCache};
pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use fred::{FredProvider, FredSettings, DEFAULT_BASE_URL};
pub use provider::{
    DataError, DataSource, FetchProgress, FetchResult, LogProgress, RawObservation,
    RevisionProvider,
};
pub use survey::{read_survey_csv, read_survey_rows, REQUIRED_COLUMNS};
