//! FRED / ALFRED revision-history provider.
//!
//! Pulls every vintage of a series in one call by asking the observations
//! endpoint for the widest possible real-time window. Each observation row
//! carries the value valid from `realtime_start` until the next revision;
//! FRED omits rows for vintages where the value did not change.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, DataSource, FetchResult, RawObservation, RevisionProvider};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

/// Earliest and latest real-time bounds FRED accepts.
const REALTIME_START: &str = "1776-07-04";
const REALTIME_END: &str = "9999-12-31";

/// Observations endpoint response. Only the fields we consume are declared.
#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Option<Vec<Observation>>,
    error_code: Option<u16>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    realtime_start: String,
    date: String,
    value: String,
}

/// Settings for the FRED client.
#[derive(Debug, Clone)]
pub struct FredSettings {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl FredSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// FRED revision-history provider.
pub struct FredProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    settings: FredSettings,
}

impl FredProvider {
    pub fn new(settings: FredSettings, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        if settings.api_key.trim().is_empty() {
            return Err(DataError::AuthenticationRequired(
                "FRED API key is empty (set FRED_API_KEY or [fred].api_key)".into(),
            ));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            settings,
        })
    }

    /// Query parameters for a full-history request.
    fn query(&self, series_id: &str) -> [(&'static str, String); 5] {
        [
            ("series_id", series_id.to_string()),
            ("api_key", self.settings.api_key.clone()),
            ("file_type", "json".to_string()),
            ("realtime_start", REALTIME_START.to_string()),
            ("realtime_end", REALTIME_END.to_string()),
        ]
    }

    /// Turn the endpoint's JSON body into raw observations.
    fn parse_response(series_id: &str, body: &str) -> Result<Vec<RawObservation>, DataError> {
        let resp: ObservationsResponse = serde_json::from_str(body).map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {series_id}: {e}"))
        })?;

        let observations = match resp.observations {
            Some(obs) => obs,
            None => {
                return Err(match (resp.error_code, resp.error_message) {
                    (Some(400), Some(msg)) if msg.contains("does not exist") => {
                        DataError::SeriesNotFound {
                            series_id: series_id.to_string(),
                        }
                    }
                    (Some(code), Some(msg)) => {
                        DataError::ResponseFormatChanged(format!("{code}: {msg}"))
                    }
                    _ => DataError::ResponseFormatChanged("no observations in response".into()),
                });
            }
        };

        Ok(observations
            .into_iter()
            .map(|o| RawObservation {
                period: o.date,
                value: o.value,
                publication_date: o.realtime_start,
            })
            .collect())
    }

    /// Execute the request with retry and circuit breaker logic.
    fn fetch_with_retry(&self, series_id: &str) -> Result<Vec<RawObservation>, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let query = self.query(series_id);
        let mut last_error = None;

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let delay = self.settings.base_delay * 2u32.pow(attempt - 1);
                debug!(series = series_id, attempt, ?delay, "retrying");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            match self.client.get(&self.settings.base_url).query(&query).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        self.circuit_breaker.trip();
                        return Err(DataError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(DataError::AuthenticationRequired(
                            "FRED rejected the API key".into(),
                        ));
                    }

                    let body = resp
                        .text()
                        .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

                    // FRED reports a bad series id as HTTP 400 with a JSON error body.
                    if status == reqwest::StatusCode::BAD_REQUEST {
                        return Self::parse_response(series_id, &body);
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error =
                            Some(DataError::Other(format!("HTTP {status} for {series_id}")));
                        continue;
                    }

                    let observations = Self::parse_response(series_id, &body)?;
                    self.circuit_breaker.record_success();
                    return Ok(observations);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl RevisionProvider for FredProvider {
    fn name(&self) -> &str {
        "fred"
    }

    fn fetch(&self, series_id: &str) -> Result<FetchResult, DataError> {
        let observations = self.fetch_with_retry(series_id)?;
        Ok(FetchResult {
            series_id: series_id.to_string(),
            observations,
            source: DataSource::Fred,
        })
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "realtime_start": "1776-07-04",
        "realtime_end": "9999-12-31",
        "count": 3,
        "observations": [
            {"realtime_start": "2002-01-30", "realtime_end": "2002-02-27", "date": "2001-10-01", "value": "9317.4"},
            {"realtime_start": "2002-02-28", "realtime_end": "2002-03-27", "date": "2001-10-01", "value": "9322.8"},
            {"realtime_start": "1991-12-04", "realtime_end": "1992-01-29", "date": "1947-01-01", "value": "."}
        ]
    }"#;

    #[test]
    fn parses_observations_keeping_raw_values() {
        let obs = FredProvider::parse_response("GDPC1", BODY).unwrap();
        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0].period, "2001-10-01");
        assert_eq!(obs[0].publication_date, "2002-01-30");
        assert_eq!(obs[0].value, "9317.4");
        // Non-numeric placeholder survives until the store discards it.
        assert_eq!(obs[2].value, ".");
    }

    #[test]
    fn missing_series_maps_to_not_found() {
        let body = r#"{"error_code": 400, "error_message": "Bad Request.  The series does not exist."}"#;
        match FredProvider::parse_response("NOPE", body) {
            Err(DataError::SeriesNotFound { series_id }) => assert_eq!(series_id, "NOPE"),
            other => panic!("expected SeriesNotFound, got {other:?}"),
        }
    }

    #[test]
    fn missing_observations_key_is_format_change() {
        let body = r#"{"count": 0}"#;
        assert!(matches!(
            FredProvider::parse_response("GDPC1", body),
            Err(DataError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let cb = Arc::new(CircuitBreaker::default_provider());
        let result = FredProvider::new(FredSettings::new("  "), cb);
        assert!(matches!(result, Err(DataError::AuthenticationRequired(_))));
    }

    #[test]
    fn query_requests_full_realtime_window() {
        let cb = Arc::new(CircuitBreaker::default_provider());
        let provider = FredProvider::new(FredSettings::new("key"), cb).unwrap();
        let query = provider.query("GNPC96");
        assert!(query.contains(&("realtime_start", "1776-07-04".to_string())));
        assert!(query.contains(&("realtime_end", "9999-12-31".to_string())));
        assert!(query.contains(&("series_id", "GNPC96".to_string())));
    }
}
