//! Pipeline configuration, loaded from TOML.
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration. Example:
//!
//! ```toml
//! [fred]
//! timeout_secs = 30
//!
//! [indicators]
//! legacy = "GNPC96"
//! current = "GDPC1"
//! cutover_year = 1992
//!
//! [resolver]
//! tolerance = 1.0
//! year_basis = "reference_period"
//!
//! [survey]
//! path = "data/spf_rgdp.csv"
//! min_year = 1974
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use vintagelab_core::data::{FredSettings, DEFAULT_BASE_URL};
use vintagelab_core::domain::IndicatorRegime;
use vintagelab_core::shocks::ShockConfig;
use vintagelab_core::vintage::{ResolverPolicy, SurveyFilter, YearBasis, DEFAULT_TOLERANCE};

/// Environment variable consulted when `[fred].api_key` is not set.
pub const API_KEY_ENV: &str = "FRED_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub fred: FredConfig,
    pub indicators: IndicatorConfig,
    pub resolver: ResolverConfig,
    pub survey: SurveyConfig,
    pub output: OutputConfig,
    pub cache: CacheConfig,
    pub shocks: ShocksConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FredConfig {
    /// Never serialized, so it stays out of manifests and the config hash.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for FredConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 60,
            max_retries: 3,
        }
    }
}

impl FredConfig {
    /// The configured key, falling back to `FRED_API_KEY`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }

    /// Client settings for a resolved key.
    pub fn settings(&self, api_key: String) -> FredSettings {
        FredSettings {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            ..FredSettings::new(api_key)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Series used for reference periods before `cutover_year`.
    pub legacy: String,
    pub current: String,
    pub cutover_year: i32,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        let regime = IndicatorRegime::default();
        Self {
            legacy: regime.legacy.0,
            current: regime.current.0,
            cutover_year: regime.cutover_year,
        }
    }
}

impl IndicatorConfig {
    pub fn regime(&self) -> IndicatorRegime {
        IndicatorRegime::new(self.legacy.as_str(), self.current.as_str(), self.cutover_year)
    }

    pub fn series_ids(&self) -> [&str; 2] {
        [self.legacy.as_str(), self.current.as_str()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub tolerance: f64,
    pub year_basis: YearBasis,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            year_basis: YearBasis::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    pub path: Option<PathBuf>,
    /// Rounds before this year are dropped at ingestion.
    pub min_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/cache"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShocksConfig {
    /// SEP projection panel (CSV).
    pub panel: Option<PathBuf>,
    pub output: PathBuf,
    #[serde(flatten)]
    pub extraction: ShockConfig,
}

impl Default for ShocksConfig {
    fn default() -> Self {
        Self {
            panel: None,
            output: PathBuf::from("shocks.csv"),
            extraction: ShockConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let tolerance = self.resolver.tolerance;
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "resolver.tolerance must be positive, got {tolerance}"
            )));
        }
        if self.indicators.legacy.trim().is_empty() || self.indicators.current.trim().is_empty() {
            return Err(ConfigError::Invalid("indicator series ids must not be blank".into()));
        }
        if self.indicators.legacy == self.indicators.current {
            return Err(ConfigError::Invalid(format!(
                "legacy and current indicators are both '{}'",
                self.indicators.legacy
            )));
        }
        if self.fred.max_retries > 10 {
            return Err(ConfigError::Invalid(format!(
                "fred.max_retries must be at most 10, got {}",
                self.fred.max_retries
            )));
        }
        if self.shocks.extraction.target.trim().is_empty() {
            return Err(ConfigError::Invalid("shocks.target must not be blank".into()));
        }
        Ok(())
    }

    pub fn policy(&self) -> ResolverPolicy {
        ResolverPolicy {
            tolerance: self.resolver.tolerance,
            regime: self.indicators.regime(),
            year_basis: self.resolver.year_basis,
        }
    }

    pub fn survey_filter(&self) -> SurveyFilter {
        SurveyFilter {
            min_year: self.survey.min_year,
        }
    }

    /// Content hash of the effective configuration.
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
