//! Pipeline runner: wires together config, loading, reconciliation and shocks.
//!
//! Entry points:
//! - `run_pipeline()`: reads the survey, loads histories via cache/provider, reconciles. Used by CLI.
//! - `run_reconciliation()`: pure reconciliation over pre-loaded inputs, no I/O.
//! - `run_shock_extraction()`: reads the SEP panel and extracts shocks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use vintagelab_core::data::{
    read_survey_csv, DataSource, FetchProgress, ParquetCache, RevisionProvider,
};
use vintagelab_core::domain::{EnrichedResponse, RoundKey};
use vintagelab_core::fingerprint::dataset_hash;
use vintagelab_core::shocks::{read_panel_csv, extract_shocks, ShockError, ShockExtraction};
use vintagelab_core::vintage::{
    reconcile, IngestStats, RawSurveyRow, ReconciliationSummary, RoundOutcome, SurveyError,
    SurveyIngestReport, SurveyRoundIndex,
};

use crate::config::{ConfigError, PipelineConfig};
use crate::data_loader::{load_histories, LoadError, LoadOptions, LoadedHistories};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("survey error: {0}")]
    Survey(#[from] SurveyError),
    #[error("shock extraction error: {0}")]
    Shock(#[from] ShockError),
    #[error("survey table has no usable rows")]
    EmptySurvey,
    #[error("no survey file configured (set [survey].path or pass --survey)")]
    MissingSurveyPath,
    #[error("no SEP panel configured (set [shocks].panel or pass --panel)")]
    MissingPanelPath,
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Survey ingestion counts as persisted in the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyCounts {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub absent_values: usize,
    pub filtered_out: usize,
    pub rejected: usize,
}

impl From<&SurveyIngestReport> for SurveyCounts {
    fn from(report: &SurveyIngestReport) -> Self {
        Self {
            rows_read: report.rows_read,
            rows_kept: report.rows_kept,
            absent_values: report.absent_values,
            filtered_out: report.filtered_out,
            rejected: report.rejected.len(),
        }
    }
}

/// Everything needed to identify and audit a reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config: PipelineConfig,
    pub config_hash: String,
    pub dataset_hash: String,
    pub summary: ReconciliationSummary,
    pub survey: SurveyCounts,
    pub sources: BTreeMap<String, DataSource>,
    pub ingest: BTreeMap<String, IngestStats>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Complete result of a reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    pub manifest: RunManifest,
    pub outcomes: BTreeMap<RoundKey, RoundOutcome>,
    /// Survey rows in input order with `RGDPL` attached.
    pub rows: Vec<EnrichedResponse>,
}

/// Reconcile pre-loaded inputs. No I/O.
pub fn run_reconciliation(
    config: &PipelineConfig,
    survey_rows: Vec<RawSurveyRow>,
    loaded: LoadedHistories,
) -> Result<ReconciliationReport, RunError> {
    config.validate()?;

    let (index, report) = SurveyRoundIndex::from_raw_rows(survey_rows, config.survey_filter());
    if index.is_empty() {
        return Err(RunError::EmptySurvey);
    }
    info!(
        rows = report.rows_read,
        kept = report.rows_kept,
        absent = report.absent_values,
        rounds = index.all_rounds().len(),
        "survey indexed"
    );

    let policy = config.policy();
    let reconciliation = reconcile(&loaded.store, &index, &policy);
    let summary = reconciliation.summary();
    if summary.computed == 0 {
        warn!(rounds = summary.rounds, "no round could be resolved; RGDPL is all placeholders");
    }

    let manifest = RunManifest {
        schema_version: SCHEMA_VERSION,
        config: config.clone(),
        config_hash: config.config_hash(),
        dataset_hash: dataset_hash(&loaded.store, &index).0,
        summary,
        survey: SurveyCounts::from(&report),
        sources: loaded.sources,
        ingest: loaded.ingest,
    };

    Ok(ReconciliationReport {
        manifest,
        rows: reconciliation.enriched_rows(),
        outcomes: reconciliation.outcomes().clone(),
    })
}

/// Read the survey, load revision histories, reconcile.
pub fn run_pipeline(
    config: &PipelineConfig,
    cache: &ParquetCache,
    provider: Option<&dyn RevisionProvider>,
    progress: Option<&dyn FetchProgress>,
    opts: &LoadOptions,
) -> Result<ReconciliationReport, RunError> {
    config.validate()?;
    let path = config
        .survey
        .path
        .as_deref()
        .ok_or(RunError::MissingSurveyPath)?;
    let survey_rows = read_survey_csv(path)?;
    if survey_rows.is_empty() {
        return Err(RunError::EmptySurvey);
    }

    let series = config.indicators.series_ids();
    let loaded = load_histories(&series, cache, provider, progress, opts)?;
    run_reconciliation(config, survey_rows, loaded)
}

/// Read the configured SEP panel and extract shocks.
pub fn run_shock_extraction(config: &PipelineConfig) -> Result<ShockExtraction, RunError> {
    config.validate()?;
    let path = config
        .shocks
        .panel
        .as_deref()
        .ok_or(RunError::MissingPanelPath)?;
    let extraction = &config.shocks.extraction;
    let panel = read_panel_csv(path, &extraction.date_column)?;
    Ok(extract_shocks(&panel, extraction)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vintagelab_core::data::RawObservation;
    use vintagelab_core::domain::IndicatorId;
    use vintagelab_core::vintage::RevisionHistoryStore;

    fn row(year: &str, quarter: &str, id: &str, rgdp1: &str) -> RawSurveyRow {
        RawSurveyRow {
            year: year.into(),
            quarter: quarter.into(),
            id: id.into(),
            rgdp1: rgdp1.into(),
        }
    }

    fn loaded() -> LoadedHistories {
        let mut store = RevisionHistoryStore::new();
        store.ingest(
            &IndicatorId::new("GDPC1"),
            &[
                RawObservation {
                    period: "2001-10-01".into(),
                    value: "100.0".into(),
                    publication_date: "2002-01-15".into(),
                },
                RawObservation {
                    period: "2000-10-01".into(),
                    value: "96.0".into(),
                    publication_date: "2001-01-20".into(),
                },
            ],
        );
        store.register_empty(&IndicatorId::new("GNPC96"));
        let mut sources = BTreeMap::new();
        sources.insert("GDPC1".to_string(), DataSource::Cache);
        sources.insert("GNPC96".to_string(), DataSource::Unavailable);
        LoadedHistories {
            store,
            sources,
            ingest: BTreeMap::new(),
        }
    }

    #[test]
    fn reconciles_and_fills_manifest() {
        let rows = vec![
            row("2002", "1", "1", "100"),
            row("2002", "1", "2", "100"),
            row("2002", "1", "3", "#N/A"),
            row("2002", "2", "1", "250"),
        ];
        let report = run_reconciliation(&PipelineConfig::default(), rows, loaded()).unwrap();

        assert_eq!(report.rows.len(), 4);
        assert_eq!(report.rows[0].rgdpl, 96.0);
        assert_eq!(report.rows[3].rgdpl, 0.0);
        assert_eq!(report.manifest.summary.computed, 1);
        assert_eq!(report.manifest.survey.absent_values, 1);
        assert_eq!(report.manifest.schema_version, SCHEMA_VERSION);
        assert_eq!(report.manifest.sources["GNPC96"], DataSource::Unavailable);
        assert_eq!(report.outcomes.len(), 2);
    }

    #[test]
    fn empty_survey_is_fatal() {
        let rows = vec![row("bad", "1", "1", "100")];
        assert!(matches!(
            run_reconciliation(&PipelineConfig::default(), rows, loaded()),
            Err(RunError::EmptySurvey)
        ));
    }

    #[test]
    fn pipeline_requires_survey_path() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let result = run_pipeline(
            &PipelineConfig::default(),
            &cache,
            None,
            None,
            &LoadOptions::default(),
        );
        assert!(matches!(result, Err(RunError::MissingSurveyPath)));
    }

    #[test]
    fn shocks_require_panel_path() {
        assert!(matches!(
            run_shock_extraction(&PipelineConfig::default()),
            Err(RunError::MissingPanelPath)
        ));
    }
}
