//! VintageLab Runner: pipeline orchestration on top of `vintagelab-core`.
//!
//! - TOML pipeline configuration
//! - Revision-history loading with cache/fetch/degrade fallback
//! - Reconciliation runs with manifest and dataset fingerprint
//! - Shock extraction runs
//! - CSV/JSON artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;

pub use config::{ConfigError, PipelineConfig};
pub use data_loader::{load_histories, refresh_cache, LoadError, LoadOptions, LoadedHistories};
pub use export::{load_manifest, save_artifacts, save_shocks};
pub use runner::{
    run_pipeline, run_reconciliation, run_shock_extraction, ReconciliationReport, RunError,
    RunManifest, SCHEMA_VERSION,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
    }

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<ReconciliationReport>();
        assert_sync::<ReconciliationReport>();
        assert_send::<RunManifest>();
        assert_sync::<RunManifest>();
    }
}
