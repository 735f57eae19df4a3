//! Artifact export: enriched survey CSV, per-round diagnostics, manifest, shocks.
//!
//! The manifest carries a `schema_version`; unknown versions are rejected on load.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use vintagelab_core::domain::{EnrichedResponse, RoundKey};
use vintagelab_core::shocks::{write_shocks_csv, Shock};
use vintagelab_core::vintage::RoundOutcome;

use crate::runner::{ReconciliationReport, RunManifest, SCHEMA_VERSION};

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_manifest_json(manifest: &RunManifest) -> Result<String> {
    serde_json::to_string_pretty(manifest).context("failed to serialize run manifest to JSON")
}

/// Deserialize a manifest, rejecting unknown schema versions.
pub fn import_manifest_json(json: &str) -> Result<RunManifest> {
    let manifest: RunManifest =
        serde_json::from_str(json).context("failed to deserialize run manifest from JSON")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

// ─── CSV ────────────────────────────────────────────────────────────

fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Survey table with the reconstructed column: `YEAR,QUARTER,ID,RGDP1,RGDPL`.
/// Absent forecasts are written as empty cells.
pub fn export_enriched_csv(rows: &[EnrichedResponse]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["YEAR", "QUARTER", "ID", "RGDP1", "RGDPL"])?;
    for row in rows {
        let r = &row.response;
        wtr.write_record([
            r.round.year().to_string(),
            r.round.quarter().to_string(),
            r.respondent.0.clone(),
            format_value(r.stated_value),
            row.rgdpl.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per round: consensus, matched vintage, aggregate and status.
pub fn export_rounds_csv(outcomes: &BTreeMap<RoundKey, RoundOutcome>) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "round",
        "respondents",
        "mode",
        "reference_period",
        "indicator",
        "vintage_date",
        "matched_value",
        "rgdpl",
        "quarters_used",
        "status",
    ])?;

    for (round, outcome) in outcomes {
        let consensus = outcome.consensus();
        let vintage = outcome.vintage();
        let (rgdpl, quarters_used, status) = match outcome {
            RoundOutcome::Computed { aggregate, .. } => (
                aggregate.value.to_string(),
                aggregate.quarters_used().to_string(),
                "computed",
            ),
            RoundOutcome::Skipped { reason, .. } => (String::new(), String::new(), reason.as_str()),
        };
        wtr.write_record([
            round.to_string(),
            consensus
                .map(|c| c.respondent_count.to_string())
                .unwrap_or_default(),
            format_value(consensus.map(|c| c.mode_value)),
            consensus
                .map(|c| c.reference_period.to_string())
                .unwrap_or_default(),
            vintage.map(|v| v.indicator.to_string()).unwrap_or_default(),
            vintage
                .map(|v| v.publication_date.to_string())
                .unwrap_or_default(),
            format_value(vintage.map(|v| v.matched_value)),
            rgdpl,
            quarters_used,
            status.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn export_shocks_csv(shocks: &[Shock]) -> Result<String> {
    let mut buf = Vec::new();
    write_shocks_csv(&mut buf, shocks)?;
    String::from_utf8(buf).context("CSV output is not valid UTF-8")
}

/// Write the shock series to `path`, creating parent directories.
pub fn save_shocks(shocks: &[Shock], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let csv = export_shocks_csv(shocks)?;
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a reconciliation run.
///
/// Creates `run_{timestamp}/` under `output_dir` containing:
/// - `spf_rgdpl.csv`: enriched survey table
/// - `rounds.csv`: per-round diagnostics
/// - `manifest.json`: config, summary, hashes
pub fn save_artifacts(report: &ReconciliationReport, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!("run_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let enriched = export_enriched_csv(&report.rows)?;
    std::fs::write(run_dir.join("spf_rgdpl.csv"), enriched)?;

    let rounds = export_rounds_csv(&report.outcomes)?;
    std::fs::write(run_dir.join("rounds.csv"), rounds)?;

    let json = export_manifest_json(&report.manifest)?;
    std::fs::write(run_dir.join("manifest.json"), json)?;

    Ok(run_dir)
}

/// Load a manifest from an artifact directory. Rejects unknown schema versions.
pub fn load_manifest(dir: &Path) -> Result<RunManifest> {
    let path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_manifest_json(&json)
}
