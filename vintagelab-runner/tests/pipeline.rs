//! End-to-end runner tests: survey CSV + cached histories → artifacts on disk.

use std::path::Path;

use vintagelab_core::data::{DataSource, ParquetCache, RawObservation};
use vintagelab_runner::config::PipelineConfig;
use vintagelab_runner::data_loader::LoadOptions;
use vintagelab_runner::export::{load_manifest, save_artifacts, save_shocks};
use vintagelab_runner::runner::{run_pipeline, run_shock_extraction, RunError};

fn obs(period: &str, value: &str, published: &str) -> RawObservation {
    RawObservation {
        period: period.into(),
        value: value.into(),
        publication_date: published.into(),
    }
}

fn seed_cache(dir: &Path) -> ParquetCache {
    let cache = ParquetCache::new(dir);
    cache
        .write(
            "GDPC1",
            &[
                obs("2001-10-01", "100.0", "2002-01-15"),
                obs("2001-10-01", "100.5", "2002-04-15"),
                obs("2000-01-01", "90.0", "2001-01-10"),
                obs("2000-04-01", "91.0", "2001-01-10"),
                obs("2000-07-01", "92.0", "2001-01-10"),
                obs("2000-10-01", "93.0", "2001-01-10"),
            ],
            "fixture",
        )
        .unwrap();
    cache
}

fn write_survey(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("spf.csv");
    std::fs::write(
        &path,
        "YEAR,QUARTER,ID,INDUSTRY,RGDP1,RGDP2\n\
         2002,1,10,1,100,101\n\
         2002,1,11,1,100,101\n\
         2002,1,12,2,101,102\n\
         2002,2,10,1,#N/A,\n\
         1970,1,10,1,500,\n",
    )
    .unwrap();
    path
}

fn config(dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.survey.path = Some(write_survey(dir));
    config.survey.min_year = Some(1974);
    config.cache.dir = dir.join("cache");
    config.output.dir = dir.join("out");
    config
}

#[test]
fn offline_pipeline_writes_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let cache = seed_cache(&config.cache.dir);
    let opts = LoadOptions {
        offline: true,
        force: false,
    };

    let report = run_pipeline(&config, &cache, None, None, &opts).unwrap();

    assert_eq!(report.manifest.survey.filtered_out, 1);
    assert_eq!(report.manifest.sources["GDPC1"], DataSource::Cache);
    assert_eq!(report.manifest.sources["GNPC96"], DataSource::Unavailable);
    assert_eq!(report.manifest.summary.computed, 1);

    let run_dir = save_artifacts(&report, &config.output.dir).unwrap();
    let enriched = std::fs::read_to_string(run_dir.join("spf_rgdpl.csv")).unwrap();
    assert_eq!(
        enriched,
        "YEAR,QUARTER,ID,RGDP1,RGDPL\n\
         2002,1,10,100,91.5\n\
         2002,1,11,100,91.5\n\
         2002,1,12,101,91.5\n\
         2002,2,10,,0\n"
    );

    let rounds = std::fs::read_to_string(run_dir.join("rounds.csv")).unwrap();
    let mut lines = rounds.lines().skip(1);
    assert_eq!(
        lines.next(),
        Some("2002Q1,3,100,2001Q4,GDPC1,2002-01-15,100,91.5,4,computed")
    );
    assert_eq!(lines.next(), Some("2002Q2,,,,,,,,,no_responses"));

    let manifest = load_manifest(&run_dir).unwrap();
    assert_eq!(manifest.dataset_hash, report.manifest.dataset_hash);
    assert_eq!(manifest.config, config);
}

#[test]
fn offline_without_cache_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let cache = ParquetCache::new(&config.cache.dir);
    let opts = LoadOptions {
        offline: true,
        force: false,
    };

    assert!(matches!(
        run_pipeline(&config, &cache, None, None, &opts),
        Err(RunError::Data(_))
    ));
}

#[test]
fn shock_extraction_from_configured_panel() {
    let dir = tempfile::tempdir().unwrap();
    let panel = dir.path().join("sep.csv");
    let mut csv = String::from("date,DFFR,UNRATEMD0,UNRATEMD1,FEDTARMDLR\n");
    for (i, year) in (2015..=2019).enumerate() {
        for (j, month) in [3, 6, 9, 12].iter().enumerate() {
            let t = (i * 4 + j) as f64;
            csv.push_str(&format!(
                "{year}-{month:02}-01,{},{},{},{}\n",
                0.25 * ((i + j) % 3) as f64,
                5.0 - 0.05 * t + 0.1 * (j % 2) as f64,
                4.9 - 0.03 * t,
                0.5 + 0.25 * (t % 3.0),
            ));
        }
    }
    std::fs::write(&panel, csv).unwrap();

    let mut config = PipelineConfig::default();
    config.shocks.panel = Some(panel);
    config.shocks.output = dir.path().join("out/shocks.csv");

    let extraction = run_shock_extraction(&config).unwrap();
    // 2015-09 .. 2019-12 = 18 rows, plus four 2020 placeholders.
    assert_eq!(extraction.shocks.len(), 22);

    save_shocks(&extraction.shocks, &config.shocks.output).unwrap();
    let written = std::fs::read_to_string(&config.shocks.output).unwrap();
    assert!(written.starts_with("date,residuals\n2015-09-01,"));
    assert!(written.ends_with("2020-12-01,0.0\n"));
}
