//! VintageLab CLI: fetch, reconcile, shocks and cache commands.
//!
//! Commands:
//! - `fetch`: download revision histories from FRED/ALFRED into the Parquet cache
//! - `reconcile`: attach the real-time prior-year aggregate (`RGDPL`) to a survey table
//! - `shocks`: extract monetary policy shocks from an SEP projection panel
//! - `cache status`: report what is cached per series

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use vintagelab_core::data::{
    CircuitBreaker, FredProvider, LogProgress, ParquetCache, RevisionProvider,
};
use vintagelab_core::vintage::YearBasis;
use vintagelab_runner::config::API_KEY_ENV;
use vintagelab_runner::{
    refresh_cache, run_pipeline, run_shock_extraction, save_artifacts, save_shocks, LoadOptions,
    PipelineConfig,
};

#[derive(Parser)]
#[command(
    name = "vintagelab",
    about = "VintageLab CLI: real-time vintage reconciliation for survey forecasts"
)]
struct Cli {
    /// Pipeline config (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download full revision histories and cache them as Parquet.
    Fetch {
        /// Series to fetch. Defaults to the configured legacy and current indicators.
        series: Vec<String>,

        /// Cache directory (overrides [cache].dir).
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Reconcile a survey table against the revision histories.
    Reconcile {
        /// Survey CSV with YEAR, QUARTER, ID, RGDP1 columns (overrides [survey].path).
        #[arg(long)]
        survey: Option<PathBuf>,

        /// Drop rounds before this year.
        #[arg(long)]
        min_year: Option<i32>,

        /// Match tolerance between the modal forecast and a vintage.
        #[arg(long)]
        tolerance: Option<f64>,

        /// Anchor the regime and prior year on the round's own year.
        #[arg(long, default_value_t = false)]
        round_year: bool,

        /// Offline mode: use the cache only.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Re-fetch every series even if cached.
        #[arg(long, default_value_t = false)]
        force: bool,

        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Output directory for artifacts.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Extract monetary policy shocks from an SEP projection panel.
    Shocks {
        /// Panel CSV (overrides [shocks].panel).
        #[arg(long)]
        panel: Option<PathBuf>,

        /// Output CSV (overrides [shocks].output).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached series, observation counts and latest publication dates.
    Status {
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Fetch { series, cache_dir } => {
            if let Some(dir) = cache_dir {
                config.cache.dir = dir;
            }
            run_fetch(&config, series)
        }
        Commands::Reconcile {
            survey,
            min_year,
            tolerance,
            round_year,
            offline,
            force,
            cache_dir,
            output_dir,
        } => {
            if let Some(path) = survey {
                config.survey.path = Some(path);
            }
            if min_year.is_some() {
                config.survey.min_year = min_year;
            }
            if let Some(t) = tolerance {
                config.resolver.tolerance = t;
            }
            if round_year {
                config.resolver.year_basis = YearBasis::Round;
            }
            if let Some(dir) = cache_dir {
                config.cache.dir = dir;
            }
            if let Some(dir) = output_dir {
                config.output.dir = dir;
            }
            config.validate()?;
            run_reconcile_cmd(&config, LoadOptions { offline, force })
        }
        Commands::Shocks { panel, output } => {
            if let Some(path) = panel {
                config.shocks.panel = Some(path);
            }
            if let Some(path) = output {
                config.shocks.output = path;
            }
            run_shocks_cmd(&config)
        }
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => {
                if let Some(dir) = cache_dir {
                    config.cache.dir = dir;
                }
                run_cache_status(&config)
            }
        },
    }
}

/// FRED provider from config, or `None` when no API key is available.
fn build_provider(config: &PipelineConfig) -> Result<Option<FredProvider>> {
    let Some(api_key) = config.fred.resolve_api_key() else {
        return Ok(None);
    };
    let breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = FredProvider::new(config.fred.settings(api_key), breaker)?;
    Ok(Some(provider))
}

fn run_fetch(config: &PipelineConfig, series: Vec<String>) -> Result<()> {
    let Some(provider) = build_provider(config)? else {
        bail!("no FRED API key: set {API_KEY_ENV} or [fred].api_key");
    };
    let series: Vec<String> = if series.is_empty() {
        config
            .indicators
            .series_ids()
            .iter()
            .map(|s| s.to_string())
            .collect()
    } else {
        series
    };
    let ids: Vec<&str> = series.iter().map(String::as_str).collect();
    let cache = ParquetCache::new(&config.cache.dir);

    let results = refresh_cache(&ids, &cache, &provider, Some(&LogProgress));

    let mut failed = 0;
    for (series_id, result) in &results {
        match result {
            Ok(meta) => println!(
                "{series_id}: {} observations, {} to {}, latest publication {}",
                meta.observation_count, meta.first_period, meta.last_period, meta.latest_publication
            ),
            Err(e) => {
                eprintln!("Error for {series_id}: {e}");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} series failed to fetch", results.len());
    }
    Ok(())
}

fn run_reconcile_cmd(config: &PipelineConfig, opts: LoadOptions) -> Result<()> {
    let cache = ParquetCache::new(&config.cache.dir);
    let provider = if opts.offline {
        None
    } else {
        let provider = build_provider(config)?;
        if provider.is_none() {
            warn!("no FRED API key ({API_KEY_ENV}); using cached histories only");
        }
        provider
    };

    let report = run_pipeline(
        config,
        &cache,
        provider.as_ref().map(|p| p as &dyn RevisionProvider),
        Some(&LogProgress),
        &opts,
    )?;
    let run_dir = save_artifacts(&report, &config.output.dir)?;

    let summary = &report.manifest.summary;
    println!("Rounds:    {}", summary.rounds);
    println!("Computed:  {}", summary.computed);
    for (reason, count) in &summary.skipped {
        println!("Skipped:   {count} ({})", reason.as_str());
    }
    println!(
        "Responses: {} ({} enriched)",
        summary.responses, summary.responses_enriched
    );
    println!("Dataset:   {}", report.manifest.dataset_hash);
    println!("Artifacts: {}", run_dir.display());
    Ok(())
}

fn run_shocks_cmd(config: &PipelineConfig) -> Result<()> {
    let extraction = run_shock_extraction(config)?;
    save_shocks(&extraction.shocks, &config.shocks.output)?;

    let dropped = extraction.dropped_regressors();
    if !dropped.is_empty() {
        warn!(regressors = ?dropped, "collinear regressors dropped");
    }
    println!(
        "Shocks: {} rows ({} regressors, intercept {:.4})",
        extraction.shocks.len(),
        extraction.regressors.len(),
        extraction.fit.intercept
    );
    println!("Written: {}", config.shocks.output.display());
    Ok(())
}

fn run_cache_status(config: &PipelineConfig) -> Result<()> {
    let cache_dir: &Path = &config.cache.dir;
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }
    let cache = ParquetCache::new(cache_dir);

    let mut series = cache.cached_series();
    for id in config.indicators.series_ids() {
        if !series.iter().any(|s| s == id) {
            series.push(id.to_string());
        }
    }
    series.sort();
    let ids: Vec<&str> = series.iter().map(String::as_str).collect();

    println!("Cache: {}", cache_dir.display());
    println!();
    println!(
        "{:<10} {:<8} {:>12} {:<20} {:<20}",
        "Series", "Cached", "Observations", "Latest publication", "Cached at"
    );
    println!("{}", "-".repeat(74));
    for status in cache.status(&ids) {
        println!(
            "{:<10} {:<8} {:>12} {:<20} {:<20}",
            status.series_id,
            if status.cached { "yes" } else { "no" },
            status
                .observation_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".into()),
            status.latest_publication.as_deref().unwrap_or("-"),
            status
                .cached_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".into()),
        );
    }
    Ok(())
}
