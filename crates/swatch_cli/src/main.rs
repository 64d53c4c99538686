//! swatchmaker - batch-generate labeled filament swatch models.
//!
//! Reads slicer filament profiles, derives label parameters for each, and
//! drives the external renderer under a bounded-concurrency scheduler.
//! Prints a consolidated report when the batch drains; individual job
//! failures land in the report, not in the exit code.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use tokio::sync::Semaphore;
use tracing_subscriber::EnvFilter;

use swatch_core::config::ConfigManager;
use swatch_core::models::{JobRequest, PrintMode};
use swatch_core::orchestrator::{normalize_limit, JobPipeline, Scheduler};
use swatch_core::presets::{PresetStore, PresetWrites};
use swatch_core::render::OpenScadRenderer;
use swatch_core::report;

/// Batch-generate labeled filament swatch models from slicer filament
/// profiles.
#[derive(Debug, Parser)]
#[command(name = "swatchmaker", version)]
struct Cli {
    /// Print mode: Mono (single labeled model), Manual (separate body and
    /// label for a mid-print filament swap), or MMU (separate models for a
    /// multi-material unit). Case-insensitive.
    #[arg(long, default_value = "MMU")]
    print_mode: PrintMode,

    /// How many renderer processes to run in parallel; zero or negative
    /// uses the number of available processing units.
    #[arg(short = 'l', long, default_value_t = -1)]
    parallel: i64,

    /// Directory to write generated model files to.
    #[arg(short = 'O', long)]
    output_dir: Option<PathBuf>,

    /// Log renderer command lines and scheduling decisions.
    #[arg(short, long)]
    verbose: bool,

    /// Let the renderer write directly to this terminal instead of
    /// capturing its output.
    #[arg(short, long)]
    debug: bool,

    /// Write resolved parameters to the preset store for later tuning.
    #[arg(short = 'w', long)]
    write_presets: bool,

    /// Use hand-tuned entries from the preset store.
    #[arg(short = 'r', long)]
    read_presets: bool,

    /// Configuration file path.
    #[arg(long, default_value = "swatchmaker.toml")]
    config: PathBuf,

    /// Filament descriptor JSON files, one per swatch.
    #[arg(required = true)]
    setting_files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = ConfigManager::new(&cli.config);
    config
        .load_if_present()
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let settings = config.settings().clone();

    let limit = normalize_limit(cli.parallel);
    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.paths.output_folder));
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    let template = PathBuf::from(&settings.renderer.template);
    let renderer = OpenScadRenderer::new(&settings.renderer.program, &template)
        .with_captured_output(!cli.debug);
    let presets = PresetStore::for_template(&template);

    let requests: Vec<JobRequest> = cli
        .setting_files
        .iter()
        .map(|file| {
            JobRequest::new(file.clone(), cli.print_mode)
                .with_presets(cli.read_presets, cli.write_presets)
        })
        .collect();

    tracing::info!(
        "processing {} swatches with up to {} renderer processes",
        requests.len(),
        limit
    );

    let slots = Arc::new(Semaphore::new(limit));
    let pipeline = Arc::new(JobPipeline::new(
        Arc::new(renderer),
        presets.clone(),
        &output_dir,
        slots,
    ));
    let results = Scheduler::new(limit).run(pipeline, requests).await;

    if cli.write_presets {
        let writes = PresetWrites::collect(&results);
        if !writes.is_empty() {
            tracing::info!(
                "writing {} preset entries to {}",
                writes.len(),
                presets.path().display()
            );
            presets.flush(&writes).context("writing preset store")?;
        }
    }

    print!("{}", report::render(&results));
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
