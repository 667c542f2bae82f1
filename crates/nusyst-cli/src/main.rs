//! nusyst CLI

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use nusyst_calc::{SystematicsConfig, read_config};
use nusyst_core::DiagnosticSink;
use nusyst_io::{EventSummary, ParquetDiagnosticSink, ParquetEventSource, ResponseWriter};

#[derive(Parser)]
#[command(name = "nusyst")]
#[command(about = "nusyst - systematic-response weights for neutrino interaction events")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every configured parameter for each event
    Weights {
        /// Systematics configuration (YAML, or JSON by extension)
        #[arg(short, long)]
        config: PathBuf,

        /// Input event table (Parquet)
        #[arg(short, long)]
        input: PathBuf,

        /// Output response table (Parquet)
        #[arg(short, long)]
        output: PathBuf,

        /// Also write the parameter metadata table here (Parquet)
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Maximum number of events to process, counted after the skipped
        /// ones (rows skip..skip+N)
        #[arg(short = 'N', long = "max-events")]
        max_events: Option<usize>,

        /// Number of leading events to skip
        #[arg(short, long, default_value = "0")]
        skip: usize,

        /// Installation data root for relative histogram paths
        #[arg(long)]
        data_root: Option<PathBuf>,
    },

    /// Print the configured parameters (pretty JSON)
    Params {
        /// Systematics configuration (YAML, or JSON by extension)
        #[arg(short, long)]
        config: PathBuf,

        /// Output file. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Weights { config, input, output, metadata, max_events, skip, data_root } => {
            cmd_weights(
                &config,
                &input,
                &output,
                metadata.as_ref(),
                max_events,
                skip,
                data_root.as_deref(),
            )
        }
        Commands::Params { config, output } => cmd_params(&config, output.as_ref()),
    }
}

fn load_config(path: &Path) -> Result<SystematicsConfig> {
    tracing::info!(path = %path.display(), "loading systematics configuration");
    let cfg = read_config(path)
        .with_context(|| format!("failed to read configuration {}", path.display()))?;
    if cfg.providers.is_empty() {
        bail!("configuration {} defines no providers", path.display());
    }
    Ok(cfg)
}

/// Number of events to process: everything after `skip`, capped by `max_events`.
fn events_to_process(n_events: usize, skip: usize, max_events: Option<usize>) -> Result<usize> {
    if skip >= n_events {
        bail!("cannot skip {skip} events: input only has {n_events}");
    }
    let remaining = n_events - skip;
    Ok(max_events.map_or(remaining, |m| m.min(remaining)))
}

fn cmd_weights(
    config: &Path,
    input: &Path,
    output: &Path,
    metadata: Option<&PathBuf>,
    max_events: Option<usize>,
    skip: usize,
    data_root: Option<&Path>,
) -> Result<()> {
    let cfg = load_config(config)?;
    let data_root = cfg.data_root(data_root);

    let mut open_sink = |path: &Path| -> nusyst_core::Result<Box<dyn DiagnosticSink>> {
        Ok(Box::new(ParquetDiagnosticSink::create(path)?))
    };
    let mut aggregator =
        cfg.build(data_root.as_deref(), &mut open_sink).context("failed to set up providers")?;
    let registry = aggregator.registry().clone();
    tracing::info!(
        parameters = registry.len(),
        providers = aggregator.n_providers(),
        "providers configured"
    );

    let source = ParquetEventSource::open_range(input, skip, max_events)
        .with_context(|| format!("failed to open event table {}", input.display()))?;
    let n_events = source.num_rows();
    let n_process = events_to_process(n_events, skip, max_events)?;
    tracing::info!(n_events, skip, n_process, "processing events");

    let mut writer = ResponseWriter::create(output, &registry)
        .with_context(|| format!("failed to create {}", output.display()))?;

    let report_every = (n_process / 20).max(1);
    let first_row = source.first_row();
    for (done, event) in source.enumerate() {
        let i = first_row + done;
        let event = event.with_context(|| format!("failed to read events from row {i}"))?;
        let set = aggregator
            .event_responses_with_central(&event)
            .with_context(|| format!("failed to evaluate event {i}"))?;
        let index = i64::try_from(i).context("event index overflow")?;
        writer.write_event(&EventSummary::from_event(index, &event), &set)?;

        if (done + 1) % report_every == 0 {
            tracing::info!(done = done + 1, total = n_process, "progress");
        }
    }

    aggregator.finish().context("failed to finish providers")?;
    let n_rows = writer.finish()?;
    if n_rows != n_process {
        bail!("expected {n_process} events after row {skip}, read {n_rows}");
    }
    tracing::info!(rows = n_rows, path = %output.display(), "response table written");

    if let Some(path) = metadata {
        nusyst_io::write_metadata(path, &registry)
            .with_context(|| format!("failed to write metadata {}", path.display()))?;
        tracing::info!(path = %path.display(), "metadata table written");
    }
    Ok(())
}

fn cmd_params(config: &Path, output: Option<&PathBuf>) -> Result<()> {
    let cfg = load_config(config)?;
    let registry = cfg.build_registry()?;
    let output_json = serde_json::json!({
        "parameters": registry.headers(),
    });
    write_json(output, output_json)
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
