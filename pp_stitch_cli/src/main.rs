use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use pp_stitch::{
    build_timeseries, discover, finalize_segment, input_timeseries_dir, merge_cycles,
    output_segment_dir, plan_windows, segment_filename, slice_window, CycleConfig, DatasetStore,
    Frequency, StitchError,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod fetch;
mod netcdf_store;

use netcdf_store::NetcdfStore;

/// Stitch repeated-cycle post-processed timeseries into one continuous
/// record, then split it into fixed-length output files.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Variable name (e.g. thetao)
    #[arg(short, long)]
    variable: String,

    /// Post-processing stream name (e.g. ocean_annual)
    #[arg(short, long)]
    stream: String,

    /// Output pp directory root
    #[arg(short = 'o', long = "output-directory")]
    output_directory: PathBuf,

    /// Number of years in each output file (e.g. 20)
    #[arg(short = 'y', long = "window-years")]
    window_years: u32,

    /// Override for the stream-derived frequency (annual|monthly|daily)
    #[arg(short = 'f', long = "frequency-override")]
    frequency_override: Option<String>,

    /// Cycle configuration JSON: ordered list of {path, years, lead_gap}
    #[arg(short = 'c', long)]
    cycles: PathBuf,

    /// Keep only discovered files whose path contains this substring
    #[arg(long)]
    pattern: Option<String>,

    /// Archive staging command invoked per directory of selected files
    #[arg(long, default_value = "dmget")]
    fetch_command: String,

    /// Skip archive staging (files are already online)
    #[arg(long, action = ArgAction::SetTrue)]
    no_fetch: bool,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let frequency = Frequency::resolve(&cli.stream, cli.frequency_override.as_deref())?;
    info!("stream {} resolved to {} frequency", cli.stream, frequency);

    let config_text = fs::read_to_string(&cli.cycles)
        .with_context(|| format!("failed to read {}", cli.cycles.display()))?;
    let config = CycleConfig::from_json(&config_text)?;

    let store = NetcdfStore;
    let mut datasets = Vec::with_capacity(config.cycles.len());
    for (index, cycle) in config.cycles.iter().enumerate() {
        let dir = input_timeseries_dir(&cycle.path, &cli.stream, frequency);
        let slices = discover(&dir, &cli.variable, cli.pattern.as_deref())?;
        let selected = build_timeseries(slices);
        if selected.is_empty() {
            return Err(StitchError::EmptySelection {
                variable: cli.variable.clone(),
                dir,
            }
            .into());
        }
        debug!(
            "cycle {}: {} files selected under {}",
            index + 1,
            selected.len(),
            dir.display()
        );

        let paths: Vec<PathBuf> = selected.into_iter().map(|s| s.path).collect();
        if cli.no_fetch {
            debug!("cycle {}: skipping staging", index + 1);
        } else {
            info!(
                "cycle {}: fetching {} files for {} in {}...",
                index + 1,
                paths.len(),
                cli.variable,
                cli.stream
            );
            fetch::stage_files(&cli.fetch_command, &paths)?;
            info!("fetch done");
        }
        datasets.push(store.open_concat(&paths)?);
    }

    let stitched = merge_cycles(datasets, Some(config.gaps()))?;
    let decoded = stitched.time.decode();
    let first_year = decoded
        .first()
        .map(|t| chrono::Datelike::year(t))
        .ok_or(StitchError::EmptyTimeAxis)?;
    info!(
        "stitched record: {} samples starting in year {}",
        stitched.len(),
        first_year
    );

    let windows = plan_windows(
        first_year,
        &config.years(),
        &config.lead_gaps(),
        cli.window_years,
    )?;

    let out_dir = output_segment_dir(
        &cli.output_directory,
        &cli.stream,
        frequency,
        cli.window_years,
    );
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    for window in &windows {
        info!(
            "extracting time period {} - {}",
            window.start_year, window.end_year
        );
        let mut segment = slice_window(&stitched, window)?;
        let times = segment.time.decode();
        let (first, last) = match (times.first(), times.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(StitchError::EmptyTimeAxis.into()),
        };
        let filename = segment_filename(&cli.stream, &cli.variable, frequency, first, last);
        finalize_segment(&mut segment, &filename);

        // Write to a scratch name first so an interrupted run never leaves a
        // half-written file at the final path.
        let final_path = out_dir.join(&filename);
        let tmp_path = out_dir.join(format!("{}.tmp", filename));
        info!("writing into file {}", final_path.display());
        store.write(&segment, &tmp_path)?;
        fs::rename(&tmp_path, &final_path)
            .with_context(|| format!("failed to move {} into place", tmp_path.display()))?;
    }

    info!("wrote {} files under {}", windows.len(), out_dir.display());
    Ok(())
}
