mod cli;
mod config;
mod audio;
mod report;
mod tempo;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use cli::Cli;
use config::{AnalysisConfig, Config};
use report::TempoReport;
use tempo::TempoAnalyzer;

struct OutputOptions {
    results_dir: PathBuf,
    write_report: bool,
}

/// Inputs and pipeline settings after merging the CLI with the config file.
struct Settings {
    inputs: Vec<PathBuf>,
    analysis: AnalysisConfig,
    output: OutputOptions,
}

/// Per-file outcomes of one batch run.
#[derive(Debug, Default)]
struct BatchSummary {
    analyzed: Vec<(PathBuf, f64)>,
    failures: Vec<(PathBuf, anyhow::Error)>,
}

impl BatchSummary {
    fn total(&self) -> usize {
        self.analyzed.len() + self.failures.len()
    }

    fn log(&self) {
        log::info!("Analyzed {} of {} file(s)", self.analyzed.len(), self.total());
        if !self.failures.is_empty() {
            log::warn!("{} file(s) failed:", self.failures.len());
            for (path, err) in &self.failures {
                log::warn!("  {}: {:#}", path.display(), err);
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect combtempo.toml / user config
    let config_path = cli.config.clone().or_else(config::find_config);
    let mut file_config = Config::default();
    if let Some(ref path) = config_path {
        if let Some(cfg) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            file_config = cfg;
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    let settings = merge_settings(cli, file_config);
    settings
        .analysis
        .validate()
        .context("Invalid analysis configuration")?;

    if settings.inputs.is_empty() {
        anyhow::bail!("No input files given (pass them as arguments or list them under [input] files)");
    }

    let analysis_config = &settings.analysis;
    log::info!("combtempo - multi-band comb-filter tempo estimation");
    log::info!(
        "Filter order {}, envelope window {}s, {} impulses, tempos {}-{} BPM step {}",
        analysis_config.filter_order,
        analysis_config.window_length,
        analysis_config.num_impulses,
        analysis_config.min_bpm,
        analysis_config.max_bpm,
        analysis_config.step_bpm
    );

    let pb = ProgressBar::new(settings.inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files {msg}")?
            .progress_chars("=>-"),
    );

    let summary = run_batch(&settings.inputs, analysis_config, &settings.output, &pb);
    pb.finish_and_clear();

    summary.log();
    if summary.analyzed.is_empty() {
        anyhow::bail!("No file could be analyzed");
    }
    Ok(())
}

/// Config values apply only where the CLI is still at its default.
fn merge_settings(mut cli: Cli, file_config: Config) -> Settings {
    let cfg = file_config.analysis;
    if cli.order == config::default_filter_order() { cli.order = cfg.filter_order; }
    if cli.window == config::default_window_length() { cli.window = cfg.window_length; }
    if cli.impulses == config::default_num_impulses() { cli.impulses = cfg.num_impulses; }
    if cli.min_bpm == config::default_min_bpm() { cli.min_bpm = cfg.min_bpm; }
    if cli.max_bpm == config::default_max_bpm() { cli.max_bpm = cfg.max_bpm; }
    if cli.step == config::default_step_bpm() { cli.step = cfg.step_bpm; }
    if cli.output == config::default_results_dir() {
        cli.output = file_config.output.results_dir;
    }
    if cli.inputs.is_empty() {
        cli.inputs = file_config.input.files;
    }

    Settings {
        inputs: cli.inputs,
        analysis: AnalysisConfig {
            bands: cfg.bands,
            filter_order: cli.order,
            window_length: cli.window,
            num_impulses: cli.impulses,
            min_bpm: cli.min_bpm,
            max_bpm: cli.max_bpm,
            step_bpm: cli.step,
        },
        output: OutputOptions {
            results_dir: cli.output,
            write_report: file_config.output.write_report && !cli.no_report,
        },
    }
}

/// Analyzes every input in order; a failing file is recorded and skipped.
fn run_batch(
    inputs: &[PathBuf],
    config: &AnalysisConfig,
    output: &OutputOptions,
    pb: &ProgressBar,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for input in inputs {
        pb.set_message(input.display().to_string());
        match process_file(input, config, output, pb) {
            Ok(bpm) => summary.analyzed.push((input.clone(), bpm)),
            Err(err) => {
                log::error!("Failed to analyze {}: {:#}", input.display(), err);
                summary.failures.push((input.clone(), err));
            }
        }
        pb.inc(1);
    }
    summary
}

/// Runs the pipeline on one file and returns its fundamental tempo.
fn process_file(
    input: &Path,
    config: &AnalysisConfig,
    output: &OutputOptions,
    pb: &ProgressBar,
) -> Result<f64> {
    log::info!("Processing file: {}", input.display());

    // 1. Decode audio
    let waveform = audio::decode::decode_audio(input)?;

    // 2. Build the pipeline for this file's sample rate
    let analyzer = TempoAnalyzer::new(config, waveform.sample_rate)
        .with_context(|| format!("Invalid configuration for {} Hz audio", waveform.sample_rate))?;

    // 3. Analyze
    let analysis = analyzer.analyze(&waveform)?;
    for failed in analysis.failed_bands() {
        if let Err(ref err) = failed.outcome {
            log::warn!("{}: band {} contributed no energy: {}", input.display(), failed.band, err);
        }
    }

    let bpm = analysis.fundamental_bpm();
    pb.suspend(|| println!("Fundamental Tempo: {} BPM", bpm));

    // 4. Report
    if output.write_report {
        let report = TempoReport::new(input, &waveform, &analysis);
        let path = report::save_report(&report, &output.results_dir)?;
        pb.suspend(|| println!("SAVED: {}", path.display()));
    }

    Ok(bpm)
}
