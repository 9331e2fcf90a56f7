use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "combtempo", about = "Multi-band comb-filter tempo estimator")]
pub struct Cli {
    /// Input audio files (WAV, MP3, FLAC, OGG, AAC)
    pub inputs: Vec<PathBuf>,

    /// Directory for per-file JSON reports
    #[arg(short, long, default_value = "results")]
    pub output: PathBuf,

    /// Config file (defaults to combtempo.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Butterworth band-pass order
    #[arg(long, default_value_t = 5)]
    pub order: usize,

    /// Envelope smoothing window in seconds
    #[arg(long, default_value_t = 0.4)]
    pub window: f64,

    /// Impulses per comb filter
    #[arg(long, default_value_t = 3)]
    pub impulses: usize,

    /// Lowest candidate tempo (BPM)
    #[arg(long, default_value_t = 60.0)]
    pub min_bpm: f64,

    /// Highest candidate tempo (BPM)
    #[arg(long, default_value_t = 179.0)]
    pub max_bpm: f64,

    /// Tempo search step (BPM)
    #[arg(long, default_value_t = 1.0)]
    pub step: f64,

    /// Skip writing JSON reports
    #[arg(long)]
    pub no_report: bool,
}
