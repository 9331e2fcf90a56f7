use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::tempo::bands::Band;
use crate::tempo::comb::TempoRange;
use crate::tempo::error::AnalysisError;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub input: InputConfig,
}

/// Parameters of the tempo pipeline.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AnalysisConfig {
    /// Frequency bands; `None` selects the Scheirer bands for the sample rate.
    #[serde(default)]
    pub bands: Option<Vec<Band>>,
    #[serde(default = "default_filter_order")]
    pub filter_order: usize,
    /// Envelope smoothing window in seconds.
    #[serde(default = "default_window_length")]
    pub window_length: f64,
    #[serde(default = "default_num_impulses")]
    pub num_impulses: usize,
    #[serde(default = "default_min_bpm")]
    pub min_bpm: f64,
    #[serde(default = "default_max_bpm")]
    pub max_bpm: f64,
    #[serde(default = "default_step_bpm")]
    pub step_bpm: f64,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default = "default_write_report")]
    pub write_report: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct InputConfig {
    /// Files analyzed when none are given on the command line.
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

impl AnalysisConfig {
    /// Checks everything that does not depend on the input's sample rate.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.filter_order == 0 {
            return Err(AnalysisError::InvalidConfig(
                "filter order must be at least 1".to_string(),
            ));
        }
        if !self.window_length.is_finite() || self.window_length < 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "invalid envelope window length: {} s",
                self.window_length
            )));
        }
        if self.num_impulses == 0 {
            return Err(AnalysisError::InvalidConfig(
                "comb filter needs at least one impulse".to_string(),
            ));
        }
        TempoRange::new(self.min_bpm, self.max_bpm, self.step_bpm)?;
        if let Some(bands) = &self.bands {
            if bands.is_empty() {
                return Err(AnalysisError::InvalidConfig(
                    "at least one band is required".to_string(),
                ));
            }
            for band in bands {
                Band::new(band.low_hz, band.high_hz)?;
            }
        }
        Ok(())
    }

    pub fn tempo_range(&self) -> TempoRange {
        TempoRange {
            min_bpm: self.min_bpm,
            max_bpm: self.max_bpm,
            step_bpm: self.step_bpm,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bands: None,
            filter_order: default_filter_order(),
            window_length: default_window_length(),
            num_impulses: default_num_impulses(),
            min_bpm: default_min_bpm(),
            max_bpm: default_max_bpm(),
            step_bpm: default_step_bpm(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            write_report: default_write_report(),
        }
    }
}

pub fn default_filter_order() -> usize { 5 }
pub fn default_window_length() -> f64 { 0.4 }
pub fn default_num_impulses() -> usize { 3 }
pub fn default_min_bpm() -> f64 { 60.0 }
pub fn default_max_bpm() -> f64 { 179.0 }
pub fn default_step_bpm() -> f64 { 1.0 }
pub fn default_results_dir() -> PathBuf { PathBuf::from("results") }
fn default_write_report() -> bool { true }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

/// `combtempo.toml` in the working directory, then the user config locations.
pub fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from("combtempo.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("combtempo").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("combtempo").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.analysis, AnalysisConfig::default());
        assert_eq!(config.analysis.filter_order, 5);
        assert_eq!(config.analysis.window_length, 0.4);
        assert_eq!(config.analysis.num_impulses, 3);
        assert_eq!(config.analysis.tempo_range(), TempoRange::default());
        assert_eq!(config.output.results_dir, PathBuf::from("results"));
        assert!(config.output.write_report);
        assert!(config.input.files.is_empty());
    }

    #[test]
    fn validation_catches_bad_values() {
        assert!(AnalysisConfig::default().validate().is_ok());
        let cases = [
            AnalysisConfig { filter_order: 0, ..AnalysisConfig::default() },
            AnalysisConfig { window_length: f64::NAN, ..AnalysisConfig::default() },
            AnalysisConfig { num_impulses: 0, ..AnalysisConfig::default() },
            AnalysisConfig { min_bpm: 200.0, ..AnalysisConfig::default() },
            AnalysisConfig { max_bpm: 1e30, ..AnalysisConfig::default() },
            AnalysisConfig { step_bpm: 1e-9, ..AnalysisConfig::default() },
            AnalysisConfig { bands: Some(Vec::new()), ..AnalysisConfig::default() },
            AnalysisConfig {
                bands: Some(vec![Band { low_hz: 500.0, high_hz: 100.0 }]),
                ..AnalysisConfig::default()
            },
        ];
        for config in cases {
            assert!(matches!(config.validate(), Err(AnalysisError::InvalidConfig(_))));
        }
    }

    #[test]
    fn parses_bands_and_overrides() {
        let config: Config = toml::from_str(
            r#"
            [analysis]
            filter_order = 4
            min_bpm = 90
            max_bpm = 150.0
            bands = [
                { low_hz = 1.0, high_hz = 200.0 },
                { low_hz = 200.0, high_hz = 400.0 },
            ]

            [output]
            results_dir = "/tmp/tempo"

            [input]
            files = ["a.mp3", "b.flac"]
            "#,
        )
        .unwrap();
        assert_eq!(config.analysis.filter_order, 4);
        assert_eq!(config.analysis.min_bpm, 90.0);
        assert_eq!(config.analysis.step_bpm, 1.0);
        assert_eq!(config.analysis.bands.as_ref().unwrap().len(), 2);
        assert_eq!(config.output.results_dir, PathBuf::from("/tmp/tempo"));
        assert_eq!(config.input.files.len(), 2);
    }
}
