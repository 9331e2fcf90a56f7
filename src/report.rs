use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::audio::decode::Waveform;
use crate::tempo::TempoAnalysis;

/// Serializable summary of one analyzed file.
#[derive(Debug, Serialize)]
pub struct TempoReport {
    pub input: String,
    pub sample_rate: u32,
    pub duration_seconds: f64,
    pub tempos: Vec<f64>,
    pub bands: Vec<BandReport>,
    pub total_energy: Vec<f64>,
    pub fundamental_tempo: f64,
}

#[derive(Debug, Serialize)]
pub struct BandReport {
    pub low_hz: f64,
    pub high_hz: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TempoReport {
    pub fn new(input: &Path, waveform: &Waveform, analysis: &TempoAnalysis) -> Self {
        let bands = analysis
            .bands
            .iter()
            .map(|result| BandReport {
                low_hz: result.band.low_hz,
                high_hz: result.band.high_hz,
                energy: result.outcome.as_ref().ok().cloned(),
                error: result.outcome.as_ref().err().map(|e| e.to_string()),
            })
            .collect();

        Self {
            input: input.display().to_string(),
            sample_rate: waveform.sample_rate,
            duration_seconds: waveform.duration(),
            tempos: analysis.bpms.clone(),
            bands,
            total_energy: analysis.total_energy().to_vec(),
            fundamental_tempo: analysis.fundamental_bpm(),
        }
    }
}

/// File stem with everything outside `[A-Za-z0-9_-]` replaced by `_`.
pub fn safe_basename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned
    }
}

/// Writes `<safe_basename>_tempo.json` into `results_dir`, returning its absolute path.
pub fn save_report(report: &TempoReport, results_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(results_dir)
        .with_context(|| format!("Failed to create results directory: {}", results_dir.display()))?;

    let path = results_dir.join(format!(
        "{}_tempo.json",
        safe_basename(Path::new(&report.input))
    ));
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;

    let absolute = path.canonicalize().unwrap_or(path);
    log::debug!("Report written to {}", absolute.display());
    Ok(absolute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::tempo::bands::Band;

    #[test]
    fn basename_is_sanitized() {
        assert_eq!(safe_basename(Path::new("/music/My Song (live).mp3")), "My_Song__live_");
        assert_eq!(safe_basename(Path::new("track-01_final.flac")), "track-01_final");
        assert_eq!(safe_basename(Path::new("/")), "untitled");
    }

    #[test]
    fn report_round_trips_through_json() {
        let waveform = Waveform {
            samples: vec![0.0; 4000],
            sample_rate: 8000,
        };
        let config = AnalysisConfig {
            bands: Some(vec![
                Band { low_hz: 200.0, high_hz: 400.0 },
                Band { low_hz: 3200.0, high_hz: 4000.0 },
            ]),
            min_bpm: 100.0,
            max_bpm: 110.0,
            ..AnalysisConfig::default()
        };
        let analysis = crate::tempo::analyze(&waveform, &config).unwrap();
        let report = TempoReport::new(Path::new("/in/silence test.wav"), &waveform, &analysis);

        let dir = std::env::temp_dir().join("combtempo_report_test");
        let path = save_report(&report, &dir).unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("silence_test_tempo.json"));

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(value["fundamental_tempo"], 100.0);
        assert_eq!(value["tempos"].as_array().unwrap().len(), 11);
        assert_eq!(value["bands"][0]["energy"].as_array().unwrap().len(), 11);
        assert!(value["bands"][1]["error"].is_string());
        assert!(value["bands"][1].get("energy").is_none());
        assert_eq!(value["duration_seconds"], 0.5);
    }
}
