//! Scheirer-style multi-band tempo estimation.
//!
//! Stages, per band: band-pass filtering, envelope extraction, onset
//! emphasis (diff-rect) and comb-filter tempo energy. The per-band energy
//! curves are then summed and the tempo of maximum total energy is the
//! fundamental tempo. A band that fails contributes an all-zero curve.

pub mod aggregate;
pub mod bands;
pub mod comb;
pub mod envelope;
pub mod error;
pub mod fft;
pub mod filterbank;
pub mod onset;
#[cfg(test)]
pub(crate) mod test_signals;

use rayon::prelude::*;

use crate::audio::decode::Waveform;
use crate::config::AnalysisConfig;
use aggregate::{aggregate, Aggregate};
use bands::{scheirer_bands, Band};
use comb::CombAnalyzer;
use envelope::envelope;
use error::{AnalysisError, Result};
use filterbank::{BandFilter, Filterbank};
use onset::diff_rect;

/// Outcome of one band: its energy curve, or why it could not be computed.
#[derive(Clone, Debug)]
pub struct BandResult {
    pub band: Band,
    pub outcome: Result<Vec<f64>>,
}

impl BandResult {
    pub fn energy_curve(&self) -> Option<&[f64]> {
        self.outcome.as_deref().ok()
    }
}

/// Everything the pipeline produces for one waveform.
#[derive(Clone, Debug)]
pub struct TempoAnalysis {
    pub bpms: Vec<f64>,
    pub bands: Vec<BandResult>,
    pub aggregate: Aggregate,
}

impl TempoAnalysis {
    pub fn fundamental_bpm(&self) -> f64 {
        self.aggregate.fundamental_bpm
    }

    pub fn total_energy(&self) -> &[f64] {
        &self.aggregate.total_energy
    }

    pub fn failed_bands(&self) -> impl Iterator<Item = &BandResult> {
        self.bands.iter().filter(|b| b.outcome.is_err())
    }
}

/// A validated pipeline for one sample rate.
#[derive(Debug)]
pub struct TempoAnalyzer {
    sample_rate: u32,
    window_length: f64,
    num_impulses: usize,
    bpms: Vec<f64>,
    filterbank: Filterbank,
}

impl TempoAnalyzer {
    /// Checks the whole configuration before any signal is touched.
    pub fn new(config: &AnalysisConfig, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidConfig(
                "sample rate must be positive".to_string(),
            ));
        }
        config.validate()?;
        let bpms = config.tempo_range().bpms();
        if bpms.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "tempo range must not be empty".to_string(),
            ));
        }

        let bands = config
            .bands
            .clone()
            .unwrap_or_else(|| scheirer_bands(sample_rate));
        let filterbank = Filterbank::new(&bands, sample_rate, config.filter_order)?;

        Ok(Self {
            sample_rate,
            window_length: config.window_length,
            num_impulses: config.num_impulses,
            bpms,
            filterbank,
        })
    }

    pub fn analyze(&self, waveform: &Waveform) -> Result<TempoAnalysis> {
        if waveform.sample_rate != self.sample_rate {
            return Err(AnalysisError::InvalidInput(format!(
                "waveform is {} Hz, analyzer was configured for {} Hz",
                waveform.sample_rate, self.sample_rate
            )));
        }

        let comb = CombAnalyzer::new(
            self.sample_rate,
            &self.bpms,
            self.num_impulses,
            waveform.samples.len(),
        )?;

        log::info!(
            "Analyzing {} bands over {} tempos ({:.0}-{:.0} BPM), transform length {}",
            self.filterbank.filters().len(),
            self.bpms.len(),
            self.bpms.first().copied().unwrap_or_default(),
            self.bpms.last().copied().unwrap_or_default(),
            comb.transform_len(),
        );

        let bands: Vec<BandResult> = self
            .filterbank
            .filters()
            .par_iter()
            .map(|filter| BandResult {
                band: filter.band,
                outcome: self.analyze_band(filter, &waveform.samples, &comb),
            })
            .collect();

        for result in &bands {
            if let Some(curve) = result.energy_curve() {
                log::debug!(
                    "Band {}: peak energy {:.4e}",
                    result.band,
                    curve.iter().copied().fold(0.0f64, f64::max)
                );
            }
        }

        let curves: Vec<Option<&[f64]>> = bands.iter().map(BandResult::energy_curve).collect();
        let aggregate = aggregate(&curves, &self.bpms)?;

        log::info!(
            "Fundamental tempo {:.1} BPM ({} of {} bands contributed)",
            aggregate.fundamental_bpm,
            curves.iter().filter(|c| c.is_some()).count(),
            curves.len()
        );

        Ok(TempoAnalysis {
            bpms: self.bpms.clone(),
            bands,
            aggregate,
        })
    }

    fn analyze_band(
        &self,
        filter: &BandFilter,
        samples: &[f32],
        comb: &CombAnalyzer,
    ) -> Result<Vec<f64>> {
        let sub_band = filter.apply(samples)?;
        let env = envelope(&sub_band, self.sample_rate, self.window_length)?;
        drop(sub_band);
        let onset = diff_rect(&env, self.sample_rate);
        comb.energy_curve(&onset)
    }
}

/// Runs the full pipeline on `waveform` with `config`.
pub fn analyze(waveform: &Waveform, config: &AnalysisConfig) -> Result<TempoAnalysis> {
    TempoAnalyzer::new(config, waveform.sample_rate)?.analyze(waveform)
}
