//! Comb-filter tempo energy.
//!
//! For each candidate tempo the onset signal is convolved (conceptually) with
//! a train of `num_impulses` unit impulses spaced one beat period apart, and
//! the energy of that convolution is the tempo's score. The convolution is
//! never formed: by Parseval's theorem
//!
//! ```text
//! sum_n (s * h)[n]^2 = (1/N) * sum_k |S[k]|^2 * |H[k]|^2
//! ```
//!
//! so the onset power spectrum `|S[k]|^2` is computed once per band and each
//! tempo only needs the comb's power response `|H[k]|^2`. For a comb of `M`
//! impulses with period `P` that response has the closed form
//!
//! ```text
//! |H[k]|^2 = M + 2 * sum_{d=1}^{M-1} (M - d) * cos(2*pi*k*d*P / N)
//! ```
//!
//! which is evaluated from a shared cosine table. `N` is long enough that the
//! circular convolution equals the linear one, so energies match the
//! time-domain sum of squares exactly (up to rounding).

use rayon::prelude::*;
use std::f64::consts::PI;

use super::error::{AnalysisError, Result};
use super::fft::{forward_real, next_fast_len};

/// Upper bound on the number of candidate tempos in one range.
pub const MAX_TEMPO_CANDIDATES: usize = 10_000;

/// Slack when deciding whether the last step still lands on `max_bpm`.
const STEP_TOLERANCE: f64 = 1e-9;

/// Candidate tempos `min_bpm, min_bpm + step_bpm, ...` up to `max_bpm` inclusive.
///
/// A step that would overshoot `max_bpm` is not taken.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TempoRange {
    pub min_bpm: f64,
    pub max_bpm: f64,
    pub step_bpm: f64,
}

impl Default for TempoRange {
    fn default() -> Self {
        Self {
            min_bpm: 60.0,
            max_bpm: 179.0,
            step_bpm: 1.0,
        }
    }
}

impl TempoRange {
    pub fn new(min_bpm: f64, max_bpm: f64, step_bpm: f64) -> Result<Self> {
        let range = Self {
            min_bpm,
            max_bpm,
            step_bpm,
        };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        let finite = [self.min_bpm, self.max_bpm, self.step_bpm]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.min_bpm <= 0.0 || self.step_bpm <= 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "invalid tempo range {}-{} BPM step {}",
                self.min_bpm, self.max_bpm, self.step_bpm
            )));
        }
        if self.min_bpm > self.max_bpm {
            return Err(AnalysisError::InvalidConfig(format!(
                "empty tempo range: {} BPM > {} BPM",
                self.min_bpm, self.max_bpm
            )));
        }
        let steps = self.whole_steps();
        if !steps.is_finite() || steps >= MAX_TEMPO_CANDIDATES as f64 {
            return Err(AnalysisError::InvalidConfig(format!(
                "tempo range {}-{} BPM step {} has more than {} candidates",
                self.min_bpm, self.max_bpm, self.step_bpm, MAX_TEMPO_CANDIDATES
            )));
        }
        Ok(())
    }

    /// Number of candidate tempos, or `None` for an invalid range.
    pub fn candidate_count(&self) -> Option<usize> {
        self.validate().ok()?;
        let steps = self.whole_steps();
        Some(steps as usize + 1)
    }

    /// Whole steps from `min_bpm` that stay within `max_bpm`.
    fn whole_steps(&self) -> f64 {
        ((self.max_bpm - self.min_bpm) / self.step_bpm + STEP_TOLERANCE).floor()
    }

    /// The candidate tempos in ascending order, none above `max_bpm`.
    pub fn bpms(&self) -> Vec<f64> {
        let count = self.candidate_count().unwrap_or(0);
        (0..count)
            .map(|i| self.min_bpm + i as f64 * self.step_bpm)
            .collect()
    }
}

/// Beat period in samples for `bpm`, rounded and at least one sample.
pub fn comb_period(sample_rate: u32, bpm: f64) -> usize {
    let period = (sample_rate as f64 * 60.0 / bpm).round();
    if period >= 1.0 {
        period as usize
    } else {
        1
    }
}

/// Time-domain comb: `num_impulses` unit impulses spaced `period` apart.
#[cfg(test)]
pub fn comb_filter(period: usize, num_impulses: usize) -> Vec<f64> {
    if num_impulses == 0 {
        return Vec::new();
    }
    let period = period.max(1);
    let mut filter = vec![0.0; period * (num_impulses - 1) + 1];
    for slot in filter.iter_mut().step_by(period) {
        *slot = 1.0;
    }
    filter
}

/// Scores every candidate tempo against onset signals of a fixed length.
///
/// Built once per waveform and shared read-only by all bands.
#[derive(Debug)]
pub struct CombAnalyzer {
    periods: Vec<usize>,
    num_impulses: usize,
    signal_len: usize,
    transform_len: usize,
    cos_table: Vec<f64>,
}

impl CombAnalyzer {
    pub fn new(
        sample_rate: u32,
        bpms: &[f64],
        num_impulses: usize,
        signal_len: usize,
    ) -> Result<Self> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidConfig(
                "sample rate must be positive".to_string(),
            ));
        }
        if bpms.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "tempo range must not be empty".to_string(),
            ));
        }
        if let Some(bad) = bpms.iter().find(|b| !(b.is_finite() && **b > 0.0)) {
            return Err(AnalysisError::InvalidConfig(format!(
                "invalid candidate tempo: {} BPM",
                bad
            )));
        }
        if num_impulses == 0 {
            return Err(AnalysisError::InvalidConfig(
                "comb filter needs at least one impulse".to_string(),
            ));
        }

        let periods: Vec<usize> = bpms.iter().map(|&b| comb_period(sample_rate, b)).collect();
        let max_period = periods.iter().copied().max().unwrap_or(1);
        // The longest comb spans (M - 1) periods; padding by at least that
        // much keeps every convolution tail from wrapping around.
        let padding = max_period.max((num_impulses - 1) * max_period);
        let transform_len = next_fast_len(signal_len + padding);

        let cos_table = (0..transform_len)
            .map(|j| (2.0 * PI * j as f64 / transform_len as f64).cos())
            .collect();

        log::debug!(
            "Comb periods {}-{} samples for {} tempos",
            periods.iter().min().copied().unwrap_or(1),
            max_period,
            bpms.len()
        );

        Ok(Self {
            periods,
            num_impulses,
            signal_len,
            transform_len,
            cos_table,
        })
    }

    pub fn transform_len(&self) -> usize {
        self.transform_len
    }

    /// Energy of `onset` resonating with each candidate comb, in tempo order.
    pub fn energy_curve(&self, onset: &[f64]) -> Result<Vec<f64>> {
        if onset.len() != self.signal_len {
            return Err(AnalysisError::InvalidInput(format!(
                "onset signal has {} samples, analyzer expects {}",
                onset.len(),
                self.signal_len
            )));
        }

        let power: Vec<f64> = forward_real(onset, self.transform_len)
            .iter()
            .map(|c| c.norm_sqr())
            .collect();

        let scale = 1.0 / self.transform_len as f64;
        let energies: Vec<f64> = self
            .periods
            .par_iter()
            .map(|&period| self.comb_energy(&power, period) * scale)
            .collect();

        if energies.iter().any(|e| !e.is_finite()) {
            return Err(AnalysisError::Numerical(
                "non-finite comb filter energy".to_string(),
            ));
        }
        Ok(energies)
    }

    /// `sum_k power[k] * |H[k]|^2` for a comb of the given period.
    fn comb_energy(&self, power: &[f64], period: usize) -> f64 {
        let n = self.transform_len;
        let m = self.num_impulses;
        if m == 1 {
            return power.iter().sum();
        }

        // Phase index of bin k for lag d*P is (k * d * P) mod N; advance it
        // incrementally per bin instead of multiplying.
        let steps: Vec<usize> = (1..m).map(|d| (d * period) % n).collect();
        let weights: Vec<f64> = (1..m).map(|d| 2.0 * (m - d) as f64).collect();
        let mut phases = vec![0usize; m - 1];

        let mut total = 0.0;
        for &p in power {
            let mut response = m as f64;
            for ((phase, &step), &weight) in phases.iter_mut().zip(&steps).zip(&weights) {
                response += weight * self.cos_table[*phase];
                *phase += step;
                if *phase >= n {
                    *phase -= n;
                }
            }
            total += p * response;
        }
        total
    }
}

/// Comb-filter energy of `onset` for every tempo in `bpms`.
pub fn analyze_tempo(
    onset: &[f64],
    sample_rate: u32,
    bpms: &[f64],
    num_impulses: usize,
) -> Result<Vec<f64>> {
    CombAnalyzer::new(sample_rate, bpms, num_impulses, onset.len())?.energy_curve(onset)
}
