//! Butterworth band-pass filterbank.
//!
//! Each band gets a digital Butterworth band-pass designed from the analog
//! low-pass prototype: band-pass transform in the analog domain, bilinear
//! transform with pre-warped edges, then realized as a cascade of biquads.
//! A filter of order `n` has `2n` poles and therefore `n` sections.

use rustfft::num_complex::Complex;
use std::f64::consts::PI;

use super::bands::Band;
use super::error::{AnalysisError, Result};

/// Poles closer to the unit circle than this are treated as unstable.
const MAX_POLE_RADIUS: f64 = 1.0 - 1e-12;

/// One second-order section, coefficients normalized by a0.
///
/// Transposed Direct Form II:
///   y[n]  = b0*x[n] + z1
///   z1'   = b1*x[n] - a1*y[n] + z2
///   z2'   = b2*x[n] - a2*y[n]
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    /// Band-pass section with zeros at z = 1 and z = -1 and the given pole pair.
    fn band_pass(pole_a: Complex<f64>, pole_b: Complex<f64>) -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: -1.0,
            a1: -(pole_a + pole_b).re,
            a2: (pole_a * pole_b).re,
        }
    }

    /// Complex response at normalized angular frequency `omega` (rad/sample).
    fn response(&self, omega: f64) -> Complex<f64> {
        let z1 = Complex::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let num = self.b0 + z1 * self.b1 + z2 * self.b2;
        let den = 1.0 + z1 * self.a1 + z2 * self.a2;
        num / den
    }

    fn scale(&mut self, gain: f64) {
        self.b0 *= gain;
        self.b1 *= gain;
        self.b2 *= gain;
    }

    fn is_finite(&self) -> bool {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
            .iter()
            .all(|c| c.is_finite())
    }

    fn process(&self, signal: &mut [f64]) {
        let (mut z1, mut z2) = (0.0, 0.0);
        for x in signal.iter_mut() {
            let input = *x;
            let output = self.b0 * input + z1;
            z1 = self.b1 * input - self.a1 * output + z2;
            z2 = self.b2 * input - self.a2 * output;
            *x = output;
        }
    }
}

/// A designed band-pass filter: a cascade of biquads.
#[derive(Debug, Clone)]
pub struct BandPass {
    sections: Vec<Biquad>,
}

impl BandPass {
    /// Designs a Butterworth band-pass of `order` for `band` at `sample_rate`.
    pub fn design(band: Band, sample_rate: u32, order: usize) -> Result<Self> {
        let fail = |reason: &str| AnalysisError::FilterDesign {
            low_hz: band.low_hz,
            high_hz: band.high_hz,
            reason: reason.to_string(),
        };

        if order == 0 {
            return Err(fail("filter order must be at least 1"));
        }
        let nyquist = sample_rate as f64 / 2.0;
        let low = band.low_hz / nyquist;
        let high = band.high_hz / nyquist;
        if !(low > 0.0 && low < high && high < 1.0) {
            return Err(fail("normalized edges must satisfy 0 < low < high < 1"));
        }

        // Pre-warp to the analog domain used by z = (1 + s) / (1 - s).
        let warped_low = (PI * low / 2.0).tan();
        let warped_high = (PI * high / 2.0).tan();
        let bandwidth = warped_high - warped_low;
        let center = (warped_low * warped_high).sqrt();

        let to_band_pass = |p: Complex<f64>| {
            let half = p * (bandwidth / 2.0);
            let root = (half * half - center * center).sqrt();
            (half + root, half - root)
        };
        let bilinear = |s: Complex<f64>| (1.0 + s) / (1.0 - s);

        let mut sections = Vec::with_capacity(order);
        // Upper-half-plane prototype poles; conjugates supply the other half.
        for k in 0..order / 2 {
            let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
            let (s1, s2) = to_band_pass(Complex::from_polar(1.0, theta));
            for s in [s1, s2] {
                let z = bilinear(s);
                sections.push(Biquad::band_pass(z, z.conj()));
            }
        }
        if order % 2 == 1 {
            let (s1, s2) = to_band_pass(Complex::new(-1.0, 0.0));
            sections.push(Biquad::band_pass(bilinear(s1), bilinear(s2)));
        }

        // Unity gain at the geometric centre of the band.
        let omega_center = 2.0 * center.atan();
        for section in &mut sections {
            let magnitude = section.response(omega_center).norm();
            if !(magnitude.is_finite() && magnitude > 0.0) {
                return Err(fail("section has no gain at the band centre"));
            }
            section.scale(1.0 / magnitude);
            if !section.is_finite() {
                return Err(fail("non-finite coefficients"));
            }
            // Stable iff both roots of z^2 + a1 z + a2 lie inside the unit circle.
            if section.a2.abs() >= MAX_POLE_RADIUS || section.a1.abs() >= 1.0 + section.a2 {
                return Err(fail("unstable pole placement"));
            }
        }

        Ok(Self { sections })
    }

    /// Filters `samples` causally; the output has the input's length.
    pub fn apply(&self, samples: &[f32]) -> Vec<f64> {
        let mut signal: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
        for section in &self.sections {
            section.process(&mut signal);
        }
        signal
    }

    #[cfg(test)]
    fn magnitude_at(&self, freq_hz: f64, sample_rate: u32) -> f64 {
        let omega = 2.0 * PI * freq_hz / sample_rate as f64;
        self.sections
            .iter()
            .map(|s| s.response(omega).norm())
            .product()
    }
}

/// A band together with its designed filter, or the reason design failed.
#[derive(Debug, Clone)]
pub struct BandFilter {
    pub band: Band,
    design: Result<BandPass>,
}

impl BandFilter {
    /// Produces the sub-band signal, or the band's design/processing failure.
    pub fn apply(&self, samples: &[f32]) -> Result<Vec<f64>> {
        let filter = self.design.as_ref().map_err(Clone::clone)?;
        let output = filter.apply(samples);
        if output.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::Numerical(format!(
                "band {} produced non-finite samples",
                self.band
            )));
        }
        Ok(output)
    }
}

/// Splits a waveform into sub-band signals.
#[derive(Debug, Clone)]
pub struct Filterbank {
    filters: Vec<BandFilter>,
}

impl Filterbank {
    /// Validates every band and the order, then designs one filter per band.
    ///
    /// Bounds violations are configuration errors and reject the whole
    /// filterbank. A band that passes validation but cannot be realized
    /// (e.g. an edge exactly at Nyquist) keeps its design error, which
    /// surfaces when that band is filtered.
    pub fn new(bands: &[Band], sample_rate: u32, order: usize) -> Result<Self> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidConfig(
                "sample rate must be positive".to_string(),
            ));
        }
        if order == 0 {
            return Err(AnalysisError::InvalidConfig(
                "filter order must be at least 1".to_string(),
            ));
        }
        if bands.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "at least one band is required".to_string(),
            ));
        }
        for band in bands {
            band.validate(sample_rate)?;
        }

        let filters = bands
            .iter()
            .map(|&band| BandFilter {
                band,
                design: BandPass::design(band, sample_rate, order),
            })
            .collect();

        Ok(Self { filters })
    }

    pub fn filters(&self) -> &[BandFilter] {
        &self.filters
    }

    /// Filters `samples` through every band, in band order.
    #[cfg(test)]
    pub fn filter(&self, samples: &[f32]) -> Vec<Result<Vec<f64>>> {
        self.filters.iter().map(|f| f.apply(samples)).collect()
    }
}
