use std::f64::consts::PI;

use super::error::{AnalysisError, Result};
use super::fft::convolve_real;

/// Length in samples of the half-Hann smoothing window, never below 1.
pub fn half_window_len(sample_rate: u32, window_length: f64) -> usize {
    let samples = (window_length * sample_rate as f64 / 2.0).floor();
    if samples >= 1.0 {
        samples as usize
    } else {
        1
    }
}

/// Decaying half of a Hann bell: 1.0 at n = 0 falling towards 0.
pub fn half_hann(len: usize) -> Vec<f64> {
    (0..len)
        .map(|n| 0.5 + 0.5 * (PI * n as f64 / len as f64).cos())
        .collect()
}

/// Amplitude envelope of a sub-band signal.
///
/// Full-wave rectifies the signal and smooths it with a half-Hann window of
/// `window_length` seconds (half of it, in samples), convolving in the
/// frequency domain and keeping the first `signal.len()` samples.
pub fn envelope(signal: &[f64], sample_rate: u32, window_length: f64) -> Result<Vec<f64>> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput(
            "sample rate must be positive".to_string(),
        ));
    }
    if !window_length.is_finite() || window_length < 0.0 {
        return Err(AnalysisError::InvalidInput(format!(
            "invalid envelope window length: {}",
            window_length
        )));
    }
    if signal.is_empty() {
        return Ok(Vec::new());
    }

    let rectified: Vec<f64> = signal.iter().map(|s| s.abs()).collect();
    let window = half_hann(half_window_len(sample_rate, window_length));

    let mut smoothed = convolve_real(&rectified, &window);
    smoothed.truncate(signal.len());
    // Both operands are non-negative; anything below zero is FFT round-off.
    for v in &mut smoothed {
        *v = v.max(0.0);
    }
    Ok(smoothed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tempo::test_signals::noise;

    #[test]
    fn window_length_in_samples() {
        assert_eq!(half_window_len(44100, 0.4), 8820);
        assert_eq!(half_window_len(1000, 0.001), 1);
        assert_eq!(half_window_len(1000, 0.0), 1);
    }

    #[test]
    fn half_hann_decays_from_one() {
        let w = half_hann(8);
        assert_eq!(w[0], 1.0);
        assert!(w.windows(2).all(|p| p[1] < p[0]));
        assert!(w.iter().all(|&v| v > 0.0));
        assert_eq!(half_hann(1), vec![1.0]);
    }

    #[test]
    fn preserves_length_and_is_non_negative() {
        for (len, window) in [(1usize, 0.4), (100, 0.01), (5000, 0.4), (3000, 2.0)] {
            let signal = noise(len, 7 + len as u64);
            let env = envelope(&signal, 8000, window).unwrap();
            assert_eq!(env.len(), len);
            assert!(env.iter().all(|&v| v >= 0.0));
        }
    }

    #[test]
    fn degenerate_window_is_identity_of_rectified_signal() {
        let signal = [0.5, -1.0, 0.25, -0.75];
        let env = envelope(&signal, 1000, 0.0001).unwrap();
        for (e, s) in env.iter().zip(&signal) {
            assert!((e - s.abs()).abs() < 1e-12);
        }
    }

    #[test]
    fn smooths_an_impulse_into_the_window_shape() {
        let mut signal = vec![0.0; 200];
        signal[10] = -2.0;
        let env = envelope(&signal, 1000, 0.1).unwrap();
        let window = half_hann(50);
        assert!(env[..10].iter().all(|&v| v.abs() < 1e-12));
        for (k, w) in window.iter().enumerate() {
            assert!((env[10 + k] - 2.0 * w).abs() < 1e-9);
        }
        assert!(env[60..].iter().all(|&v| v.abs() < 1e-9));
    }

    #[test]
    fn silence_stays_silent() {
        let env = envelope(&vec![0.0; 1000], 8000, 0.4).unwrap();
        assert!(env.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn empty_signal_gives_empty_envelope() {
        assert!(envelope(&[], 8000, 0.4).unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(envelope(&[1.0], 0, 0.4).is_err());
        assert!(envelope(&[1.0], 8000, f64::NAN).is_err());
        assert!(envelope(&[1.0], 8000, -1.0).is_err());
    }
}
