use serde::{Deserialize, Serialize};

use super::error::{AnalysisError, Result};

/// A frequency band in Hz.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub low_hz: f64,
    pub high_hz: f64,
}

impl Band {
    pub fn new(low_hz: f64, high_hz: f64) -> Result<Self> {
        let band = Self { low_hz, high_hz };
        band.check_bounds()?;
        Ok(band)
    }

    /// Checks `0 < low < high <= nyquist` for the given sample rate.
    pub fn validate(&self, sample_rate: u32) -> Result<()> {
        self.check_bounds()?;
        let nyquist = sample_rate as f64 / 2.0;
        if self.high_hz > nyquist {
            return Err(AnalysisError::InvalidConfig(format!(
                "band {} exceeds Nyquist frequency {:.1} Hz",
                self, nyquist
            )));
        }
        Ok(())
    }

    fn check_bounds(&self) -> Result<()> {
        if !self.low_hz.is_finite() || !self.high_hz.is_finite() {
            return Err(AnalysisError::InvalidConfig(format!(
                "band {} has non-finite edges",
                self
            )));
        }
        if self.low_hz <= 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "band {} must start above 0 Hz",
                self
            )));
        }
        if self.low_hz >= self.high_hz {
            return Err(AnalysisError::InvalidConfig(format!(
                "band {} has low cut >= high cut",
                self
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{} Hz", self.low_hz, self.high_hz)
    }
}

/// Upper edges of the Scheirer (1998) bands; the first band starts at 1 Hz.
const SCHEIRER_EDGES: [f64; 7] = [1.0, 200.0, 400.0, 800.0, 1600.0, 3200.0, 5000.0];

/// Highest default edge as a fraction of Nyquist. A band-pass edge at
/// Nyquist itself cannot be realized.
const MAX_DEFAULT_EDGE: f64 = 0.95;

/// The Scheirer (1998) bands that fit below `min(5 kHz, 0.95 * Nyquist)`.
///
/// Bands starting at or above the cap are dropped and the highest remaining
/// band is cut at the cap, so every default band is valid and designable
/// at `sample_rate`.
pub fn scheirer_bands(sample_rate: u32) -> Vec<Band> {
    let cap = (sample_rate as f64 / 2.0 * MAX_DEFAULT_EDGE).min(5000.0);
    SCHEIRER_EDGES
        .windows(2)
        .filter(|edges| edges[0] < cap)
        .map(|edges| Band {
            low_hz: edges[0],
            high_hz: edges[1].min(cap),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheirer_bands_cap_at_5khz() {
        let bands = scheirer_bands(44100);
        assert_eq!(bands.len(), 6);
        assert_eq!(bands[5].high_hz, 5000.0);
        for band in &bands {
            assert!(band.validate(44100).is_ok());
        }
    }

    #[test]
    fn scheirer_bands_stay_below_nyquist() {
        let bands = scheirer_bands(8000);
        assert_eq!(bands.len(), 6);
        assert_eq!(bands[5].low_hz, 3200.0);
        assert!((bands[5].high_hz - 3800.0).abs() < 1e-9);
        for band in &bands {
            assert!(band.validate(8000).is_ok());
        }
    }

    #[test]
    fn scheirer_bands_drop_bands_above_low_nyquist() {
        let bands = scheirer_bands(6000);
        assert_eq!(bands.len(), 5);
        assert_eq!(bands[4].low_hz, 1600.0);
        assert!((bands[4].high_hz - 2850.0).abs() < 1e-9);
        for band in &bands {
            assert!(band.validate(6000).is_ok());
        }

        let tiny = scheirer_bands(300);
        assert_eq!(tiny.len(), 1);
        assert!((tiny[0].high_hz - 142.5).abs() < 1e-9);
        assert!(scheirer_bands(2).is_empty());
    }

    #[test]
    fn rejects_inverted_band() {
        assert!(matches!(
            Band::new(400.0, 200.0),
            Err(AnalysisError::InvalidConfig(_))
        ));
        assert!(Band::new(200.0, 200.0).is_err());
    }

    #[test]
    fn rejects_zero_and_above_nyquist() {
        assert!(Band::new(0.0, 200.0).is_err());
        let band = Band::new(1000.0, 30000.0).unwrap();
        assert!(band.validate(44100).is_err());
        assert!(Band::new(f64::NAN, 100.0).is_err());
    }
}
