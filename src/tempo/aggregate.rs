use serde::Serialize;

use super::error::{AnalysisError, Result};

/// Cross-band sum and the selected fundamental tempo.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Aggregate {
    pub total_energy: Vec<f64>,
    pub fundamental_index: usize,
    pub fundamental_bpm: f64,
}

/// Index of the first maximum, so ties resolve to the lowest tempo.
pub fn first_argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some(b) if v <= values[b] => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Sums per-band energy curves and picks the tempo of maximum total energy.
///
/// `None` entries stand for failed bands and count as all-zero curves.
pub fn aggregate(curves: &[Option<&[f64]>], bpms: &[f64]) -> Result<Aggregate> {
    if bpms.is_empty() {
        return Err(AnalysisError::InvalidConfig(
            "tempo range must not be empty".to_string(),
        ));
    }

    let mut total_energy = vec![0.0; bpms.len()];
    for (band, curve) in curves.iter().enumerate() {
        let Some(curve) = curve else { continue };
        if curve.len() != bpms.len() {
            return Err(AnalysisError::InvalidInput(format!(
                "band {} energy curve has {} values, tempo range has {}",
                band,
                curve.len(),
                bpms.len()
            )));
        }
        for (total, &e) in total_energy.iter_mut().zip(curve.iter()) {
            *total += e;
        }
    }

    let fundamental_index = first_argmax(&total_energy).unwrap_or(0);
    Ok(Aggregate {
        fundamental_bpm: bpms[fundamental_index],
        fundamental_index,
        total_energy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_bands_elementwise() {
        let a = [1.0, 2.0, 3.0];
        let b = [0.5, 4.0, 0.0];
        let result = aggregate(&[Some(&a[..]), Some(&b[..])], &[60.0, 61.0, 62.0]).unwrap();
        assert_eq!(result.total_energy, vec![1.5, 6.0, 3.0]);
        assert_eq!(result.fundamental_index, 1);
        assert_eq!(result.fundamental_bpm, 61.0);
    }

    #[test]
    fn ties_pick_lowest_tempo() {
        let a = [1.0, 5.0, 2.0, 5.0];
        let result = aggregate(&[Some(&a[..])], &[60.0, 70.0, 80.0, 90.0]).unwrap();
        assert_eq!(result.fundamental_index, 1);
        assert_eq!(result.fundamental_bpm, 70.0);
    }

    #[test]
    fn all_zero_picks_first_tempo() {
        let zeros = [0.0; 4];
        let result = aggregate(&[Some(&zeros[..]), None], &[60.0, 70.0, 80.0, 90.0]).unwrap();
        assert_eq!(result.fundamental_index, 0);
        assert_eq!(result.fundamental_bpm, 60.0);
    }

    #[test]
    fn failed_bands_contribute_nothing() {
        let a = [1.0, 3.0];
        let result = aggregate(&[None, Some(&a[..]), None], &[100.0, 110.0]).unwrap();
        assert_eq!(result.total_energy, vec![1.0, 3.0]);
        assert_eq!(result.fundamental_bpm, 110.0);
    }

    #[test]
    fn single_tempo_is_always_selected() {
        let a = [42.0];
        let result = aggregate(&[Some(&a[..])], &[128.0]).unwrap();
        assert_eq!(result.fundamental_index, 0);
        assert_eq!(result.fundamental_bpm, 128.0);

        let result = aggregate(&[None], &[128.0]).unwrap();
        assert_eq!(result.fundamental_bpm, 128.0);
    }

    #[test]
    fn rejects_mismatched_curve_and_empty_range() {
        let a = [1.0, 2.0];
        assert!(aggregate(&[Some(&a[..])], &[60.0]).is_err());
        assert!(aggregate(&[], &[]).is_err());
    }
}
