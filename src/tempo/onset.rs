/// Onset emphasis: first-order difference followed by half-wave rectification.
///
/// The first sample differences against itself, so the output starts at 0.
/// `_sample_rate` is accepted for a uniform stage signature; the difference
/// is taken per sample.
pub fn diff_rect(envelope: &[f64], _sample_rate: u32) -> Vec<f64> {
    let Some(&first) = envelope.first() else {
        return Vec::new();
    };
    let mut prev = first;
    envelope
        .iter()
        .map(|&v| {
            let diff = v - prev;
            prev = v;
            diff.max(0.0)
        })
        .collect()
}
