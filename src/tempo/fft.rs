use rustfft::{num_complex::Complex, FftPlanner};

/// Smallest 5-smooth number (2^a * 3^b * 5^c) that is >= `n`.
///
/// rustfft has dedicated butterflies for these radices, so padding to one
/// of them keeps transforms fast without doubling to a power of two.
pub fn next_fast_len(n: usize) -> usize {
    if n <= 1 {
        return 1;
    }
    let mut best = n.next_power_of_two();
    let mut p5 = 1usize;
    while p5 < best {
        let mut p35 = p5;
        while p35 < best {
            // Smallest power-of-two multiple of p35 reaching n.
            let mut candidate = p35;
            while candidate < n {
                candidate *= 2;
            }
            best = best.min(candidate);
            p35 *= 3;
        }
        p5 *= 5;
    }
    best
}

/// Forward FFT of a real signal, zero-padded to `len`.
pub fn forward_real(signal: &[f64], len: usize) -> Vec<Complex<f64>> {
    let mut buffer = vec![Complex::new(0.0, 0.0); len];
    for (slot, &v) in buffer.iter_mut().zip(signal) {
        slot.re = v;
    }
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(len);
    fft.process(&mut buffer);
    buffer
}

/// Linear convolution of two real signals via FFT multiplication.
///
/// Returns the full `a.len() + b.len() - 1` samples.
pub fn convolve_real(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let full_len = a.len() + b.len() - 1;
    let len = next_fast_len(full_len);

    let mut spectrum = forward_real(a, len);
    let kernel = forward_real(b, len);
    for (s, k) in spectrum.iter_mut().zip(&kernel) {
        *s = *s * *k;
    }

    let mut planner = FftPlanner::<f64>::new();
    let ifft = planner.plan_fft_inverse(len);
    ifft.process(&mut spectrum);

    // rustfft leaves transforms unnormalized.
    let scale = 1.0 / len as f64;
    spectrum[..full_len].iter().map(|c| c.re * scale).collect()
}
