//! Deterministic synthetic signals shared by the pipeline tests.

use std::f64::consts::PI;

/// Uniform noise in [-1, 1) from a seeded xorshift64* generator.
pub fn noise(len: usize, seed: u64) -> Vec<f64> {
    let mut state = seed.max(1);
    (0..len)
        .map(|_| {
            state ^= state >> 12;
            state ^= state << 25;
            state ^= state >> 27;
            let bits = state.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 11;
            bits as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
        })
        .collect()
}

pub fn noise_f32(len: usize, seed: u64) -> Vec<f32> {
    noise(len, seed).into_iter().map(|v| v as f32).collect()
}

/// Short bursts of a `tone_hz` sine every `period` samples, silence between.
pub fn tone_bursts(
    len: usize,
    sample_rate: u32,
    period: usize,
    tone_hz: f64,
    burst_len: usize,
) -> Vec<f32> {
    let mut out = vec![0.0f32; len];
    for start in (0..len).step_by(period.max(1)) {
        for i in 0..burst_len.min(len - start) {
            let t = i as f64 / sample_rate as f64;
            out[start + i] = (2.0 * PI * tone_hz * t).sin() as f32;
        }
    }
    out
}

/// Unit impulses every `period` samples.
pub fn click_train(len: usize, period: usize) -> Vec<f64> {
    let mut out = vec![0.0; len];
    for i in (0..len).step_by(period.max(1)) {
        out[i] = 1.0;
    }
    out
}
