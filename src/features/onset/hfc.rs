//! High-frequency content detection functions
//!
//! Weights each bin of the full (two-sided) spectrum by its one-based index
//! so that broadband transients, which carry most of their extra energy in
//! the upper bins, stand out. Frames hold one side of the spectrum only: an
//! interior bin `k` stands for itself (weight `k + 1`) and for its mirror
//! image at `N - k` (weight `N - k + 1`).

use crate::features::spectral::SpectralFrame;

/// Summed full-spectrum index weight of one-sided bin `k`
#[inline]
fn frequency_weight(frame: &SpectralFrame, k: usize) -> f64 {
    let frame_length = 2 * frame.num_bins().saturating_sub(1);
    let weight = (k + 1) as f64;
    if frame.bin_weight(k) > 1.0 {
        weight + (frame_length - k + 1) as f64
    } else {
        weight
    }
}

/// Frequency-weighted magnitude sum of the current frame
pub fn high_frequency_content(current: &SpectralFrame) -> f64 {
    current
        .magnitude
        .iter()
        .enumerate()
        .map(|(k, &m)| frequency_weight(current, k) * m)
        .sum()
}

/// Frequency-weighted sum of absolute magnitude differences
pub fn high_frequency_spectral_difference(current: &SpectralFrame, previous_magnitude: &[f64]) -> f64 {
    current
        .magnitude
        .iter()
        .zip(previous_magnitude.iter())
        .enumerate()
        .map(|(k, (&m, &pm))| frequency_weight(current, k) * (m - pm).abs())
        .sum()
}

/// Frequency-weighted sum of positive magnitude differences
pub fn high_frequency_spectral_difference_hwr(
    current: &SpectralFrame,
    previous_magnitude: &[f64],
) -> f64 {
    current
        .magnitude
        .iter()
        .zip(previous_magnitude.iter())
        .enumerate()
        .map(|(k, (&m, &pm))| frequency_weight(current, k) * (m - pm).max(0.0))
        .sum()
}
