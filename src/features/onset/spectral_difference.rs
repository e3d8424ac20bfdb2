//! Magnitude spectral difference
//!
//! Sums bin-wise magnitude changes between consecutive frames. The plain
//! variant counts decreases as well as increases, the half-wave rectified one
//! only increases.

use crate::features::spectral::SpectralFrame;

/// Sum of absolute magnitude differences
pub fn spectral_difference(current: &SpectralFrame, previous_magnitude: &[f64]) -> f64 {
    current
        .magnitude
        .iter()
        .zip(previous_magnitude.iter())
        .enumerate()
        .map(|(k, (&m, &pm))| current.bin_weight(k) * (m - pm).abs())
        .sum()
}

/// Sum of positive magnitude differences
pub fn spectral_difference_hwr(current: &SpectralFrame, previous_magnitude: &[f64]) -> f64 {
    current
        .magnitude
        .iter()
        .zip(previous_magnitude.iter())
        .enumerate()
        .map(|(k, (&m, &pm))| current.bin_weight(k) * (m - pm).max(0.0))
        .sum()
}
