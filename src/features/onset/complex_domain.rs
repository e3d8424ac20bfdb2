//! Phase-based detection functions
//!
//! For a stationary sinusoid the phase advances by a constant amount per hop,
//! so the second-order phase difference `phi[n] - 2 phi[n-1] + phi[n-2]` is
//! close to zero. Onsets break that prediction. The complex-domain methods
//! combine the phase prediction with the magnitude of the previous frame and
//! measure the distance between the predicted and observed spectral values.
//!
//! # Reference
//!
//! Bello, J. P., Duxbury, C., Davies, M., & Sandler, M. (2004).
//! On the Use of Phase and Energy for Musical Onset Detection in the Complex Domain.
//! *IEEE Signal Processing Letters*, 11(6), 553-556.

use crate::features::spectral::SpectralFrame;
use std::f64::consts::{PI, TAU};

/// Bins at or below this magnitude are ignored by [`phase_deviation`]
pub const PHASE_DEVIATION_MIN_MAGNITUDE: f64 = 0.1;

/// Wrap a phase value into (-pi, pi]
#[inline]
pub fn princarg(phase: f64) -> f64 {
    let wrapped = (phase + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

#[inline]
fn second_order_deviation(phase: f64, previous: f64, previous2: f64) -> f64 {
    phase - 2.0 * previous + previous2
}

#[inline]
fn complex_distance(magnitude: f64, previous_magnitude: f64, deviation: f64) -> f64 {
    (magnitude * magnitude + previous_magnitude * previous_magnitude
        - 2.0 * magnitude * previous_magnitude * deviation.cos())
    .max(0.0)
    .sqrt()
}

/// Sum of absolute wrapped phase deviations over non-negligible bins
pub fn phase_deviation(current: &SpectralFrame, previous_phase: &[f64], previous_phase2: &[f64]) -> f64 {
    let mut sum = 0.0;

    for k in 0..current.num_bins() {
        if current.magnitude[k] > PHASE_DEVIATION_MIN_MAGNITUDE {
            let deviation =
                second_order_deviation(current.phase[k], previous_phase[k], previous_phase2[k]);
            sum += current.bin_weight(k) * princarg(deviation).abs();
        }
    }

    sum
}

/// Complex spectral difference over all bins
pub fn complex_spectral_difference(
    current: &SpectralFrame,
    previous_magnitude: &[f64],
    previous_phase: &[f64],
    previous_phase2: &[f64],
) -> f64 {
    let mut sum = 0.0;

    for k in 0..current.num_bins() {
        let deviation = second_order_deviation(current.phase[k], previous_phase[k], previous_phase2[k]);
        sum += current.bin_weight(k)
            * complex_distance(current.magnitude[k], previous_magnitude[k], deviation);
    }

    sum
}

/// Complex spectral difference restricted to bins whose magnitude increased
pub fn complex_spectral_difference_hwr(
    current: &SpectralFrame,
    previous_magnitude: &[f64],
    previous_phase: &[f64],
    previous_phase2: &[f64],
) -> f64 {
    let mut sum = 0.0;

    for k in 0..current.num_bins() {
        if current.magnitude[k] - previous_magnitude[k] > 0.0 {
            let deviation =
                second_order_deviation(current.phase[k], previous_phase[k], previous_phase2[k]);
            sum += current.bin_weight(k)
                * complex_distance(current.magnitude[k], previous_magnitude[k], deviation);
        }
    }

    sum
}
