//! Time-domain energy detection functions
//!
//! Both methods work on the sum of squared samples of the current frame and
//! need no FFT.

/// Energy envelope: the frame energy itself
#[inline]
pub fn energy_envelope(energy: f64) -> f64 {
    energy.max(0.0)
}

/// Half-wave rectified first-order energy difference
///
/// Only increases in energy count as onset evidence.
#[inline]
pub fn energy_difference(energy: f64, previous_energy: f64) -> f64 {
    (energy - previous_energy).max(0.0)
}
