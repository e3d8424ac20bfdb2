//! Balanced autocorrelation of the onset history
//!
//! The autocorrelation is computed with an FFT of twice the signal length
//! (zero padded, so the result is linear rather than circular):
//!
//! ```text
//! acf = IFFT(|FFT(signal)|²)
//! ```
//!
//! Each lag is then divided by the number of overlapping samples at that lag
//! (`len - lag`). Without this the result is biased towards short lags, since
//! fewer products contribute to long ones.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Reusable FFT-based balanced autocorrelation for signals of a fixed length
pub struct BalancedAutocorrelation {
    signal_length: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl BalancedAutocorrelation {
    /// Plan transforms for signals of `signal_length` samples
    pub fn new(signal_length: usize) -> Self {
        let fft_length = (2 * signal_length).max(1);
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_length);
        let inverse = planner.plan_fft_inverse(fft_length);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        Self {
            signal_length,
            forward,
            inverse,
            buffer: vec![Complex::new(0.0, 0.0); fft_length],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    /// Signal length this instance was planned for
    pub fn signal_length(&self) -> usize {
        self.signal_length
    }

    /// Compute the balanced autocorrelation of `signal` into `acf`
    ///
    /// # Arguments
    ///
    /// * `signal` - Input of `signal_length` samples; shorter input is zero
    ///   padded, longer input truncated
    /// * `acf` - Output, one value per lag `0..signal_length`
    ///
    /// Values are additionally divided by the FFT length, which makes them
    /// equal to the direct time-domain sum `Σ x[n]·x[n+lag] / (len - lag)`
    /// scaled by `1 / (2·len)`.
    pub fn compute(&mut self, signal: &[f64], acf: &mut [f64]) {
        let fft_length = self.buffer.len();

        for (i, bin) in self.buffer.iter_mut().enumerate() {
            let value = if i < self.signal_length {
                signal.get(i).copied().unwrap_or(0.0)
            } else {
                0.0
            };
            *bin = Complex::new(value, 0.0);
        }

        self.forward
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        for bin in self.buffer.iter_mut() {
            *bin = Complex::new(bin.norm_sqr(), 0.0);
        }

        self.inverse
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        for (lag, out) in acf.iter_mut().take(self.signal_length).enumerate() {
            let overlap = (self.signal_length - lag) as f64;
            *out = self.buffer[lag].norm() / overlap / fft_length as f64;
        }
    }
}

impl std::fmt::Debug for BalancedAutocorrelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalancedAutocorrelation")
            .field("signal_length", &self.signal_length)
            .finish()
    }
}
