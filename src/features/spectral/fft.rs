//! FFT backend abstraction
//!
//! The spectral frontend only needs an in-place forward transform of a fixed
//! length, so the transform is hidden behind [`FftBackend`]. The default
//! implementation uses `rustfft`.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

/// In-place forward FFT of a fixed length
pub trait FftBackend: Send {
    /// Transform length in samples
    fn len(&self) -> usize;

    /// Replace `buffer` (of length [`FftBackend::len`]) by its forward transform
    fn forward(&mut self, buffer: &mut [Complex<f64>]);
}

/// [`FftBackend`] backed by a planned `rustfft` transform
pub struct RustFftBackend {
    fft: Arc<dyn Fft<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl RustFftBackend {
    /// Plan a forward transform of `len` points
    pub fn new(len: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(len);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self { fft, scratch }
    }
}

impl FftBackend for RustFftBackend {
    fn len(&self) -> usize {
        self.fft.len()
    }

    fn forward(&mut self, buffer: &mut [Complex<f64>]) {
        self.fft.process_with_scratch(buffer, &mut self.scratch);
    }
}

impl fmt::Debug for RustFftBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RustFftBackend")
            .field("len", &self.fft.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_of_impulse_is_flat() {
        let mut backend = RustFftBackend::new(8);
        assert_eq!(backend.len(), 8);

        let mut buffer = vec![Complex::new(0.0, 0.0); 8];
        buffer[0] = Complex::new(1.0, 0.0);
        backend.forward(&mut buffer);

        for bin in &buffer {
            assert!((bin.re - 1.0).abs() < 1e-12);
            assert!(bin.im.abs() < 1e-12);
        }
    }

    #[test]
    fn test_forward_of_cosine_peaks_at_its_bin() {
        let n = 64;
        let mut backend = RustFftBackend::new(n);
        let mut buffer: Vec<Complex<f64>> = (0..n)
            .map(|i| {
                let x = (2.0 * std::f64::consts::PI * 4.0 * i as f64 / n as f64).cos();
                Complex::new(x, 0.0)
            })
            .collect();
        backend.forward(&mut buffer);

        let peak = (0..=n / 2)
            .max_by(|&a, &b| buffer[a].norm().partial_cmp(&buffer[b].norm()).unwrap())
            .unwrap();
        assert_eq!(peak, 4);
    }
}
