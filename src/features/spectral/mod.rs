//! Spectral frontend
//!
//! Assembles overlapping analysis frames from incoming hops of audio, applies
//! the analysis window and computes the one-sided magnitude/phase spectrum.
//!
//! # Framing
//!
//! The frontend keeps the last `frame_length` samples in a ring buffer. Each
//! call to [`SpectralFrontend::push_hop`] appends exactly `hop_size` samples,
//! so consecutive frames overlap by `frame_length - hop_size` samples. The
//! buffer starts out zero-filled, which means the first frames are partially
//! silent.
//!
//! Before the transform the windowed frame is rotated by half its length
//! (zero-phase windowing), so the phase of a centred impulse is flat.
//!
//! # Example
//!
//! ```
//! use beat_tracker::features::spectral::{SpectralFrontend, WindowType};
//!
//! let mut frontend = SpectralFrontend::new(1024, 512, WindowType::Hann)?;
//! frontend.push_hop(&[0.0; 512])?;
//! let spectrum = frontend.analyze();
//! assert_eq!(spectrum.num_bins(), 513);
//! # Ok::<(), beat_tracker::TrackerError>(())
//! ```

pub mod fft;
pub mod window;

pub use fft::{FftBackend, RustFftBackend};
pub use window::WindowType;

use crate::error::TrackerError;
use ringbuffer::{AllocRingBuffer, RingBuffer};
use rustfft::num_complex::Complex;

/// Magnitude and phase of one analysis frame, `frame_length / 2 + 1` bins
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFrame {
    /// Magnitude per bin
    pub magnitude: Vec<f64>,

    /// Phase per bin in radians, within (-pi, pi]
    pub phase: Vec<f64>,
}

impl SpectralFrame {
    /// All-zero spectrum with `num_bins` bins
    pub fn zeros(num_bins: usize) -> Self {
        Self {
            magnitude: vec![0.0; num_bins],
            phase: vec![0.0; num_bins],
        }
    }

    /// Number of bins
    pub fn num_bins(&self) -> usize {
        self.magnitude.len()
    }

    /// Multiplicity of bin `k` in the full (two-sided) spectrum
    ///
    /// DC and Nyquist appear once, every other bin has a mirror image, so sums
    /// over the one-sided spectrum weighted by this factor equal the
    /// corresponding sums over all `frame_length` bins.
    #[inline]
    pub fn bin_weight(&self, k: usize) -> f64 {
        if k == 0 || k + 1 == self.num_bins() {
            1.0
        } else {
            2.0
        }
    }
}

/// Frames audio hops and transforms them into [`SpectralFrame`]s
pub struct SpectralFrontend {
    frame_length: usize,
    hop_size: usize,
    frame: AllocRingBuffer<f64>,
    window_type: WindowType,
    window: Vec<f64>,
    fft: Box<dyn FftBackend>,
    buffer: Vec<Complex<f64>>,
}

impl SpectralFrontend {
    /// Create a frontend using the default `rustfft` backend
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidConfig`] if `frame_length` or `hop_size`
    /// is zero or `hop_size > frame_length`.
    pub fn new(frame_length: usize, hop_size: usize, window: WindowType) -> Result<Self, TrackerError> {
        Self::validate(frame_length, hop_size)?;
        Self::with_backend(
            frame_length,
            hop_size,
            window,
            Box::new(RustFftBackend::new(frame_length)),
        )
    }

    /// Create a frontend with a caller-supplied FFT implementation
    ///
    /// # Errors
    ///
    /// Same as [`SpectralFrontend::new`], plus a backend whose length differs
    /// from `frame_length`.
    pub fn with_backend(
        frame_length: usize,
        hop_size: usize,
        window: WindowType,
        fft: Box<dyn FftBackend>,
    ) -> Result<Self, TrackerError> {
        Self::validate(frame_length, hop_size)?;

        if fft.len() != frame_length {
            return Err(TrackerError::InvalidConfig(format!(
                "FFT backend length {} does not match frame length {}",
                fft.len(),
                frame_length
            )));
        }

        let mut frame = AllocRingBuffer::new(frame_length);
        for _ in 0..frame_length {
            frame.push(0.0);
        }

        log::debug!(
            "Spectral frontend: frame={}, hop={}, window={}",
            frame_length,
            hop_size,
            window
        );

        Ok(Self {
            frame_length,
            hop_size,
            frame,
            window_type: window,
            window: window.coefficients(frame_length),
            fft,
            buffer: vec![Complex::new(0.0, 0.0); frame_length],
        })
    }

    fn validate(frame_length: usize, hop_size: usize) -> Result<(), TrackerError> {
        if frame_length == 0 {
            return Err(TrackerError::InvalidConfig(
                "Frame length must be > 0".to_string(),
            ));
        }

        if hop_size == 0 {
            return Err(TrackerError::InvalidConfig(
                "Hop size must be > 0".to_string(),
            ));
        }

        if hop_size > frame_length {
            return Err(TrackerError::InvalidConfig(format!(
                "Hop size ({}) must not exceed frame length ({})",
                hop_size, frame_length
            )));
        }

        Ok(())
    }

    /// Frame length in samples
    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    /// Hop size in samples
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Analysis window
    pub fn window_type(&self) -> WindowType {
        self.window_type
    }

    /// Number of bins in each produced [`SpectralFrame`]
    pub fn num_bins(&self) -> usize {
        self.frame_length / 2 + 1
    }

    /// Shift the frame by one hop, appending `hop` at the end
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidInput`] if `hop.len() != hop_size`.
    pub fn push_hop(&mut self, hop: &[f64]) -> Result<(), TrackerError> {
        if hop.len() != self.hop_size {
            return Err(TrackerError::InvalidInput(format!(
                "Expected {} samples per hop, got {}",
                self.hop_size,
                hop.len()
            )));
        }

        for &sample in hop {
            self.frame.push(sample);
        }

        Ok(())
    }

    /// Sum of squared samples of the current (unwindowed) frame
    pub fn frame_energy(&self) -> f64 {
        self.frame.iter().map(|&x| x * x).sum()
    }

    /// Window, rotate and transform the current frame
    pub fn analyze(&mut self) -> SpectralFrame {
        let half = self.frame_length / 2;

        for (i, (&sample, &w)) in self.frame.iter().zip(self.window.iter()).enumerate() {
            self.buffer[(i + half) % self.frame_length] = Complex::new(sample * w, 0.0);
        }

        self.fft.forward(&mut self.buffer);

        let num_bins = self.num_bins();
        let mut spectrum = SpectralFrame::zeros(num_bins);
        for (k, bin) in self.buffer.iter().take(num_bins).enumerate() {
            spectrum.magnitude[k] = bin.norm();
            spectrum.phase[k] = bin.im.atan2(bin.re);
        }

        spectrum
    }
}

impl std::fmt::Debug for SpectralFrontend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralFrontend")
            .field("frame_length", &self.frame_length)
            .field("hop_size", &self.hop_size)
            .finish()
    }
}
