//! Onset detection function
//!
//! Reduces each analysis frame to a single non-negative onset strength value.
//! Several detection methods are available:
//! - Energy envelope and energy difference (time domain)
//! - Spectral difference, optionally half-wave rectified
//! - Complex spectral difference, optionally half-wave rectified
//! - High-frequency content and high-frequency spectral difference
//! - Phase deviation
//!
//! The generator keeps only the state the methods need: the previous frame's
//! magnitude spectrum and energy, and the phase of the two previous frames.

pub mod complex_domain;
pub mod energy;
pub mod hfc;
pub mod spectral_difference;
pub mod threshold;

use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::features::spectral::{SpectralFrame, SpectralFrontend, WindowType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Onset detection method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnsetMethod {
    /// Frame energy
    EnergyEnvelope,
    /// Rectified first-order difference of the frame energy
    EnergyDifference,
    /// Magnitude spectrum difference
    SpectralDifference,
    /// Magnitude spectrum difference over rising bins only
    SpectralDifferenceHwr,
    /// Mean absolute second-order phase difference
    PhaseDeviation,
    /// Distance between the observed and the predicted complex spectrum
    ComplexSpectralDifference,
    /// Complex spectral difference over rising bins only
    #[default]
    ComplexSpectralDifferenceHwr,
    /// Frequency-weighted spectral magnitude
    HighFrequencyContent,
    /// Frequency-weighted magnitude difference
    HighFrequencySpectralDifference,
    /// Frequency-weighted magnitude difference over rising bins only
    HighFrequencySpectralDifferenceHwr,
}

impl OnsetMethod {
    /// All supported methods
    pub const ALL: [OnsetMethod; 10] = [
        OnsetMethod::EnergyEnvelope,
        OnsetMethod::EnergyDifference,
        OnsetMethod::SpectralDifference,
        OnsetMethod::SpectralDifferenceHwr,
        OnsetMethod::PhaseDeviation,
        OnsetMethod::ComplexSpectralDifference,
        OnsetMethod::ComplexSpectralDifferenceHwr,
        OnsetMethod::HighFrequencyContent,
        OnsetMethod::HighFrequencySpectralDifference,
        OnsetMethod::HighFrequencySpectralDifferenceHwr,
    ];

    /// Canonical kebab-case name
    pub fn name(&self) -> &'static str {
        match self {
            OnsetMethod::EnergyEnvelope => "energy-envelope",
            OnsetMethod::EnergyDifference => "energy-difference",
            OnsetMethod::SpectralDifference => "spectral-difference",
            OnsetMethod::SpectralDifferenceHwr => "spectral-difference-hwr",
            OnsetMethod::PhaseDeviation => "phase-deviation",
            OnsetMethod::ComplexSpectralDifference => "complex-spectral-difference",
            OnsetMethod::ComplexSpectralDifferenceHwr => "complex-spectral-difference-hwr",
            OnsetMethod::HighFrequencyContent => "high-frequency-content",
            OnsetMethod::HighFrequencySpectralDifference => "high-frequency-spectral-difference",
            OnsetMethod::HighFrequencySpectralDifferenceHwr => {
                "high-frequency-spectral-difference-hwr"
            }
        }
    }

    /// Whether the method needs the magnitude/phase spectrum
    ///
    /// The energy methods work on the time-domain frame and skip the FFT.
    pub fn needs_spectrum(&self) -> bool {
        !matches!(self, OnsetMethod::EnergyEnvelope | OnsetMethod::EnergyDifference)
    }

    /// Evaluate the method for one frame
    ///
    /// # Arguments
    ///
    /// * `energy` - Sum of squared samples of the current frame
    /// * `spectrum` - Spectrum of the current frame, required when
    ///   [`needs_spectrum`](Self::needs_spectrum) is true
    /// * `previous` - State carried over from earlier frames
    ///
    /// # Returns
    ///
    /// Half-wave rectified onset strength. A spectral method evaluated without
    /// a spectrum yields 0.
    pub fn evaluate(&self, energy: f64, spectrum: Option<&SpectralFrame>, previous: &PreviousFrame) -> f64 {
        let value = match (self, spectrum) {
            (OnsetMethod::EnergyEnvelope, _) => energy::energy_envelope(energy),
            (OnsetMethod::EnergyDifference, _) => energy::energy_difference(energy, previous.energy),
            (OnsetMethod::SpectralDifference, Some(s)) => {
                spectral_difference::spectral_difference(s, &previous.magnitude)
            }
            (OnsetMethod::SpectralDifferenceHwr, Some(s)) => {
                spectral_difference::spectral_difference_hwr(s, &previous.magnitude)
            }
            (OnsetMethod::PhaseDeviation, Some(s)) => {
                complex_domain::phase_deviation(s, &previous.phase, &previous.phase2)
            }
            (OnsetMethod::ComplexSpectralDifference, Some(s)) => complex_domain::complex_spectral_difference(
                s,
                &previous.magnitude,
                &previous.phase,
                &previous.phase2,
            ),
            (OnsetMethod::ComplexSpectralDifferenceHwr, Some(s)) => {
                complex_domain::complex_spectral_difference_hwr(
                    s,
                    &previous.magnitude,
                    &previous.phase,
                    &previous.phase2,
                )
            }
            (OnsetMethod::HighFrequencyContent, Some(s)) => hfc::high_frequency_content(s),
            (OnsetMethod::HighFrequencySpectralDifference, Some(s)) => {
                hfc::high_frequency_spectral_difference(s, &previous.magnitude)
            }
            (OnsetMethod::HighFrequencySpectralDifferenceHwr, Some(s)) => {
                hfc::high_frequency_spectral_difference_hwr(s, &previous.magnitude)
            }
            (_, None) => 0.0,
        };

        half_wave_rectify(value)
    }
}

impl fmt::Display for OnsetMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OnsetMethod {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "energy" | "energy-envelope" => Ok(OnsetMethod::EnergyEnvelope),
            "energy-difference" => Ok(OnsetMethod::EnergyDifference),
            "spectral-difference" => Ok(OnsetMethod::SpectralDifference),
            "spectral-difference-hwr" => Ok(OnsetMethod::SpectralDifferenceHwr),
            "phase-deviation" => Ok(OnsetMethod::PhaseDeviation),
            "complex-spectral-difference" => Ok(OnsetMethod::ComplexSpectralDifference),
            "complex-spectral-difference-hwr" => Ok(OnsetMethod::ComplexSpectralDifferenceHwr),
            "high-frequency-content" | "hfc" => Ok(OnsetMethod::HighFrequencyContent),
            "high-frequency-spectral-difference" => Ok(OnsetMethod::HighFrequencySpectralDifference),
            "high-frequency-spectral-difference-hwr" => {
                Ok(OnsetMethod::HighFrequencySpectralDifferenceHwr)
            }
            _ => Err(TrackerError::InvalidConfig(format!(
                "Unsupported onset method: {}",
                s
            ))),
        }
    }
}

/// Clamp negative values to zero
#[inline]
pub fn half_wave_rectify(value: f64) -> f64 {
    if value > 0.0 {
        value
    } else {
        0.0
    }
}

/// State carried over from the frames before the current one
#[derive(Debug, Clone, PartialEq)]
pub struct PreviousFrame {
    /// Magnitude spectrum of the previous frame
    pub magnitude: Vec<f64>,
    /// Phase of the previous frame
    pub phase: Vec<f64>,
    /// Phase of the frame before the previous one
    pub phase2: Vec<f64>,
    /// Energy of the previous frame
    pub energy: f64,
}

impl PreviousFrame {
    /// Silent history for spectra with `num_bins` bins
    pub fn zeros(num_bins: usize) -> Self {
        Self {
            magnitude: vec![0.0; num_bins],
            phase: vec![0.0; num_bins],
            phase2: vec![0.0; num_bins],
            energy: 0.0,
        }
    }

    /// Shift the history by one frame
    fn advance(&mut self, energy: f64, spectrum: Option<SpectralFrame>) {
        self.energy = energy;
        if let Some(spectrum) = spectrum {
            std::mem::swap(&mut self.phase2, &mut self.phase);
            self.phase = spectrum.phase;
            self.magnitude = spectrum.magnitude;
        }
    }
}

/// Streaming onset detection function generator
///
/// Feed it one hop of audio at a time; each hop yields one onset strength
/// value.
///
/// # Example
///
/// ```
/// use beat_tracker::features::onset::{OnsetDetectionFunction, OnsetMethod};
/// use beat_tracker::features::spectral::WindowType;
///
/// let mut odf = OnsetDetectionFunction::new(512, 1024, OnsetMethod::default(), WindowType::Hann)?;
/// let value = odf.process_hop(&[0.0; 512])?;
/// assert_eq!(value, 0.0);
/// # Ok::<(), beat_tracker::TrackerError>(())
/// ```
#[derive(Debug)]
pub struct OnsetDetectionFunction {
    method: OnsetMethod,
    frontend: SpectralFrontend,
    previous: PreviousFrame,
}

impl OnsetDetectionFunction {
    /// Create a generator
    ///
    /// # Arguments
    ///
    /// * `hop_size` - Samples per hop
    /// * `frame_length` - Analysis frame length, a power of two
    /// * `method` - Detection method
    /// * `window` - Analysis window
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidConfig`] for invalid frame or hop sizes.
    pub fn new(
        hop_size: usize,
        frame_length: usize,
        method: OnsetMethod,
        window: WindowType,
    ) -> Result<Self, TrackerError> {
        let frontend = SpectralFrontend::new(frame_length, hop_size, window)?;
        let previous = PreviousFrame::zeros(frontend.num_bins());

        log::debug!(
            "Onset detection: method={}, frame_length={}, hop_size={}, window={}",
            method,
            frame_length,
            hop_size,
            window
        );

        Ok(Self {
            method,
            frontend,
            previous,
        })
    }

    /// Create a generator from a tracker configuration
    pub fn from_config(config: &TrackerConfig) -> Result<Self, TrackerError> {
        Self::new(config.hop_size, config.frame_length, config.onset_method, config.window)
    }

    /// Detection method in use
    pub fn method(&self) -> OnsetMethod {
        self.method
    }

    /// Samples per hop
    pub fn hop_size(&self) -> usize {
        self.frontend.hop_size()
    }

    /// Analysis frame length
    pub fn frame_length(&self) -> usize {
        self.frontend.frame_length()
    }

    /// Consume one hop of audio and return its onset strength
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidInput`] if `hop` does not contain
    /// exactly `hop_size` samples.
    pub fn process_hop(&mut self, hop: &[f64]) -> Result<f64, TrackerError> {
        self.frontend.push_hop(hop)?;

        let energy = self.frontend.frame_energy();
        let spectrum = if self.method.needs_spectrum() {
            Some(self.frontend.analyze())
        } else {
            None
        };

        let value = self.method.evaluate(energy, spectrum.as_ref(), &self.previous);
        self.previous.advance(energy, spectrum);

        Ok(value)
    }

    /// Clear all frame history
    pub fn reset(&mut self) -> Result<(), TrackerError> {
        *self = Self::new(
            self.frontend.hop_size(),
            self.frontend.frame_length(),
            self.method,
            self.frontend.window_type(),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click_hops(num_hops: usize, hop_size: usize, every: usize) -> Vec<Vec<f64>> {
        (0..num_hops)
            .map(|h| {
                let mut hop = vec![0.0; hop_size];
                if h % every == 0 {
                    for (i, s) in hop.iter_mut().enumerate().take(32) {
                        *s = if i % 2 == 0 { 0.9 } else { -0.9 };
                    }
                }
                hop
            })
            .collect()
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("energy".parse::<OnsetMethod>().unwrap(), OnsetMethod::EnergyEnvelope);
        assert_eq!(
            "complex-spectral-difference".parse::<OnsetMethod>().unwrap(),
            OnsetMethod::ComplexSpectralDifference
        );
        assert_eq!(
            "High_Frequency_Content".parse::<OnsetMethod>().unwrap(),
            OnsetMethod::HighFrequencyContent
        );
        assert!(matches!(
            "wavelet".parse::<OnsetMethod>(),
            Err(TrackerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_method_name_round_trip() {
        for method in OnsetMethod::ALL {
            assert_eq!(method.name().parse::<OnsetMethod>().unwrap(), method);
        }
    }

    #[test]
    fn test_default_method() {
        assert_eq!(OnsetMethod::default(), OnsetMethod::ComplexSpectralDifferenceHwr);
    }

    #[test]
    fn test_half_wave_rectify() {
        assert_eq!(half_wave_rectify(-1.0), 0.0);
        assert_eq!(half_wave_rectify(2.5), 2.5);
        assert_eq!(half_wave_rectify(f64::NAN), 0.0);
    }

    #[test]
    fn test_silence_gives_zero() {
        for method in OnsetMethod::ALL {
            let mut odf = OnsetDetectionFunction::new(512, 1024, method, WindowType::Hann).unwrap();
            for _ in 0..4 {
                assert_eq!(odf.process_hop(&[0.0; 512]).unwrap(), 0.0, "{}", method);
            }
        }
    }

    #[test]
    fn test_all_methods_non_negative() {
        let hops = click_hops(40, 256, 7);
        for method in OnsetMethod::ALL {
            let mut odf = OnsetDetectionFunction::new(256, 512, method, WindowType::Hann).unwrap();
            for hop in &hops {
                let value = odf.process_hop(hop).unwrap();
                assert!(value >= 0.0 && value.is_finite(), "{} produced {}", method, value);
            }
        }
    }

    #[test]
    fn test_click_raises_onset_strength() {
        let mut odf =
            OnsetDetectionFunction::new(512, 1024, OnsetMethod::SpectralDifferenceHwr, WindowType::Hann)
                .unwrap();
        for _ in 0..4 {
            odf.process_hop(&[0.0; 512]).unwrap();
        }

        let mut hop = vec![0.0; 512];
        hop[100] = 1.0;
        let value = odf.process_hop(&hop).unwrap();
        assert!(value > 0.0);
    }

    #[test]
    fn test_wrong_hop_length() {
        let mut odf = OnsetDetectionFunction::new(512, 1024, OnsetMethod::default(), WindowType::Hann).unwrap();
        assert!(matches!(
            odf.process_hop(&[0.0; 100]),
            Err(TrackerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let hops = click_hops(10, 512, 3);
        let mut odf = OnsetDetectionFunction::new(512, 1024, OnsetMethod::default(), WindowType::Hann).unwrap();
        let first: Vec<f64> = hops.iter().map(|h| odf.process_hop(h).unwrap()).collect();
        odf.reset().unwrap();
        let second: Vec<f64> = hops.iter().map(|h| odf.process_hop(h).unwrap()).collect();
        assert_eq!(first, second);
    }
}
