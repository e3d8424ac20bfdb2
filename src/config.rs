//! Configuration parameters for beat tracking

use crate::error::TrackerError;
use crate::features::beat_tracking::{TempoUpdate, TrackingMode};
use crate::features::onset::OnsetMethod;
use crate::features::spectral::WindowType;
use serde::{Deserialize, Serialize};

/// Beat tracking configuration
///
/// All fields have defaults; missing fields in serialised configurations take
/// the default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    // Spectral analysis
    /// Analysis frame length in samples, a power of two (default: 1024)
    pub frame_length: usize,

    /// Samples between successive frames (default: 512)
    pub hop_size: usize,

    /// Onset detection method (default: complex spectral difference, half-wave rectified)
    pub onset_method: OnsetMethod,

    /// Analysis window (default: Hann)
    pub window: WindowType,

    // Tracking
    /// Causal prediction or offline backtracking (default: causal)
    pub tracking_mode: TrackingMode,

    /// Tempo re-estimation cadence (default: on every beat)
    pub tempo_update: TempoUpdate,

    /// Minimum tempo in BPM (default: 80.0)
    pub min_bpm: f64,

    /// Maximum tempo in BPM (default: 160.0)
    pub max_bpm: f64,

    /// Tempo assumed before the first estimate (default: 120.0)
    pub initial_tempo_bpm: f64,

    /// Sharpness of the beat-to-beat transition weighting (default: 5.0)
    /// Higher values penalise deviations from the beat period more strongly
    pub tightness: f64,

    /// Weight of past cumulative score against new onset strength (default: 0.9)
    pub alpha: f64,

    /// Decay of the adaptive peak threshold used by offline backtracking (default: 0.9)
    pub peak_threshold_decay: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            frame_length: 1024,
            hop_size: 512,
            onset_method: OnsetMethod::default(),
            window: WindowType::default(),
            tracking_mode: TrackingMode::default(),
            tempo_update: TempoUpdate::default(),
            min_bpm: 80.0,
            max_bpm: 160.0,
            initial_tempo_bpm: 120.0,
            tightness: 5.0,
            alpha: 0.9,
            peak_threshold_decay: 0.9,
        }
    }
}

impl TrackerConfig {
    /// Check the configuration for consistency
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidConfig`] describing the first problem
    /// found.
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.frame_length == 0 || !self.frame_length.is_power_of_two() {
            return Err(TrackerError::InvalidConfig(format!(
                "Frame length must be a power of two, got {}",
                self.frame_length
            )));
        }

        if self.hop_size == 0 || self.hop_size > self.frame_length {
            return Err(TrackerError::InvalidConfig(format!(
                "Hop size must be in 1..={}, got {}",
                self.frame_length, self.hop_size
            )));
        }

        if !(self.min_bpm.is_finite() && self.max_bpm.is_finite())
            || self.min_bpm <= 0.0
            || self.min_bpm >= self.max_bpm
        {
            return Err(TrackerError::InvalidConfig(format!(
                "Invalid BPM range: [{:.1}, {:.1}]",
                self.min_bpm, self.max_bpm
            )));
        }

        if !(self.initial_tempo_bpm.is_finite() && self.initial_tempo_bpm > 0.0) {
            return Err(TrackerError::InvalidConfig(format!(
                "Initial tempo must be positive, got {}",
                self.initial_tempo_bpm
            )));
        }

        if !(self.tightness.is_finite() && self.tightness > 0.0) {
            return Err(TrackerError::InvalidConfig(format!(
                "Tightness must be positive, got {}",
                self.tightness
            )));
        }

        if !(0.0..1.0).contains(&self.alpha) {
            return Err(TrackerError::InvalidConfig(format!(
                "Alpha must be in [0, 1), got {}",
                self.alpha
            )));
        }

        if !(0.0..1.0).contains(&self.peak_threshold_decay) {
            return Err(TrackerError::InvalidConfig(format!(
                "Peak threshold decay must be in [0, 1), got {}",
                self.peak_threshold_decay
            )));
        }

        if self.tempo_update == TempoUpdate::Interval(0) {
            return Err(TrackerError::InvalidConfig(
                "Tempo update interval must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Hops held by the onset and cumulative score histories
    ///
    /// `512 · 512 / hop_size`, about 6 seconds at 44.1 kHz.
    pub fn onset_history_len(&self) -> usize {
        (512 * 512) / self.hop_size.max(1)
    }
}
