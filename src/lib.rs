//! # Beat Tracker
//!
//! A real-time beat tracking engine for mono audio: onset detection, tempo
//! induction and beat-phase tracking.
//!
//! ## Features
//!
//! - **Onset Detection**: Ten time- and frequency-domain detection functions
//! - **Tempo Induction**: Autocorrelation, comb filterbank and tempo transition model
//! - **Beat Tracking**: Cumulative score with causal beat prediction or offline backtracking
//! - **Streaming**: Frame-by-frame sessions with zero look-ahead
//!
//! ## Quick Start
//!
//! ```no_run
//! use beat_tracker::{detect_beats, TrackerConfig};
//!
//! // Load audio samples (mono, f64)
//! let samples: Vec<f64> = vec![0.0; 44100 * 10]; // Your audio data
//! let sample_rate = 44100;
//!
//! let beats = detect_beats(&samples, sample_rate, &TrackerConfig::default())?;
//! for beat in beats {
//!     println!("Beat at {:.3}s", beat);
//! }
//! # Ok::<(), beat_tracker::TrackerError>(())
//! ```
//!
//! ## Architecture
//!
//! The pipeline follows this flow:
//!
//! ```text
//! Audio Input → Spectral Frontend → Onset Detection → Tempo Induction → Beat Tracking → Output
//! ```
//!
//! For frame-by-frame use, drive a [`BeatTracker`] directly.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;

// Re-export main types
pub use analysis::confidence::BeatConfidence;
pub use analysis::result::{AnalysisFlag, AnalysisMetadata, BeatAnalysis};
pub use config::TrackerConfig;
pub use error::TrackerError;
pub use features::beat_tracking::{BeatEvent, BeatTracker, TempoUpdate, TrackingMode, TrackingPhase};
pub use features::onset::{OnsetDetectionFunction, OnsetMethod};
pub use features::period::TempoEstimate;
pub use features::spectral::WindowType;

/// Added to every onset detection value before the facade tracks it
pub const ODF_OFFSET: f64 = 1e-4;

/// Compute the onset detection function of an audio buffer
///
/// The buffer is consumed in whole hops; trailing samples that do not fill a
/// hop are ignored.
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Tracker configuration
///
/// # Returns
///
/// One non-negative onset strength per hop
///
/// # Errors
///
/// Returns [`TrackerError::InvalidInput`] for empty or non-finite audio or a
/// zero sample rate, and [`TrackerError::InvalidConfig`] for an invalid
/// configuration.
///
/// # Example
///
/// ```
/// use beat_tracker::{calculate_onset_detection_function, TrackerConfig};
///
/// let samples = vec![0.0; 44100];
/// let odf = calculate_onset_detection_function(&samples, 44100, &TrackerConfig::default())?;
/// assert_eq!(odf.len(), 44100 / 512);
/// # Ok::<(), beat_tracker::TrackerError>(())
/// ```
pub fn calculate_onset_detection_function(
    samples: &[f64],
    sample_rate: u32,
    config: &TrackerConfig,
) -> Result<Vec<f64>, TrackerError> {
    log::debug!(
        "Computing onset detection function: {} samples at {} Hz ({})",
        samples.len(),
        sample_rate,
        config.onset_method
    );

    validate_audio(samples, sample_rate)?;
    let mut onset = OnsetDetectionFunction::from_config(config)?;

    let odf = samples
        .chunks_exact(config.hop_size)
        .map(|hop| onset.process_hop(hop))
        .collect::<Result<Vec<f64>, TrackerError>>()?;

    log::debug!("Onset detection function: {} hops", odf.len());
    Ok(odf)
}

/// Detect beats in an audio buffer
///
/// Computes the onset detection function and tracks it in the configured
/// [`TrackingMode`]. The result is identical to
/// [`detect_beats_from_odf`] applied to the output of
/// [`calculate_onset_detection_function`].
///
/// # Returns
///
/// Beat times in seconds, strictly increasing
///
/// # Errors
///
/// Same as [`calculate_onset_detection_function`].
pub fn detect_beats(samples: &[f64], sample_rate: u32, config: &TrackerConfig) -> Result<Vec<f64>, TrackerError> {
    let odf = calculate_onset_detection_function(samples, sample_rate, config)?;
    detect_beats_from_odf(&odf, sample_rate, config)
}

/// Detect beats in a precomputed onset detection function
///
/// An empty onset detection function yields no beats.
///
/// # Arguments
///
/// * `odf` - One onset strength per hop
/// * `sample_rate` - Sample rate of the audio the function was computed from
/// * `config` - Tracker configuration (its `hop_size` must match the function)
///
/// # Errors
///
/// Returns [`TrackerError::InvalidInput`] for a zero sample rate or
/// non-finite values, and [`TrackerError::InvalidConfig`] for an invalid
/// configuration.
///
/// # Example
///
/// ```
/// use beat_tracker::{detect_beats_from_odf, TrackerConfig};
///
/// let odf: Vec<f64> = (0..1000).map(|i| if i % 43 == 0 { 1.0 } else { 0.0 }).collect();
/// let beats = detect_beats_from_odf(&odf, 44100, &TrackerConfig::default())?;
/// assert!(beats.windows(2).all(|w| w[0] < w[1]));
/// # Ok::<(), beat_tracker::TrackerError>(())
/// ```
pub fn detect_beats_from_odf(odf: &[f64], sample_rate: u32, config: &TrackerConfig) -> Result<Vec<f64>, TrackerError> {
    let (events, _) = track_odf(odf, sample_rate, config)?;
    Ok(events.into_iter().map(|beat| beat.time_seconds).collect())
}

/// Full beat analysis of an audio buffer
///
/// Returns beat times and frames, the final tempo estimate, the onset
/// detection function, confidence scores and metadata.
///
/// # Errors
///
/// Same as [`calculate_onset_detection_function`].
pub fn analyze_beats(samples: &[f64], sample_rate: u32, config: &TrackerConfig) -> Result<BeatAnalysis, TrackerError> {
    use std::time::Instant;
    let start_time = Instant::now();

    log::debug!("Starting beat analysis: {} samples at {} Hz", samples.len(), sample_rate);

    let odf = calculate_onset_detection_function(samples, sample_rate, config)?;
    let (events, tempo) = track_odf(&odf, sample_rate, config)?;

    let beats: Vec<f64> = events.iter().map(|beat| beat.time_seconds).collect();
    let beat_frames: Vec<u64> = events.iter().map(|beat| beat.frame).collect();
    let confidence = analysis::confidence::compute_confidence(&tempo, &beats);

    let processing_time_ms = start_time.elapsed().as_secs_f64() * 1000.0;
    log::debug!(
        "Beat analysis done: {} beats, {:.1} BPM, {:.1} ms",
        beats.len(),
        tempo.bpm,
        processing_time_ms
    );

    Ok(BeatAnalysis {
        beats,
        beat_frames,
        tempo,
        confidence,
        metadata: AnalysisMetadata {
            duration_seconds: samples.len() as f64 / sample_rate as f64,
            sample_rate,
            hop_size: config.hop_size,
            frame_length: config.frame_length,
            num_hops: odf.len(),
            onset_method: config.onset_method,
            tracking_mode: config.tracking_mode,
            processing_time_ms,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        onset_detection_function: odf,
    })
}

/// Run one tracking session over an onset detection function
///
/// Every value is shifted by [`ODF_OFFSET`] first, on both the audio and the
/// onset detection function paths.
fn track_odf(
    odf: &[f64],
    sample_rate: u32,
    config: &TrackerConfig,
) -> Result<(Vec<BeatEvent>, TempoEstimate), TrackerError> {
    if let Some(i) = odf.iter().position(|v| !v.is_finite()) {
        return Err(TrackerError::InvalidInput(format!(
            "Non-finite onset detection value at hop {}",
            i
        )));
    }

    let mut tracker = BeatTracker::new(config, sample_rate)?;
    let shifted: Vec<f64> = odf.iter().map(|v| v + ODF_OFFSET).collect();
    let events = tracker.track(&shifted);

    log::debug!(
        "Tracked {} beats over {} hops ({} mode)",
        events.len(),
        odf.len(),
        config.tracking_mode
    );
    Ok((events, tracker.tempo_estimate()))
}

fn validate_audio(samples: &[f64], sample_rate: u32) -> Result<(), TrackerError> {
    if samples.is_empty() {
        return Err(TrackerError::InvalidInput("Empty audio samples".to_string()));
    }

    if sample_rate == 0 {
        return Err(TrackerError::InvalidInput("Invalid sample rate".to_string()));
    }

    if let Some(i) = samples.iter().position(|s| !s.is_finite()) {
        return Err(TrackerError::InvalidInput(format!("Non-finite sample at index {}", i)));
    }

    Ok(())
}
