//! Analysis result types

use super::confidence::BeatConfidence;
use crate::features::beat_tracking::TrackingMode;
use crate::features::onset::OnsetMethod;
use crate::features::period::TempoEstimate;
use serde::{Deserialize, Serialize};

/// Analysis flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisFlag {
    /// No beat was found
    NoBeats,
    /// Tempo posterior is spread over several tempi
    LowTempoConfidence,
    /// Beat intervals vary strongly
    TempoVariation,
}

/// Complete beat analysis of one audio buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeatAnalysis {
    /// Beat times in seconds, strictly increasing
    pub beats: Vec<f64>,

    /// Hop index of each beat
    pub beat_frames: Vec<u64>,

    /// Tempo estimate at the end of the signal
    pub tempo: TempoEstimate,

    /// Onset detection function, one value per hop
    pub onset_detection_function: Vec<f64>,

    /// Confidence scores and flags
    pub confidence: BeatConfidence,

    /// Analysis metadata
    pub metadata: AnalysisMetadata,
}

impl BeatAnalysis {
    /// Median beat interval in seconds, `None` with fewer than two beats
    pub fn median_beat_interval(&self) -> Option<f64> {
        let mut intervals: Vec<f64> = self.beats.windows(2).map(|w| w[1] - w[0]).collect();
        if intervals.is_empty() {
            return None;
        }
        intervals.sort_by(|a, b| a.total_cmp(b));
        Some(intervals[intervals.len() / 2])
    }
}

/// Analysis metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Audio duration in seconds
    pub duration_seconds: f64,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Samples per hop
    pub hop_size: usize,

    /// Analysis frame length in samples
    pub frame_length: usize,

    /// Number of hops analysed
    pub num_hops: usize,

    /// Onset detection method
    pub onset_method: OnsetMethod,

    /// Tracking mode
    pub tracking_mode: TrackingMode,

    /// Processing time in milliseconds
    pub processing_time_ms: f64,

    /// Crate version that produced the result
    pub algorithm_version: String,
}
