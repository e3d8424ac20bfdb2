//! Confidence scoring
//!
//! Summarises how trustworthy a beat sequence is.
//!
//! # Confidence Components
//!
//! 1. **Tempo Confidence**: Posterior probability of the selected tempo
//! 2. **Grid Stability**: `1 - CV` of the beat intervals, where CV is the
//!    coefficient of variation (standard deviation over mean)
//! 3. **Overall Confidence**: Equal-weight average of the two

use super::result::AnalysisFlag;
use crate::features::period::TempoEstimate;
use serde::{Deserialize, Serialize};

/// Below this tempo confidence [`AnalysisFlag::LowTempoConfidence`] is raised
const LOW_TEMPO_CONFIDENCE: f64 = 0.3;

/// Below this grid stability [`AnalysisFlag::TempoVariation`] is raised
const LOW_GRID_STABILITY: f64 = 0.3;

/// Beat sequence confidence scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatConfidence {
    /// Tempo confidence (0.0-1.0)
    pub tempo_confidence: f64,

    /// Grid stability (0.0-1.0)
    pub grid_stability: f64,

    /// Overall confidence (0.0-1.0)
    pub overall_confidence: f64,

    /// Analysis flags
    pub flags: Vec<AnalysisFlag>,
}

/// Grid stability of a beat sequence
///
/// Returns 0 for fewer than three beats, where no interval variation can be
/// measured.
pub fn grid_stability(beat_times: &[f64]) -> f64 {
    if beat_times.len() < 3 {
        return 0.0;
    }

    let intervals: Vec<f64> = beat_times.windows(2).map(|w| w[1] - w[0]).collect();
    let n = intervals.len() as f64;
    let mean = intervals.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return 0.0;
    }

    let variance = intervals.iter().map(|i| (i - mean).powi(2)).sum::<f64>() / n;
    (1.0 - variance.sqrt() / mean).clamp(0.0, 1.0)
}

/// Score a beat sequence
///
/// # Arguments
///
/// * `tempo` - Final tempo estimate
/// * `beat_times` - Beat times in seconds
pub fn compute_confidence(tempo: &TempoEstimate, beat_times: &[f64]) -> BeatConfidence {
    let tempo_confidence = tempo.confidence.clamp(0.0, 1.0);
    let grid_stability = grid_stability(beat_times);

    let overall_confidence = if beat_times.is_empty() {
        0.0
    } else {
        (0.5 * tempo_confidence + 0.5 * grid_stability).clamp(0.0, 1.0)
    };

    let mut flags = Vec::new();
    if beat_times.is_empty() {
        flags.push(AnalysisFlag::NoBeats);
    }
    if tempo_confidence < LOW_TEMPO_CONFIDENCE {
        flags.push(AnalysisFlag::LowTempoConfidence);
    }
    if !beat_times.is_empty() && grid_stability < LOW_GRID_STABILITY {
        flags.push(AnalysisFlag::TempoVariation);
    }

    log::debug!(
        "Confidence scores: tempo={:.3}, grid={:.3}, overall={:.3}",
        tempo_confidence,
        grid_stability,
        overall_confidence
    );

    BeatConfidence {
        tempo_confidence,
        grid_stability,
        overall_confidence,
        flags,
    }
}

impl BeatConfidence {
    /// Check if overall confidence is high (>= 0.7)
    pub fn is_high_confidence(&self) -> bool {
        self.overall_confidence >= 0.7
    }

    /// Check if overall confidence is low (< 0.5)
    pub fn is_low_confidence(&self) -> bool {
        self.overall_confidence < 0.5
    }

    /// Human-readable confidence level: "High", "Medium" or "Low"
    pub fn confidence_level(&self) -> &'static str {
        if self.is_high_confidence() {
            "High"
        } else if self.is_low_confidence() {
            "Low"
        } else {
            "Medium"
        }
    }
}
