//! Offline backtracking through the cumulative score
//!
//! While the causal engine runs over a complete onset detection function it
//! records, for every hop, the cumulative score, the beat period in effect and
//! the predecessor hop that maximised the transition-weighted score. Once the
//! whole signal is scored the beat sequence is read backwards:
//!
//! 1. Find the last beat: the latest local maximum within the final beat
//!    period whose score reaches the adaptive peak threshold (or the largest
//!    score of that window if none does)
//! 2. Follow predecessors back to the start of the signal
//!
//! The result is the best-scoring path ending at the last beat, rather than a
//! sequence of greedy forward decisions.

use crate::features::onset::threshold::DecayingPeakThreshold;

/// Scoring record of one hop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreStep {
    /// Hop index
    pub frame: u64,

    /// Cumulative score at this hop
    pub score: f64,

    /// Beat period in hops when the hop was scored
    pub beat_period: f64,

    /// Hop of the best previous beat, if it lies within the processed signal
    pub predecessor: Option<u64>,
}

/// Adaptive peak threshold over a score trace
///
/// The trace is cut into consecutive blocks one beat period long; the maximum
/// score of each block is folded into a decaying average.
pub fn peak_threshold(trace: &[ScoreStep], decay: f64) -> f64 {
    let mut threshold = DecayingPeakThreshold::new(decay);
    let mut start = 0;

    while start < trace.len() {
        let block = (trace[start].beat_period.round() as usize).max(1);
        let end = (start + block).min(trace.len());
        let peak = trace[start..end]
            .iter()
            .map(|step| step.score)
            .fold(f64::MIN, f64::max);
        threshold.update(peak);
        start = end;
    }

    threshold.value()
}

/// Find the hop where backtracking starts
///
/// Returns an index into `trace`, or `None` for an empty trace.
pub fn final_beat_index(trace: &[ScoreStep], threshold: f64) -> Option<usize> {
    let last = trace.last()?;
    let period = (last.beat_period.round() as usize).max(1);
    let window_start = trace.len().saturating_sub(period);

    let score = |i: usize| trace[i].score;
    let is_local_max = |i: usize| {
        let left = if i > 0 { score(i - 1) } else { f64::MIN };
        let right = if i + 1 < trace.len() { score(i + 1) } else { f64::MIN };
        score(i) >= left && score(i) >= right
    };

    let latest_peak = (window_start..trace.len())
        .rev()
        .find(|&i| is_local_max(i) && score(i) >= threshold);

    latest_peak.or_else(|| {
        log::debug!("No score peak above {:.4} in the final beat period, using the maximum", threshold);
        let mut best = window_start;
        for i in window_start..trace.len() {
            if score(i) > score(best) {
                best = i;
            }
        }
        Some(best)
    })
}

/// Read the beat sequence out of a complete score trace
///
/// # Arguments
///
/// * `trace` - One record per hop, consecutive frames in order
/// * `decay` - Decay of the adaptive peak threshold
///
/// # Returns
///
/// Beat frames in strictly increasing order.
pub fn backtrack_beats(trace: &[ScoreStep], decay: f64) -> Vec<u64> {
    let Some(first_frame) = trace.first().map(|step| step.frame) else {
        return Vec::new();
    };

    let threshold = peak_threshold(trace, decay);
    let Some(mut index) = final_beat_index(trace, threshold) else {
        return Vec::new();
    };

    let mut beats = vec![trace[index].frame];
    while let Some(previous) = trace[index].predecessor {
        if previous < first_frame || previous >= trace[index].frame {
            break;
        }
        index = (previous - first_frame) as usize;
        beats.push(previous);
    }

    beats.reverse();
    log::debug!(
        "Backtracked {} beats over {} hops (threshold {:.4})",
        beats.len(),
        trace.len(),
        threshold
    );
    beats
}
