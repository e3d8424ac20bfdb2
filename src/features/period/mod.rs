//! Tempo (beat period) estimation
//!
//! Estimates the beat period from a trailing window of the onset detection
//! function:
//! - Resampling of the onset history to 512 points
//! - Moving-mean adaptive thresholding
//! - Balanced autocorrelation
//! - Comb filterbank with Rayleigh lag weighting
//! - Viterbi-style tempo posterior with a Gaussian transition model
//!
//! # Reference
//!
//! Stark, A. M., Davies, M. E. P., & Plumbley, M. D. (2009).
//! Real-Time Beat-Synchronous Analysis of Musical Audio.
//! *Proceedings of the 12th International Conference on Digital Audio Effects (DAFx)*.

pub mod autocorrelation;
pub mod comb_filter;
pub mod resample;
pub mod transition;

use crate::error::TrackerError;
use crate::features::onset::threshold::moving_mean_threshold;
use autocorrelation::BalancedAutocorrelation;
use comb_filter::{CombFilterbank, NUM_LAGS};
use resample::{LinearResampler, OnsetResampler};
use serde::{Deserialize, Serialize};
use transition::{argmax, TempoTransitionModel};

/// Length of the onset history view used for tempo induction
pub const RESAMPLED_LENGTH: usize = 512;

/// Current tempo estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoEstimate {
    /// Beat period in hops (a whole number)
    pub beat_period: f64,

    /// Tempo in BPM
    pub bpm: f64,

    /// Posterior probability of the selected tempo (0.0-1.0)
    pub confidence: f64,
}

/// Beat period in whole hops for a tempo
///
/// # Arguments
///
/// * `bpm` - Tempo in beats per minute
/// * `sample_rate` - Sample rate in Hz
/// * `hop_size` - Samples per hop
pub fn beat_period_for_tempo(bpm: f64, sample_rate: f64, hop_size: usize) -> f64 {
    (60.0 * sample_rate / (hop_size as f64 * bpm)).round()
}

/// Tempo in BPM for a beat period in hops
pub fn tempo_for_beat_period(beat_period: f64, sample_rate: f64, hop_size: usize) -> f64 {
    60.0 / ((hop_size as f64 / sample_rate) * beat_period)
}

/// Recurrent tempo estimator over the onset history
///
/// Each call to [`TempoEstimator::estimate`] folds a new observation into the
/// tempo posterior, so estimates are smoothed over time. Tempo can be reset
/// with [`TempoEstimator::set_tempo`] or pinned with
/// [`TempoEstimator::fix_tempo`].
pub struct TempoEstimator {
    sample_rate: f64,
    hop_size: usize,
    history_len: usize,
    model: TempoTransitionModel,
    resampler: Box<dyn OnsetResampler>,
    autocorrelation: BalancedAutocorrelation,
    comb: CombFilterbank,
    previous_delta: Vec<f64>,
    fixed_delta: Option<Vec<f64>>,
    resampled: Vec<f64>,
    acf: Vec<f64>,
    comb_output: Vec<f64>,
    estimate: TempoEstimate,
}

impl TempoEstimator {
    /// Create an estimator with the linear resampler
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Sample rate in Hz
    /// * `hop_size` - Samples per hop
    /// * `history_len` - Length of the onset history passed to `estimate`
    /// * `min_bpm`, `max_bpm` - Tempo range
    /// * `initial_bpm` - Prior tempo, reported until the first estimate
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidConfig`] for a zero sample rate or hop
    /// size, an empty tempo range or a non-positive initial tempo.
    pub fn new(
        sample_rate: u32,
        hop_size: usize,
        history_len: usize,
        min_bpm: f64,
        max_bpm: f64,
        initial_bpm: f64,
    ) -> Result<Self, TrackerError> {
        Self::with_resampler(
            sample_rate,
            hop_size,
            history_len,
            min_bpm,
            max_bpm,
            initial_bpm,
            Box::new(LinearResampler),
        )
    }

    /// Create an estimator with a caller-supplied resampler
    pub fn with_resampler(
        sample_rate: u32,
        hop_size: usize,
        history_len: usize,
        min_bpm: f64,
        max_bpm: f64,
        initial_bpm: f64,
        resampler: Box<dyn OnsetResampler>,
    ) -> Result<Self, TrackerError> {
        if sample_rate == 0 || hop_size == 0 {
            return Err(TrackerError::InvalidConfig(format!(
                "Invalid sample rate ({}) or hop size ({})",
                sample_rate, hop_size
            )));
        }

        if !(min_bpm > 0.0 && min_bpm < max_bpm) {
            return Err(TrackerError::InvalidConfig(format!(
                "Invalid BPM range: [{:.1}, {:.1}]",
                min_bpm, max_bpm
            )));
        }

        if !(initial_bpm > 0.0 && initial_bpm.is_finite()) {
            return Err(TrackerError::InvalidConfig(format!(
                "Invalid initial tempo: {}",
                initial_bpm
            )));
        }

        let sample_rate = sample_rate as f64;
        let model = TempoTransitionModel::new(min_bpm, max_bpm);

        // Lag weighting peaks at the prior tempo, and the bank reaches the
        // slowest tempo of the range
        let lag_factor = 60.0 * sample_rate / RESAMPLED_LENGTH as f64;
        let slowest_lag = (lag_factor / min_bpm).round() as usize;
        let comb = CombFilterbank::with_prior(
            NUM_LAGS.max(slowest_lag + 1),
            (lag_factor / initial_bpm).round(),
        );
        let num_states = model.num_states();

        Ok(Self {
            sample_rate,
            hop_size,
            history_len,
            model,
            resampler,
            autocorrelation: BalancedAutocorrelation::new(RESAMPLED_LENGTH),
            comb_output: vec![0.0; comb.num_lags()],
            comb,
            previous_delta: vec![1.0; num_states],
            fixed_delta: None,
            resampled: vec![0.0; RESAMPLED_LENGTH],
            acf: vec![0.0; RESAMPLED_LENGTH],
            estimate: TempoEstimate {
                beat_period: beat_period_for_tempo(initial_bpm, sample_rate, hop_size),
                bpm: initial_bpm,
                confidence: 0.0,
            },
        })
    }

    /// Latest estimate
    pub fn current(&self) -> TempoEstimate {
        self.estimate
    }

    /// Tempo state space
    pub fn model(&self) -> &TempoTransitionModel {
        &self.model
    }

    /// Comb filterbank scoring the autocorrelation
    pub fn filterbank(&self) -> &CombFilterbank {
        &self.comb
    }

    /// Whether the tempo is pinned by [`fix_tempo`](Self::fix_tempo)
    pub fn is_tempo_fixed(&self) -> bool {
        self.fixed_delta.is_some()
    }

    /// Lags per inverse BPM in the resampled onset view
    fn lag_factor(&self) -> f64 {
        60.0 * self.sample_rate / RESAMPLED_LENGTH as f64
    }

    /// Update the tempo estimate from the onset history
    ///
    /// # Arguments
    ///
    /// * `history` - Onset history, oldest first
    ///
    /// # Returns
    ///
    /// The updated estimate. A history shorter than the configured window
    /// leaves the previous estimate (the prior, at first) in place.
    pub fn estimate(&mut self, history: &[f64]) -> TempoEstimate {
        if history.len() < self.history_len {
            log::warn!(
                "Onset history too short for tempo induction ({} < {}), keeping {:.1} BPM",
                history.len(),
                self.history_len,
                self.estimate.bpm
            );
            return self.estimate;
        }

        let window = &history[history.len() - self.history_len..];
        self.resampler.resample(window, &mut self.resampled);
        moving_mean_threshold(&mut self.resampled);

        self.autocorrelation.compute(&self.resampled, &mut self.acf);
        self.comb.apply(&self.acf, &mut self.comb_output);
        moving_mean_threshold(&mut self.comb_output);

        let observation = self.model.observation(&self.comb_output, self.lag_factor());

        if let Some(fixed) = &self.fixed_delta {
            self.previous_delta.clone_from(fixed);
        }

        let delta = self.model.update(&self.previous_delta, &observation);
        let Some(best) = argmax(&delta) else {
            return self.estimate;
        };

        let candidate_bpm = self.model.candidates()[best];
        let beat_period = beat_period_for_tempo(candidate_bpm, self.sample_rate, self.hop_size);
        if beat_period > 0.0 {
            self.estimate = TempoEstimate {
                beat_period,
                bpm: tempo_for_beat_period(beat_period, self.sample_rate, self.hop_size),
                confidence: delta[best].clamp(0.0, 1.0),
            };
        }
        self.previous_delta = delta;

        log::debug!(
            "Tempo estimate: {:.2} BPM (period {} hops, confidence {:.3})",
            self.estimate.bpm,
            self.estimate.beat_period,
            self.estimate.confidence
        );

        self.estimate
    }

    /// Reset the posterior to a single tempo
    ///
    /// The tempo is folded by octaves into the tempo range. Returns the new
    /// beat period in hops.
    pub fn set_tempo(&mut self, bpm: f64) -> f64 {
        let state = self.model.state_for_tempo(bpm);
        self.previous_delta = one_hot(self.model.num_states(), state);

        let folded = transition::fold_tempo(bpm, self.model.min_bpm(), self.model.max_bpm());
        let beat_period = beat_period_for_tempo(folded, self.sample_rate, self.hop_size).max(1.0);
        self.estimate = TempoEstimate {
            beat_period,
            bpm: tempo_for_beat_period(beat_period, self.sample_rate, self.hop_size),
            confidence: 1.0,
        };

        log::debug!("Tempo set to {:.2} BPM (period {} hops)", folded, beat_period);
        beat_period
    }

    /// Pin every future update to a single tempo
    pub fn fix_tempo(&mut self, bpm: f64) {
        let state = self.model.state_for_tempo(bpm);
        self.fixed_delta = Some(one_hot(self.model.num_states(), state));
        log::debug!("Tempo fixed to {:.2} BPM", self.model.candidates()[state]);
    }

    /// Release a tempo pinned by [`fix_tempo`](Self::fix_tempo)
    pub fn unfix_tempo(&mut self) {
        self.fixed_delta = None;
    }
}

impl std::fmt::Debug for TempoEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TempoEstimator")
            .field("sample_rate", &self.sample_rate)
            .field("hop_size", &self.hop_size)
            .field("history_len", &self.history_len)
            .field("estimate", &self.estimate)
            .field("tempo_fixed", &self.fixed_delta.is_some())
            .finish()
    }
}

fn one_hot(len: usize, index: usize) -> Vec<f64> {
    let mut values = vec![0.0; len];
    if let Some(value) = values.get_mut(index) {
        *value = 1.0;
    }
    values
}

#[cfg(test)]
mod tests {
    use super::comb_filter::RAYLEIGH_PARAMETER;
    use super::*;

    fn pulse_train(len: usize, period: usize) -> Vec<f64> {
        (0..len)
            .map(|i| if i % period == 0 { 1.0 } else { 0.0001 })
            .collect()
    }

    #[test]
    fn test_beat_period_conversions() {
        assert_eq!(beat_period_for_tempo(120.0, 44100.0, 512), 43.0);
        let bpm = tempo_for_beat_period(43.0, 44100.0, 512);
        assert!((bpm - 120.18).abs() < 0.01);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(TempoEstimator::new(0, 512, 512, 80.0, 160.0, 120.0).is_err());
        assert!(TempoEstimator::new(44100, 512, 512, 160.0, 80.0, 120.0).is_err());
        assert!(TempoEstimator::new(44100, 512, 512, 80.0, 160.0, 0.0).is_err());
    }

    #[test]
    fn test_short_history_keeps_prior() {
        let mut estimator = TempoEstimator::new(44100, 512, 512, 80.0, 160.0, 120.0).unwrap();
        let estimate = estimator.estimate(&[1.0; 100]);
        assert_eq!(estimate.bpm, 120.0);
        assert_eq!(estimate.beat_period, 43.0);
        assert_eq!(estimate.confidence, 0.0);
    }

    #[test]
    fn test_pulse_train_at_120_bpm() {
        let mut estimator = TempoEstimator::new(44100, 512, 512, 80.0, 160.0, 120.0).unwrap();
        let history = pulse_train(512, 43);
        let mut estimate = estimator.current();
        for _ in 0..4 {
            estimate = estimator.estimate(&history);
        }
        // The comb filter reads lag `τ - 1` for its first element, which
        // places a 43-hop pulse train between the 43 and 44 hop filters
        assert!((43.0..=44.0).contains(&estimate.beat_period), "got {}", estimate.beat_period);
        assert!(estimate.confidence > 0.0);
    }

    #[test]
    fn test_pulse_train_at_100_bpm() {
        // 100 BPM at 44.1 kHz / 512 hop: 51.7 hops, use 52
        let mut estimator = TempoEstimator::new(44100, 512, 512, 80.0, 160.0, 120.0).unwrap();
        let history = pulse_train(512, 52);
        let mut estimate = estimator.current();
        for _ in 0..8 {
            estimate = estimator.estimate(&history);
        }
        assert!((52.0..=53.0).contains(&estimate.beat_period), "got {}", estimate.beat_period);
    }

    #[test]
    fn test_filterbank_follows_configuration() {
        let estimator = TempoEstimator::new(44100, 512, 512, 80.0, 160.0, 120.0).unwrap();
        assert_eq!(estimator.filterbank().rayleigh_parameter(), RAYLEIGH_PARAMETER);
        assert_eq!(estimator.filterbank().num_lags(), NUM_LAGS);

        // 120 BPM is 94 lags at 96 kHz, 80 BPM is 141
        let estimator = TempoEstimator::new(96000, 512, 512, 80.0, 160.0, 120.0).unwrap();
        assert_eq!(estimator.filterbank().rayleigh_parameter(), 94.0);
        assert_eq!(estimator.filterbank().num_lags(), 142);
    }

    #[test]
    fn test_slow_tempo_follows_prior() {
        // 129 hops is 40 BPM, half of it 80 BPM; both are in range
        let history = pulse_train(512, 129);

        let mut estimator = TempoEstimator::new(44100, 512, 512, 40.0, 240.0, 45.0).unwrap();
        let mut estimate = estimator.current();
        for _ in 0..4 {
            estimate = estimator.estimate(&history);
        }
        assert_eq!(estimate.beat_period, 129.0);

        let mut estimator = TempoEstimator::new(44100, 512, 512, 40.0, 240.0, 120.0).unwrap();
        for _ in 0..4 {
            estimate = estimator.estimate(&history);
        }
        assert_eq!(estimate.beat_period, 65.0);
    }

    #[test]
    fn test_fixed_tempo_wins() {
        let mut estimator = TempoEstimator::new(44100, 512, 512, 80.0, 160.0, 120.0).unwrap();
        estimator.fix_tempo(90.0);
        assert!(estimator.is_tempo_fixed());

        let history = pulse_train(512, 43);
        let estimate = estimator.estimate(&history);
        assert!((estimate.bpm - 90.0).abs() < 2.0, "got {}", estimate.bpm);

        estimator.unfix_tempo();
        assert!(!estimator.is_tempo_fixed());
    }

    #[test]
    fn test_set_tempo_folds_and_resets() {
        let mut estimator = TempoEstimator::new(44100, 512, 512, 80.0, 160.0, 120.0).unwrap();
        let period = estimator.set_tempo(50.0);
        assert_eq!(period, beat_period_for_tempo(100.0, 44100.0, 512));
        assert_eq!(estimator.current().beat_period, period);
    }
}
