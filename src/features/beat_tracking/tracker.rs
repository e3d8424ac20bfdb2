//! Beat tracker
//!
//! Runs the cumulative score recursion on every onset detection function
//! sample, predicts the next beat half a beat period after each beat, and
//! re-estimates the tempo as beats are emitted.
//!
//! # Algorithm
//!
//! Per onset sample:
//!
//! 1. The sample is made positive and floored at `1e-4`, then appended to the
//!    onset history
//! 2. The cumulative score is extended by one hop
//! 3. If a prediction is due, the cumulative score is extrapolated one beat
//!    period ahead and the next beat is placed at its weighted maximum
//! 4. If the predicted beat is due, a beat is emitted and (by default) the
//!    tempo is re-estimated from the onset history
//!
//! Both histories start out with synthetic content at the initial tempo, so
//! the first beat is predicted 10 hops after start.
//!
//! # Reference
//!
//! Stark, A. M., Davies, M. E. P., & Plumbley, M. D. (2009).
//! Real-Time Beat-Synchronous Analysis of Musical Audio.
//! *Proceedings of the 12th International Conference on Digital Audio Effects (DAFx)*.

use super::backtrack::{backtrack_beats, ScoreStep};
use super::cumulative::{predict_next_beat, TransitionWindow};
use super::history::HopHistory;
use super::{BeatEvent, TempoUpdate, TrackingMode, TrackingPhase};
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::features::onset::OnsetDetectionFunction;
use crate::features::period::{
    beat_period_for_tempo, tempo_for_beat_period, TempoEstimate, TempoEstimator,
};

/// Added to every onset sample so the score never collapses to zero
const ONSET_FLOOR: f64 = 1e-4;

/// Hops until the first prediction
const FIRST_PREDICTION_HOPS: i64 = 10;

/// Synthetic history values written by [`BeatTracker::set_tempo`]
const SYNTHETIC_BEAT_VALUE: f64 = 150.0;
const SYNTHETIC_OFFBEAT_VALUE: f64 = 10.0;

/// Time in seconds of a hop index
///
/// # Example
///
/// ```
/// use beat_tracker::features::beat_tracking::beat_time_seconds;
///
/// assert_eq!(beat_time_seconds(86, 512, 44100), 86.0 * 512.0 / 44100.0);
/// ```
pub fn beat_time_seconds(frame: u64, hop_size: usize, sample_rate: u32) -> f64 {
    (hop_size as f64 / sample_rate as f64) * frame as f64
}

/// One beat tracking session
///
/// Drive it with audio via [`process_hop`](Self::process_hop) or with a
/// precomputed onset detection function via
/// [`process_onset_sample`](Self::process_onset_sample), one hop at a time,
/// and query the state after each call. [`track`](Self::track) processes a
/// whole onset detection function in the configured [`TrackingMode`].
///
/// # Example
///
/// ```
/// use beat_tracker::{BeatTracker, TrackerConfig};
///
/// let mut tracker = BeatTracker::new(&TrackerConfig::default(), 44100)?;
/// let mut beats = 0;
/// for _ in 0..1000 {
///     if tracker.process_onset_sample(0.0).is_some() {
///         beats += 1;
///     }
/// }
/// assert!(beats > 0);
/// # Ok::<(), beat_tracker::TrackerError>(())
/// ```
#[derive(Debug)]
pub struct BeatTracker {
    config: TrackerConfig,
    sample_rate: u32,
    onset: OnsetDetectionFunction,
    tempo: TempoEstimator,
    onset_history: HopHistory,
    cumulative_score: HopHistory,
    window: TransitionWindow,
    beat_period: f64,
    hops_until_prediction: i64,
    hops_until_beat: i64,
    beat_due: bool,
    latest_cumulative_score: f64,
    hops_processed: u64,
    phase: TrackingPhase,
}

impl BeatTracker {
    /// Create a tracking session
    ///
    /// # Arguments
    ///
    /// * `config` - Tracker configuration
    /// * `sample_rate` - Sample rate of the audio in Hz
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidConfig`] if the configuration is invalid
    /// or the onset history is too short for the slowest tempo at this sample
    /// rate, and [`TrackerError::InvalidInput`] for a zero sample rate.
    pub fn new(config: &TrackerConfig, sample_rate: u32) -> Result<Self, TrackerError> {
        config.validate()?;

        if sample_rate == 0 {
            return Err(TrackerError::InvalidInput(
                "Sample rate must be > 0".to_string(),
            ));
        }

        let history_len = config.onset_history_len();
        let fs = sample_rate as f64;
        let slowest = beat_period_for_tempo(config.min_bpm, fs, config.hop_size)
            .max(beat_period_for_tempo(config.initial_tempo_bpm, fs, config.hop_size));
        if 2.0 * slowest > history_len as f64 {
            return Err(TrackerError::InvalidConfig(format!(
                "Onset history of {} hops cannot hold two beats of {} hops; increase hop size or min_bpm",
                history_len, slowest
            )));
        }

        let fastest = beat_period_for_tempo(config.max_bpm, fs, config.hop_size);
        if fastest < 1.0 {
            return Err(TrackerError::InvalidConfig(format!(
                "Hop size {} is too large for {:.1} BPM at {} Hz",
                config.hop_size, config.max_bpm, sample_rate
            )));
        }

        let onset = OnsetDetectionFunction::from_config(config)?;
        let tempo = TempoEstimator::new(
            sample_rate,
            config.hop_size,
            history_len,
            config.min_bpm,
            config.max_bpm,
            config.initial_tempo_bpm,
        )?;

        let beat_period = tempo.current().beat_period.max(1.0);
        let pulse = beat_period as usize;
        let onset_history = HopHistory::from_fn(history_len, |i| if i % pulse == 0 { 1.0 } else { 0.0 });
        let cumulative_score = HopHistory::new(history_len);

        log::debug!(
            "Beat tracker: {} Hz, hop={}, history={} hops, initial period={} hops, mode={}",
            sample_rate,
            config.hop_size,
            history_len,
            beat_period,
            config.tracking_mode
        );

        Ok(Self {
            config: config.clone(),
            sample_rate,
            onset,
            tempo,
            onset_history,
            cumulative_score,
            window: TransitionWindow::new(beat_period, config.tightness),
            beat_period,
            hops_until_prediction: FIRST_PREDICTION_HOPS,
            hops_until_beat: -1,
            beat_due: false,
            latest_cumulative_score: 0.0,
            hops_processed: 0,
            phase: TrackingPhase::AwaitingFirstBeat,
        })
    }

    /// Process one hop of audio
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidInput`] if `hop` does not hold exactly
    /// `hop_size` samples.
    pub fn process_hop(&mut self, hop: &[f64]) -> Result<Option<BeatEvent>, TrackerError> {
        let sample = self.onset.process_hop(hop)?;
        Ok(self.process_onset_sample(sample))
    }

    /// Process one onset detection function sample
    ///
    /// # Returns
    ///
    /// The beat emitted at this hop, if any.
    pub fn process_onset_sample(&mut self, sample: f64) -> Option<BeatEvent> {
        self.step(sample).0
    }

    /// Process a complete onset detection function in the configured mode
    ///
    /// In causal mode this is equivalent to calling
    /// [`process_onset_sample`](Self::process_onset_sample) for every value.
    /// In offline mode the same engine runs over all values and the beats are
    /// then read back from the cumulative score.
    pub fn track(&mut self, odf: &[f64]) -> Vec<BeatEvent> {
        match self.config.tracking_mode {
            TrackingMode::Causal => odf
                .iter()
                .filter_map(|&sample| self.process_onset_sample(sample))
                .collect(),
            TrackingMode::Offline => {
                let trace: Vec<ScoreStep> = odf.iter().map(|&sample| self.step(sample).1).collect();
                let frames = backtrack_beats(&trace, self.config.peak_threshold_decay);
                let first_frame = trace.first().map_or(0, |step| step.frame);

                frames
                    .into_iter()
                    .map(|frame| {
                        let step = &trace[(frame - first_frame) as usize];
                        BeatEvent {
                            frame,
                            time_seconds: beat_time_seconds(frame, self.config.hop_size, self.sample_rate),
                            tempo_bpm: tempo_for_beat_period(
                                step.beat_period,
                                self.sample_rate as f64,
                                self.config.hop_size,
                            ),
                        }
                    })
                    .collect()
            }
        }
    }

    fn step(&mut self, sample: f64) -> (Option<BeatEvent>, ScoreStep) {
        let sample = if sample.is_finite() { sample.abs() } else { 0.0 } + ONSET_FLOOR;
        let frame = self.hops_processed;

        self.hops_until_prediction -= 1;
        self.hops_until_beat -= 1;
        self.beat_due = false;

        self.onset_history.push(sample);
        let step = self.update_cumulative_score(sample, frame);

        if self.hops_until_prediction == 0 {
            self.predict_beat();
        }

        let mut event = None;
        if self.hops_until_beat == 0 {
            self.beat_due = true;
            self.phase = TrackingPhase::Tracking;

            if self.config.tempo_update == TempoUpdate::OnBeat {
                self.update_tempo();
            }

            let beat = BeatEvent {
                frame,
                time_seconds: beat_time_seconds(frame, self.config.hop_size, self.sample_rate),
                tempo_bpm: self.current_tempo_bpm(),
            };
            log::trace!("Beat at hop {} ({:.3}s)", beat.frame, beat.time_seconds);
            event = Some(beat);
        }

        self.hops_processed += 1;

        if let TempoUpdate::Interval(interval) = self.config.tempo_update {
            if self.hops_processed % interval as u64 == 0 {
                self.update_tempo();
            }
        }

        (event, step)
    }

    fn update_cumulative_score(&mut self, sample: f64, frame: u64) -> ScoreStep {
        let position = self.cumulative_score.len();
        let (best, best_index) = self
            .window
            .best_predecessor(|i| self.cumulative_score.get(i), position);

        let alpha = self.config.alpha;
        let score = (1.0 - alpha) * sample + alpha * best;
        self.latest_cumulative_score = score;
        self.cumulative_score.push(score);

        ScoreStep {
            frame,
            score,
            beat_period: self.beat_period,
            predecessor: best_index.and_then(|i| (frame + i as u64).checked_sub(position as u64)),
        }
    }

    fn predict_beat(&mut self) {
        let history = self.cumulative_score.to_vec();
        if let Some(hops) = predict_next_beat(&history, &self.window) {
            self.hops_until_beat = hops as i64;
        }
        self.hops_until_prediction = self.hops_until_beat + (self.beat_period / 2.0).round() as i64;
    }

    fn update_tempo(&mut self) {
        let history = self.onset_history.to_vec();
        let estimate = self.tempo.estimate(&history);
        self.set_beat_period(estimate.beat_period);
    }

    fn set_beat_period(&mut self, beat_period: f64) {
        let beat_period = beat_period.max(1.0);
        if beat_period != self.beat_period {
            self.beat_period = beat_period;
            self.window = TransitionWindow::new(beat_period, self.config.tightness);
        }
    }

    /// Force the tracker to a tempo
    ///
    /// The tempo (folded by octaves into the tempo range) replaces the tempo
    /// posterior, both histories are rewritten as a pulse train at the new
    /// period ending now, and the next beat is predicted half a period ahead.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidInput`] for a non-positive or
    /// non-finite tempo.
    pub fn set_tempo(&mut self, bpm: f64) -> Result<(), TrackerError> {
        check_tempo(bpm)?;

        let beat_period = self.tempo.set_tempo(bpm);
        let pulse = beat_period.max(1.0) as usize;
        let len = self.onset_history.len();
        let synthetic = |i: usize| {
            if (len - 1 - i) % pulse == 0 {
                SYNTHETIC_BEAT_VALUE
            } else {
                SYNTHETIC_OFFBEAT_VALUE
            }
        };
        self.onset_history.refill(&synthetic);
        self.cumulative_score.refill(&synthetic);

        self.hops_until_beat = 0;
        self.hops_until_prediction = (beat_period / 2.0).round() as i64;
        self.set_beat_period(beat_period);
        Ok(())
    }

    /// Constrain every future tempo estimate to one tempo
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidInput`] for a non-positive or
    /// non-finite tempo.
    pub fn fix_tempo(&mut self, bpm: f64) -> Result<(), TrackerError> {
        check_tempo(bpm)?;
        self.tempo.fix_tempo(bpm);
        Ok(())
    }

    /// Let the tempo follow the signal again after [`fix_tempo`](Self::fix_tempo)
    pub fn unfix_tempo(&mut self) {
        self.tempo.unfix_tempo();
    }

    /// Whether a beat was emitted by the last processed hop
    pub fn beat_due_in_current_frame(&self) -> bool {
        self.beat_due
    }

    /// Current tempo in BPM
    pub fn current_tempo_bpm(&self) -> f64 {
        self.tempo.current().bpm
    }

    /// Current beat period in hops
    pub fn current_beat_period(&self) -> f64 {
        self.beat_period
    }

    /// Full tempo estimate
    pub fn tempo_estimate(&self) -> TempoEstimate {
        self.tempo.current()
    }

    /// Cumulative score of the last processed hop
    pub fn latest_cumulative_score(&self) -> f64 {
        self.latest_cumulative_score
    }

    /// Hops until the predicted next beat, if one is scheduled
    pub fn hops_until_next_beat(&self) -> Option<u64> {
        u64::try_from(self.hops_until_beat).ok().filter(|&hops| hops > 0)
    }

    /// Tracking state
    pub fn phase(&self) -> TrackingPhase {
        self.phase
    }

    /// Hops processed so far
    pub fn hops_processed(&self) -> u64 {
        self.hops_processed
    }

    /// Samples per hop
    pub fn hop_size(&self) -> usize {
        self.config.hop_size
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Session configuration
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

fn check_tempo(bpm: f64) -> Result<(), TrackerError> {
    if bpm.is_finite() && bpm > 0.0 {
        Ok(())
    } else {
        Err(TrackerError::InvalidInput(format!("Invalid tempo: {}", bpm)))
    }
}
