//! Tempo state space and transition model
//!
//! Tempo candidates are spaced 2 BPM apart across the configured range. A
//! Gaussian transition matrix favours small tempo changes between successive
//! estimates, and a max-product (Viterbi) update combines the previous
//! posterior with the current comb filterbank observation.

use std::f64::consts::PI;

/// Spacing between tempo candidates in BPM
pub const TEMPO_STEP_BPM: f64 = 2.0;

/// Discrete tempo state space with a Gaussian transition matrix
#[derive(Debug, Clone)]
pub struct TempoTransitionModel {
    min_bpm: f64,
    candidates: Vec<f64>,
    matrix: Vec<Vec<f64>>,
}

impl TempoTransitionModel {
    /// Build the model for `[min_bpm, max_bpm]`
    ///
    /// The number of candidates is `floor((max - min) / 2) + 1`, 41 for the
    /// default range of 80-160 BPM. The transition spread is an eighth of the
    /// number of candidates (integer division, at least 1).
    pub fn new(min_bpm: f64, max_bpm: f64) -> Self {
        let span = (max_bpm - min_bpm).max(0.0);
        let num_states = (span / TEMPO_STEP_BPM).floor() as usize + 1;
        let candidates = (0..num_states)
            .map(|i| min_bpm + TEMPO_STEP_BPM * i as f64)
            .collect();

        let sigma = (num_states / 8).max(1) as f64;
        let norm = 1.0 / (sigma * (2.0 * PI).sqrt());
        let matrix = (0..num_states)
            .map(|i| {
                let mu = (i + 1) as f64;
                (0..num_states)
                    .map(|j| {
                        let x = (j + 1) as f64;
                        norm * (-(x - mu).powi(2) / (2.0 * sigma * sigma)).exp()
                    })
                    .collect()
            })
            .collect();

        Self {
            min_bpm,
            candidates,
            matrix,
        }
    }

    /// Number of tempo states
    pub fn num_states(&self) -> usize {
        self.candidates.len()
    }

    /// Tempo of each state in BPM
    pub fn candidates(&self) -> &[f64] {
        &self.candidates
    }

    /// Transition weight from state `from` to state `to`
    pub fn transition(&self, from: usize, to: usize) -> f64 {
        self.matrix[from][to]
    }

    /// Lowest tempo of the range
    pub fn min_bpm(&self) -> f64 {
        self.min_bpm
    }

    /// Highest tempo of the range
    pub fn max_bpm(&self) -> f64 {
        self.candidates.last().copied().unwrap_or(self.min_bpm)
    }

    /// Fold a tempo by octaves into the range and return its state index
    pub fn state_for_tempo(&self, bpm: f64) -> usize {
        let folded = fold_tempo(bpm, self.min_bpm, self.max_bpm());
        let index = ((folded - self.min_bpm) / TEMPO_STEP_BPM).round();
        (index.max(0.0) as usize).min(self.num_states() - 1)
    }

    /// Observation vector from a comb filterbank response
    ///
    /// # Arguments
    ///
    /// * `comb_output` - Filterbank response, index `lag - 1` for each lag
    /// * `lag_factor` - Lags per inverse BPM: `lag = lag_factor / bpm`
    ///
    /// The observation of tempo `T` adds the responses at the lags of `T` and
    /// of `2T`, so a tempo is supported by evidence of its double.
    pub fn observation(&self, comb_output: &[f64], lag_factor: f64) -> Vec<f64> {
        let lookup = |bpm: f64| -> f64 {
            if comb_output.is_empty() {
                return 0.0;
            }
            let lag = (lag_factor / bpm).round().max(1.0) as usize;
            comb_output[(lag - 1).min(comb_output.len() - 1)]
        };

        self.candidates
            .iter()
            .map(|&bpm| lookup(bpm) + lookup(2.0 * bpm))
            .collect()
    }

    /// One max-product update of the tempo posterior
    ///
    /// `delta[j] = max_i(previous[i] · T[i][j]) · observation[j]`, normalised
    /// by the sum of its positive entries.
    pub fn update(&self, previous: &[f64], observation: &[f64]) -> Vec<f64> {
        let mut delta: Vec<f64> = (0..self.num_states())
            .map(|j| {
                let best = previous
                    .iter()
                    .enumerate()
                    .map(|(i, &p)| p * self.matrix[i][j])
                    .fold(-1.0, |acc: f64, v| if v > acc { v } else { acc });
                best * observation.get(j).copied().unwrap_or(0.0)
            })
            .collect();

        normalise_positive(&mut delta);
        delta
    }
}

/// Fold `bpm` by octaves until it lies within `[min_bpm, max_bpm]`
///
/// For ranges narrower than an octave the result is clamped to `max_bpm`.
pub fn fold_tempo(bpm: f64, min_bpm: f64, max_bpm: f64) -> f64 {
    let mut tempo = bpm;
    while tempo > max_bpm {
        tempo /= 2.0;
    }
    while tempo < min_bpm {
        tempo *= 2.0;
    }
    tempo.min(max_bpm)
}

/// Divide by the sum of positive entries, if there are any
pub fn normalise_positive(values: &mut [f64]) {
    let sum: f64 = values.iter().filter(|&&v| v > 0.0).sum();
    if sum > 0.0 {
        for value in values.iter_mut() {
            *value /= sum;
        }
    }
}

/// Index of the first maximum, `None` for an empty slice
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, bv)) if v <= bv => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
