//! Cumulative score recursion and beat prediction
//!
//! The cumulative score at hop `t` combines the onset strength at `t` with the
//! best weighted score of a plausible previous beat:
//!
//! ```text
//! C[t] = (1 - α)·O[t] + α·max_{τ ∈ [2p, p/2]} W(τ)·C[t - τ]
//! W(τ) = exp(-(η·ln(τ / p))² / 2)
//! ```
//!
//! where `p` is the beat period in hops and `η` the tightness. `W` is a
//! log-Gaussian that peaks one beat period back.
//!
//! # Reference
//!
//! Ellis, D. P. W. (2007). Beat Tracking by Dynamic Programming.
//! *Journal of New Music Research*, 36(1), 51-60.

/// Log-Gaussian transition weights for one beat period
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionWindow {
    beat_period: f64,
    tightness: f64,
    far: usize,
    near: usize,
    weights: Vec<f64>,
}

impl TransitionWindow {
    /// Build the window for a beat period (in hops) and tightness
    ///
    /// The window spans offsets `round(2p)` (oldest) to `round(p/2)` (newest)
    /// before the current hop.
    pub fn new(beat_period: f64, tightness: f64) -> Self {
        let beat_period = beat_period.max(1.0);
        let far = (2.0 * beat_period).round() as usize;
        let near = ((beat_period / 2.0).round() as usize).max(1);
        let len = far.saturating_sub(near) + 1;

        let mut weights = Vec::with_capacity(len);
        let mut v = -2.0 * beat_period;
        for _ in 0..len {
            let log_ratio = (-v / beat_period).ln();
            weights.push((-(tightness * log_ratio).powi(2) / 2.0).exp());
            v += 1.0;
        }

        Self {
            beat_period,
            tightness,
            far,
            near,
            weights,
        }
    }

    /// Beat period the window was built for
    pub fn beat_period(&self) -> f64 {
        self.beat_period
    }

    /// Tightness the window was built for
    pub fn tightness(&self) -> f64 {
        self.tightness
    }

    /// Weights, oldest offset first
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Largest offset covered by the window
    pub fn far_offset(&self) -> usize {
        self.far
    }

    /// Best weighted score before `position`
    ///
    /// # Arguments
    ///
    /// * `score` - Score at an index (only indices below `position` are read)
    /// * `position` - Index of the hop being scored
    ///
    /// # Returns
    ///
    /// The maximum of `weight · score` over the window (0 if nothing is
    /// positive) and the index it was found at. Indices before 0 are skipped.
    pub fn best_predecessor(&self, score: impl Fn(usize) -> f64, position: usize) -> (f64, Option<usize>) {
        let mut best = 0.0;
        let mut best_index = None;

        for (n, &weight) in self.weights.iter().enumerate() {
            let Some(index) = (position + n).checked_sub(self.far) else {
                continue;
            };
            let weighted = score(index) * weight;
            if weighted > best {
                best = weighted;
                best_index = Some(index);
            }
        }

        (best, best_index)
    }
}

/// Predict the next beat from the cumulative score history
///
/// The score is extended one beat period into the future using the
/// recursion without onset input, and the extension is weighted by a Gaussian
/// centred half a period ahead.
///
/// # Arguments
///
/// * `history` - Cumulative score, oldest first
/// * `window` - Transition window for the current beat period
///
/// # Returns
///
/// Hops from now (0 = the next hop after `history`) to the predicted beat,
/// or `None` when the extended score is nowhere positive.
pub fn predict_next_beat(history: &[f64], window: &TransitionWindow) -> Option<usize> {
    let beat_period = window.beat_period();
    let horizon = beat_period as usize;
    let offset = history.len();

    let mut future = Vec::with_capacity(offset + horizon);
    future.extend_from_slice(history);
    for i in offset..offset + horizon {
        let (best, _) = window.best_predecessor(|k| future[k], i);
        future.push(best);
    }

    let half = beat_period / 2.0;
    let mut best = 0.0;
    let mut best_offset = None;
    for n in 0..horizon {
        let v = (n + 1) as f64;
        let weight = (-(v - half).powi(2) / (2.0 * half * half)).exp();
        let weighted = future[offset + n] * weight;
        if weighted > best {
            best = weighted;
            best_offset = Some(n);
        }
    }

    best_offset
}
