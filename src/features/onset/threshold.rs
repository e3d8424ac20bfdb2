//! Adaptive thresholding utilities
//!
//! Two flavours are provided:
//!
//! - [`moving_mean_threshold`] subtracts a local moving average from a signal
//!   and half-wave rectifies the result. It removes slowly varying energy so
//!   that only peaks remain, and is applied to the onset detection function
//!   and to the comb filterbank output during tempo induction.
//! - [`DecayingPeakThreshold`] tracks an exponentially decaying average of
//!   observed peak values. It scales with the overall level of the signal,
//!   which a fixed threshold cannot do.

/// Samples before the current one that enter the moving mean
const MEAN_WINDOW_PRE: usize = 8;

/// Samples after the current one that enter the moving mean
const MEAN_WINDOW_POST: usize = 7;

/// Mean of `values[start..end]`, zero for an empty range
fn mean_of_range(values: &[f64], start: usize, end: usize) -> f64 {
    if end <= start {
        return 0.0;
    }
    values[start..end].iter().sum::<f64>() / (end - start) as f64
}

/// Subtract a moving-mean threshold from `values` in place
///
/// The threshold at index `i` is the mean over `[i - 8, i + 7)`. Near the
/// edges, where the full window does not fit, the mean is taken over the part
/// of the signal that is available. Negative results are clamped to zero.
///
/// # Example
///
/// ```
/// use beat_tracker::features::onset::threshold::moving_mean_threshold;
///
/// let mut values = vec![1.0; 32];
/// values[16] = 5.0;
/// moving_mean_threshold(&mut values);
/// assert!(values[16] > 0.0);
/// assert_eq!(values[4], 0.0);
/// ```
pub fn moving_mean_threshold(values: &mut [f64]) {
    let n = values.len();
    if n == 0 {
        return;
    }

    let mut thresholds = vec![0.0; n];
    let head = MEAN_WINDOW_POST.min(n - 1);

    for (i, threshold) in thresholds.iter_mut().enumerate().take(head + 1) {
        let end = (i + MEAN_WINDOW_PRE).min(n);
        *threshold = mean_of_range(values, 1, end);
    }

    for i in (head + 1)..n.saturating_sub(MEAN_WINDOW_POST) {
        thresholds[i] = mean_of_range(values, i - MEAN_WINDOW_PRE, i + MEAN_WINDOW_POST);
    }

    for i in n.saturating_sub(MEAN_WINDOW_POST)..n {
        let start = i.saturating_sub(MEAN_WINDOW_POST).max(1);
        thresholds[i] = mean_of_range(values, start, n);
    }

    for (value, threshold) in values.iter_mut().zip(thresholds.iter()) {
        *value = (*value - threshold).max(0.0);
    }
}

/// Exponentially decaying average of peak values
///
/// `value <- decay * value + (1 - decay) * peak`. The first observed peak
/// initialises the average directly.
#[derive(Debug, Clone)]
pub struct DecayingPeakThreshold {
    decay: f64,
    value: Option<f64>,
}

impl DecayingPeakThreshold {
    /// Create a threshold with the given decay factor in `[0, 1)`
    pub fn new(decay: f64) -> Self {
        Self {
            decay: decay.clamp(0.0, 0.999_999),
            value: None,
        }
    }

    /// Feed a new peak value and return the updated threshold
    pub fn update(&mut self, peak: f64) -> f64 {
        let next = match self.value {
            Some(current) => self.decay * current + (1.0 - self.decay) * peak,
            None => peak,
        };
        self.value = Some(next);
        next
    }

    /// Current threshold, zero before any peak has been observed
    pub fn value(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_mean_threshold_removes_constant_signal() {
        let mut values = vec![3.0; 64];
        moving_mean_threshold(&mut values);
        assert!(values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_moving_mean_threshold_keeps_peaks() {
        let mut values = vec![0.0; 64];
        for i in (0..64).step_by(16) {
            values[i + 8] = 10.0;
        }
        moving_mean_threshold(&mut values);

        for i in (0..64).step_by(16) {
            assert!(values[i + 8] > 8.0, "peak at {} was suppressed", i + 8);
        }
        assert!(values.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_moving_mean_threshold_short_inputs() {
        let mut empty: Vec<f64> = vec![];
        moving_mean_threshold(&mut empty);

        let mut short = vec![1.0, 4.0, 1.0];
        moving_mean_threshold(&mut short);
        assert_eq!(short.len(), 3);
        assert!(short.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_decaying_peak_threshold() {
        let mut threshold = DecayingPeakThreshold::new(0.5);
        assert_eq!(threshold.value(), 0.0);
        assert_eq!(threshold.update(4.0), 4.0);
        assert_eq!(threshold.update(2.0), 3.0);
        assert_eq!(threshold.update(3.0), 3.0);
    }
}
