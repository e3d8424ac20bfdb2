//! Analysis window functions
//!
//! Each audio frame is multiplied by a smoothing window before the FFT to
//! limit spectral leakage. The Hann window is the default.

use crate::error::TrackerError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Taper ratio of the Tukey window
const TUKEY_ALPHA: f64 = 0.5;

/// Window applied to each audio frame before the FFT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowType {
    /// No tapering
    Rectangular,
    /// Raised cosine, zero at both ends
    #[default]
    Hann,
    /// Raised cosine on a 0.08 pedestal
    Hamming,
    /// Three-term cosine window
    Blackman,
    /// Flat top with cosine tapers
    Tukey,
}

impl WindowType {
    /// Canonical kebab-case name
    pub fn name(&self) -> &'static str {
        match self {
            WindowType::Rectangular => "rectangular",
            WindowType::Hann => "hann",
            WindowType::Hamming => "hamming",
            WindowType::Blackman => "blackman",
            WindowType::Tukey => "tukey",
        }
    }

    /// Compute the window coefficients for a frame of `len` samples
    pub fn coefficients(&self, len: usize) -> Vec<f64> {
        if len < 2 {
            return vec![1.0; len];
        }

        let n_max = (len - 1) as f64;

        match self {
            WindowType::Rectangular => vec![1.0; len],
            WindowType::Hann => (0..len)
                .map(|n| 0.5 * (1.0 - (2.0 * PI * (n as f64 / n_max)).cos()))
                .collect(),
            WindowType::Hamming => (0..len)
                .map(|n| 0.54 - 0.46 * (2.0 * PI * (n as f64 / n_max)).cos())
                .collect(),
            WindowType::Blackman => (0..len)
                .map(|n| {
                    let x = n as f64 / n_max;
                    0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
                })
                .collect(),
            WindowType::Tukey => {
                let flat = TUKEY_ALPHA * (n_max / 2.0);
                let first = 1.0 - (len / 2) as f64;

                (0..len)
                    .map(|n| {
                        let position = first + n as f64;
                        if position.abs() <= flat {
                            1.0
                        } else {
                            0.5 * (1.0 + (PI * ((2.0 * position) / (TUKEY_ALPHA * n_max) - 1.0)).cos())
                        }
                    })
                    .collect()
            }
        }
    }
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WindowType {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rectangular" | "rect" => Ok(WindowType::Rectangular),
            "hann" | "hanning" => Ok(WindowType::Hann),
            "hamming" => Ok(WindowType::Hamming),
            "blackman" => Ok(WindowType::Blackman),
            "tukey" => Ok(WindowType::Tukey),
            other => Err(TrackerError::InvalidConfig(format!(
                "Unsupported window type: {}",
                other
            ))),
        }
    }
}
