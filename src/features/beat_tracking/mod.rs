//! Beat tracking modules
//!
//! Turn the onset detection function into beat times:
//! - Cumulative score recursion over a rolling history
//! - Causal beat prediction half a beat ahead
//! - Offline backtracking through the complete score

pub mod backtrack;
pub mod cumulative;
pub mod history;
pub mod tracker;

pub use tracker::{beat_time_seconds, BeatTracker};

use crate::error::TrackerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How beats are placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackingMode {
    /// Beats are predicted from past input only and never revised
    #[default]
    Causal,
    /// Beats are chosen by backtracking through the whole cumulative score
    Offline,
}

impl TrackingMode {
    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            TrackingMode::Causal => "causal",
            TrackingMode::Offline => "offline",
        }
    }
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrackingMode {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "causal" | "online" | "real-time" | "realtime" => Ok(TrackingMode::Causal),
            "offline" | "backtracking" => Ok(TrackingMode::Offline),
            _ => Err(TrackerError::InvalidConfig(format!(
                "Unsupported tracking mode: {}",
                s
            ))),
        }
    }
}

/// Tracking state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackingPhase {
    /// No beat has been emitted yet
    AwaitingFirstBeat,
    /// At least one beat has been emitted
    Tracking,
}

/// When the tempo is re-estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TempoUpdate {
    /// On every emitted beat
    #[default]
    OnBeat,
    /// Every given number of hops
    Interval(usize),
}

/// A single detected beat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatEvent {
    /// Hop index of the beat
    pub frame: u64,

    /// Beat time in seconds
    pub time_seconds: f64,

    /// Tempo estimate when the beat was emitted
    pub tempo_bpm: f64,
}
