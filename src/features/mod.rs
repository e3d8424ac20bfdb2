//! Feature extraction modules
//!
//! This module contains the analysis stages, in pipeline order:
//! - Spectral frontend (framing, windowing, FFT)
//! - Onset detection function (10 methods)
//! - Period estimation (tempo induction)
//! - Beat tracking (causal prediction and offline backtracking)

pub mod beat_tracking;
pub mod onset;
pub mod period;
pub mod spectral;
