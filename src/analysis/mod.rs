//! Analysis result aggregation
//!
//! Combines the onset detection function, tempo estimate and beat sequence
//! into a serialisable result:
//! - Confidence scoring
//! - Result types

pub mod confidence;
pub mod result;
