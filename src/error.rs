//! Error types for the beat tracking engine

use thiserror::Error;

/// Errors that can occur while configuring or driving a tracking session
///
/// Both variants are raised before any processing starts: configuration is
/// checked when a session is built and inputs are checked when a facade call
/// begins. Once inputs are accepted the computation is total.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    /// Invalid configuration (frame/hop sizes, tempo range, unknown method names)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid input data (empty audio, non-finite samples, zero sample rate)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrackerError::InvalidConfig("hop size must be > 0".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: hop size must be > 0");

        let err = TrackerError::InvalidInput("Empty audio samples".to_string());
        assert!(err.to_string().starts_with("Invalid input"));
    }
}
