//! Error types for the descriptor engine

use thiserror::Error;

/// Errors that can occur while measuring or analyzing a track
///
/// Every variant is recoverable at single-track granularity: the engine turns
/// any of them into an error record instead of propagating past its boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Audio could not be read or parsed
    #[error("Decoding error: {0}")]
    DecodingError(String),

    /// A DSP computation failed on otherwise valid audio
    #[error("Measurement error: {0}")]
    MeasurementError(String),

    /// The front-end does not provide the requested measurement
    #[error("Measurement unavailable: {0}")]
    MeasurementUnavailable(String),

    /// Invalid command-line arguments or configuration values
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Numerical error (overflow, non-finite intermediate, etc.)
    #[error("Numerical error: {0}")]
    NumericalError(String),
}

impl AnalysisError {
    /// True when the error signals a missing capability rather than a failure
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AnalysisError::MeasurementUnavailable(_))
    }
}
