use thiserror::Error;

/// Errors raised by the tempo analysis pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Configuration rejected before any processing starts.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input data a stage cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Band-pass design produced no usable filter for a band.
    #[error("filter design failed for {low_hz}-{high_hz} Hz: {reason}")]
    FilterDesign {
        low_hz: f64,
        high_hz: f64,
        reason: String,
    },

    /// Non-finite values appeared while processing a band.
    #[error("numerical error: {0}")]
    Numerical(String),
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;
