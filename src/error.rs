//! Error taxonomy for the aggregation and point-location engine.

use thiserror::Error;

/// Errors produced by the pure engine operations.
///
/// All operations are deterministic over immutable inputs, so none of these
/// are retryable: the same call with the same input yields the same outcome.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or empty geometry input.
    #[error("invalid geometry in {op}: {reason}")]
    InvalidGeometry { op: &'static str, reason: String },

    /// Out-of-range clustering or aggregation parameter.
    #[error("invalid parameter for {op}: {reason}")]
    InvalidParameter { op: &'static str, reason: String },

    /// A point-location query matched no feature. Callers treat this as a
    /// normal "no match" outcome, not a failure.
    #[error("no feature contains the queried point")]
    NotFound,
}

impl EngineError {
    pub fn invalid_geometry(op: &'static str, reason: impl Into<String>) -> Self {
        EngineError::InvalidGeometry {
            op,
            reason: reason.into(),
        }
    }

    pub fn invalid_parameter(op: &'static str, reason: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            op,
            reason: reason.into(),
        }
    }
}
