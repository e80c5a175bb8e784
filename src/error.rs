use thiserror::Error;

/// Possible net radiation errors.
///
/// Physically degenerate values (negative square-root arguments, the sun
/// below the horizon, zero day length) are never errors; they surface as NaN
/// in the output field.
#[derive(Error, Debug)]
pub enum NetRadiationError {
    /// The inputs can't be broadcast against each other
    #[error("inputs have incompatible shapes {left:?} and {right:?}")]
    ShapeMismatch { left: Vec<usize>, right: Vec<usize> },
    /// A timestamp string couldn't be parsed
    #[error("couldn't parse timestamp {0:?}")]
    InvalidTimestamp(String),
    /// Seconds since the epoch that don't map to a calendar date
    #[error("timestamp {0} s is outside the representable date range")]
    TimestampOutOfRange(f64),
    /// A structurally invalid field
    #[error("invalid field: {0}")]
    InvalidField(String),
}

/// Convenience type for `Result<T, NetRadiationError>`.
pub type Result<T> = std::result::Result<T, NetRadiationError>;
