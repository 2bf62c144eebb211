//! Error types for the windsway core.

use thiserror::Error;

/// Errors produced by grid construction, image loading, and stage steps.
#[derive(Debug, Error)]
pub enum SwayError {
    /// Width or height was zero (or their product overflowed) when creating a grid.
    #[error("invalid dimensions: width and height must be non-zero")]
    InvalidDimensions,

    /// Two grids had incompatible dimensions for a cell-aligned operation.
    #[error("dimension mismatch: ({lhs_w}, {lhs_h}) vs ({rhs_w}, {rhs_h})")]
    DimensionMismatch {
        lhs_w: usize,
        lhs_h: usize,
        rhs_w: usize,
        rhs_h: usize,
    },

    /// A raw RGBA byte buffer did not match its declared dimensions.
    #[error("pixel buffer for {width}x{height} needs {expected} bytes, got {got}")]
    BufferSize {
        width: usize,
        height: usize,
        expected: usize,
        got: usize,
    },

    /// A stage was stepped after the classification cache was invalidated
    /// and before it was refreshed.
    #[error("pixel classification is not available; refresh the simulation state first")]
    NotClassified,

    /// A color string could not be parsed.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// A configuration value was malformed.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Reading or writing an image failed.
    #[error("i/o error: {0}")]
    Io(String),
}
