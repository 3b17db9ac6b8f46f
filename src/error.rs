//! Error types for the flux solver.
//!
//! Invalid inputs are rejected before any computation begins and abort the
//! whole batch. Non-convergence of the inner roughness iteration is *not*
//! an error: it is localized to the affected sample and surfaced as a
//! per-sample diagnostic flag on the output record.

use thiserror::Error;

/// Error type for flux solver input validation.
#[derive(Debug, Error)]
pub enum FluxError {
    /// Input arrays have different lengths.
    #[error("array length mismatch: `{name}` has {actual} entries, expected {expected}")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A measurement height is zero or negative; the log profile needs a
    /// strictly positive height.
    #[error("non-positive {name} height: {value} m")]
    NonPositiveHeight { name: &'static str, value: f64 },

    /// Station altitude is negative.
    #[error("negative altitude: {value} m")]
    NegativeAltitude { value: f64 },

    /// Relative humidity outside [0, 100] %.
    #[error("relative humidity out of range at sample {index}: {value} %")]
    HumidityOutOfRange { index: usize, value: f64 },
}
