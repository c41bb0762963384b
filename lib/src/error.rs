//! Error types for the wavelet transform
//!
//! Every fallible operation in the crate returns [`CwtError`] through the
//! crate-wide [`Result`](crate::Result) alias.

use std::collections::TryReserveError;
use thiserror::Error;

/// Errors produced while building spectra, bands or wavelet rows
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CwtError {
    /// Empty or malformed input (signal, spectrum, row range, configuration)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested row width is wider than the unpadded input
    #[error("Output width {output_width} exceeds input width {input_width}")]
    InvalidOutputWidth {
        output_width: usize,
        input_width: usize,
    },

    /// Output width does not map onto a whole number of output samples
    #[error(
        "Output width {output_width} does not divide evenly: {output_width} * {input_sample_count} is not a multiple of {input_width}"
    )]
    UnalignedOutputWidth {
        output_width: usize,
        input_width: usize,
        input_sample_count: usize,
    },

    /// Scratch or transform buffer could not be allocated
    #[error("Failed to allocate {requested} samples: {reason}")]
    AllocationFailure { requested: usize, reason: String },

    /// The FFT backend rejected the transform
    #[error("FFT error: {0}")]
    TransformFailure(String),

    /// A failure after some rows of a range were already delivered
    #[error("Row computation stopped at row {row}: {source}")]
    RowFailed {
        row: usize,
        #[source]
        source: Box<CwtError>,
    },

    /// File system error
    #[error("I/O error: {0}")]
    Io(String),

    /// Audio decoding/encoding or image encoding error
    #[error("Codec error: {0}")]
    Codec(String),
}

impl CwtError {
    /// Wrap an allocation failure for a buffer of `requested` samples
    pub fn allocation(requested: usize, err: TryReserveError) -> Self {
        CwtError::AllocationFailure {
            requested,
            reason: err.to_string(),
        }
    }

    /// Row index at which a range computation stopped, if any
    pub fn failed_row(&self) -> Option<usize> {
        match self {
            CwtError::RowFailed { row, .. } => Some(*row),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CwtError {
    fn from(err: std::io::Error) -> Self {
        CwtError::Io(err.to_string())
    }
}

impl From<hound::Error> for CwtError {
    fn from(err: hound::Error) -> Self {
        CwtError::Codec(err.to_string())
    }
}

impl From<symphonia::core::errors::Error> for CwtError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        CwtError::Codec(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_row() {
        let err = CwtError::RowFailed {
            row: 7,
            source: Box::new(CwtError::TransformFailure("boom".to_string())),
        };
        assert_eq!(err.failed_row(), Some(7));
        assert!(err.to_string().contains("row 7"));
        assert!(err.to_string().contains("boom"));

        let err = CwtError::InvalidOutputWidth {
            output_width: 20,
            input_width: 10,
        };
        assert_eq!(err.failed_row(), None);
    }

    #[test]
    fn test_allocation_error() {
        let mut v: Vec<u64> = Vec::new();
        let reserve = v.try_reserve_exact(usize::MAX).unwrap_err();
        let err = CwtError::allocation(usize::MAX, reserve);
        assert!(matches!(err, CwtError::AllocationFailure { .. }));
    }
}
