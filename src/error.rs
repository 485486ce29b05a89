//! Crate-wide error type.

use thiserror::Error;

/// Errors produced while reading capture files or decoding Velodyne packets.
#[derive(Debug, Error)]
pub enum Error {
    /// The 24-byte capture file header did not start with a recognized
    /// pcap magic number in either byte order.
    #[error("invalid capture file magic number: {0:02x?}")]
    InvalidCaptureMagic([u8; 4]),

    /// The payload's product ID byte has no known calibration.
    #[error("unsupported Velodyne product id: {0}")]
    UnsupportedModel(u8),

    /// A `CalibrationOverrides` document named a model with the wrong
    /// number of per-channel values for its array.
    #[error("calibration override for {model} field `{field}` must have {expected} entries, found {found}")]
    InvalidOverrideLength {
        model: &'static str,
        field: &'static str,
        expected: usize,
        found: usize,
    },

    /// Wraps I/O failures from opening or reading a capture file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
