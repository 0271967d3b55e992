//! Error types for the store.

use std::fmt;
use std::io;

/// Errors from volume I/O, header parsing, or the checkpoint store.
///
/// All store errors are fatal to the operation that raised them; there is
/// no retry policy.
#[derive(Debug)]
pub enum StoreError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// A volume on disk does not hold the expected number of samples.
    ShapeMismatch {
        /// Expected element count.
        expected: usize,
        /// Element count actually present.
        found: usize,
    },
    /// A header line could not be parsed.
    MalformedHeader {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A required header field is absent.
    MissingField {
        /// Name of the absent field.
        name: String,
    },
    /// A checkpoint was requested that was never saved.
    CheckpointMissing {
        /// The key that could not be resolved.
        key: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::ShapeMismatch { expected, found } => {
                write!(f, "volume holds {found} samples, expected {expected}")
            }
            Self::MalformedHeader { detail } => write!(f, "malformed header: {detail}"),
            Self::MissingField { name } => write!(f, "missing header field '{name}'"),
            Self::CheckpointMissing { key } => write!(f, "checkpoint '{key}' was never saved"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
