//! Geometry and grid validation errors.

use std::error::Error;
use std::fmt;

/// Errors detected while constructing grids or validating acquisition
/// geometry. All variants are fatal at startup: a source or receiver
/// outside the computing zone cannot be recovered from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeometryError {
    /// A grid dimension or spacing is unusable.
    InvalidGrid {
        /// Description of which parameter was rejected.
        reason: String,
    },
    /// A source or receiver position falls outside the interior grid.
    OutOfComputingZone {
        /// Which array the offending position belongs to (`"source"` or
        /// `"receiver"`).
        what: &'static str,
        /// Index of the offending element within its array.
        index: usize,
        /// Depth index of the offending position (interior coordinates).
        iz: usize,
        /// Lateral index of the offending position (interior coordinates).
        ix: usize,
        /// Interior grid depth extent.
        nz: usize,
        /// Interior grid lateral extent.
        nx: usize,
    },
    /// A data volume does not match the shape implied by the grid.
    ShapeMismatch {
        /// Expected element count.
        expected: usize,
        /// Element count actually provided.
        found: usize,
    },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGrid { reason } => write!(f, "invalid grid: {reason}"),
            Self::OutOfComputingZone {
                what,
                index,
                iz,
                ix,
                nz,
                nx,
            } => write!(
                f,
                "{what} {index} at (iz={iz}, ix={ix}) is outside the {nz}x{nx} computing zone"
            ),
            Self::ShapeMismatch { expected, found } => {
                write!(f, "shape mismatch: expected {expected} elements, found {found}")
            }
        }
    }
}

impl Error for GeometryError {}
