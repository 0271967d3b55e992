//! Engine-level error type.

use std::error::Error;
use std::fmt;

use tremor_core::GeometryError;
use tremor_propagator::PropagatorError;
use tremor_store::StoreError;

/// Errors surfaced by gradient computation, line search, or the driver.
///
/// Numerical degeneracies (line-search exhaustion, parabolic colinearity,
/// clamped cells) are *not* errors: they are recovered locally and
/// reported through [`crate::IterationReport`] and log warnings. Only
/// geometry, kernel-contract, and I/O failures propagate.
#[derive(Debug)]
pub enum InversionError {
    /// Acquisition geometry is inconsistent with the grid.
    Geometry(GeometryError),
    /// A propagator kernel rejected its buffers.
    Propagator(PropagatorError),
    /// Checkpoint or volume I/O failed. Fatal, no retry.
    Store(StoreError),
}

impl fmt::Display for InversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geometry(e) => write!(f, "geometry: {e}"),
            Self::Propagator(e) => write!(f, "propagator: {e}"),
            Self::Store(e) => write!(f, "store: {e}"),
        }
    }
}

impl Error for InversionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Geometry(e) => Some(e),
            Self::Propagator(e) => Some(e),
            Self::Store(e) => Some(e),
        }
    }
}

impl From<GeometryError> for InversionError {
    fn from(e: GeometryError) -> Self {
        Self::Geometry(e)
    }
}

impl From<PropagatorError> for InversionError {
    fn from(e: PropagatorError) -> Self {
        Self::Propagator(e)
    }
}

impl From<StoreError> for InversionError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
