//! Core types for the Tremor full-waveform-inversion engine.
//!
//! This is the leaf crate with zero internal Tremor dependencies. It defines
//! the padded finite-difference grid, the velocity model in transformed
//! units, source/receiver geometry, the observed shot gather, the Ricker
//! source wavelet, and the geometry error type used by startup validation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod gather;
pub mod geometry;
pub mod grid;
pub mod velocity;
pub mod wavelet;

// Re-export core types at crate root for convenience.
pub use error::GeometryError;
pub use gather::Gather;
pub use geometry::ShotPosition;
pub use grid::Grid;
pub use velocity::VelocityModel;
pub use wavelet::ricker;
