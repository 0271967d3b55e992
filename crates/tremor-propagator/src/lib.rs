//! Damped finite-difference wave propagation for the Tremor FWI engine.
//!
//! Provides [`DampedPropagator`], a 10th-order-in-space cross-stencil
//! acoustic propagator with a quadratic absorbing margin and a free
//! surface at the top, together with source injection, receiver sampling,
//! the wavefield triple buffer, and direct-arrival muting.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod mute;
pub mod propagator;
pub mod wavefield;

pub use mute::remove_direct_arrival;
pub use propagator::{DampedPropagator, Injection, PropagatorError};
pub use wavefield::WavefieldTriple;
