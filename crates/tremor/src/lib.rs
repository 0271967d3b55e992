//! Tremor: time-domain acoustic full waveform inversion.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Tremor sub-crates. For most users, adding `tremor` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use tremor::prelude::*;
//! use tremor::store::{CheckpointStore, MemBackend};
//!
//! // A 40x40 interior grid with a 10-cell absorbing margin.
//! let grid = Grid::new(40, 40, 10, 10.0, 0.0015).unwrap();
//! let vel = VelocityModel::expand(grid, &vec![2000.0; 40 * 40]).unwrap();
//!
//! // One centered shot, a line of receivers under the free surface.
//! let sources = ShotPosition::from_points(vec![(1, 20)]);
//! let receivers = ShotPosition::linear(1, 2, 0, 2, 19);
//!
//! // Model the "observed" data through the true model.
//! let nt = 300;
//! let wavelet = ricker(nt, 15.0, grid.dt(), 100.0);
//! let mut prop = DampedPropagator::new(grid);
//! let dcal = tremor::engine::modeling::forward_synthetic(
//!     &mut prop,
//!     &vel,
//!     &wavelet,
//!     &sources.shifted(grid.nb()),
//!     &receivers.shifted(grid.nb()),
//!     nt,
//! )
//! .unwrap();
//! let dobs = Gather::new(1, nt, 19, dcal).unwrap();
//!
//! // Invert from the true model: the misfit is already zero.
//! let settings = LoopSettings {
//!     fm: 15.0,
//!     amp: 100.0,
//!     vmin: 1000.0,
//!     vmax: 8000.0,
//!     seed: 10,
//!     strategy: ObjectiveStrategy::Encoded,
//!     mask_top_rows: 3,
//! };
//! let store = CheckpointStore::new(MemBackend::new(), 50);
//! let mut inversion =
//!     InversionLoop::new(vel, dobs, sources, receivers, store, settings).unwrap();
//! let report = inversion.run_iteration().unwrap();
//! assert!(report.objective < 1e-6);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`model`] | `tremor-core` | Grid, velocity model, geometry, wavelet |
//! | [`propagator`] | `tremor-propagator` | Damped FD propagator, mute |
//! | [`store`] | `tremor-store` | Volume I/O, headers, checkpoints |
//! | [`engine`] | `tremor-engine` | Encoder, gradient, CG, line search, driver |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Grid, velocity-model, geometry, gather, and wavelet types
/// (`tremor-core`).
pub use tremor_core as model;

/// The damped finite-difference propagator and direct-arrival mute
/// (`tremor-propagator`).
pub use tremor_propagator as propagator;

/// Volume I/O, text headers, and the wavefield checkpoint store
/// (`tremor-store`).
pub use tremor_store as store;

/// Encoder, gradient engine, conjugate directions, line search, and the
/// inversion driver (`tremor-engine`).
pub use tremor_engine as engine;

/// Common imports for typical Tremor usage.
///
/// ```rust
/// use tremor::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use tremor_core::{ricker, Gather, GeometryError, Grid, ShotPosition, VelocityModel};

    // Propagation
    pub use tremor_propagator::{
        remove_direct_arrival, DampedPropagator, Injection, PropagatorError, WavefieldTriple,
    };

    // Storage
    pub use tremor_store::{CheckpointBackend, CheckpointStore, DirBackend, StoreError};

    // Engine
    pub use tremor_engine::{
        ConfigError, InversionConfig, InversionError, InversionLoop, IterationReport,
        LineSearchOutcome, LoopSettings, ObjectiveStrategy, SourceEncoder,
    };
}
