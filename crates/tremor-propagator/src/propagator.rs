//! The damped 10th-order finite-difference propagator.
//!
//! One step advances the pressure triple `{p_prev, p_curr, p_next}` on the
//! padded grid. The spatial operator is an isotropic cross stencil of
//! radius 5 applied into a scratch field `u2`; the time update combines a
//! second-order term `(1/s)*u2` with a 1/12 fourth-order correction built
//! from the `u2` neighbours. Velocity enters in its transformed unit
//! `s = (dx/(dt*c))^2`, so no physical constants appear in the kernel.
//!
//! The absorbing margin multiplies the two-level time coefficients by
//! `(2 - 2d + d^2)` and `(1 - 2d)` with `d = 0.05 * f^2`, where `f` grows
//! linearly from 0 at the interior boundary to 1 at the outer padded edge.
//! The top margin is left undamped (free surface).
//!
//! `step_backward` runs the symbolically identical kernel; time reversal
//! comes from the caller swapping the roles of `p_prev` and `p_next`.

use std::error::Error;
use std::fmt;

use tremor_core::{Grid, ShotPosition, VelocityModel};

/// Cross-stencil coefficients for the radius-5 isotropic Laplacian.
const STENCIL: [f32; 6] = [
    1.534_007_96,
    1.788_587_21,
    -0.316_607_56,
    0.076_121_73,
    -0.016_260_42,
    0.002_167_36,
];

/// Maximum damping coefficient at the outer padded edge.
const DAMP_MAX: f32 = 0.05;

/// Half-width of the region the kernel never writes: the outermost rows
/// and columns stay zero (or refilled) because the radius-5 stencil plus
/// the fourth-order correction need six cells of support.
const STENCIL_BORDER: usize = 6;

// ── Errors ──────────────────────────────────────────────────────

/// Errors from propagator kernels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropagatorError {
    /// A wavefield or velocity buffer does not match the padded grid.
    BufferSize {
        /// Which buffer was rejected.
        what: &'static str,
        /// Expected element count (padded-grid size).
        expected: usize,
        /// Element count actually provided.
        found: usize,
    },
    /// Source samples and source positions disagree in count.
    SampleCount {
        /// Number of positions.
        positions: usize,
        /// Number of samples provided.
        samples: usize,
    },
}

impl fmt::Display for PropagatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferSize {
                what,
                expected,
                found,
            } => write!(f, "{what} buffer has {found} cells, expected {expected}"),
            Self::SampleCount { positions, samples } => write!(
                f,
                "source sample count {samples} does not match {positions} positions"
            ),
        }
    }
}

impl Error for PropagatorError {}

// ── Injection ───────────────────────────────────────────────────

/// Whether [`DampedPropagator::add_source`] injects or removes samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Injection {
    /// Add the samples at the given positions.
    Add,
    /// Subtract the samples, reversing a previous injection.
    Subtract,
}

// ── DampedPropagator ────────────────────────────────────────────

/// Finite-difference acoustic propagator with a damping absorbing margin.
///
/// Owns the per-cell damping profile and the `u2` scratch field, both
/// sized for one grid at construction.
#[derive(Clone, Debug)]
pub struct DampedPropagator {
    grid: Grid,
    damp: Vec<f32>,
    u2: Vec<f32>,
}

impl DampedPropagator {
    /// Build a propagator for `grid`, precomputing the damping profile.
    pub fn new(grid: Grid) -> Self {
        Self {
            damp: damping_profile(&grid),
            u2: vec![0.0; grid.padded_len()],
            grid,
        }
    }

    /// The grid this propagator was built for.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Advance one time step: read `p_prev` and `p_curr`, write `p_next`.
    ///
    /// # Errors
    ///
    /// Returns [`PropagatorError::BufferSize`] if any buffer is not of
    /// padded-grid size.
    pub fn step_forward(
        &mut self,
        p_prev: &[f32],
        p_curr: &[f32],
        p_next: &mut [f32],
        vel: &VelocityModel,
    ) -> Result<(), PropagatorError> {
        self.advance(p_prev, p_curr, p_next, vel)
    }

    /// The time-reversed counterpart of [`step_forward`](Self::step_forward).
    ///
    /// The kernel is symbolically identical; callers reconstruct a field
    /// backward in time by passing the *later* field as `p_prev` and
    /// receiving the *earlier* field in `p_next`.
    ///
    /// # Errors
    ///
    /// Returns [`PropagatorError::BufferSize`] if any buffer is not of
    /// padded-grid size.
    pub fn step_backward(
        &mut self,
        p_prev: &[f32],
        p_curr: &[f32],
        p_next: &mut [f32],
        vel: &VelocityModel,
    ) -> Result<(), PropagatorError> {
        self.advance(p_prev, p_curr, p_next, vel)
    }

    fn advance(
        &mut self,
        p_prev: &[f32],
        p_curr: &[f32],
        p_next: &mut [f32],
        vel: &VelocityModel,
    ) -> Result<(), PropagatorError> {
        let n = self.grid.padded_len();
        check_len("p_prev", p_prev.len(), n)?;
        check_len("p_curr", p_curr.len(), n)?;
        check_len("p_next", p_next.len(), n)?;
        check_len("velocity", vel.data().len(), n)?;

        let nzp = self.grid.nz_pad();
        let nxp = self.grid.nx_pad();
        let s = vel.data();
        let u2 = &mut self.u2;

        // Laplacian support: one cell wider than the write region so the
        // fourth-order correction can read u2 neighbours.
        let lo = STENCIL_BORDER - 1;
        for ix in lo..nxp - lo {
            for iz in lo..nzp - lo {
                let i = ix * nzp + iz;
                let mut acc = -4.0 * STENCIL[0] * p_curr[i];
                for (k, &a) in STENCIL.iter().enumerate().skip(1) {
                    acc += a
                        * (p_curr[i - k]
                            + p_curr[i + k]
                            + p_curr[i - k * nzp]
                            + p_curr[i + k * nzp]);
                }
                u2[i] = acc;
            }
        }

        let d = STENCIL_BORDER;
        for ix in d..nxp - d {
            for iz in d..nzp - d {
                let i = ix * nzp + iz;
                let delta = self.damp[i];
                let inv_s = 1.0 / s[i];
                let correction = inv_s * inv_s / 12.0
                    * (u2[i - 1] + u2[i + 1] + u2[i - nzp] + u2[i + nzp] - 4.0 * u2[i]);
                p_next[i] = (2.0 - 2.0 * delta + delta * delta) * p_curr[i]
                    - (1.0 - 2.0 * delta) * p_prev[i]
                    + inv_s * u2[i]
                    + correction;
            }
        }
        Ok(())
    }

    /// Inject (or remove, for [`Injection::Subtract`]) one sample per
    /// source position. Positions are in padded-grid index space.
    ///
    /// # Errors
    ///
    /// Returns [`PropagatorError::SampleCount`] if `samples` and
    /// `positions` disagree in length.
    pub fn add_source(
        &self,
        p: &mut [f32],
        samples: &[f32],
        positions: &ShotPosition,
        mode: Injection,
    ) -> Result<(), PropagatorError> {
        if samples.len() != positions.len() {
            return Err(PropagatorError::SampleCount {
                positions: positions.len(),
                samples: samples.len(),
            });
        }
        let sign = match mode {
            Injection::Add => 1.0,
            Injection::Subtract => -1.0,
        };
        for (sample, (iz, ix)) in samples.iter().zip(positions.iter()) {
            p[self.grid.index(iz, ix)] += sign * sample;
        }
        Ok(())
    }

    /// Sample the wavefield at each receiver into `out[0..ng)`.
    ///
    /// # Errors
    ///
    /// Returns [`PropagatorError::SampleCount`] if `out` and `receivers`
    /// disagree in length.
    pub fn record_seis(
        &self,
        out: &mut [f32],
        p: &[f32],
        receivers: &ShotPosition,
    ) -> Result<(), PropagatorError> {
        if out.len() != receivers.len() {
            return Err(PropagatorError::SampleCount {
                positions: receivers.len(),
                samples: out.len(),
            });
        }
        for (slot, (iz, ix)) in out.iter_mut().zip(receivers.iter()) {
            *slot = p[self.grid.index(iz, ix)];
        }
        Ok(())
    }
}

fn check_len(what: &'static str, found: usize, expected: usize) -> Result<(), PropagatorError> {
    if found != expected {
        return Err(PropagatorError::BufferSize {
            what,
            expected,
            found,
        });
    }
    Ok(())
}

/// Per-cell damping coefficient `d = 0.05 * f^2`, with `f` the fractional
/// distance into the margin. Side and bottom margins are damped, the top
/// margin (free surface) is not. A corner cell takes the larger of its two
/// margin coefficients.
fn damping_profile(grid: &Grid) -> Vec<f32> {
    let (nzp, nxp, nb) = (grid.nz_pad(), grid.nx_pad(), grid.nb());
    let mut damp = vec![0.0; grid.padded_len()];
    if nb == 0 {
        return damp;
    }
    let coeff = |depth: usize| -> f32 {
        let f = depth as f32 / nb as f32;
        DAMP_MAX * f * f
    };
    for ix in 0..nxp {
        let x_depth = if ix < nb {
            nb - ix
        } else if ix >= nxp - nb {
            ix - (nxp - nb - 1)
        } else {
            0
        };
        for iz in 0..nzp {
            let z_depth = if iz >= nzp - nb { iz - (nzp - nb - 1) } else { 0 };
            let depth = x_depth.max(z_depth);
            if depth > 0 {
                damp[ix * nzp + iz] = coeff(depth);
            }
        }
    }
    damp
}
