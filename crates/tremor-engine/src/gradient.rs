//! Adjoint-state gradient engine.
//!
//! The gradient of the least-squares misfit with respect to the velocity
//! model is the zero-lag cross-correlation of two wavefields: the source
//! wavefield (reconstructed backward in time from checkpoints) and the
//! adjoint wavefield (the filtered residual injected at the receivers and
//! propagated forward while walking the time axis in reverse).
//!
//! Both reverse wavefields start from zero; the source field is
//! immediately overwritten by the final checkpoint pair.
//!
//! Correlation is gated by a time mute: samples later than 0.4 s
//! contribute fully, samples in (0.3 s, 0.4 s] are ramped linearly, and
//! the loop stops once `dt * it` drops to 0.3 s.

use tremor_core::{Grid, ShotPosition, VelocityModel};
use tremor_propagator::{
    remove_direct_arrival, DampedPropagator, Injection, WavefieldTriple,
};
use tremor_store::{CheckpointBackend, CheckpointStore};

use crate::error::InversionError;
use crate::modeling;

/// Five-point second-derivative stencil applied along each residual trace.
const TRACE_FILTER: [f32; 5] = [-1.0 / 12.0, 4.0 / 3.0, -5.0 / 2.0, 4.0 / 3.0, -1.0 / 12.0];

/// Correlation runs at full weight for times beyond this (seconds).
const MUTE_FULL: f32 = 0.4;

/// Correlation stops entirely at and below this time (seconds).
const MUTE_STOP: f32 = 0.3;

// ── Mask ────────────────────────────────────────────────────────

/// Zeroes the gradient where it is not trusted: the whole padded border
/// and a small band of interior rows under the free surface, where the
/// source singularity dominates.
#[derive(Clone, Copy, Debug)]
pub struct GradientMask {
    top_rows: usize,
}

impl GradientMask {
    /// Mask with `top_rows` interior rows zeroed below the free surface.
    pub fn new(top_rows: usize) -> Self {
        Self { top_rows }
    }

    /// Apply the mask in place.
    pub fn apply(&self, g: &mut [f32], grid: &Grid) {
        let (nzp, nxp, nb) = (grid.nz_pad(), grid.nx_pad(), grid.nb());
        let z_lo = nb + self.top_rows;
        let z_hi = nzp - nb;
        let x_lo = nb;
        let x_hi = nxp - nb;
        for ix in 0..nxp {
            for iz in 0..nzp {
                let keep = iz >= z_lo && iz < z_hi && ix >= x_lo && ix < x_hi;
                if !keep {
                    g[grid.index(iz, ix)] = 0.0;
                }
            }
        }
    }
}

// ── Residual filter ─────────────────────────────────────────────

/// Apply the 5-point second-derivative stencil along the time axis of
/// each receiver trace of a `(nt, ng)` block, zeroing the first two and
/// last two samples. The data is transposed to `(ig, it)` order, filtered
/// per trace, and transposed back.
pub fn second_derivative_filter(data: &mut [f32], nt: usize, ng: usize) {
    let mut trace = vec![0.0f32; nt];
    let mut filtered = vec![0.0f32; nt];
    for ig in 0..ng {
        for it in 0..nt {
            trace[it] = data[it * ng + ig];
        }
        filtered.fill(0.0);
        if nt >= 5 {
            for it in 2..nt - 2 {
                let mut acc = 0.0;
                for (k, &c) in TRACE_FILTER.iter().enumerate() {
                    acc += c * trace[it + k - 2];
                }
                filtered[it] = acc;
            }
        }
        for it in 0..nt {
            data[it * ng + ig] = filtered[it];
        }
    }
}

/// Correlation weight for simulation time `t` (seconds): full weight
/// after [`MUTE_FULL`], a linear ramp inside the transition band, `None`
/// at and below [`MUTE_STOP`] (the caller stops the reverse loop).
pub fn time_mute_weight(t: f32) -> Option<f32> {
    if t > MUTE_FULL {
        Some(1.0)
    } else if t > MUTE_STOP {
        Some((t - MUTE_STOP) / (MUTE_FULL - MUTE_STOP))
    } else {
        None
    }
}

// ── Gradient computation ────────────────────────────────────────

/// Result of one gradient computation.
#[derive(Clone, Debug)]
pub struct GradientOutput {
    /// Masked gradient on the padded grid.
    pub gradient: Vec<f32>,
    /// Misfit `J = 1/2 * ||encobs - dcal||^2` of the current model,
    /// computed before the residual is filtered.
    pub objective: f64,
}

/// Compute the encoded-super-shot gradient of the current model.
///
/// `encobs` must already have its direct arrival removed; the synthetic
/// gets the same treatment (width `mute_width`) before the residual is
/// formed. Stages: forward modeling and residual, temporal filter,
/// checkpointed forward re-run, reverse-time correlation, mask.
#[allow(clippy::too_many_arguments)]
pub fn compute_gradient<B: CheckpointBackend>(
    prop: &mut DampedPropagator,
    vel: &VelocityModel,
    encsrc: &[f32],
    encobs: &[f32],
    sources: &ShotPosition,
    receivers: &ShotPosition,
    nt: usize,
    mute_width: f32,
    store: &mut CheckpointStore<B>,
    mask: &GradientMask,
) -> Result<GradientOutput, InversionError> {
    let grid = *prop.grid();
    let ns = sources.len();
    let ng = receivers.len();
    let dt = grid.dt();
    let n = grid.padded_len();

    // Synthetic data and residual objective.
    let mut dcal = modeling::forward_synthetic(prop, vel, encsrc, sources, receivers, nt)?;
    remove_direct_arrival(&mut dcal, nt, dt, sources, receivers, vel, mute_width);
    let mut vsrc = vec![0.0f32; nt * ng];
    let objective = modeling::residual(encobs, &dcal, &mut vsrc);

    // The adjoint source is the second time derivative of the residual.
    second_derivative_filter(&mut vsrc, nt, ng);

    // Forward re-run persisting the reconstruction checkpoints.
    modeling::forward_with_checkpoints(prop, vel, encsrc, sources, nt, store)?;

    // Reverse pass: walk time backward, rebuilding the source wavefield
    // from checkpoints while propagating the adjoint wavefield, and
    // correlate the two.
    let mut sp_curr = vec![0.0f32; n]; // source field at `it` (source injected)
    let mut sp_ahead = vec![0.0f32; n]; // source field at `it + 1`
    let mut sp_back = vec![0.0f32; n]; // receives the field at `it - 1`
    let mut gp = WavefieldTriple::zeroed(n);
    let mut gradient = vec![0.0f32; n];

    for it in (0..nt).rev() {
        store.load_reverse(it, nt, &mut sp_curr, &mut sp_ahead)?;

        prop.step_backward(&sp_ahead, &sp_curr, &mut sp_back, vel)?;
        prop.add_source(
            &mut sp_curr,
            &encsrc[it * ns..(it + 1) * ns],
            sources,
            Injection::Subtract,
        )?;

        prop.add_source(
            &mut gp.curr,
            &vsrc[it * ng..(it + 1) * ng],
            receivers,
            Injection::Add,
        )?;
        prop.step_forward(&gp.prev, &gp.curr, &mut gp.next, vel)?;
        gp.rotate();

        match time_mute_weight(dt * it as f32) {
            Some(weight) => {
                for ((g, &s), &a) in gradient.iter_mut().zip(&sp_curr).zip(&gp.curr) {
                    *g -= weight * s * a;
                }
            }
            None => break,
        }

        // Slide the reconstruction window down one step: the cleaned
        // field at `it` becomes the look-ahead, the freshly rebuilt field
        // at `it - 1` becomes current.
        std::mem::swap(&mut sp_ahead, &mut sp_curr);
        std::mem::swap(&mut sp_curr, &mut sp_back);
    }

    mask.apply(&mut gradient, &grid);
    Ok(GradientOutput {
        gradient,
        objective,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tremor_core::{ricker, Grid};
    use tremor_store::MemBackend;

    // ---------------------------------------------------------------
    // Residual filter
    // ---------------------------------------------------------------

    #[test]
    fn filter_of_constant_trace_is_zero() {
        // Second derivative of a constant vanishes (away from the edges,
        // which are zeroed anyway).
        let nt = 16;
        let mut data = vec![3.0f32; nt];
        second_derivative_filter(&mut data, nt, 1);
        assert!(data.iter().all(|&v| v.abs() < 1e-5), "{data:?}");
    }

    #[test]
    fn filter_of_quadratic_is_constant_two() {
        let nt = 20;
        let mut data: Vec<f32> = (0..nt).map(|it| (it * it) as f32).collect();
        second_derivative_filter(&mut data, nt, 1);
        for it in 2..nt - 2 {
            assert!((data[it] - 2.0).abs() < 1e-3, "it={it} got {}", data[it]);
        }
        assert_eq!(data[0], 0.0);
        assert_eq!(data[1], 0.0);
        assert_eq!(data[nt - 1], 0.0);
        assert_eq!(data[nt - 2], 0.0);
    }

    #[test]
    fn filter_works_per_receiver_column() {
        // Two receivers: a constant trace and a quadratic trace.
        let nt = 12;
        let ng = 2;
        let mut data = vec![0.0f32; nt * ng];
        for it in 0..nt {
            data[it * ng] = 5.0;
            data[it * ng + 1] = (it * it) as f32;
        }
        second_derivative_filter(&mut data, nt, ng);
        for it in 2..nt - 2 {
            assert!(data[it * ng].abs() < 1e-5);
            assert!((data[it * ng + 1] - 2.0).abs() < 1e-3);
        }
    }

    // ---------------------------------------------------------------
    // Time mute
    // ---------------------------------------------------------------

    #[test]
    fn time_mute_bands() {
        assert_eq!(time_mute_weight(0.5), Some(1.0));
        assert_eq!(time_mute_weight(0.3), None);
        assert_eq!(time_mute_weight(0.1), None);
        let ramp = time_mute_weight(0.35).unwrap();
        assert!((ramp - 0.5).abs() < 1e-6);
    }

    // ---------------------------------------------------------------
    // Mask
    // ---------------------------------------------------------------

    #[test]
    fn mask_zeroes_border_and_top_rows() {
        let grid = Grid::new(10, 10, 3, 5.0, 0.001).unwrap();
        let mut g = vec![1.0f32; grid.padded_len()];
        GradientMask::new(2).apply(&mut g, &grid);
        // Border cell.
        assert_eq!(g[grid.index(0, 0)], 0.0);
        // First interior rows under the free surface.
        assert_eq!(g[grid.index(3, 5)], 0.0);
        assert_eq!(g[grid.index(4, 5)], 0.0);
        // Deeper interior survives.
        assert_eq!(g[grid.index(5, 5)], 1.0);
        assert_eq!(g[grid.index(12, 12)], 1.0);
        // Bottom margin zeroed.
        assert_eq!(g[grid.index(13, 5)], 0.0);
    }

    // ---------------------------------------------------------------
    // Full gradient
    // ---------------------------------------------------------------

    fn two_layer_setup() -> (Grid, VelocityModel, VelocityModel, ShotPosition, ShotPosition) {
        let grid = Grid::new(40, 40, 10, 10.0, 0.0015).unwrap();
        let mut layered = vec![2000.0f32; 40 * 40];
        for ix in 0..40 {
            for iz in 20..40 {
                layered[ix * 40 + iz] = 2500.0;
            }
        }
        let vel_true = VelocityModel::expand(grid, &layered).unwrap();
        let vel_start = VelocityModel::expand(grid, &vec![2200.0; 40 * 40]).unwrap();
        let sources = ShotPosition::from_points(vec![(1, 20)]).shifted(grid.nb());
        let receivers = ShotPosition::linear(1, 2, 0, 2, 18).shifted(grid.nb());
        (grid, vel_true, vel_start, sources, receivers)
    }

    #[test]
    fn wrong_model_yields_nonzero_gradient_and_objective() {
        let (grid, vel_true, vel_start, sources, receivers) = two_layer_setup();
        let mut prop = DampedPropagator::new(grid);
        let nt = 400; // 0.6 s of two-way time, past the mute window
        let wavelet = ricker(nt, 12.0, grid.dt(), 100.0);
        let mute = 1.5 / 12.0;

        let mut encobs =
            modeling::forward_synthetic(&mut prop, &vel_true, &wavelet, &sources, &receivers, nt)
                .unwrap();
        remove_direct_arrival(&mut encobs, nt, grid.dt(), &sources, &receivers, &vel_true, mute);

        let mut store = CheckpointStore::new(MemBackend::new(), 50);
        let out = compute_gradient(
            &mut prop,
            &vel_start,
            &wavelet,
            &encobs,
            &sources,
            &receivers,
            nt,
            mute,
            &mut store,
            &GradientMask::new(3),
        )
        .unwrap();

        assert!(out.objective > 0.0);
        let norm: f32 = out.gradient.iter().map(|v| v * v).sum();
        assert!(norm > 0.0, "gradient vanished on a wrong model");
    }

    #[test]
    fn matching_model_yields_zero_gradient() {
        let (grid, vel_true, _, sources, receivers) = two_layer_setup();
        let mut prop = DampedPropagator::new(grid);
        let nt = 400;
        let wavelet = ricker(nt, 12.0, grid.dt(), 100.0);
        let mute = 1.5 / 12.0;

        let mut encobs =
            modeling::forward_synthetic(&mut prop, &vel_true, &wavelet, &sources, &receivers, nt)
                .unwrap();
        remove_direct_arrival(&mut encobs, nt, grid.dt(), &sources, &receivers, &vel_true, mute);

        let mut store = CheckpointStore::new(MemBackend::new(), 50);
        let out = compute_gradient(
            &mut prop,
            &vel_true,
            &wavelet,
            &encobs,
            &sources,
            &receivers,
            nt,
            mute,
            &mut store,
            &GradientMask::new(3),
        )
        .unwrap();

        assert!(out.objective < 1e-10, "J = {}", out.objective);
        assert!(out.gradient.iter().all(|&g| g == 0.0));
    }
}
