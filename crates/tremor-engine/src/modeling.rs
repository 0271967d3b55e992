//! Forward modeling of an encoded super-shot.
//!
//! Shared by the residual/objective build, the checkpointed re-run that
//! feeds wavefield reconstruction, and line-search candidate evaluation.
//! The time loop injects the encoded source into the current field, steps,
//! rotates the triple, and (when recording) samples the receivers from the
//! freshly computed field.

use tremor_core::{ShotPosition, VelocityModel};
use tremor_propagator::{DampedPropagator, Injection, WavefieldTriple};
use tremor_store::{CheckpointBackend, CheckpointStore};

use crate::error::InversionError;

/// Run `nt` forward steps and record synthetic receiver data of shape
/// `(nt, ng)`. `encsrc` is the `(nt, ns)` super-shot source block;
/// positions are in padded-grid index space.
pub fn forward_synthetic(
    prop: &mut DampedPropagator,
    vel: &VelocityModel,
    encsrc: &[f32],
    sources: &ShotPosition,
    receivers: &ShotPosition,
    nt: usize,
) -> Result<Vec<f32>, InversionError> {
    let ns = sources.len();
    let ng = receivers.len();
    let mut w = WavefieldTriple::zeroed(prop.grid().padded_len());
    let mut dcal = vec![0.0; nt * ng];
    for it in 0..nt {
        prop.add_source(
            &mut w.curr,
            &encsrc[it * ns..(it + 1) * ns],
            sources,
            Injection::Add,
        )?;
        prop.step_forward(&w.prev, &w.curr, &mut w.next, vel)?;
        w.rotate();
        prop.record_seis(&mut dcal[it * ng..(it + 1) * ng], &w.curr, receivers)?;
    }
    Ok(dcal)
}

/// The same time loop, persisting `(p_prev, p_curr)` pairs into the
/// checkpoint store instead of recording receivers. Feeds the reverse-time
/// wavefield reconstruction.
pub fn forward_with_checkpoints<B: CheckpointBackend>(
    prop: &mut DampedPropagator,
    vel: &VelocityModel,
    encsrc: &[f32],
    sources: &ShotPosition,
    nt: usize,
    store: &mut CheckpointStore<B>,
) -> Result<(), InversionError> {
    let ns = sources.len();
    let mut w = WavefieldTriple::zeroed(prop.grid().padded_len());
    for it in 0..nt {
        prop.add_source(
            &mut w.curr,
            &encsrc[it * ns..(it + 1) * ns],
            sources,
            Injection::Add,
        )?;
        prop.step_forward(&w.prev, &w.curr, &mut w.next, vel)?;
        w.rotate();
        store.save_forward(it, nt, &w.prev, &w.curr)?;
    }
    Ok(())
}

/// Least-squares misfit `J = 1/2 * sum((obs - syn)^2)`, accumulated in
/// f64.
pub fn misfit(obs: &[f32], syn: &[f32]) -> f64 {
    0.5 * obs
        .iter()
        .zip(syn)
        .map(|(&o, &s)| {
            let r = f64::from(o) - f64::from(s);
            r * r
        })
        .sum::<f64>()
}

/// Residual `obs - syn` written into `out`, returning the misfit.
pub fn residual(obs: &[f32], syn: &[f32], out: &mut [f32]) -> f64 {
    let mut acc = 0.0f64;
    for ((slot, &o), &s) in out.iter_mut().zip(obs).zip(syn) {
        let r = o - s;
        *slot = r;
        acc += f64::from(r) * f64::from(r);
    }
    0.5 * acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use tremor_core::{ricker, Gather, Grid};
    use tremor_store::MemBackend;

    fn setup() -> (Grid, VelocityModel, ShotPosition, ShotPosition) {
        let grid = Grid::new(40, 40, 10, 10.0, 0.0015).unwrap();
        let vel = VelocityModel::expand(grid, &vec![2000.0; 40 * 40]).unwrap();
        let sources = ShotPosition::from_points(vec![(2, 20)]).shifted(grid.nb());
        let receivers = ShotPosition::linear(2, 5, 0, 2, 15).shifted(grid.nb());
        (grid, vel, sources, receivers)
    }

    #[test]
    fn synthetic_records_nonzero_arrivals() {
        let (grid, vel, sources, receivers) = setup();
        let mut prop = DampedPropagator::new(grid);
        let nt = 150;
        let wavelet = ricker(nt, 15.0, grid.dt(), 1.0);
        let encsrc = wavelet.clone(); // ns = 1
        let dcal = forward_synthetic(&mut prop, &vel, &encsrc, &sources, &receivers, nt).unwrap();
        assert_eq!(dcal.len(), nt * 15);
        let energy: f32 = dcal.iter().map(|v| v * v).sum();
        assert!(energy > 0.0, "wave never reached the receivers");
    }

    #[test]
    fn misfit_of_identical_traces_is_zero() {
        let a = vec![1.0f32, 2.0, 3.0];
        assert_eq!(misfit(&a, &a), 0.0);
    }

    #[test]
    fn residual_matches_misfit() {
        let obs = vec![1.0f32, 2.0, 3.0];
        let syn = vec![0.5f32, 2.0, 4.0];
        let mut out = vec![0.0f32; 3];
        let j = residual(&obs, &syn, &mut out);
        assert_eq!(out, vec![0.5, 0.0, -1.0]);
        assert!((j - 0.5 * (0.25 + 1.0)) < 1e-12);
        assert!((j - misfit(&obs, &syn)).abs() < 1e-12);
    }

    #[test]
    fn checkpointed_run_persists_final_pair() {
        let (grid, vel, sources, _) = setup();
        let mut prop = DampedPropagator::new(grid);
        let nt = 60;
        let wavelet = ricker(nt, 15.0, grid.dt(), 1.0);
        let mut store = CheckpointStore::new(MemBackend::new(), 25);
        forward_with_checkpoints(&mut prop, &vel, &wavelet, &sources, nt, &mut store).unwrap();
        let mut prev = vec![0.0f32; grid.padded_len()];
        let mut curr = vec![0.0f32; grid.padded_len()];
        assert!(store.load_reverse(nt - 1, nt, &mut prev, &mut curr).unwrap());
        let energy: f32 = curr.iter().map(|v| v * v).sum();
        assert!(energy > 0.0);
    }

    #[test]
    fn single_shot_gather_roundtrip() {
        // Building a Gather from per-shot synthetics and slicing it back
        // is the identity.
        let (grid, vel, sources, receivers) = setup();
        let mut prop = DampedPropagator::new(grid);
        let nt = 80;
        let wavelet = ricker(nt, 15.0, grid.dt(), 1.0);
        let dcal = forward_synthetic(&mut prop, &vel, &wavelet, &sources, &receivers, nt).unwrap();
        let gather = Gather::new(1, nt, 15, dcal.clone()).unwrap();
        assert_eq!(gather.shot(0), &dcal[..]);
    }
}
