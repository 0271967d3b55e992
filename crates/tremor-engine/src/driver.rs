//! The outer inversion driver.
//!
//! Owns all state that persists across outer iterations: the velocity
//! model, the conjugate-direction state, the persisted line-search step,
//! the encoder RNG, and the checkpoint store. One call to
//! [`run_iteration`](InversionLoop::run_iteration) performs the full
//! pipeline: encode, gradient, mask, direction, line search, clamped
//! update, border refill.
//!
//! Recovered degeneracies (fallback line-search branches, clamped cells,
//! a vanished direction) are reported in the [`IterationReport`] and
//! logged; they never abort the run.

use tracing::{info, warn};

use tremor_core::{ricker, Gather, GeometryError, ShotPosition, VelocityModel};
use tremor_propagator::{remove_direct_arrival, DampedPropagator};
use tremor_store::{CheckpointBackend, CheckpointStore};

use crate::direction::CgDirection;
use crate::encoder::SourceEncoder;
use crate::error::InversionError;
use crate::gradient::{self, GradientMask};
use crate::linesearch::{self, LineSearchOutcome, LineSearchResult, StepSizeMemory};
use crate::modeling;

/// Direct-arrival mute width for line-search synthetics (seconds).
const TRIAL_MUTE_WIDTH: f32 = 0.15;

// ── Settings ────────────────────────────────────────────────────

/// How the line search measures the objective.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectiveStrategy {
    /// Evaluate on the iteration's encoded super-shot: one forward model
    /// per candidate, a stochastic estimate of the true multi-shot
    /// misfit. The default.
    Encoded,
    /// Evaluate on all unencoded shots: `ns` forward models per
    /// candidate, the exact misfit.
    FullShots,
}

/// Scalar knobs of the inversion loop.
#[derive(Clone, Copy, Debug)]
pub struct LoopSettings {
    /// Ricker dominant frequency (Hz); also sets the observed-data mute
    /// width `1.5 / fm`.
    pub fm: f32,
    /// Ricker peak amplitude.
    pub amp: f32,
    /// Lower physical velocity clamp (m/s).
    pub vmin: f32,
    /// Upper physical velocity clamp (m/s).
    pub vmax: f32,
    /// Encoding RNG seed.
    pub seed: u64,
    /// Objective strategy for the line search.
    pub strategy: ObjectiveStrategy,
    /// Interior rows zeroed in the gradient below the free surface.
    pub mask_top_rows: usize,
}

// ── Report ──────────────────────────────────────────────────────

/// What one outer iteration did.
#[derive(Clone, Debug)]
pub struct IterationReport {
    /// Zero-based iteration index.
    pub iteration: usize,
    /// Misfit of the model this iteration started from.
    pub objective: f64,
    /// Objective associated with the accepted step.
    pub step_objective: f64,
    /// Accepted step length (zero when the direction vanished).
    pub alpha: f64,
    /// Which line-search branch produced the step.
    pub outcome: LineSearchOutcome,
    /// Conjugate-direction `beta` of this iteration.
    pub beta: f64,
    /// Cells the velocity clamp touched during the update.
    pub clamped_cells: usize,
    /// Objective evaluations spent by the line search.
    pub evaluations: usize,
}

// ── InversionLoop ───────────────────────────────────────────────

/// Per-run state and orchestration.
///
/// Strictly sequential: the gradient engine and line search borrow the
/// shared state mutably in turn, so iteration `k + 1` observes every
/// write of iteration `k`.
pub struct InversionLoop<B> {
    prop: DampedPropagator,
    vel: VelocityModel,
    dobs: Gather,
    wavelet: Vec<f32>,
    sources: ShotPosition,
    receivers: ShotPosition,
    encoder: SourceEncoder,
    cg: CgDirection,
    memory: StepSizeMemory,
    store: CheckpointStore<B>,
    mask: GradientMask,
    strategy: ObjectiveStrategy,
    s_lo: f32,
    s_hi: f32,
    obs_mute: f32,
    iteration: usize,
}

impl<B: CheckpointBackend> InversionLoop<B> {
    /// Assemble a loop from its collaborators. `sources` and `receivers`
    /// are in interior coordinates; they are validated against the grid
    /// and shifted into padded index space here.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if a position is outside the computing
    /// zone or the gather shape disagrees with the geometry.
    pub fn new(
        vel: VelocityModel,
        dobs: Gather,
        sources: ShotPosition,
        receivers: ShotPosition,
        store: CheckpointStore<B>,
        settings: LoopSettings,
    ) -> Result<Self, GeometryError> {
        let grid = *vel.grid();
        sources.validate("source", grid.nz(), grid.nx())?;
        receivers.validate("receiver", grid.nz(), grid.nx())?;
        if dobs.ns() != sources.len() {
            return Err(GeometryError::ShapeMismatch {
                expected: sources.len(),
                found: dobs.ns(),
            });
        }
        if dobs.ng() != receivers.len() {
            return Err(GeometryError::ShapeMismatch {
                expected: receivers.len(),
                found: dobs.ng(),
            });
        }
        let wavelet = ricker(dobs.nt(), settings.fm, grid.dt(), settings.amp);
        // The transform is decreasing in speed: the upper physical clamp
        // is the lower bound in transformed units.
        let s_lo = grid.transform(settings.vmax);
        let s_hi = grid.transform(settings.vmin);
        Ok(Self {
            prop: DampedPropagator::new(grid),
            cg: CgDirection::new(grid.padded_len()),
            sources: sources.shifted(grid.nb()),
            receivers: receivers.shifted(grid.nb()),
            encoder: SourceEncoder::new(settings.seed),
            memory: StepSizeMemory::new(),
            mask: GradientMask::new(settings.mask_top_rows),
            strategy: settings.strategy,
            obs_mute: 1.5 / settings.fm,
            vel,
            dobs,
            wavelet,
            store,
            s_lo,
            s_hi,
            iteration: 0,
        })
    }

    /// The current velocity model.
    pub fn velocity(&self) -> &VelocityModel {
        &self.vel
    }

    /// Completed iteration count.
    pub fn iterations(&self) -> usize {
        self.iteration
    }

    /// Run `niter` iterations, handing each report and the updated model
    /// to `observer` (which typically appends the model to the output
    /// volume).
    ///
    /// # Errors
    ///
    /// Propagates the first engine or observer failure.
    pub fn run<F>(&mut self, niter: usize, mut observer: F) -> Result<Vec<IterationReport>, InversionError>
    where
        F: FnMut(&IterationReport, &VelocityModel) -> Result<(), InversionError>,
    {
        let mut reports = Vec::with_capacity(niter);
        for _ in 0..niter {
            let report = self.run_iteration()?;
            observer(&report, &self.vel)?;
            reports.push(report);
        }
        Ok(reports)
    }

    /// One outer iteration: encode, gradient, direction, line search,
    /// clamped velocity update, border refill.
    ///
    /// # Errors
    ///
    /// Propagates geometry, kernel, and checkpoint I/O failures.
    pub fn run_iteration(&mut self) -> Result<IterationReport, InversionError> {
        let grid = *self.prop.grid();
        let nt = self.dobs.nt();
        let dt = grid.dt();

        // Encode this iteration's super-shot.
        let enc = self.encoder.draw(self.dobs.ns());
        let encsrc = enc.encode_sources(&self.wavelet);
        let mut encobs = enc.encode_data(&self.dobs);
        remove_direct_arrival(
            &mut encobs,
            nt,
            dt,
            &self.sources,
            &self.receivers,
            &self.vel,
            self.obs_mute,
        );

        // Gradient of the encoded misfit.
        let out = gradient::compute_gradient(
            &mut self.prop,
            &self.vel,
            &encsrc,
            &encobs,
            &self.sources,
            &self.receivers,
            nt,
            self.obs_mute,
            &mut self.store,
            &self.mask,
        )?;
        let j1 = out.objective;

        // Conjugate direction.
        let d = self.cg.update(&out.gradient).to_vec();
        let beta = self.cg.last_beta();

        // Step selection under the physics cap.
        let cap = linesearch::step_cap(&self.vel, &d);
        let (result, clamped_cells) = if cap.is_finite() {
            let alpha3_max = 2.0 * cap;
            let result = {
                let Self {
                    prop,
                    vel,
                    dobs,
                    wavelet,
                    sources,
                    receivers,
                    memory,
                    strategy,
                    s_lo,
                    s_hi,
                    obs_mute,
                    ..
                } = self;
                let (s_lo, s_hi) = (*s_lo, *s_hi);
                let (strategy, obs_mute) = (*strategy, *obs_mute);
                let eval = |alpha: f64| -> Result<f64, InversionError> {
                    let trial = vel.stepped(&d, alpha as f32, s_lo, s_hi);
                    match strategy {
                        ObjectiveStrategy::Encoded => {
                            let mut dcal = modeling::forward_synthetic(
                                prop, &trial, &encsrc, sources, receivers, nt,
                            )?;
                            remove_direct_arrival(
                                &mut dcal,
                                nt,
                                dt,
                                sources,
                                receivers,
                                &trial,
                                TRIAL_MUTE_WIDTH,
                            );
                            Ok(modeling::misfit(&encobs, &dcal))
                        }
                        ObjectiveStrategy::FullShots => {
                            let mut total = 0.0;
                            for is in 0..dobs.ns() {
                                let src = ShotPosition::from_points(vec![sources.get(is)]);
                                let mut dcal = modeling::forward_synthetic(
                                    prop, &trial, wavelet, &src, receivers, nt,
                                )?;
                                remove_direct_arrival(
                                    &mut dcal,
                                    nt,
                                    dt,
                                    &src,
                                    receivers,
                                    &trial,
                                    TRIAL_MUTE_WIDTH,
                                );
                                let mut obs = dobs.shot(is).to_vec();
                                remove_direct_arrival(
                                    &mut obs, nt, dt, &src, receivers, &trial, obs_mute,
                                );
                                total += modeling::misfit(&obs, &dcal);
                            }
                            Ok(total)
                        }
                    }
                };
                linesearch::search(j1, alpha3_max, memory, eval)?
            };
            let clamped = self
                .vel
                .apply_step(&d, result.alpha as f32, self.s_lo, self.s_hi);
            (result, clamped)
        } else {
            warn!(
                iteration = self.iteration,
                "search direction vanished; model left unchanged"
            );
            (
                LineSearchResult {
                    alpha: 0.0,
                    objective: j1,
                    outcome: LineSearchOutcome::Skipped,
                    evaluations: 0,
                },
                0,
            )
        };

        if clamped_cells > 0 {
            warn!(
                iteration = self.iteration,
                clamped_cells, "velocity clamp engaged during update"
            );
        }

        let report = IterationReport {
            iteration: self.iteration,
            objective: j1,
            step_objective: result.objective,
            alpha: result.alpha,
            outcome: result.outcome,
            beta,
            clamped_cells,
            evaluations: result.evaluations,
        };
        info!(
            iteration = report.iteration,
            objective = report.objective,
            alpha = report.alpha,
            outcome = ?report.outcome,
            evaluations = report.evaluations,
            "iteration complete"
        );
        self.iteration += 1;
        Ok(report)
    }
}
