//! Parabolic line search with bracketing and physical step caps.
//!
//! Selects a step length `alpha > 0` approximately minimizing
//! `J(v + alpha * d)` along the conjugate direction. The objective is
//! injected as a closure so the state machine is testable against
//! synthetic curves; in production each evaluation is a full forward
//! modeling run.
//!
//! The cap comes from physics, not curve shape: no single cell may change
//! by more than [`MAX_VELOCITY_CHANGE`] m/s at `alpha2_max`, and the
//! search never steps past `alpha3_max = 2 * alpha2_max`.
//!
//! Numerical degeneracies (all halvings uphill, the minimum beyond the
//! cap, three near-colinear objective values) are recovered locally: the
//! search falls back to the best step it has tried and reports the branch
//! through [`LineSearchOutcome`], never through an error.

use smallvec::SmallVec;
use tracing::warn;

use tremor_core::VelocityModel;

use crate::error::InversionError;

/// Per-iteration cap on the velocity change of any single cell (m/s).
pub const MAX_VELOCITY_CHANGE: f32 = 200.0;

/// Direction entries at or below this magnitude are treated as zero when
/// computing the physics cap.
const DIRECTION_EPS: f32 = 1e-10;

/// Persisted steps below this are considered collapsed and re-seeded.
const TINY_ALPHA: f64 = 1e-7;

/// Re-seed value for a collapsed persisted step.
const MIN_ALPHA: f64 = 1e-4;

/// Bracket-left halving budget.
const MAX_HALVINGS: usize = 5;

/// Relative slope-difference threshold for the near-colinear test.
const COLINEAR_TOL: f64 = 1e-3;

// ── Persisted step state ────────────────────────────────────────

/// The persisted initial step length, carried across outer iterations by
/// the driver so each search starts where the last one ended.
#[derive(Clone, Copy, Debug, Default)]
pub struct StepSizeMemory {
    alpha: Option<f64>,
}

impl StepSizeMemory {
    /// Empty memory; the first search seeds it from the physics cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored step, if any search has completed.
    pub fn alpha(&self) -> Option<f64> {
        self.alpha
    }
}

// ── Results ─────────────────────────────────────────────────────

/// Which branch of the search produced the result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineSearchOutcome {
    /// A proper bracket was found and the parabolic vertex taken.
    Parabolic,
    /// The three bracket points were near-colinear; the step was set to
    /// the cap.
    Degenerate,
    /// Five halvings never got below `J(0)`; the best tried step was
    /// returned.
    FallbackLeft,
    /// The objective was still descending at the cap; the best tried step
    /// was returned.
    FallbackRight,
    /// The direction was numerically zero; no search was run.
    Skipped,
}

/// Selected step and its objective.
#[derive(Clone, Copy, Debug)]
pub struct LineSearchResult {
    /// The selected step length.
    pub alpha: f64,
    /// Objective associated with `alpha` (fit value for the parabolic
    /// branch, measured value otherwise).
    pub objective: f64,
    /// Which branch produced the result.
    pub outcome: LineSearchOutcome,
    /// Number of objective evaluations spent.
    pub evaluations: usize,
}

// ── Physics cap ─────────────────────────────────────────────────

/// The largest step such that no cell's speed changes by more than
/// [`MAX_VELOCITY_CHANGE`]: the minimum over cells of
/// `(s(c - maxdv) - s(c)) / |d|`. Returns infinity when the direction is
/// numerically zero everywhere.
pub fn step_cap(vel: &VelocityModel, direction: &[f32]) -> f64 {
    let grid = vel.grid();
    let mut cap = f64::INFINITY;
    for (&s, &d) in vel.data().iter().zip(direction) {
        if d.abs() <= DIRECTION_EPS {
            continue;
        }
        let c = grid.physical(s);
        if c <= MAX_VELOCITY_CHANGE {
            continue;
        }
        let shifted = grid.transform(c - MAX_VELOCITY_CHANGE);
        let cell_cap = f64::from(shifted - s) / f64::from(d.abs());
        cap = cap.min(cell_cap);
    }
    cap
}

// ── Search ──────────────────────────────────────────────────────

/// Run the bracketing line search.
///
/// `j1` is the objective of the unstepped model (already known from the
/// gradient build); `alpha3_max` is twice the physics cap; `eval` measures
/// `J` at a candidate step. The selected step is written back into
/// `memory` for the next iteration.
///
/// # Errors
///
/// Propagates evaluator failures (forward modeling is real I/O-backed
/// work); never fails on numerical degeneracies.
pub fn search<F>(
    j1: f64,
    alpha3_max: f64,
    memory: &mut StepSizeMemory,
    mut eval: F,
) -> Result<LineSearchResult, InversionError>
where
    F: FnMut(f64) -> Result<f64, InversionError>,
{
    let persisted = memory.alpha.unwrap_or(alpha3_max);
    let mut alpha3 = if persisted < TINY_ALPHA {
        persisted.max(MIN_ALPHA)
    } else {
        persisted
    };
    alpha3 = alpha3.min(alpha3_max);
    let mut alpha2 = alpha3 / 2.0;

    let mut tried: SmallVec<[(f64, f64); 16]> = SmallVec::new();
    let mut evaluations = 0;
    let mut try_eval = |alpha: f64,
                        tried: &mut SmallVec<[(f64, f64); 16]>,
                        evaluations: &mut usize|
     -> Result<f64, InversionError> {
        let j = eval(alpha)?;
        tried.push((alpha, j));
        *evaluations += 1;
        Ok(j)
    };

    let mut j2 = try_eval(alpha2, &mut tried, &mut evaluations)?;
    let mut j3 = try_eval(alpha3, &mut tried, &mut evaluations)?;

    let mut bracketed_by_halving = false;
    if j2 > j1 {
        // Walk left: halve until the midpoint dips below J(0).
        let mut halvings = 0;
        while j2 > j1 && halvings < MAX_HALVINGS {
            alpha3 = alpha2;
            j3 = j2;
            alpha2 /= 2.0;
            j2 = try_eval(alpha2, &mut tried, &mut evaluations)?;
            halvings += 1;
        }
        if j2 > j1 {
            // Exhausted: take the best step seen, probe once above it.
            let (best_alpha, _) = best_tried(&tried);
            alpha2 = best_alpha;
            alpha3 = (2.0 * alpha2).min(alpha3_max);
            try_eval(alpha3, &mut tried, &mut evaluations)?;
            let (alpha, objective) = best_tried(&tried);
            warn!(alpha, objective, "line search exhausted left bracket");
            memory.alpha = Some(alpha);
            return Ok(LineSearchResult {
                alpha,
                objective,
                outcome: LineSearchOutcome::FallbackLeft,
                evaluations,
            });
        }
        bracketed_by_halving = true;
    }

    if !bracketed_by_halving {
        // Walk right while the objective keeps dropping faster than the
        // chord through (0, J1) and (alpha2, J2) predicts.
        loop {
            let chord = j1 + (j2 - j1) * alpha3 / alpha2;
            if j3 < chord && j3 < j1 && alpha3 < alpha3_max {
                alpha2 = alpha3;
                j2 = j3;
                alpha3 = (2.0 * alpha3).min(alpha3_max);
                j3 = try_eval(alpha3, &mut tried, &mut evaluations)?;
            } else {
                break;
            }
        }
        if alpha3 >= alpha3_max && j3 < j2 {
            // Still descending at the cap: the minimum is out of reach.
            let (best_alpha, _) = best_tried(&tried);
            alpha3 = best_alpha;
            alpha2 = alpha3 / 2.0;
            try_eval(alpha2, &mut tried, &mut evaluations)?;
            let (alpha, objective) = best_tried(&tried);
            warn!(alpha, objective, "line search capped by max velocity change");
            memory.alpha = Some(alpha);
            return Ok(LineSearchResult {
                alpha,
                objective,
                outcome: LineSearchOutcome::FallbackRight,
                evaluations,
            });
        }
    }

    // Parabolic vertex through (0, J1), (alpha2, J2), (alpha3, J3).
    let k1 = (j2 - j1) / alpha2;
    let k2 = (j3 - j2) / (alpha3 - alpha2);
    let colinear = (k2 - k1).abs() < COLINEAR_TOL * k1.abs().max(k2.abs());
    let vertex = parabola_vertex(j1, alpha2, j2, alpha3, j3);

    let (alpha, objective, outcome) = match vertex {
        Some((xv, yv)) if !colinear && xv > 0.0 => {
            let alpha = xv.min(alpha3_max);
            (alpha, yv, LineSearchOutcome::Parabolic)
        }
        _ => {
            // Near-colinear (or concave) fit: step to the cap instead.
            let alpha = (2.0 * alpha3).min(alpha3_max);
            let objective = try_eval(alpha, &mut tried, &mut evaluations)?;
            warn!(alpha, "parabolic fit degenerate, stepping to cap");
            (alpha, objective, LineSearchOutcome::Degenerate)
        }
    };

    memory.alpha = Some(alpha);
    Ok(LineSearchResult {
        alpha,
        objective,
        outcome,
        evaluations,
    })
}

/// Vertex of the fitted parabola, with the curvature anchored on the
/// first chord: `a = (J1 - J2) / alpha2^2`, `b` and `c` solved through
/// the second and third points. Returns `None` when the fit is not
/// convex.
fn parabola_vertex(j1: f64, alpha2: f64, j2: f64, alpha3: f64, j3: f64) -> Option<(f64, f64)> {
    let a = (j1 - j2) / (alpha2 * alpha2);
    if !(a > 0.0) || alpha3 <= alpha2 {
        return None;
    }
    let b = ((j3 - j2) - a * (alpha3 * alpha3 - alpha2 * alpha2)) / (alpha3 - alpha2);
    let c = j2 - a * alpha2 * alpha2 - b * alpha2;
    let xv = -b / (2.0 * a);
    let yv = c - b * b / (4.0 * a);
    if xv.is_finite() {
        Some((xv, yv))
    } else {
        None
    }
}

fn best_tried(tried: &[(f64, f64)]) -> (f64, f64) {
    tried
        .iter()
        .copied()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap_or((0.0, f64::INFINITY))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run<F>(j1: f64, alpha3_max: f64, memory: &mut StepSizeMemory, f: F) -> LineSearchResult
    where
        F: Fn(f64) -> f64,
    {
        search(j1, alpha3_max, memory, |a| Ok(f(a))).unwrap()
    }

    #[test]
    fn parabolic_vertex_known_values() {
        // J1=10 at 0, J2=4 at 1, J3=7 at 2.
        let (xv, yv) = parabola_vertex(10.0, 1.0, 4.0, 2.0, 7.0).unwrap();
        assert!((xv - 1.25).abs() < 1e-6, "xv = {xv}");
        assert!((yv - 3.625).abs() < 1e-6, "yv = {yv}");
    }

    #[test]
    fn bracket_gives_parabolic_result() {
        // A convex objective with minimum at 1.2; seed the memory so the
        // initial pair is (1, 2).
        let mut memory = StepSizeMemory { alpha: Some(2.0) };
        let f = |a: f64| 10.0 + (a - 1.2) * (a - 1.2);
        let result = run(f(0.0), 100.0, &mut memory, f);
        assert_eq!(result.outcome, LineSearchOutcome::Parabolic);
        assert!(result.alpha > 0.5 && result.alpha < 2.0, "alpha = {}", result.alpha);
        assert_eq!(memory.alpha(), Some(result.alpha));
    }

    #[test]
    fn all_uphill_returns_best_tried() {
        // Monotone increasing objective: every candidate is worse than
        // J(0); the fallback must return the lowest-J (smallest) alpha
        // actually tried, never zero.
        let mut memory = StepSizeMemory { alpha: Some(32.0) };
        let f = |a: f64| 1.0 + a;
        let result = run(1.0, 64.0, &mut memory, f);
        assert_eq!(result.outcome, LineSearchOutcome::FallbackLeft);
        assert!(result.alpha > 0.0);
        // Initial alpha2 = 16 halved five times = 0.5.
        assert!((result.alpha - 0.5).abs() < 1e-12, "alpha = {}", result.alpha);
        assert!((result.objective - 1.5).abs() < 1e-12);
    }

    #[test]
    fn descending_past_cap_falls_back_right() {
        // Superlinearly decreasing objective: the bracket keeps doubling
        // until it hits the cap while J is still dropping.
        let mut memory = StepSizeMemory { alpha: Some(1.0) };
        let f = |a: f64| 10.0 - 0.1 * a * a;
        let result = run(10.0, 8.0, &mut memory, f);
        assert_eq!(result.outcome, LineSearchOutcome::FallbackRight);
        // Best tried is the cap itself.
        assert!((result.alpha - 8.0).abs() < 1e-12, "alpha = {}", result.alpha);
        assert!((result.objective - 3.6).abs() < 1e-12);
    }

    #[test]
    fn flat_objective_steps_to_cap() {
        // J identical everywhere: no bracket expansion, zero curvature,
        // degenerate fit.
        let mut memory = StepSizeMemory { alpha: Some(2.0) };
        let f = |_: f64| 10.0;
        let result = run(10.0, 100.0, &mut memory, f);
        assert_eq!(result.outcome, LineSearchOutcome::Degenerate);
        // Cap rule: 2 * alpha3 with alpha3 = 2.
        assert!((result.alpha - 4.0).abs() < 1e-12, "alpha = {}", result.alpha);
    }

    #[test]
    fn collapsed_memory_is_reseeded() {
        let mut memory = StepSizeMemory { alpha: Some(1e-9) };
        let f = |a: f64| 10.0 + (a - 5e-5) * (a - 5e-5);
        let result = run(f(0.0), 1.0, &mut memory, f);
        // Initial alpha3 was re-seeded to 1e-4, not 1e-9.
        assert!(result.alpha > 1e-6, "alpha = {}", result.alpha);
    }

    #[test]
    fn first_use_seeds_from_cap() {
        let mut memory = StepSizeMemory::new();
        assert_eq!(memory.alpha(), None);
        let f = |a: f64| 10.0 + (a - 1.0) * (a - 1.0);
        let _ = run(11.0, 4.0, &mut memory, f);
        assert!(memory.alpha().is_some());
    }

    #[test]
    fn alpha_never_exceeds_cap() {
        let mut memory = StepSizeMemory { alpha: Some(100.0) };
        let f = |a: f64| 10.0 + (a - 50.0) * (a - 50.0) / 100.0;
        let result = run(f(0.0), 6.0, &mut memory, f);
        assert!(result.alpha <= 6.0, "alpha = {}", result.alpha);
    }

    #[test]
    fn step_cap_enforces_max_velocity_change() {
        use tremor_core::Grid;
        let grid = Grid::new(10, 10, 2, 5.0, 0.001).unwrap();
        let vel = VelocityModel::expand(grid, &vec![2000.0; 100]).unwrap();
        // One cell pushed much harder than the rest.
        let mut direction = vec![1e-3f32; grid.padded_len()];
        direction[grid.index(7, 7)] = 1.0;
        let cap = step_cap(&vel, &direction);
        assert!(cap.is_finite());

        // Stepping by the cap changes the hot cell by exactly maxdv.
        let s0 = vel.data()[grid.index(7, 7)];
        let c0 = grid.physical(s0);
        let s1 = s0 + cap as f32 * direction[grid.index(7, 7)];
        let c1 = grid.physical(s1);
        assert!((c0 - c1 - MAX_VELOCITY_CHANGE).abs() < 0.5, "dc = {}", c0 - c1);
    }

    #[test]
    fn zero_direction_has_infinite_cap() {
        use tremor_core::Grid;
        let grid = Grid::new(10, 10, 2, 5.0, 0.001).unwrap();
        let vel = VelocityModel::expand(grid, &vec![2000.0; 100]).unwrap();
        let direction = vec![0.0f32; grid.padded_len()];
        assert!(step_cap(&vel, &direction).is_infinite());
    }
}
