//! Nonlinear conjugate-gradient direction builder.
//!
//! Polak–Ribière with reset: `beta = (<g,g> - <g,g_prev>) / <g_prev,g_prev>`,
//! floored at zero so the direction never turns against the gradient. The
//! previous gradient and direction persist across outer iterations in this
//! state struct; the first call simply copies the gradient.

/// Conjugate-direction state carried across outer iterations.
#[derive(Clone, Debug)]
pub struct CgDirection {
    g_prev: Vec<f32>,
    d: Vec<f32>,
    iterations: usize,
    last_beta: f64,
}

impl CgDirection {
    /// State for gradients of `len` cells.
    pub fn new(len: usize) -> Self {
        Self {
            g_prev: vec![0.0; len],
            d: vec![0.0; len],
            iterations: 0,
            last_beta: 0.0,
        }
    }

    /// Fold the current gradient into a new search direction.
    ///
    /// # Panics
    ///
    /// Panics if `g` does not match the length given at construction;
    /// gradients always come from the same grid.
    pub fn update(&mut self, g: &[f32]) -> &[f32] {
        assert_eq!(g.len(), self.d.len(), "gradient length changed");
        if self.iterations == 0 {
            self.d.copy_from_slice(g);
            self.last_beta = 0.0;
        } else {
            let a = dot(g, g);
            let b = dot(g, &self.g_prev);
            let c = dot(&self.g_prev, &self.g_prev);
            let beta = if c > 0.0 { ((a - b) / c).max(0.0) } else { 0.0 };
            for (d, &gi) in self.d.iter_mut().zip(g) {
                *d = gi + beta as f32 * *d;
            }
            self.last_beta = beta;
        }
        self.g_prev.copy_from_slice(g);
        self.iterations += 1;
        &self.d
    }

    /// The current direction (last value returned by
    /// [`update`](Self::update)).
    pub fn direction(&self) -> &[f32] {
        &self.d
    }

    /// The `beta` used by the most recent update. Zero on the first
    /// iteration and after a reset.
    pub fn last_beta(&self) -> f64 {
        self.last_beta
    }

    /// Number of updates applied so far.
    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}
