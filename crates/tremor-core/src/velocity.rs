//! The velocity model on the padded grid, in transformed units.
//!
//! Values are stored as `s = (dx / (dt * c))^2`, the unit the propagator
//! and the update clamps work in directly. Conversion to physical m/s
//! happens only at the boundaries of the system (file I/O, logging, the
//! per-iteration velocity-change cap).
//!
//! Two invariants are maintained by this type:
//! - every cell stays within the configured clamp bounds, and
//! - each padded border cell equals its nearest interior-edge cell
//!   ("refill"), so the absorbing margin never introduces a velocity
//!   contrast of its own.

use crate::error::GeometryError;
use crate::grid::Grid;

/// Dense velocity model on the padded grid, in transformed units.
#[derive(Clone, Debug)]
pub struct VelocityModel {
    grid: Grid,
    data: Vec<f32>,
}

impl VelocityModel {
    /// Build a padded model from an interior `nz x nx` volume of physical
    /// speeds (m/s, column-major z-fast). The margin is filled by the
    /// border refill rule.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ShapeMismatch`] if `interior` does not hold
    /// exactly `nz * nx` samples.
    pub fn expand(grid: Grid, interior: &[f32]) -> Result<Self, GeometryError> {
        let expected = grid.nz() * grid.nx();
        if interior.len() != expected {
            return Err(GeometryError::ShapeMismatch {
                expected,
                found: interior.len(),
            });
        }
        let mut model = Self {
            grid,
            data: vec![0.0; grid.padded_len()],
        };
        let nb = grid.nb();
        for ix in 0..grid.nx() {
            for iz in 0..grid.nz() {
                let c = interior[ix * grid.nz() + iz];
                model.data[grid.index(iz + nb, ix + nb)] = grid.transform(c);
            }
        }
        model.refill_border();
        Ok(model)
    }

    /// Build a model directly from padded transformed-unit data.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ShapeMismatch`] if `data` is not of
    /// padded-grid size.
    pub fn from_padded(grid: Grid, data: Vec<f32>) -> Result<Self, GeometryError> {
        if data.len() != grid.padded_len() {
            return Err(GeometryError::ShapeMismatch {
                expected: grid.padded_len(),
                found: data.len(),
            });
        }
        Ok(Self { grid, data })
    }

    /// The grid this model lives on.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Transformed-unit cell values on the padded grid.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable access to the padded cell values. The caller is responsible
    /// for restoring the refill invariant afterwards.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Extract the interior volume converted back to physical speeds (m/s).
    pub fn shrink_physical(&self) -> Vec<f32> {
        let g = &self.grid;
        let nb = g.nb();
        let mut out = vec![0.0; g.nz() * g.nx()];
        for ix in 0..g.nx() {
            for iz in 0..g.nz() {
                out[ix * g.nz() + iz] = g.physical(self.data[g.index(iz + nb, ix + nb)]);
            }
        }
        out
    }

    /// Copy each border cell from its nearest interior-edge cell.
    ///
    /// Fills the top/bottom margins column-wise first, then replicates the
    /// completed leftmost/rightmost interior columns sideways, which also
    /// covers the corners.
    pub fn refill_border(&mut self) {
        let g = self.grid;
        let (nz_pad, nx_pad, nb) = (g.nz_pad(), g.nx_pad(), g.nb());
        if nb == 0 {
            return;
        }
        for ix in nb..nx_pad - nb {
            let top = self.data[g.index(nb, ix)];
            let bottom = self.data[g.index(nz_pad - nb - 1, ix)];
            for iz in 0..nb {
                self.data[g.index(iz, ix)] = top;
                self.data[g.index(nz_pad - 1 - iz, ix)] = bottom;
            }
        }
        let left_col = nb;
        let right_col = nx_pad - nb - 1;
        for ix in 0..nb {
            let (dst_left, src_left) = (ix * nz_pad, left_col * nz_pad);
            let (dst_right, src_right) = ((nx_pad - 1 - ix) * nz_pad, right_col * nz_pad);
            self.data.copy_within(src_left..src_left + nz_pad, dst_left);
            self.data
                .copy_within(src_right..src_right + nz_pad, dst_right);
        }
    }

    /// Step along `direction` by `alpha`, clamp every cell into
    /// `[s_lo, s_hi]` (transformed units), and restore the border refill.
    /// Returns the number of cells the clamp touched.
    pub fn apply_step(&mut self, direction: &[f32], alpha: f32, s_lo: f32, s_hi: f32) -> usize {
        let mut clamped = 0;
        for (v, d) in self.data.iter_mut().zip(direction) {
            let stepped = *v + alpha * d;
            let bounded = stepped.clamp(s_lo, s_hi);
            if bounded != stepped {
                clamped += 1;
            }
            *v = bounded;
        }
        self.refill_border();
        clamped
    }

    /// A trial model stepped along `direction` by `alpha`, clamped and
    /// refilled, leaving `self` untouched. Used by line-search candidate
    /// evaluation.
    pub fn stepped(&self, direction: &[f32], alpha: f32, s_lo: f32, s_hi: f32) -> Self {
        let mut trial = self.clone();
        trial.apply_step(direction, alpha, s_lo, s_hi);
        trial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid {
        Grid::new(4, 3, 2, 5.0, 0.001).unwrap()
    }

    fn constant_model(c: f32) -> VelocityModel {
        let g = grid();
        VelocityModel::expand(g, &vec![c; g.nz() * g.nx()]).unwrap()
    }

    #[test]
    fn expand_rejects_wrong_shape() {
        let g = grid();
        assert!(matches!(
            VelocityModel::expand(g, &[0.0; 5]),
            Err(GeometryError::ShapeMismatch { expected: 12, found: 5 })
        ));
    }

    #[test]
    fn expand_constant_is_constant_everywhere() {
        let m = constant_model(2000.0);
        let s = m.grid().transform(2000.0);
        assert!(m.data().iter().all(|&v| (v - s).abs() < 1e-6));
    }

    #[test]
    fn border_refill_copies_nearest_interior_edge() {
        let g = grid();
        // Interior with a distinct value per column so sideways replication
        // is observable.
        let mut interior = vec![0.0; g.nz() * g.nx()];
        for ix in 0..g.nx() {
            for iz in 0..g.nz() {
                interior[ix * g.nz() + iz] = 2000.0 + 100.0 * ix as f32 + iz as f32;
            }
        }
        let m = VelocityModel::expand(g, &interior).unwrap();
        let nb = g.nb();
        // Top margin of an interior column equals the first interior row.
        let ix = nb + 1;
        assert_eq!(m.data()[g.index(0, ix)], m.data()[g.index(nb, ix)]);
        // Left margin equals the leftmost interior column, row by row.
        for iz in 0..g.nz_pad() {
            assert_eq!(m.data()[g.index(iz, 0)], m.data()[g.index(iz, nb)]);
        }
        // Corner equals the corner interior cell.
        assert_eq!(m.data()[g.index(0, 0)], m.data()[g.index(nb, nb)]);
    }

    #[test]
    fn shrink_inverts_expand() {
        let g = grid();
        let mut interior = vec![0.0; g.nz() * g.nx()];
        for (i, v) in interior.iter_mut().enumerate() {
            *v = 1500.0 + i as f32;
        }
        let m = VelocityModel::expand(g, &interior).unwrap();
        let back = m.shrink_physical();
        for (a, b) in interior.iter().zip(&back) {
            assert!((a - b).abs() / a < 1e-5);
        }
    }

    #[test]
    fn apply_step_clamps_and_counts() {
        let mut m = constant_model(2000.0);
        let s = m.grid().transform(2000.0);
        let n = m.data().len();
        let direction = vec![1.0; n];
        let clamped = m.apply_step(&direction, 1e9, s - 1.0, s + 1.0);
        assert_eq!(clamped, n);
        assert!(m.data().iter().all(|&v| v <= s + 1.0));
    }

    #[test]
    fn stepped_leaves_original_untouched() {
        let m = constant_model(2000.0);
        let before = m.data().to_vec();
        let _trial = m.stepped(&vec![1.0; before.len()], 0.5, 0.0, f32::MAX);
        assert_eq!(m.data(), &before[..]);
    }
}
