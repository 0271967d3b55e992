//! The padded finite-difference grid and the velocity unit transform.
//!
//! The interior `nz x nx` physical grid is expanded by `nb` cells on every
//! side to host the absorbing margin. All wavefields and the velocity model
//! live on the padded grid. Storage is column-major with `z` as the fast
//! axis: `idx = ix * nz_pad + iz`.

use crate::error::GeometryError;

/// Geometry of the padded computational grid.
///
/// Carries the interior extents, the margin thickness, and the space/time
/// sampling needed for the velocity unit transform
/// `s = (dx / (dt * c))^2`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grid {
    nz: usize,
    nx: usize,
    nb: usize,
    dx: f32,
    dt: f32,
}

impl Grid {
    /// Create a grid, validating extents and sampling.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidGrid`] if either interior extent is
    /// zero or a sampling interval is not finite and positive.
    pub fn new(nz: usize, nx: usize, nb: usize, dx: f32, dt: f32) -> Result<Self, GeometryError> {
        if nz == 0 || nx == 0 {
            return Err(GeometryError::InvalidGrid {
                reason: format!("interior extents must be non-zero, got {nz}x{nx}"),
            });
        }
        if !(dx > 0.0 && dx.is_finite()) {
            return Err(GeometryError::InvalidGrid {
                reason: format!("dx must be finite and positive, got {dx}"),
            });
        }
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(GeometryError::InvalidGrid {
                reason: format!("dt must be finite and positive, got {dt}"),
            });
        }
        Ok(Self { nz, nx, nb, dx, dt })
    }

    /// Interior depth extent (cells).
    pub fn nz(&self) -> usize {
        self.nz
    }

    /// Interior lateral extent (cells).
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Absorbing margin thickness (cells, each side).
    pub fn nb(&self) -> usize {
        self.nb
    }

    /// Cell spacing in meters (`dx == dz`).
    pub fn dx(&self) -> f32 {
        self.dx
    }

    /// Time step in seconds.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Padded depth extent.
    pub fn nz_pad(&self) -> usize {
        self.nz + 2 * self.nb
    }

    /// Padded lateral extent.
    pub fn nx_pad(&self) -> usize {
        self.nx + 2 * self.nb
    }

    /// Number of cells on the padded grid.
    pub fn padded_len(&self) -> usize {
        self.nz_pad() * self.nx_pad()
    }

    /// Flat index of padded-grid cell `(iz, ix)`.
    pub fn index(&self, iz: usize, ix: usize) -> usize {
        ix * self.nz_pad() + iz
    }

    /// Transform a physical speed (m/s) into the internal unit
    /// `s = (dx / (dt * c))^2`.
    ///
    /// The transform is bijective on positive speeds and strictly
    /// decreasing in `c`: faster rock maps to a smaller `s`.
    pub fn transform(&self, c: f32) -> f32 {
        let r = self.dx / (self.dt * c);
        r * r
    }

    /// Invert [`transform`](Self::transform): recover the physical speed
    /// (m/s) from the internal unit.
    pub fn physical(&self, s: f32) -> f32 {
        self.dx / (self.dt * s.sqrt())
    }

    /// Courant number `dt * c / dx` for the given speed. Values well below
    /// one are required for a stable explicit update; the caller decides
    /// the acceptable threshold.
    pub fn courant(&self, c: f32) -> f32 {
        self.dt * c / self.dx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid() -> Grid {
        Grid::new(100, 120, 30, 5.0, 0.001).unwrap()
    }

    #[test]
    fn rejects_zero_extent() {
        assert!(matches!(
            Grid::new(0, 10, 5, 5.0, 0.001),
            Err(GeometryError::InvalidGrid { .. })
        ));
        assert!(matches!(
            Grid::new(10, 0, 5, 5.0, 0.001),
            Err(GeometryError::InvalidGrid { .. })
        ));
    }

    #[test]
    fn rejects_bad_sampling() {
        assert!(Grid::new(10, 10, 5, 0.0, 0.001).is_err());
        assert!(Grid::new(10, 10, 5, 5.0, f32::NAN).is_err());
        assert!(Grid::new(10, 10, 5, -1.0, 0.001).is_err());
    }

    #[test]
    fn padded_extents() {
        let g = grid();
        assert_eq!(g.nz_pad(), 160);
        assert_eq!(g.nx_pad(), 180);
        assert_eq!(g.padded_len(), 160 * 180);
    }

    #[test]
    fn index_is_column_major_z_fast() {
        let g = grid();
        assert_eq!(g.index(0, 0), 0);
        assert_eq!(g.index(1, 0), 1);
        assert_eq!(g.index(0, 1), g.nz_pad());
    }

    #[test]
    fn transform_is_decreasing_in_speed() {
        let g = grid();
        assert!(g.transform(2000.0) > g.transform(3000.0));
    }

    proptest! {
        #[test]
        fn transform_roundtrip(c in 300.0f32..8000.0) {
            let g = grid();
            let back = g.physical(g.transform(c));
            prop_assert!((back - c).abs() / c < 1e-5, "c={c} back={back}");
        }
    }
}
