//! Source and receiver acquisition geometry.
//!
//! Positions are generated as linear arrays `(begin, stride, count)` in
//! interior grid coordinates, validated against the computing zone, and
//! shifted into padded index space before use by the propagator.

use crate::error::GeometryError;

/// An ordered list of grid positions `(iz, ix)` for sources or receivers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShotPosition {
    points: Vec<(usize, usize)>,
}

impl ShotPosition {
    /// Generate `n` positions along a line: point `i` sits at
    /// `(zbeg + i*jz, xbeg + i*jx)`.
    pub fn linear(zbeg: usize, xbeg: usize, jz: usize, jx: usize, n: usize) -> Self {
        let points = (0..n).map(|i| (zbeg + i * jz, xbeg + i * jx)).collect();
        Self { points }
    }

    /// Build from explicit positions.
    pub fn from_points(points: Vec<(usize, usize)>) -> Self {
        Self { points }
    }

    /// Validate that every position lies inside the interior `nz x nx`
    /// computing zone.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::OutOfComputingZone`] naming the first
    /// offending position. `what` labels the array in the error message.
    pub fn validate(&self, what: &'static str, nz: usize, nx: usize) -> Result<(), GeometryError> {
        for (index, &(iz, ix)) in self.points.iter().enumerate() {
            if iz >= nz || ix >= nx {
                return Err(GeometryError::OutOfComputingZone {
                    what,
                    index,
                    iz,
                    ix,
                    nz,
                    nx,
                });
            }
        }
        Ok(())
    }

    /// The same positions shifted by `nb` on both axes, i.e. expressed in
    /// padded-grid index space.
    pub fn shifted(&self, nb: usize) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|&(iz, ix)| (iz + nb, ix + nb))
                .collect(),
        }
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the list holds no positions.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over `(iz, ix)` positions.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.points.iter().copied()
    }

    /// Position `i`.
    pub fn get(&self, i: usize) -> (usize, usize) {
        self.points[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_generates_strided_points() {
        let p = ShotPosition::linear(2, 10, 0, 5, 3);
        assert_eq!(p.len(), 3);
        assert_eq!(p.get(0), (2, 10));
        assert_eq!(p.get(1), (2, 15));
        assert_eq!(p.get(2), (2, 20));
    }

    #[test]
    fn validate_accepts_interior_positions() {
        let p = ShotPosition::linear(0, 0, 1, 1, 4);
        assert!(p.validate("source", 4, 4).is_ok());
    }

    #[test]
    fn validate_rejects_out_of_zone() {
        let p = ShotPosition::linear(2, 10, 0, 5, 3);
        let err = p.validate("receiver", 100, 18).unwrap_err();
        assert_eq!(
            err,
            GeometryError::OutOfComputingZone {
                what: "receiver",
                index: 2,
                iz: 2,
                ix: 20,
                nz: 100,
                nx: 18,
            }
        );
    }

    #[test]
    fn shifted_moves_into_padded_space() {
        let p = ShotPosition::linear(1, 2, 0, 1, 2).shifted(30);
        assert_eq!(p.get(0), (31, 32));
        assert_eq!(p.get(1), (31, 33));
    }
}
