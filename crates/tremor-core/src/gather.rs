//! The observed shot gather: a dense `(shot, time, receiver)` volume.

use crate::error::GeometryError;

/// Dense observed data of shape `(ns, nt, ng)`, flattened row-major over
/// `(is, it, ig)`: `data[(is * nt + it) * ng + ig]`.
#[derive(Clone, Debug)]
pub struct Gather {
    ns: usize,
    nt: usize,
    ng: usize,
    data: Vec<f32>,
}

impl Gather {
    /// Wrap a flat volume, checking the shape.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ShapeMismatch`] if `data` does not hold
    /// exactly `ns * nt * ng` samples.
    pub fn new(ns: usize, nt: usize, ng: usize, data: Vec<f32>) -> Result<Self, GeometryError> {
        let expected = ns * nt * ng;
        if data.len() != expected {
            return Err(GeometryError::ShapeMismatch {
                expected,
                found: data.len(),
            });
        }
        Ok(Self { ns, nt, ng, data })
    }

    /// An all-zero gather of the given shape.
    pub fn zeroed(ns: usize, nt: usize, ng: usize) -> Self {
        Self {
            ns,
            nt,
            ng,
            data: vec![0.0; ns * nt * ng],
        }
    }

    /// Shot count.
    pub fn ns(&self) -> usize {
        self.ns
    }

    /// Time-sample count per trace.
    pub fn nt(&self) -> usize {
        self.nt
    }

    /// Receiver count per shot.
    pub fn ng(&self) -> usize {
        self.ng
    }

    /// The receiver slice of shot `is` at time sample `it` (`ng` values).
    pub fn slice(&self, is: usize, it: usize) -> &[f32] {
        let start = (is * self.nt + it) * self.ng;
        &self.data[start..start + self.ng]
    }

    /// Mutable receiver slice of shot `is` at time sample `it`.
    pub fn slice_mut(&mut self, is: usize, it: usize) -> &mut [f32] {
        let start = (is * self.nt + it) * self.ng;
        &mut self.data[start..start + self.ng]
    }

    /// One complete shot: the `(nt, ng)` block for shot `is`.
    pub fn shot(&self, is: usize) -> &[f32] {
        let start = is * self.nt * self.ng;
        &self.data[start..start + self.nt * self.ng]
    }

    /// Mutable access to one complete shot block.
    pub fn shot_mut(&mut self, is: usize) -> &mut [f32] {
        let start = is * self.nt * self.ng;
        &mut self.data[start..start + self.nt * self.ng]
    }

    /// The whole flat volume.
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_wrong_length() {
        assert!(Gather::new(2, 3, 4, vec![0.0; 23]).is_err());
        assert!(Gather::new(2, 3, 4, vec![0.0; 24]).is_ok());
    }

    #[test]
    fn slice_indexes_shot_time_receiver() {
        let mut g = Gather::zeroed(2, 3, 4);
        g.slice_mut(1, 2)[3] = 7.0;
        assert_eq!(g.data()[(1 * 3 + 2) * 4 + 3], 7.0);
        assert_eq!(g.slice(1, 2)[3], 7.0);
    }

    #[test]
    fn shot_returns_contiguous_block() {
        let mut g = Gather::zeroed(2, 2, 2);
        g.shot_mut(1).fill(1.0);
        assert!(g.shot(0).iter().all(|&v| v == 0.0));
        assert!(g.shot(1).iter().all(|&v| v == 1.0));
    }
}
