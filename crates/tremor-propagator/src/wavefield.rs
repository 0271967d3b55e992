//! Triple-buffered pressure wavefield.

/// The `{prev, curr, next}` pressure triple on the padded grid.
///
/// Only two fields are logically live at any instant; the third is a
/// scratch buffer reused across steps. [`rotate`](Self::rotate) cycles the
/// buffers without copying cell data.
#[derive(Clone, Debug)]
pub struct WavefieldTriple {
    /// Field at the previous time step.
    pub prev: Vec<f32>,
    /// Field at the current time step.
    pub curr: Vec<f32>,
    /// Scratch buffer receiving the next time step.
    pub next: Vec<f32>,
}

impl WavefieldTriple {
    /// Three zeroed buffers of `len` cells.
    pub fn zeroed(len: usize) -> Self {
        Self {
            prev: vec![0.0; len],
            curr: vec![0.0; len],
            next: vec![0.0; len],
        }
    }

    /// Cycle the buffers after a step: the freshly written `next` becomes
    /// `curr`, `curr` becomes `prev`, and the old `prev` becomes scratch.
    pub fn rotate(&mut self) {
        std::mem::swap(&mut self.prev, &mut self.curr);
        std::mem::swap(&mut self.curr, &mut self.next);
    }

    /// Zero all three buffers.
    pub fn reset(&mut self) {
        self.prev.fill(0.0);
        self.curr.fill(0.0);
        self.next.fill(0.0);
    }
}
