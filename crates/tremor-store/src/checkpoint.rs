//! Wavefield checkpoint store.
//!
//! Reconstructing the source wavefield backward in time needs the forward
//! field at every step, but storing all `nt` fields costs O(nt * grid)
//! memory. Instead the forward pass persists the `(p_prev, p_curr)` pair
//! every `interval` steps (plus the final pair), and the reverse pass
//! reloads the pair at those same boundaries, re-deriving the steps in
//! between. Memory stays O(grid) at a cost of O(nt * grid / interval) I/O.
//!
//! The store is keyed by `(timestep, slot)` plus a distinguished `last`
//! key; the backend is an opaque byte-array provider so tests run against
//! memory and production against `CHECKPOINTDIR` files.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::codec::{read_f32_into, write_f32_slice};
use crate::error::StoreError;

// ── Keys ────────────────────────────────────────────────────────

/// Which half of a checkpointed wavefield pair a record holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    /// The `p_prev` half.
    One,
    /// The `p_curr` half.
    Two,
}

impl Slot {
    fn tag(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

/// Identifies one persisted wavefield array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointKey {
    /// The pair persisted at a periodic timestep boundary.
    Step {
        /// The timestep the pair was persisted at.
        it: usize,
        /// Which half of the pair.
        slot: Slot,
    },
    /// The final pair, persisted at `it = nt - 1`.
    Last {
        /// Which half of the pair.
        slot: Slot,
    },
}

impl CheckpointKey {
    /// Stable storage name: `check_time_<it>_<slot>` or
    /// `check_time_last_<slot>`.
    pub fn name(&self) -> String {
        match self {
            Self::Step { it, slot } => format!("check_time_{}_{}", it, slot.tag()),
            Self::Last { slot } => format!("check_time_last_{}", slot.tag()),
        }
    }
}

// ── Backends ────────────────────────────────────────────────────

/// An opaque byte-array provider for checkpoint records.
pub trait CheckpointBackend {
    /// Persist `data` under `key`, replacing any previous record.
    fn save(&mut self, key: &CheckpointKey, data: &[f32]) -> Result<(), StoreError>;

    /// Load the record at `key` into `out`, which must match the saved
    /// length.
    fn load(&mut self, key: &CheckpointKey, out: &mut [f32]) -> Result<(), StoreError>;
}

/// Directory-of-files backend: one raw little-endian `f32` file per key.
#[derive(Debug)]
pub struct DirBackend {
    dir: PathBuf,
}

impl DirBackend {
    /// Use (and create if needed) the given directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, key: &CheckpointKey) -> PathBuf {
        self.dir.join(key.name())
    }
}

impl CheckpointBackend for DirBackend {
    fn save(&mut self, key: &CheckpointKey, data: &[f32]) -> Result<(), StoreError> {
        let mut w = BufWriter::new(File::create(self.path(key))?);
        write_f32_slice(&mut w, data)
    }

    fn load(&mut self, key: &CheckpointKey, out: &mut [f32]) -> Result<(), StoreError> {
        let path = self.path(key);
        let file = File::open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::CheckpointMissing { key: key.name() }
            } else {
                StoreError::Io(e)
            }
        })?;
        let bytes = file.metadata()?.len() as usize;
        if bytes != 4 * out.len() {
            return Err(StoreError::ShapeMismatch {
                expected: out.len(),
                found: bytes / 4,
            });
        }
        read_f32_into(&mut BufReader::new(file), out)
    }
}

/// In-memory backend for tests, keyed by record name in insertion order.
#[derive(Debug, Default)]
pub struct MemBackend {
    records: IndexMap<String, Vec<f32>>,
}

impl MemBackend {
    /// An empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all saved records, in save order.
    pub fn record_names(&self) -> Vec<&str> {
        self.records.keys().map(String::as_str).collect()
    }
}

impl CheckpointBackend for MemBackend {
    fn save(&mut self, key: &CheckpointKey, data: &[f32]) -> Result<(), StoreError> {
        self.records.insert(key.name(), data.to_vec());
        Ok(())
    }

    fn load(&mut self, key: &CheckpointKey, out: &mut [f32]) -> Result<(), StoreError> {
        let record = self
            .records
            .get(&key.name())
            .ok_or_else(|| StoreError::CheckpointMissing { key: key.name() })?;
        if record.len() != out.len() {
            return Err(StoreError::ShapeMismatch {
                expected: out.len(),
                found: record.len(),
            });
        }
        out.copy_from_slice(record);
        Ok(())
    }
}

// ── CheckpointStore ─────────────────────────────────────────────

/// Applies the forward-save / reverse-load call patterns over a backend.
#[derive(Debug)]
pub struct CheckpointStore<B> {
    backend: B,
    interval: usize,
}

impl<B: CheckpointBackend> CheckpointStore<B> {
    /// Wrap a backend with the given checkpoint interval (minimum 1).
    pub fn new(backend: B, interval: usize) -> Self {
        Self {
            backend,
            interval: interval.max(1),
        }
    }

    /// The checkpoint interval in timesteps.
    pub fn interval(&self) -> usize {
        self.interval
    }

    /// Forward-pass hook: persist `(p_prev, p_curr)` when `it` is a
    /// periodic boundary, and under the `last` key at `it = nt - 1`.
    /// Returns whether anything was written.
    ///
    /// # Errors
    ///
    /// Propagates backend failures; checkpoint I/O has no retry.
    pub fn save_forward(
        &mut self,
        it: usize,
        nt: usize,
        p_prev: &[f32],
        p_curr: &[f32],
    ) -> Result<bool, StoreError> {
        if it + 1 == nt {
            self.backend
                .save(&CheckpointKey::Last { slot: Slot::One }, p_prev)?;
            self.backend
                .save(&CheckpointKey::Last { slot: Slot::Two }, p_curr)?;
            return Ok(true);
        }
        if it > 0 && it % self.interval == 0 {
            self.backend
                .save(&CheckpointKey::Step { it, slot: Slot::One }, p_prev)?;
            self.backend
                .save(&CheckpointKey::Step { it, slot: Slot::Two }, p_curr)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Reverse-pass hook: reload the pair at `it = nt - 1` (from `last`)
    /// and at every periodic boundary, overwriting the in-memory pair.
    /// Returns whether anything was loaded.
    ///
    /// # Errors
    ///
    /// Propagates backend failures; a missing record is
    /// [`StoreError::CheckpointMissing`].
    pub fn load_reverse(
        &mut self,
        it: usize,
        nt: usize,
        p_prev: &mut [f32],
        p_curr: &mut [f32],
    ) -> Result<bool, StoreError> {
        if it + 1 == nt {
            self.backend
                .load(&CheckpointKey::Last { slot: Slot::One }, p_prev)?;
            self.backend
                .load(&CheckpointKey::Last { slot: Slot::Two }, p_curr)?;
            return Ok(true);
        }
        if it > 0 && it % self.interval == 0 {
            self.backend
                .load(&CheckpointKey::Step { it, slot: Slot::One }, p_prev)?;
            self.backend
                .load(&CheckpointKey::Step { it, slot: Slot::Two }, p_curr)?;
            return Ok(true);
        }
        Ok(false)
    }
}
