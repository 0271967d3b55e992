//! Byte-stream I/O for the Tremor FWI engine.
//!
//! Everything on disk is a raw little-endian IEEE-754 `f32` array with a
//! sidecar text header of `name=value` pairs carrying shape, spacing, and
//! units. This crate provides the primitive codec, the header type, volume
//! read/append helpers, and the wavefield checkpoint store that bounds the
//! gradient engine's memory at O(grid).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod checkpoint;
pub mod codec;
pub mod error;
pub mod header;
pub mod volume;

pub use checkpoint::{CheckpointBackend, CheckpointKey, CheckpointStore, DirBackend, MemBackend, Slot};
pub use error::StoreError;
pub use header::VolumeHeader;
