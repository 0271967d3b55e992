//! Raw `f32` volume files: read, write, and per-iteration append.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::codec::{read_f32_vec, write_f32_slice};
use crate::error::StoreError;

/// Read a volume of exactly `expected` samples.
///
/// # Errors
///
/// Returns [`StoreError::ShapeMismatch`] if the file size disagrees with
/// `expected`, or [`StoreError::Io`] on read failure.
pub fn read_volume(path: &Path, expected: usize) -> Result<Vec<f32>, StoreError> {
    let file = File::open(path)?;
    let bytes = file.metadata()?.len() as usize;
    if bytes != 4 * expected {
        return Err(StoreError::ShapeMismatch {
            expected,
            found: bytes / 4,
        });
    }
    read_f32_vec(&mut BufReader::new(file), expected)
}

/// Write a volume, truncating any existing file.
///
/// # Errors
///
/// Returns [`StoreError::Io`] on write failure.
pub fn write_volume(path: &Path, data: &[f32]) -> Result<(), StoreError> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);
    write_f32_slice(&mut w, data)?;
    Ok(())
}

/// Append a volume to an existing file (creating it on first use). Used
/// for the per-iteration velocity output, which grows by one model per
/// outer iteration.
///
/// # Errors
///
/// Returns [`StoreError::Io`] on write failure.
pub fn append_volume(path: &Path, data: &[f32]) -> Result<(), StoreError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut w = BufWriter::new(file);
    write_f32_slice(&mut w, data)?;
    Ok(())
}
