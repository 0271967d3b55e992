//! Primitive little-endian `f32` codec over `Read`/`Write`.
//!
//! The wire format is intentionally simple: a flat array of little-endian
//! IEEE-754 `f32`, no magic, no compression, no padding. Shape travels in
//! a separate text header (see [`crate::header`]).

use std::io::{Read, Write};

use crate::error::StoreError;

/// Write a slice of `f32` as little-endian bytes.
pub fn write_f32_slice(w: &mut dyn Write, data: &[f32]) -> Result<(), StoreError> {
    // Buffer in chunks so large grids do not issue one syscall per value.
    let mut buf = Vec::with_capacity(4 * data.len().min(16 * 1024));
    for chunk in data.chunks(16 * 1024) {
        buf.clear();
        for v in chunk {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        w.write_all(&buf)?;
    }
    Ok(())
}

/// Read exactly `len` little-endian `f32` values.
pub fn read_f32_vec(r: &mut dyn Read, len: usize) -> Result<Vec<f32>, StoreError> {
    let mut out = vec![0.0f32; len];
    read_f32_into(r, &mut out)?;
    Ok(out)
}

/// Read little-endian `f32` values into an existing buffer, filling it
/// completely.
pub fn read_f32_into(r: &mut dyn Read, out: &mut [f32]) -> Result<(), StoreError> {
    let mut bytes = vec![0u8; 4 * out.len().min(16 * 1024)];
    let mut filled = 0;
    while filled < out.len() {
        let take = (out.len() - filled).min(16 * 1024);
        let buf = &mut bytes[..4 * take];
        r.read_exact(buf)?;
        for (slot, quad) in out[filled..filled + take].iter_mut().zip(buf.chunks_exact(4)) {
            *slot = f32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]);
        }
        filled += take;
    }
    Ok(())
}

/// Read every remaining `f32` until EOF. Errors if the byte count is not a
/// multiple of four.
pub fn read_f32_to_end(r: &mut dyn Read) -> Result<Vec<f32>, StoreError> {
    let mut bytes = Vec::new();
    r.read_to_end(&mut bytes)?;
    if bytes.len() % 4 != 0 {
        return Err(StoreError::MalformedHeader {
            detail: format!("volume byte count {} is not a multiple of 4", bytes.len()),
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|q| f32::from_le_bytes([q[0], q[1], q[2], q[3]]))
        .collect())
}
