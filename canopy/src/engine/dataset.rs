//! Point sources: seeded uniform generation and raw binary files.
//!
//! Files are a flat sequence of little-endian `f32` quadruples
//! `(x, y, z, mass)`, 16 bytes per point, no header.

use std::fs;
use std::path::Path;

use log::info;
use rand::Rng;

use crate::error::DatasetError;
use crate::spatial::states::NVec4;

const RECORD_BYTES: usize = 16;

/// `count` points with every component drawn from `[0, extent)`.
pub fn uniform_points<R: Rng + ?Sized>(count: usize, extent: f64, rng: &mut R) -> Vec<NVec4> {
    (0..count)
        .map(|_| {
            NVec4::new(
                rng.gen_range(0.0..extent),
                rng.gen_range(0.0..extent),
                rng.gen_range(0.0..extent),
                rng.gen_range(0.0..extent),
            )
        })
        .collect()
}

pub fn load_points(path: &Path) -> Result<Vec<NVec4>, DatasetError> {
    let bytes = fs::read(path)?;
    if bytes.len() % RECORD_BYTES != 0 {
        return Err(DatasetError::Truncated { len: bytes.len() });
    }

    let points: Vec<NVec4> = bytes
        .chunks_exact(RECORD_BYTES)
        .map(|record| {
            let mut c = [0.0_f64; 4];
            for (slot, raw) in c.iter_mut().zip(record.chunks_exact(4)) {
                *slot = f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64;
            }
            NVec4::new(c[0], c[1], c[2], c[3])
        })
        .collect();

    info!("loaded {} points from {}", points.len(), path.display());
    Ok(points)
}

pub fn write_points(path: &Path, points: &[NVec4]) -> Result<(), DatasetError> {
    let mut bytes = Vec::with_capacity(points.len() * RECORD_BYTES);
    for p in points {
        for c in p.iter() {
            bytes.extend_from_slice(&(*c as f32).to_le_bytes());
        }
    }
    fs::write(path, bytes)?;
    Ok(())
}
