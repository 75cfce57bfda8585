//! Core types for recorded attributes
//!
//! This module defines the fixed-width record abstraction that every stream
//! is built on, the concrete payloads shipped with the crate, and the stream
//! kinds that decide chunk file prefixes.
//!
//! # Main Types
//!
//! - [`Record`] - Fixed-width little-endian encoding of one sample
//! - [`Interpolate`] - Linear blend between two samples
//! - [`Vec3`] - Three `f32` components (positions, euler rotations, scales)
//! - [`StreamKind`] - Which attribute a stream captures

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed-width sample that can be stored in a chunk
///
/// Every record of a given type encodes to exactly [`Record::ENCODED_LEN`]
/// bytes, which is what makes offset arithmetic over chunks possible.
pub trait Record: Copy + fmt::Debug + 'static {
    /// Encoded size in bytes
    const ENCODED_LEN: usize;

    /// Append the encoding of `self` to `out`
    fn encode_into(&self, out: &mut Vec<u8>);

    /// Decode a record from exactly `ENCODED_LEN` bytes
    fn decode_from(bytes: &[u8]) -> Self;
}

/// Linear interpolation between two samples
pub trait Interpolate {
    /// Blend from `self` to `other`; `t` is clamped to `[0, 1]`
    fn lerp(&self, other: &Self, t: f32) -> Self;
}

/// Read a little-endian `f32` at `offset`
fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    f32::from_le_bytes(raw)
}

impl Record for f32 {
    const ENCODED_LEN: usize = 4;

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn decode_from(bytes: &[u8]) -> Self {
        read_f32(bytes, 0)
    }
}

impl Interpolate for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        self + (other - self) * t
    }
}

/// A three-component vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another vector
    pub fn distance(&self, other: &Vec3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl Record for Vec3 {
    const ENCODED_LEN: usize = 12;

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.x.to_le_bytes());
        out.extend_from_slice(&self.y.to_le_bytes());
        out.extend_from_slice(&self.z.to_le_bytes());
    }

    fn decode_from(bytes: &[u8]) -> Self {
        Self {
            x: read_f32(bytes, 0),
            y: read_f32(bytes, 4),
            z: read_f32(bytes, 8),
        }
    }
}

impl Interpolate for Vec3 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            x: self.x.lerp(&other.x, t),
            y: self.y.lerp(&other.y, t),
            z: self.z.lerp(&other.z, t),
        }
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Which attribute a stream captures
///
/// The kind decides the chunk file prefix, so several streams can share one
/// recording directory without their chunks colliding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    /// World position
    Position,
    /// Euler rotation angles
    Rotation,
    /// Local scale
    Scale,
    /// Any other attribute, stored under the given prefix
    Custom(String),
}

impl StreamKind {
    /// File prefix used for this stream's chunks
    pub fn prefix(&self) -> &str {
        match self {
            StreamKind::Position => "positions",
            StreamKind::Rotation => "rotations",
            StreamKind::Scale => "scales",
            StreamKind::Custom(prefix) => prefix,
        }
    }

    /// File name of the chunk with the given index
    pub fn chunk_file_name(&self, index: usize) -> String {
        format!("{}_{}.bin", self.prefix(), index)
    }

    /// Parse a chunk index out of a file name belonging to this stream
    pub fn parse_chunk_index(&self, file_name: &str) -> Option<usize> {
        file_name
            .strip_prefix(self.prefix())?
            .strip_prefix('_')?
            .strip_suffix(".bin")?
            .parse()
            .ok()
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}
