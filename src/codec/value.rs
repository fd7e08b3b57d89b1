//! Pure encoders/decoders for the fixed-shape numeric tensors (spec section 4.1).
//!
//! Every function here is total except for its documented shape assertion:
//! these assertions exist to catch a programming error in the caller (an
//! encoder handed the wrong matrix), not a corrupted artifact — corrupted
//! artifacts are caught one layer up, in [`crate::codec::entity`], where a
//! short read becomes a recoverable [`crate::error::MapError`] instead of a
//! panic.

use serde::{Deserialize, Serialize};

use crate::types::{Descriptor, Intrinsics, Keypoint, Pose, Position};

/// Wire form of an intrinsics matrix: the four scalars that matter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireIntrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

pub fn encode_intrinsics(m: &Intrinsics) -> WireIntrinsics {
    WireIntrinsics { fx: m[(0, 0)], fy: m[(1, 1)], cx: m[(0, 2)], cy: m[(1, 2)] }
}

pub fn decode_intrinsics(w: &WireIntrinsics) -> Intrinsics {
    crate::types::intrinsics_from_params(w.fx, w.fy, w.cx, w.cy)
}

/// Wire form of a descriptor: 8 little-endian u32s, four bytes each.
pub type WireDescriptor = [u32; 8];

pub fn encode_descriptor(d: &Descriptor) -> WireDescriptor {
    let mut out = [0u32; 8];
    for (chunk, slot) in d.chunks_exact(4).zip(out.iter_mut()) {
        *slot = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    out
}

pub fn decode_descriptor(w: &WireDescriptor) -> Descriptor {
    let mut out = [0u8; 32];
    for (i, word) in w.iter().enumerate() {
        out[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
    }
    out
}

/// Wire form of a pose: first three rows, row-major, 12 floats. The last row
/// is known to be [0,0,0,1] and is never written.
pub type WirePose = [f32; 12];

pub fn encode_pose(m: &Pose) -> WirePose {
    let mut out = [0f32; 12];
    for row in 0..3 {
        for col in 0..4 {
            out[row * 4 + col] = m[(row, col)];
        }
    }
    out
}

pub fn decode_pose(w: &WirePose) -> Pose {
    let mut m = Pose::identity();
    for row in 0..3 {
        for col in 0..4 {
            m[(row, col)] = w[row * 4 + col];
        }
    }
    m
}

/// Wire form of a landmark position.
pub type WirePosition = [f32; 3];

pub fn encode_position(p: &Position) -> WirePosition {
    [p.x, p.y, p.z]
}

pub fn decode_position(w: &WirePosition) -> Position {
    Position::new(w[0], w[1], w[2])
}

/// Wire form of a keypoint, field-for-field with [`Keypoint`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireKeypoint {
    pub x: f32,
    pub y: f32,
    pub octave: i32,
    pub angle: f32,
}

pub fn encode_keypoint(k: &Keypoint) -> WireKeypoint {
    WireKeypoint { x: k.x, y: k.y, octave: k.octave, angle: k.angle }
}

pub fn decode_keypoint(w: &WireKeypoint) -> Keypoint {
    Keypoint::new(w.x, w.y, w.octave, w.angle)
}
