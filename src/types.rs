//! Fixed-shape numeric value types shared by the model and the codecs.
//!
//! The host's matrix/keypoint value types are out of scope (spec section 1);
//! this crate works against plain `nalgebra` types instead, the same crate
//! `karana-core` already depends on for its spatial math.

use nalgebra::{Matrix3, Matrix4, Vector3};

/// 3x3 camera intrinsics matrix (fx, fy, cx, cy packed in the usual places).
pub type Intrinsics = Matrix3<f32>;

/// 4x4 rigid world->camera pose in homogeneous coordinates.
pub type Pose = Matrix4<f32>;

/// 3D landmark position.
pub type Position = Vector3<f32>;

/// 256-bit binary feature descriptor (ORB-style).
pub type Descriptor = [u8; 32];

/// Build an intrinsics matrix from its four defining scalars, identity
/// elsewhere — mirrors what [`crate::codec::value::decode_intrinsics`] does
/// on the wire, but is also handy for tests and host adapters.
pub fn intrinsics_from_params(fx: f32, fy: f32, cx: f32, cy: f32) -> Intrinsics {
    let mut k = Intrinsics::identity();
    k[(0, 0)] = fx;
    k[(1, 1)] = fy;
    k[(0, 2)] = cx;
    k[(1, 2)] = cy;
    k
}

/// A detected keypoint within a keyframe's image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub octave: i32,
    pub angle: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, octave: i32, angle: f32) -> Self {
        Self { x, y, octave, angle }
    }
}
