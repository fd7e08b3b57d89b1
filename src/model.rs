//! The in-memory map graph: landmarks, keyframes, and the feature
//! observations that bind them (spec section 3).
//!
//! These are the types the orchestrator borrows from the live host map on
//! save, and the types it hands back to the host map on load. Fields marked
//! "not persisted" below are populated only by [`crate::rebuild`].

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{Descriptor, Intrinsics, Keypoint, Pose, Position};

/// A feature observed in one keyframe, optionally bound to a landmark.
#[derive(Debug, Clone)]
pub struct Feature {
    pub keypoint: Keypoint,
    /// The landmark this feature is an observation of, if any.
    pub landmark_id: Option<u32>,
    /// Present unless dropped by an options-driven shrink (spec section 4.2)
    /// or because the owning landmark's descriptor stands in for it.
    pub descriptor: Option<Descriptor>,
}

/// A selected camera frame retained as a mapping anchor.
///
/// `intrinsics` always holds a concrete matrix in the live map; the choice
/// between an indexed and an inline wire form (spec section 4.3) is made by
/// the codec at save time and resolved back to a concrete matrix at load
/// time, so the rest of the crate never has to care which form was used.
#[derive(Debug, Clone)]
pub struct Keyframe {
    pub id: u32,
    pub pose: Pose,
    pub timestamp: f64,
    pub intrinsics: Intrinsics,
    /// Ordered list of this keyframe's feature observations; index into this
    /// vector is the `featureIndex` named by the observation relation.
    pub features: Vec<Feature>,
    /// Full symmetric set of loop partners. Only the half with a smaller id
    /// than `self.id` is ever written to disk (spec section 3); the other
    /// half is reinstated by [`crate::rebuild`].
    pub loop_edges: BTreeSet<u32>,

    // --- not persisted; rebuilt on load (spec section 3) ---
    pub not_erase: bool,
    pub connected_weights: BTreeMap<u32, u32>,
    pub ordered_connected: Vec<u32>,
    pub parent: Option<u32>,
    pub bad: bool,
    pub bow_vector: Vec<u8>,
    /// Column-major feature grid: `feature_grid[cell_x][cell_y]` lists
    /// feature indices whose keypoint falls in that cell.
    pub feature_grid: Vec<Vec<Vec<usize>>>,
}

impl Keyframe {
    pub fn new(id: u32, pose: Pose, timestamp: f64, intrinsics: Intrinsics) -> Self {
        Self {
            id,
            pose,
            timestamp,
            intrinsics,
            features: Vec::new(),
            loop_edges: BTreeSet::new(),
            not_erase: false,
            connected_weights: BTreeMap::new(),
            ordered_connected: Vec::new(),
            parent: None,
            bad: false,
            bow_vector: Vec::new(),
            feature_grid: Vec::new(),
        }
    }

    /// Only the half of `loop_edges` with an id smaller than this keyframe's
    /// own — the half the wire format actually carries.
    pub fn persisted_loop_edges(&self) -> impl Iterator<Item = u32> + '_ {
        self.loop_edges.iter().copied().filter(move |&other| other < self.id)
    }
}

/// An observation: "keyframe K sees landmark L at feature index i."
pub type Observation = (u32, usize);

/// A persistent 3D point estimated from multiple camera observations.
#[derive(Debug, Clone)]
pub struct Landmark {
    pub id: u32,
    pub position: Position,
    pub visible: u32,
    pub found: u32,
    pub descriptor: Option<Descriptor>,

    // --- not persisted; rebuilt on load (spec section 3) ---
    pub observations: BTreeSet<Observation>,
    pub reference_keyframe: Option<u32>,
    pub min_distance: f32,
    pub max_distance: f32,
    pub normal: Position,
    pub bad: bool,
}

impl Landmark {
    pub fn new(id: u32, position: Position, visible: u32, found: u32) -> Self {
        Self {
            id,
            position,
            visible,
            found,
            descriptor: None,
            observations: BTreeSet::new(),
            reference_keyframe: None,
            min_distance: 0.0,
            max_distance: 0.0,
            normal: Position::zeros(),
            bad: false,
        }
    }
}

/// The live map: the set of landmarks and keyframes a host session owns.
///
/// Ownership transfers at save/load boundaries exactly as spec section 5
/// describes: the core borrows these during save, and on load it builds
/// fresh instances and publishes them here for the host to take over.
#[derive(Debug, Clone, Default)]
pub struct Map {
    pub landmarks: BTreeMap<u32, Landmark>,
    pub keyframes: BTreeMap<u32, Keyframe>,
    /// Roots of the spanning-tree forest — normally just the id-minimum
    /// keyframe, but kept as a set to mirror the host's `keyframeOrigins`.
    pub origins: Vec<u32>,
    pub max_keyframe_id: u32,
    pub next_keyframe_id: u32,
    pub next_landmark_id: u32,
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    /// Landmarks in ascending id order — the order every pass in this crate
    /// must process them in (spec section 3's "strict id-ordered processing").
    pub fn landmarks_ascending(&self) -> impl Iterator<Item = &Landmark> {
        self.landmarks.values()
    }

    /// Keyframes in ascending id order.
    pub fn keyframes_ascending(&self) -> impl Iterator<Item = &Keyframe> {
        self.keyframes.values()
    }
}
