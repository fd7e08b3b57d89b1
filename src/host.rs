//! Abstract host capabilities the rebuilder and orchestrator depend on
//! (spec section 9, "Host coupling"; spec section 5's thread-pause model).
//!
//! Nothing here names a concrete tracker, local mapper, viewer, or visual
//! vocabulary. An embedding engine implements these traits against its own
//! live objects; this crate only ever calls through them.

use std::collections::BTreeMap;

use crate::model::Map;
use crate::types::{Pose, Position};

/// A bag-of-words vector over the engine's visual vocabulary. Opaque here —
/// the core carries it but never inspects it (spec section 1).
pub type BowVector = Vec<u8>;

/// The grid geometry a keyframe's image was divided into, needed to rebuild
/// the feature grid (spec section 4.6, phase A step 4). Host-owned because
/// it depends on calibration and image size the core never persists.
#[derive(Debug, Clone, Copy)]
pub struct GridParams {
    pub cols: usize,
    pub rows: usize,
    pub min_x: f32,
    pub min_y: f32,
    pub inv_cell_w: f32,
    pub inv_cell_h: f32,
}

/// The four rebuild-time capabilities only the host can provide, plus
/// keyframe-database registration (spec section 9).
pub trait MappingHost {
    fn compute_bow(&self, keyframe_id: u32, map: &Map) -> BowVector;

    /// Lets the host recompute derived pose quantities (rotation,
    /// translation, camera center) that it caches alongside the raw matrix.
    fn set_pose(&mut self, keyframe_id: u32, pose: &Pose);

    fn grid_params(&self, keyframe_id: u32) -> GridParams;

    /// Recomputes covisibility weights and the ordered-connected list for
    /// a keyframe from the map's current observation graph.
    fn update_connections(&mut self, keyframe_id: u32, map: &Map) -> (BTreeMap<u32, u32>, Vec<u32>);

    /// Recomputes a landmark's mean viewing direction and min/max
    /// observable distance from its current observation set.
    fn update_normal_and_depth(&mut self, landmark_id: u32, map: &Map) -> (Position, f32, f32);

    fn keyframe_database_add(&mut self, keyframe_id: u32);
    fn keyframe_database_clear(&mut self);
}

/// Busy-wait pause/resume coordination with one host thread (spec section 5).
///
/// `save`/`load` poll `is_stopped` with a small sleep between checks; a host
/// that never reports stopped after `request_stop` hangs the caller
/// indefinitely, which is the documented, accepted failure mode (spec
/// section 7, "Host-thread-not-stopping").
pub trait ThreadControl {
    fn request_stop(&mut self);
    fn is_stopped(&self) -> bool;
    fn resume(&mut self);
}

/// The session-level pause/reset surface the orchestrator drives around
/// save and load (spec section 4.7). `save` only touches the local mapper;
/// `load` additionally resets the tracker, stops the viewer, and leaves the
/// tracking state as LOST when it's done (spec section 4.7 step 6).
pub trait SessionHost: MappingHost {
    fn local_mapper(&mut self) -> &mut dyn ThreadControl;
    fn viewer(&mut self) -> &mut dyn ThreadControl;
    fn reset_tracker(&mut self);
    fn set_tracking_lost(&mut self);
}
