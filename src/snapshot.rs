//! Ordered snapshot helper (spec section 4.7 step 4; SPEC_FULL section 11).
//!
//! osmap exposes this as its own method (`getVectorMapPointAndKeyFrame`)
//! rather than inlining it into the save path; kept as a standalone
//! function here for the same reason, and because tests want it too.

use crate::model::{Keyframe, Landmark, Map};

/// A stable, ascending-id-ordered view of a map's landmarks and keyframes,
/// taken once at the start of save and held for its duration.
pub struct Snapshot<'a> {
    pub landmarks: Vec<&'a Landmark>,
    pub keyframes: Vec<&'a Keyframe>,
}

pub fn take(map: &Map) -> Snapshot<'_> {
    Snapshot {
        landmarks: map.landmarks.values().collect(),
        keyframes: map.keyframes.values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Intrinsics, Pose, Position};

    #[test]
    fn snapshot_is_ascending_by_id() {
        let mut map = Map::new();
        for id in [5u32, 1, 3] {
            map.landmarks.insert(id, Landmark::new(id, Position::zeros(), 0, 0));
            map.keyframes.insert(id, Keyframe::new(id, Pose::identity(), 0.0, Intrinsics::identity()));
        }
        let snap = take(&map);
        assert_eq!(snap.landmarks.iter().map(|l| l.id).collect::<Vec<_>>(), vec![1, 3, 5]);
        assert_eq!(snap.keyframes.iter().map(|k| k.id).collect::<Vec<_>>(), vec![1, 3, 5]);
    }
}
