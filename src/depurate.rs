//! The pre-write depuration pass (spec section 4.5).
//!
//! A repair, not a validation: it mutates the live map in place so that
//! what gets snapshotted for writing is internally consistent.

use log::warn;

use crate::model::Map;
use crate::options::Options;

/// For every keyframe's feature list: null out references to landmarks
/// flagged bad, and warn about references to landmarks the map's own
/// landmark set doesn't contain.
///
/// The original reclaims such a landmark into the map's indexed set when
/// the host still holds a live, unindexed instance of it; this crate's map
/// is the landmark set (there is no separate unindexed pool an instance
/// could live in outside it), so a dangling id here has nothing to
/// reclaim and is only ever a warning — see `DESIGN.md`.
pub fn depurate(map: &mut Map, opts: Options) {
    let bad_ids: std::collections::BTreeSet<u32> =
        map.landmarks.values().filter(|l| l.bad).map(|l| l.id).collect();

    for kf in map.keyframes.values_mut() {
        for feature in kf.features.iter_mut() {
            let Some(lm_id) = feature.landmark_id else { continue };
            if bad_ids.contains(&lm_id) {
                feature.landmark_id = None;
            } else if !map.landmarks.contains_key(&lm_id) {
                if !opts.contains(Options::NO_APPEND_FOUND_MAPPOINTS) {
                    warn!(
                        "[DEPURATE] keyframe {} feature references unknown landmark {}; no unindexed instance to reclaim",
                        kf.id, lm_id
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Feature, Keyframe, Landmark};
    use crate::types::{Intrinsics, Keypoint, Pose, Position};

    fn feature(landmark_id: Option<u32>) -> Feature {
        Feature { keypoint: Keypoint::new(0.0, 0.0, 0, 0.0), landmark_id, descriptor: None }
    }

    #[test]
    fn nulls_references_to_bad_landmarks() {
        let mut map = Map::new();
        let mut bad = Landmark::new(5, Position::zeros(), 0, 0);
        bad.bad = true;
        map.landmarks.insert(5, bad);
        let mut kf = Keyframe::new(0, Pose::identity(), 0.0, Intrinsics::identity());
        kf.features.push(feature(Some(5)));
        map.keyframes.insert(0, kf);

        depurate(&mut map, Options::empty());
        assert_eq!(map.keyframes[&0].features[0].landmark_id, None);
    }

    #[test]
    fn leaves_valid_references_untouched() {
        let mut map = Map::new();
        map.landmarks.insert(3, Landmark::new(3, Position::zeros(), 0, 0));
        let mut kf = Keyframe::new(0, Pose::identity(), 0.0, Intrinsics::identity());
        kf.features.push(feature(Some(3)));
        map.keyframes.insert(0, kf);

        depurate(&mut map, Options::empty());
        assert_eq!(map.keyframes[&0].features[0].landmark_id, Some(3));
    }
}
