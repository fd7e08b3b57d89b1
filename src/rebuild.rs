//! The post-read reconstruction pass (spec section 4.6).
//!
//! Nothing in the artifact is sufficient without this pass: every derived
//! structure — observations, covisibility, spanning tree, feature grid,
//! BoW vectors, reference keyframes, normal/depth summaries — is rebuilt
//! here, in the fixed order the spec lays out. Order matters: later phases
//! depend on state installed by earlier ones.

use log::warn;

use crate::host::{GridParams, MappingHost};
use crate::model::{Feature, Map};
use crate::options::Options;
use crate::types::Keypoint;

/// Attaches decoded feature blocks to their owning keyframes and resolves
/// the two decode-time error cases that need the full id space to detect
/// (spec section 7): a block naming an unknown keyframe is dropped with a
/// warning; a feature naming an unknown landmark has its link cleared with
/// a warning and is otherwise kept.
pub fn link_features(map: &mut Map, blocks: Vec<(u32, Vec<Feature>)>) {
    for (kf_id, mut features) in blocks {
        if !map.keyframes.contains_key(&kf_id) {
            warn!("[REBUILD] feature block references unknown keyframe {kf_id}; skipping block");
            continue;
        }
        for feature in features.iter_mut() {
            if let Some(lm_id) = feature.landmark_id {
                if !map.landmarks.contains_key(&lm_id) {
                    warn!("[REBUILD] keyframe {kf_id} feature references unknown landmark {lm_id}; treating as unbound");
                    feature.landmark_id = None;
                }
            }
        }
        map.keyframes.get_mut(&kf_id).unwrap().features = features;
    }
}

fn build_feature_grid(keypoints: &[Keypoint], params: GridParams) -> Vec<Vec<Vec<usize>>> {
    let mut grid = vec![vec![Vec::new(); params.rows]; params.cols];
    for (i, kp) in keypoints.iter().enumerate() {
        let cell_x = ((kp.x - params.min_x) * params.inv_cell_w).round();
        let cell_y = ((kp.y - params.min_y) * params.inv_cell_h).round();
        if cell_x < 0.0 || cell_y < 0.0 {
            continue;
        }
        let (cx, cy) = (cell_x as usize, cell_y as usize);
        if cx < params.cols && cy < params.rows {
            grid[cx][cy].push(i);
        }
    }
    grid
}

/// Phase A: per-keyframe reconstruction, ascending id order (spec section
/// 4.6). Observations installed in this phase for keyframe K are visible to
/// `update_connections` calls for every keyframe processed after K, which is
/// what makes the covisibility result deterministic.
fn rebuild_keyframes(map: &mut Map, host: &mut impl MappingHost, opts: Options) {
    let ids: Vec<u32> = map.keyframes.keys().copied().collect();
    for kf_id in ids {
        let not_erase = !map.keyframes[&kf_id].loop_edges.is_empty();
        let pose = map.keyframes[&kf_id].pose;

        let bow = host.compute_bow(kf_id, map);
        host.set_pose(kf_id, &pose);
        let grid_params = host.grid_params(kf_id);
        let keypoints: Vec<Keypoint> = map.keyframes[&kf_id].features.iter().map(|f| f.keypoint).collect();
        let grid = build_feature_grid(&keypoints, grid_params);
        host.keyframe_database_add(kf_id);
        let (weights, ordered) = host.update_connections(kf_id, map);
        let bad = !opts.contains(Options::NO_SET_BAD) && kf_id != 0 && ordered.is_empty();

        {
            let kf = map.keyframes.get_mut(&kf_id).unwrap();
            kf.not_erase = not_erase;
            kf.bow_vector = bow;
            kf.feature_grid = grid;
            kf.connected_weights = weights;
            kf.ordered_connected = ordered;
            kf.bad = bad;
        }

        let links: Vec<(usize, u32)> = map.keyframes[&kf_id]
            .features
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.landmark_id.map(|lm| (i, lm)))
            .collect();
        for (i, lm_id) in links {
            if let Some(lm) = map.landmarks.get_mut(&lm_id) {
                lm.observations.insert((kf_id, i));
            }
        }
    }
}

/// Phase B: spanning tree over the covisibility graph, rooted at the
/// smallest keyframe id (spec section 4.6). Converges because every
/// connected component contains a path to a keyframe with id 0 or an
/// already-parented keyframe, and assignment is monotone.
fn rebuild_spanning_tree(map: &mut Map) {
    map.origins.clear();
    let Some(&root) = map.keyframes.keys().next() else { return };
    map.origins.push(root);

    loop {
        let mut assigned = 0u32;
        let unparented: Vec<u32> = map
            .keyframes
            .iter()
            .filter(|(&id, kf)| kf.parent.is_none() && id != 0)
            .map(|(&id, _)| id)
            .collect();
        for kf_id in unparented {
            let candidates = map.keyframes[&kf_id].ordered_connected.clone();
            for candidate in candidates {
                let eligible = candidate == 0 || map.keyframes.get(&candidate).is_some_and(|k| k.parent.is_some());
                if eligible {
                    map.keyframes.get_mut(&kf_id).unwrap().parent = Some(candidate);
                    assigned += 1;
                    break;
                }
            }
        }
        if assigned == 0 {
            break;
        }
    }
}

/// Phase C: id-counter bookkeeping for the next keyframe to be created.
fn rebuild_keyframe_counters(map: &mut Map) {
    if let Some(&last) = map.keyframes.keys().next_back() {
        map.max_keyframe_id = last;
        map.next_keyframe_id = last + 1;
    }
}

/// Phase D: per-landmark reconstruction, ascending id order (spec section 4.6).
fn rebuild_landmarks(map: &mut Map, host: &mut impl MappingHost, opts: Options) {
    let ids: Vec<u32> = map.landmarks.keys().copied().collect();
    for lm_id in ids {
        let observations_empty = map.landmarks[&lm_id].observations.is_empty();
        if !opts.contains(Options::NO_SET_BAD) && lm_id != 0 && observations_empty {
            map.landmarks.get_mut(&lm_id).unwrap().bad = true;
            continue;
        }

        let reference_keyframe = map.landmarks[&lm_id].observations.iter().next().map(|&(kf, _)| kf);
        let (normal, min_distance, max_distance) = host.update_normal_and_depth(lm_id, map);

        let lm = map.landmarks.get_mut(&lm_id).unwrap();
        lm.reference_keyframe = reference_keyframe;
        lm.normal = normal;
        lm.min_distance = min_distance;
        lm.max_distance = max_distance;
    }
    if let Some(&last) = map.landmarks.keys().next_back() {
        map.next_landmark_id = last + 1;
    }
}

/// Runs all four rebuild phases in order (spec section 4.6).
pub fn rebuild(map: &mut Map, host: &mut impl MappingHost, opts: Options) {
    host.keyframe_database_clear();
    rebuild_keyframes(map, host, opts);
    rebuild_spanning_tree(map);
    rebuild_keyframe_counters(map);
    rebuild_landmarks(map, host, opts);
}
