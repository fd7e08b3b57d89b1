//! `save` and `load` entry points (spec section 4.7).
//!
//! These sequence every other component in the exact order spec.md lays
//! out and own the one genuinely stateful part of the whole crate: pausing
//! and resuming the host's threads around the swap.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;

use crate::artifact;
use crate::codec::entity::{
    WireFeatureBlockArray, WireKeyframeArray, WireLandmarkArray, decode_feature_block, decode_keyframe,
    decode_landmark, encode_feature_block, encode_intrinsics, encode_keyframe, encode_landmark,
    install_loop_edge_reciprocity,
};
use crate::codec::value::decode_intrinsics;
use crate::depurate;
use crate::error::MapError;
use crate::header::{self, Header};
use crate::host::{SessionHost, ThreadControl};
use crate::intrinsics::IntrinsicsTable;
use crate::model::Map;
use crate::options::Options;
use crate::rebuild;
use crate::snapshot;

/// Configuration for [`save`]. `options` is the bitmask actually used when
/// writing (spec section 6); the writer may additionally set
/// `FEATURES_FILE_DELIMITED` itself if the feature count forces it.
#[derive(Debug, Clone)]
pub struct SaveConfig {
    pub pause_host: bool,
    /// Mirrors osmap's `verbose` flag (SPEC_FULL section 11): raises save's
    /// diagnostic logging from a single summary line to per-artifact counts.
    pub verbose: bool,
    pub options: Options,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self { pause_host: true, verbose: false, options: Options::empty() }
    }
}

/// Configuration for [`load`]. The options bitmask is not part of this
/// struct: it is read back from the header, not chosen by the caller.
#[derive(Debug, Clone, Default)]
pub struct LoadConfig {
    pub pause_host: bool,
    pub verbose: bool,
}

fn wait_until_stopped(thread: &mut dyn ThreadControl) {
    thread.request_stop();
    while !thread.is_stopped() {
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn split_base(path: &Path) -> (String, PathBuf) {
    let base_path = header::base_name_from_header_path(path);
    let base_name = base_path.file_name().and_then(|s| s.to_str()).unwrap_or("map").to_string();
    let dir = base_path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    (base_name, dir)
}

/// Writes the whole map graph to `path` (spec section 4.7, save).
pub fn save(map: &mut Map, path: &Path, host: &mut impl SessionHost, config: &SaveConfig) -> anyhow::Result<()> {
    info!("[ORCHESTRATOR] save starting: {}", path.display());

    if config.pause_host {
        wait_until_stopped(host.local_mapper());
    }

    let (base_name, dir) = split_base(path);

    if !config.options.contains(Options::NO_DEPURATION) {
        depurate::depurate(map, config.options);
    }

    let snap = snapshot::take(map);

    let table = if config.options.contains(Options::K_IN_KEYFRAME) {
        None
    } else {
        Some(IntrinsicsTable::build(snap.keyframes.iter().copied()))
    };

    let mut opts = config.options;

    let n_mappoints = if !opts.contains(Options::NO_MAPPOINTS_FILE) {
        let wire: Vec<_> = snap.landmarks.iter().map(|l| encode_landmark(l, opts)).collect();
        let n = wire.len() as u32;
        artifact::write_mappoints(&dir.join(format!("{base_name}.mappoints")), &WireLandmarkArray { landmarks: wire })
            .map_err(anyhow_with_context("write mappoints artifact"))?;
        n
    } else {
        0
    };

    let n_keyframes = if !opts.contains(Options::NO_KEYFRAMES_FILE) {
        let wire: Vec<_> = snap
            .keyframes
            .iter()
            .map(|kf| {
                let idx = table.as_ref().and_then(|t| t.index_of.get(&kf.id).copied());
                encode_keyframe(kf, opts, idx)
            })
            .collect();
        let n = wire.len() as u32;
        artifact::write_keyframes(&dir.join(format!("{base_name}.keyframes")), &WireKeyframeArray { keyframes: wire })
            .map_err(anyhow_with_context("write keyframes artifact"))?;
        n
    } else {
        0
    };

    let n_features = if !opts.contains(Options::NO_FEATURES_FILE) {
        let blocks: Vec<_> = snap.keyframes.iter().map(|kf| encode_feature_block(kf, opts)).collect();
        let n = blocks.iter().map(|b| b.features.len() as u32).sum();
        let resolved_opts = artifact::write_features(&dir.join(format!("{base_name}.features")), blocks, opts)
            .map_err(anyhow_with_context("write features artifact"))?;
        opts = resolved_opts;
        n
    } else {
        0
    };

    let camera_matrices = table.as_ref().map(|t| t.rows.iter().map(encode_intrinsics).collect());
    let header = Header::new(&base_name, n_mappoints, n_keyframes, n_features, opts, camera_matrices);
    header.write(path).map_err(anyhow_with_context("write header"))?;

    if config.pause_host {
        host.local_mapper().resume();
    }

    if config.verbose {
        info!("[ORCHESTRATOR] save wrote landmarks={n_mappoints} keyframes={n_keyframes} features={n_features} options={:#x}", opts.bits());
    } else {
        info!("[ORCHESTRATOR] save complete: {} landmarks, {} keyframes, {} features", n_mappoints, n_keyframes, n_features);
    }
    Ok(())
}

/// Reads a map graph from `path` and installs it into `map` (spec section
/// 4.7, load). Every derived structure is reconstructed via [`rebuild::rebuild`]
/// before publication; `map`'s previous contents are replaced wholesale.
pub fn load(map: &mut Map, path: &Path, host: &mut impl SessionHost, config: &LoadConfig) -> anyhow::Result<()> {
    info!("[ORCHESTRATOR] load starting: {}", path.display());

    if config.pause_host {
        host.reset_tracker();
        wait_until_stopped(host.local_mapper());
        wait_until_stopped(host.viewer());
    }

    let header = Header::read(path).map_err(anyhow_with_context("read header"))?;
    let opts = header.options();
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));

    let table: Vec<_> = header.camera_matrices.as_ref().map(|v| v.iter().map(decode_intrinsics).collect()).unwrap_or_default();

    let mut new_map = Map::new();

    if !opts.contains(Options::NO_MAPPOINTS_FILE) {
        let array = artifact::read_mappoints(&dir.join(&header.mappoints_file)).map_err(anyhow_with_context("read mappoints artifact"))?;
        for w in &array.landmarks {
            let lm = decode_landmark(w);
            new_map.landmarks.insert(lm.id, lm);
        }
    }

    if !opts.contains(Options::NO_KEYFRAMES_FILE) {
        let array = artifact::read_keyframes(&dir.join(&header.keyframes_file)).map_err(anyhow_with_context("read keyframes artifact"))?;
        for w in &array.keyframes {
            let kf = decode_keyframe(w, &table);
            new_map.keyframes.insert(kf.id, kf);
        }
        install_loop_edge_reciprocity(&array.keyframes, &mut new_map.keyframes);
    }

    if !opts.contains(Options::NO_FEATURES_FILE) {
        let blocks = artifact::read_features(&dir.join(&header.features_file), opts).map_err(anyhow_with_context("read features artifact"))?;
        let links: Vec<_> = blocks.iter().map(decode_feature_block).collect();
        rebuild::link_features(&mut new_map, links);
    }

    rebuild::rebuild(&mut new_map, host, opts);

    let n_landmarks = new_map.landmarks.len();
    let n_keyframes = new_map.keyframes.len();
    *map = new_map;

    if config.pause_host {
        host.set_tracking_lost();
        host.viewer().resume();
    }

    info!("[ORCHESTRATOR] load complete: {} landmarks, {} keyframes", n_landmarks, n_keyframes);
    Ok(())
}

fn anyhow_with_context(context: &'static str) -> impl FnOnce(MapError) -> anyhow::Error {
    move |e| anyhow::Error::new(e).context(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::test_support::StubSessionHost;
    use crate::model::{Feature, Keyframe, Landmark};
    use crate::types::{Intrinsics, Keypoint, Pose, Position, intrinsics_from_params};

    fn scratch_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("slammap_test_{}_{}", std::process::id(), label));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn small_map() -> Map {
        let mut map = Map::new();
        let shared = intrinsics_from_params(500.0, 500.0, 320.0, 240.0);
        for id in 0..3u32 {
            map.keyframes.insert(id, Keyframe::new(id, Pose::identity(), id as f64, shared));
        }
        for id in 0..10u32 {
            map.landmarks.insert(id, Landmark::new(id, Position::new(id as f32, 0.0, 0.0), 1, 1));
        }
        for kf_id in [0u32, 1] {
            let kf = map.keyframes.get_mut(&kf_id).unwrap();
            for lm_id in 0..5u32 {
                kf.features.push(Feature { keypoint: Keypoint::new(lm_id as f32, 0.0, 0, 0.0), landmark_id: Some(lm_id), descriptor: None });
            }
        }
        let kf2 = map.keyframes.get_mut(&2).unwrap();
        for lm_id in 5..10u32 {
            kf2.features.push(Feature { keypoint: Keypoint::new(lm_id as f32, 0.0, 0, 0.0), landmark_id: Some(lm_id), descriptor: None });
        }
        map
    }

    #[test]
    fn save_then_load_round_trips_entity_fields() {
        let dir = scratch_dir("roundtrip");
        let path = dir.join("session.yaml");
        let mut map = small_map();
        let mut host = StubSessionHost::default();

        save(&mut map, &path, &mut host, &SaveConfig::default()).unwrap();
        assert!(dir.join("session.mappoints").exists());
        assert!(dir.join("session.keyframes").exists());
        assert!(dir.join("session.features").exists());

        let mut loaded = Map::new();
        load(&mut loaded, &path, &mut host, &LoadConfig::default()).unwrap();

        assert_eq!(loaded.landmarks.len(), 10);
        assert_eq!(loaded.keyframes.len(), 3);
        for id in 0..10u32 {
            assert_eq!(loaded.landmarks[&id].position, map.landmarks[&id].position);
        }
        for id in 0..3u32 {
            assert_eq!(loaded.keyframes[&id].pose, map.keyframes[&id].pose);
            assert_eq!(loaded.keyframes[&id].timestamp, map.keyframes[&id].timestamp);
        }
    }

    #[test]
    fn loaded_map_has_rebuilt_reference_keyframes() {
        let dir = scratch_dir("refkf");
        let path = dir.join("session.yaml");
        let mut map = small_map();
        let mut host = StubSessionHost::default();
        save(&mut map, &path, &mut host, &SaveConfig::default()).unwrap();

        let mut loaded = Map::new();
        load(&mut loaded, &path, &mut host, &LoadConfig::default()).unwrap();

        for id in 0..5u32 {
            assert_eq!(loaded.landmarks[&id].reference_keyframe, Some(0));
        }
        for id in 5..10u32 {
            assert_eq!(loaded.landmarks[&id].reference_keyframe, Some(2));
        }
    }

    #[test]
    fn single_shared_intrinsics_yields_table_of_one() {
        let dir = scratch_dir("intrinsics");
        let path = dir.join("session.yaml");
        let mut map = small_map();
        let mut host = StubSessionHost::default();
        save(&mut map, &path, &mut host, &SaveConfig::default()).unwrap();

        let header = Header::read(&path).unwrap();
        assert_eq!(header.camera_matrices.unwrap().len(), 1);
    }

    #[test]
    fn loop_edges_are_symmetric_after_round_trip() {
        let dir = scratch_dir("loopedges");
        let path = dir.join("session.yaml");
        let mut map = small_map();
        map.keyframes.insert(5, Keyframe::new(5, Pose::identity(), 0.0, Intrinsics::identity()));
        map.keyframes.insert(17, Keyframe::new(17, Pose::identity(), 0.0, Intrinsics::identity()));
        map.keyframes.get_mut(&5).unwrap().loop_edges.insert(17);
        map.keyframes.get_mut(&17).unwrap().loop_edges.insert(5);

        let mut host = StubSessionHost::default();
        save(&mut map, &path, &mut host, &SaveConfig::default()).unwrap();

        let mut loaded = Map::new();
        load(&mut loaded, &path, &mut host, &LoadConfig::default()).unwrap();
        assert!(loaded.keyframes[&5].loop_edges.contains(&17));
        assert!(loaded.keyframes[&17].loop_edges.contains(&5));
    }

    #[test]
    fn dangling_landmark_reference_loads_as_unbound() {
        let dir = scratch_dir("dangling");
        let path = dir.join("session.yaml");
        let mut map = Map::new();
        map.keyframes.insert(0, Keyframe::new(0, Pose::identity(), 0.0, Intrinsics::identity()));
        map.keyframes.get_mut(&0).unwrap().features.push(Feature {
            keypoint: Keypoint::new(0.0, 0.0, 0, 0.0),
            landmark_id: Some(999),
            descriptor: None,
        });
        let mut host = StubSessionHost::default();
        save(&mut map, &path, &mut host, &SaveConfig::default()).unwrap();

        let mut loaded = Map::new();
        load(&mut loaded, &path, &mut host, &LoadConfig::default()).unwrap();
        assert_eq!(loaded.keyframes[&0].features[0].landmark_id, None);
    }

    #[test]
    fn large_feature_count_uses_delimited_stream_and_round_trips() {
        let dir = scratch_dir("streaming");
        let path = dir.join("session.yaml");
        let mut map = Map::new();
        map.keyframes.insert(0, Keyframe::new(0, Pose::identity(), 0.0, Intrinsics::identity()));
        map.keyframes.insert(1, Keyframe::new(1, Pose::identity(), 0.0, Intrinsics::identity()));
        for kf_id in 0..2u32 {
            let kf = map.keyframes.get_mut(&kf_id).unwrap();
            for i in 0..600_000u32 {
                kf.features.push(Feature { keypoint: Keypoint::new(i as f32, 0.0, 0, 0.0), landmark_id: None, descriptor: None });
            }
        }
        let mut host = StubSessionHost::default();
        save(&mut map, &path, &mut host, &SaveConfig::default()).unwrap();

        let header = Header::read(&path).unwrap();
        assert!(header.options().contains(Options::FEATURES_FILE_DELIMITED));
        assert_eq!(header.n_features, 1_200_000);

        let mut loaded = Map::new();
        load(&mut loaded, &path, &mut host, &LoadConfig::default()).unwrap();
        let total: usize = loaded.keyframes.values().map(|kf| kf.features.len()).sum();
        assert_eq!(total, 1_200_000);
    }
}
