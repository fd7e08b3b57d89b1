//! Record shapes for the three artifacts and their options-aware
//! encode/decode (spec section 4.2).
//!
//! Decoding here never fails: a record that names something that turns out
//! not to exist (a dangling landmark id, an unknown owning keyframe) is
//! resolved one layer up, once every artifact has been decoded and the full
//! id space is known — see [`crate::rebuild::link_features`]. This module
//! only ever produces well-formed, if not yet cross-referenced, records.

use serde::{Deserialize, Serialize};

use crate::codec::value::{
    WireDescriptor, WireIntrinsics, WireKeypoint, WirePose, WirePosition, decode_descriptor,
    decode_intrinsics, decode_keypoint, decode_pose, decode_position, encode_descriptor,
    encode_intrinsics, encode_keypoint, encode_pose, encode_position,
};
use crate::model::{Feature, Keyframe, Landmark};
use crate::options::Options;
use crate::types::Intrinsics;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireLandmark {
    pub id: u32,
    pub position: WirePosition,
    pub visible: u32,
    pub found: u32,
    pub descriptor: Option<WireDescriptor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireLandmarkArray {
    pub landmarks: Vec<WireLandmark>,
}

/// Always emits the landmark's own descriptor when it has one, regardless of
/// `NO_FEATURES_DESCRIPTORS`: that bit only thins per-feature descriptors
/// (spec section 6, "relies on the per-landmark descriptor"), so the
/// landmark's copy is precisely what rebuild's BoW computation (spec section
/// 4.6, phase A) needs left intact once the per-feature ones are gone.
pub fn encode_landmark(l: &Landmark, _opts: Options) -> WireLandmark {
    WireLandmark {
        id: l.id,
        position: encode_position(&l.position),
        visible: l.visible,
        found: l.found,
        descriptor: l.descriptor.as_ref().map(encode_descriptor),
    }
}

pub fn decode_landmark(w: &WireLandmark) -> Landmark {
    let mut landmark = Landmark::new(w.id, decode_position(&w.position), w.visible, w.found);
    landmark.descriptor = w.descriptor.as_ref().map(decode_descriptor);
    landmark
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireKeyframe {
    pub id: u32,
    pub pose: WirePose,
    pub timestamp: f64,
    pub intrinsics_index: Option<u32>,
    pub intrinsics_inline: Option<WireIntrinsics>,
    pub loop_edges: Vec<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireKeyframeArray {
    pub keyframes: Vec<WireKeyframe>,
}

/// Encodes a keyframe. `table_index` is the row the caller's
/// [`crate::intrinsics::IntrinsicsTable`] assigned this keyframe; it is used
/// only when `K_IN_KEYFRAME` is unset, in which case exactly one of the two
/// intrinsics fields is populated, matching spec section 4.2.
pub fn encode_keyframe(kf: &Keyframe, opts: Options, table_index: Option<u32>) -> WireKeyframe {
    let (intrinsics_index, intrinsics_inline) = if opts.contains(Options::K_IN_KEYFRAME) {
        (None, Some(encode_intrinsics(&kf.intrinsics)))
    } else {
        (table_index, None)
    };
    let loop_edges = if opts.contains(Options::NO_LOOPS) {
        Vec::new()
    } else {
        kf.persisted_loop_edges().collect()
    };
    WireKeyframe { id: kf.id, pose: encode_pose(&kf.pose), timestamp: kf.timestamp, intrinsics_index, intrinsics_inline, loop_edges }
}

/// Decodes a keyframe shell: pose, timestamp, intrinsics, and the
/// smaller-id half of its loop edges as persisted. `features` and the
/// larger-id loop-edge half are filled in later by the rebuilder.
///
/// `table` is the header's intrinsics table, needed to resolve an indexed
/// keyframe back to a concrete matrix; it is ignored when the keyframe
/// carries its intrinsics inline.
pub fn decode_keyframe(w: &WireKeyframe, table: &[Intrinsics]) -> Keyframe {
    let intrinsics = match (w.intrinsics_index, &w.intrinsics_inline) {
        (Some(idx), _) => table.get(idx as usize).copied().unwrap_or_else(Intrinsics::identity),
        (None, Some(wi)) => decode_intrinsics(wi),
        (None, None) => Intrinsics::identity(),
    };
    let mut kf = Keyframe::new(w.id, decode_pose(&w.pose), w.timestamp, intrinsics);
    kf.loop_edges = w.loop_edges.iter().copied().collect();
    kf
}

/// Restores the larger-id half of every loop-edge pair that the smaller-id
/// half's record didn't carry (spec section 3's symmetry invariant; section
/// 4.2's decode-time reciprocity note). Must run after every keyframe in
/// `wires` has already been decoded into `keyframes`.
pub fn install_loop_edge_reciprocity(wires: &[WireKeyframe], keyframes: &mut BTreeMap<u32, Keyframe>) {
    for w in wires {
        for &partner in &w.loop_edges {
            if let Some(partner_kf) = keyframes.get_mut(&partner) {
                partner_kf.loop_edges.insert(w.id);
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFeature {
    pub keypoint: WireKeypoint,
    pub landmark_id: Option<u32>,
    pub descriptor: Option<WireDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFeatureBlock {
    pub keyframe_id: u32,
    pub features: Vec<WireFeature>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireFeatureBlockArray {
    pub blocks: Vec<WireFeatureBlock>,
}

/// Encodes one keyframe's feature list, applying the two feature-shrinking
/// options (spec section 4.2): `ONLY_MAPPOINTS_FEATURES` drops features with
/// no owning landmark entirely; `NO_FEATURES_DESCRIPTORS` always drops the
/// descriptor, and so does `ONLY_MAPPOINTS_FEATURES` for the (retained)
/// features that still have no landmark.
pub fn encode_feature_block(kf: &Keyframe, opts: Options) -> WireFeatureBlock {
    let only_mappoints = opts.contains(Options::ONLY_MAPPOINTS_FEATURES);
    let no_descriptors = opts.contains(Options::NO_FEATURES_DESCRIPTORS);
    let features = kf
        .features
        .iter()
        .filter(|f| !only_mappoints || f.landmark_id.is_some())
        .map(|f| {
            let drop_descriptor = no_descriptors || (only_mappoints && f.landmark_id.is_none());
            WireFeature {
                keypoint: encode_keypoint(&f.keypoint),
                landmark_id: f.landmark_id,
                descriptor: if drop_descriptor { None } else { f.descriptor.as_ref().map(encode_descriptor) },
            }
        })
        .collect();
    WireFeatureBlock { keyframe_id: kf.id, features }
}

pub fn decode_feature_block(w: &WireFeatureBlock) -> (u32, Vec<Feature>) {
    let features = w
        .features
        .iter()
        .map(|f| Feature {
            keypoint: decode_keypoint(&f.keypoint),
            landmark_id: f.landmark_id,
            descriptor: f.descriptor.as_ref().map(decode_descriptor),
        })
        .collect();
    (w.keyframe_id, features)
}
