//! Binary record codecs (spec sections 4.1, 4.2).
//!
//! `value` holds the pure tensor/keypoint encoders the entity records build
//! on top of; `entity` holds the Landmark/Keyframe/FeatureBlock record
//! shapes and their options-aware encode/decode; `framing` holds the
//! length-delimited stream helper used by the features artifact.

pub mod entity;
pub mod framing;
pub mod value;
