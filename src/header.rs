//! The textual header document (spec sections 4.4, 6).
//!
//! A small key/value document sitting next to the three binary artifacts,
//! parsed and written with `serde_yaml` the way the rest of the pack's SLAM
//! tooling keeps its run metadata in plain YAML next to binary data.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codec::value::WireIntrinsics;
use crate::error::MapError;
use crate::options::{self, Options};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    #[serde(rename = "mappointsFile")]
    pub mappoints_file: String,
    #[serde(rename = "keyframesFile")]
    pub keyframes_file: String,
    #[serde(rename = "featuresFile")]
    pub features_file: String,
    #[serde(rename = "nMappoints")]
    pub n_mappoints: u32,
    #[serde(rename = "nKeyframes")]
    pub n_keyframes: u32,
    #[serde(rename = "nFeatures")]
    pub n_features: u32,
    #[serde(rename = "Options")]
    pub options: u32,
    #[serde(rename = "cameraMatrices", skip_serializing_if = "Option::is_none", default)]
    pub camera_matrices: Option<Vec<WireIntrinsics>>,
    #[serde(rename = "Options descriptions", skip_serializing_if = "Option::is_none", default)]
    pub options_descriptions: Option<Vec<String>>,
}

impl Header {
    /// Builds the header for a base name, filling in the diagnostic
    /// `Options descriptions` field from the options bitmask itself.
    pub fn new(
        base_name: &str,
        n_mappoints: u32,
        n_keyframes: u32,
        n_features: u32,
        opts: Options,
        camera_matrices: Option<Vec<WireIntrinsics>>,
    ) -> Self {
        Self {
            mappoints_file: format!("{base_name}.mappoints"),
            keyframes_file: format!("{base_name}.keyframes"),
            features_file: format!("{base_name}.features"),
            n_mappoints,
            n_keyframes,
            n_features,
            options: opts.bits(),
            camera_matrices,
            options_descriptions: Some(options::describe(opts).into_iter().map(str::to_owned).collect()),
        }
    }

    pub fn options(&self) -> Options {
        Options::from_bits_truncate(self.options)
    }

    pub fn write(&self, path: &Path) -> Result<(), MapError> {
        let text = serde_yaml::to_string(self)?;
        std::fs::write(path, text).map_err(|e| MapError::io(path, e))
    }

    pub fn read(path: &Path) -> Result<Self, MapError> {
        let text = std::fs::read_to_string(path).map_err(|e| MapError::io(path, e))?;
        Ok(serde_yaml::from_str(&text)?)
    }
}

/// Strips an optional `.yaml` suffix from a header path to obtain the base
/// name artifact filenames are built from (spec section 4.7 step 2).
pub fn base_name_from_header_path(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext == "yaml" || ext == "yml" => path.with_extension(""),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_strips_yaml_suffix() {
        assert_eq!(base_name_from_header_path(Path::new("/tmp/session.yaml")), PathBuf::from("/tmp/session"));
        assert_eq!(base_name_from_header_path(Path::new("/tmp/session")), PathBuf::from("/tmp/session"));
    }

    #[test]
    fn header_round_trips_through_yaml() {
        let header = Header::new(
            "session",
            10,
            3,
            15,
            Options::K_IN_KEYFRAME,
            None,
        );
        let text = serde_yaml::to_string(&header).unwrap();
        let parsed: Header = serde_yaml::from_str(&text).unwrap();
        assert_eq!(parsed.n_mappoints, 10);
        assert_eq!(parsed.options(), Options::K_IN_KEYFRAME);
        assert_eq!(parsed.mappoints_file, "session.mappoints");
    }

    #[test]
    fn camera_matrices_omitted_when_none() {
        let header = Header::new("session", 0, 0, 0, Options::empty(), None);
        let text = serde_yaml::to_string(&header).unwrap();
        assert!(!text.contains("cameraMatrices"));
    }
}
