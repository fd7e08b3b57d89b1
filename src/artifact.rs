//! The three binary artifacts and the features layout decision (spec
//! section 4.4).

use std::path::Path;

use crate::codec::entity::{WireFeatureBlock, WireFeatureBlockArray, WireKeyframeArray, WireLandmarkArray};
use crate::codec::framing;
use crate::error::MapError;
use crate::options::Options;

/// The known per-message feature-count ceiling of the tagged record codec
/// (spec section 9, "Framing limit"). Never raise this; stream instead.
pub const FEATURE_MESSAGE_LIMIT: usize = 1_000_000;

pub fn write_mappoints(path: &Path, array: &WireLandmarkArray) -> Result<(), MapError> {
    let bytes = bincode::serialize(array)?;
    std::fs::write(path, bytes).map_err(|e| MapError::io(path, e))
}

pub fn read_mappoints(path: &Path) -> Result<WireLandmarkArray, MapError> {
    let bytes = std::fs::read(path).map_err(|e| MapError::io(path, e))?;
    Ok(bincode::deserialize(&bytes)?)
}

pub fn write_keyframes(path: &Path, array: &WireKeyframeArray) -> Result<(), MapError> {
    let bytes = bincode::serialize(array)?;
    std::fs::write(path, bytes).map_err(|e| MapError::io(path, e))
}

pub fn read_keyframes(path: &Path) -> Result<WireKeyframeArray, MapError> {
    let bytes = std::fs::read(path).map_err(|e| MapError::io(path, e))?;
    Ok(bincode::deserialize(&bytes)?)
}

/// Packs feature blocks greedily into arrays, each holding as many whole
/// blocks as fit before the next one would push the running feature count
/// over `FEATURE_MESSAGE_LIMIT` (spec section 4.4).
fn pack_into_arrays(blocks: Vec<WireFeatureBlock>) -> Vec<WireFeatureBlockArray> {
    let mut arrays = Vec::new();
    let mut current = Vec::new();
    let mut current_count = 0usize;
    for block in blocks {
        let block_len = block.features.len();
        if !current.is_empty() && current_count + block_len > FEATURE_MESSAGE_LIMIT {
            arrays.push(WireFeatureBlockArray { blocks: std::mem::take(&mut current) });
            current_count = 0;
        }
        current_count += block_len;
        current.push(block);
    }
    if !current.is_empty() {
        arrays.push(WireFeatureBlockArray { blocks: current });
    }
    arrays
}

/// Decides the layout and writes the features artifact, returning the
/// options value with `FEATURES_FILE_DELIMITED` set iff the stream layout
/// was used.
pub fn write_features(path: &Path, blocks: Vec<WireFeatureBlock>, opts: Options) -> Result<Options, MapError> {
    let total_features: usize = blocks.iter().map(|b| b.features.len()).sum();
    let forced_delimited = opts.contains(Options::FEATURES_FILE_DELIMITED);
    let forced_single = opts.contains(Options::FEATURES_FILE_NOT_DELIMITED);
    let use_stream = !forced_single && (forced_delimited || total_features > FEATURE_MESSAGE_LIMIT);

    let mut out_opts = opts;
    let mut file = std::fs::File::create(path).map_err(|e| MapError::io(path, e))?;
    if use_stream {
        let arrays = pack_into_arrays(blocks);
        framing::write_stream(&mut file, &arrays)?;
        out_opts.insert(Options::FEATURES_FILE_DELIMITED);
        out_opts.remove(Options::FEATURES_FILE_NOT_DELIMITED);
    } else {
        let array = WireFeatureBlockArray { blocks };
        let bytes = bincode::serialize(&array)?;
        use std::io::Write;
        file.write_all(&bytes).map_err(|e| MapError::io(path, e))?;
        out_opts.remove(Options::FEATURES_FILE_DELIMITED);
    }
    Ok(out_opts)
}

pub fn read_features(path: &Path, opts: Options) -> Result<Vec<WireFeatureBlock>, MapError> {
    let bytes = std::fs::read(path).map_err(|e| MapError::io(path, e))?;
    if opts.contains(Options::FEATURES_FILE_DELIMITED) {
        let arrays = framing::read_stream(&mut std::io::Cursor::new(bytes))?;
        Ok(arrays.into_iter().flat_map(|a| a.blocks).collect())
    } else {
        let array: WireFeatureBlockArray = bincode::deserialize(&bytes)?;
        Ok(array.blocks)
    }
}
