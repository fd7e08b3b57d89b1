//! Error types for the persistence core.
//!
//! Internal record-level problems (a dangling reference, a missing optional
//! field) are repaired in place with a `log::warn!` and never surface as a
//! `MapError` — see spec section 7's propagation policy. `MapError` covers
//! the failures that make a whole artifact unusable.

use std::fmt;
use std::path::PathBuf;

/// Errors that abort a save or load operation.
#[derive(Debug)]
pub enum MapError {
    /// An artifact file could not be read or written.
    Io { path: PathBuf, source: std::io::Error },
    /// The header document could not be parsed.
    HeaderParse(serde_yaml::Error),
    /// A binary record could not be decoded (corrupted or truncated artifact).
    RecordDecode(bincode::Error),
    /// The length-delimited features stream ended mid-record or claimed more
    /// bytes than remained in the file.
    Framing(String),
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "I/O error on {}: {source}", path.display()),
            Self::HeaderParse(e) => write!(f, "failed to parse header: {e}"),
            Self::RecordDecode(e) => write!(f, "failed to decode record: {e}"),
            Self::Framing(msg) => write!(f, "framing error: {msg}"),
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::HeaderParse(e) => Some(e),
            Self::RecordDecode(e) => Some(e),
            Self::Framing(_) => None,
        }
    }
}

impl MapError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

impl From<serde_yaml::Error> for MapError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::HeaderParse(e)
    }
}

impl From<bincode::Error> for MapError {
    fn from(e: bincode::Error) -> Self {
        Self::RecordDecode(e)
    }
}
