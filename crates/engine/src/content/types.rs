use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentRequest {
    pub enabled_mods: Vec<String>,
}

/// Closed set of explorable world segments. Content refers to them by token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorldSegment {
    Hub,
    Gallery,
    Arcade,
}

impl WorldSegment {
    pub const ALL: [WorldSegment; 3] = [WorldSegment::Hub, WorldSegment::Gallery, WorldSegment::Arcade];

    pub fn token(self) -> &'static str {
        match self {
            WorldSegment::Hub => "hub",
            WorldSegment::Gallery => "gallery",
            WorldSegment::Arcade => "arcade",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|segment| segment.token() == token)
    }
}

impl fmt::Display for WorldSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    Discovery,
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDefInMod,
    UnresolvedReference,
    NoSegments,
}

#[derive(Debug, Clone)]
pub struct ContentLoadError {
    pub code: ContentErrorCode,
    pub message: String,
    pub mod_id: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {} (mod={}, file={}",
            self.code,
            self.message,
            self.mod_id,
            self.file_path.display()
        )?;
        if let Some(loc) = self.location {
            write!(f, ", line={}, column={}", loc.line, loc.column)?;
        }
        f.write_str(")")
    }
}

impl std::error::Error for ContentLoadError {}

#[derive(Debug, Error)]
pub(crate) enum DiscoveryError {
    #[error("enabled mod id cannot be empty")]
    EmptyEnabledMod,
    #[error("duplicate enabled mod id in request: {mod_id}")]
    DuplicateEnabledMod { mod_id: String },
    #[error("enabled mod does not exist on disk: {mod_id} at {expected_dir}")]
    EnabledModMissing {
        mod_id: String,
        expected_dir: PathBuf,
    },
    #[error("base content directory does not exist: {0}")]
    BaseMissing(PathBuf),
}
