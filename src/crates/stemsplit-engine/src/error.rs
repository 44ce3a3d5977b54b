use std::path::PathBuf;
use stemsplit_rules::RuleLoadError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SplitError>;

/// Failures at the load and write boundaries of a run.
///
/// Problems with single rules or single events never surface here; they are
/// recorded as warnings in the run log and the run continues.
#[derive(Error, Debug)]
pub enum SplitError {
    #[error("Failed to read MIDI file {}: {source}", path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse MIDI file: {0}")]
    ParseInput(#[from] midly::Error),

    #[error("Input path has no file name: {}", .0.display())]
    InvalidInputPath(PathBuf),

    #[error("Failed to load rule table: {0}")]
    Rules(#[from] RuleLoadError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to read configuration {}: {source}", path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No supported MIDI file type for a sequence with {tracks} tracks. File not saved.")]
    NoSupportedFormat { tracks: usize },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SplitError {
    /// Whether the error happened before any output was produced
    pub fn is_load_error(&self) -> bool {
        !matches!(
            self,
            SplitError::NoSupportedFormat { .. } | SplitError::Write { .. }
        )
    }
}

impl From<SplitError> for String {
    fn from(e: SplitError) -> Self {
        e.to_string()
    }
}
