use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuleLoadError>;

/// Failures that stop a rule table from loading at all
#[derive(Error, Debug)]
pub enum RuleLoadError {
    #[error("Remapping rule table not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read rule table {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Rule table is empty (a header row is required)")]
    MissingHeader,
}

/// Why a row was skipped, or flagged while still accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleWarningKind {
    TooFewColumns { found: usize },
    InvalidNumber { column: &'static str, value: String },
    OriginalProgramOutOfRange(i32),
    RemappedProgramOutOfRange(i32),
    OriginalNoteOutOfRange(i32),
    UnknownChannelType(String),
    Redundant,
    /// Accepted: the note target or offset lies outside -127..=127
    OffsetOutsideTypicalRange(i32),
}

impl RuleWarningKind {
    /// Whether the row was dropped from the index
    pub fn skips_row(&self) -> bool {
        !matches!(self, RuleWarningKind::OffsetOutsideTypicalRange(_))
    }
}

impl fmt::Display for RuleWarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleWarningKind::TooFewColumns { found } => {
                write!(f, "too few columns ({}, expected 7)", found)
            }
            RuleWarningKind::InvalidNumber { column, value } => {
                write!(f, "invalid number '{}' in {}", value, column)
            }
            RuleWarningKind::OriginalProgramOutOfRange(v) => {
                write!(f, "OriginalProgramChange {} outside 0-127 or -1", v)
            }
            RuleWarningKind::RemappedProgramOutOfRange(v) => {
                write!(f, "RemappedProgramChange {} outside 0-127 or -1", v)
            }
            RuleWarningKind::OriginalNoteOutOfRange(v) => {
                write!(f, "OriginalNote {} outside 0-127, -1 or -999", v)
            }
            RuleWarningKind::UnknownChannelType(token) => {
                write!(f, "unknown channel type '{}'", token)
            }
            RuleWarningKind::Redundant => write!(f, "redundant note manipulation rule"),
            RuleWarningKind::OffsetOutsideTypicalRange(v) => {
                write!(f, "RemappedNoteOrOffset {} outside typical range -127 to 127", v)
            }
        }
    }
}

/// A problem with one row of the table. Loading continues past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleWarning {
    /// 1-based line number in the table, header included
    pub line_number: usize,
    pub line: String,
    pub kind: RuleWarningKind,
}

impl fmt::Display for RuleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = if self.kind.skips_row() { "skipped" } else { "accepted" };
        write!(
            f,
            "line {}: {} ({}): {}",
            self.line_number, self.kind, action, self.line
        )
    }
}
