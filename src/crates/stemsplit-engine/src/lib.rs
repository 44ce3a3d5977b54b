//! Program-change stem splitting for Standard MIDI Files
//!
//! Reads a MIDI sequence and a rule table, remaps program changes and notes,
//! and writes a new sequence with one track per (remapped program, channel,
//! content type, segment). Percussion is moved to the drum channel; melodic
//! content stays on its channel or, when it sits on the drum channel, is moved
//! to a free melodic one.
//!
//! # Examples
//!
//! ```no_run
//! use stemsplit_engine::{process_file, RunLog, SplitterConfig};
//! use std::path::Path;
//!
//! let mut log = RunLog::new();
//! let report = process_file(
//!     Path::new("song.mid"),
//!     Path::new("out"),
//!     Path::new("rules.csv"),
//!     &SplitterConfig::default(),
//!     &mut log,
//! )?;
//! println!("{} tracks, {} warnings", report.tracks_written, report.warnings);
//! # Ok::<(), stemsplit_engine::SplitError>(())
//! ```
//!
//! # Main Components
//!
//! - **ChannelTable / ChannelContext**: per-channel program context and segment
//! - **handle_program_change**: segment detection and program remapping
//! - **NoteTransformer**: specific remaps, shifts, layering and rechanneling
//! - **MelodicChannelPool**: first-fit channel allocation for displaced content
//! - **TrackMultiplexer**: lazily created output tracks keyed by [`TrackKey`]
//! - **SequenceAssembler**: the pass that drives all of the above

pub mod assembler;
pub mod config;
pub mod context;
pub mod error;
pub mod gm;
pub mod midifile;
pub mod multiplexer;
pub mod notes;
pub mod pool;
pub mod program;
pub mod runlog;

pub use assembler::{substitute_loop_brackets, SequenceAssembler};
pub use config::SplitterConfig;
pub use context::{ChannelContext, ChannelTable, RemapInfo};
pub use error::{Result, SplitError};
pub use multiplexer::{TrackKey, TrackMultiplexer};
pub use notes::{NoteOutcome, NoteTransformer};
pub use pool::MelodicChannelPool;
pub use runlog::{LogEntry, MessageType, RunLog};

use midly::{Arena, Smf};
use serde::Serialize;
use std::path::{Path, PathBuf};
use stemsplit_rules::RuleIndex;

/// Outcome of one successfully written file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitReport {
    pub output_path: PathBuf,
    pub tracks_written: usize,
    pub warnings: usize,
    pub errors: usize,
}

/// Load the rule table at `rules_path` and split one file
pub fn process_file(
    input: &Path,
    output_dir: &Path,
    rules_path: &Path,
    config: &SplitterConfig,
    log: &mut RunLog,
) -> Result<SplitReport> {
    let rules = RuleIndex::load(rules_path)?;
    record_rule_warnings(&rules, log);
    process_file_with_rules(input, output_dir, &rules, config, log)
}

/// Copy the row warnings of a loaded rule table into a run log
pub fn record_rule_warnings(rules: &RuleIndex, log: &mut RunLog) {
    for warning in rules.warnings() {
        log.warn(warning.to_string());
    }
}

/// Split one file with an already loaded rule table.
///
/// The index is only read, so one index can serve many runs at once.
pub fn process_file_with_rules(
    input: &Path,
    output_dir: &Path,
    rules: &RuleIndex,
    config: &SplitterConfig,
    log: &mut RunLog,
) -> Result<SplitReport> {
    config.validate()?;
    let output_path = midifile::output_path(input, output_dir, &config.output_suffix)?;

    log.info(format!("Loading MIDI file: {}", input.display()));
    let bytes = midifile::read_input(input)?;
    let smf = Smf::parse(&bytes)?;
    log.info(format!(
        "Input has {} tracks, timing {:?}",
        smf.tracks.len(),
        smf.header.timing
    ));

    let arena = Arena::new();
    let tracks = SequenceAssembler::new(rules, config, &arena, &smf).assemble(&smf, log);
    let tracks_written = tracks.len();

    midifile::write_output(&output_path, smf.header.timing, tracks)?;
    log.info(format!(
        "Wrote {} tracks to {}",
        tracks_written,
        output_path.display()
    ));

    Ok(SplitReport {
        output_path,
        tracks_written,
        warnings: log.warnings(),
        errors: log.errors(),
    })
}
