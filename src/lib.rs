//! Batch front end for the MIDI stem splitter
//!
//! Loads one rule table, then splits any number of MIDI files with it, either
//! one after another or several at once.

pub mod batch;
pub mod loggerbridge;

pub use batch::{
    collect_inputs, prepare_output_dir, report_rule_warnings, run_batch, BatchOptions,
    BatchSummary,
};
pub use loggerbridge::{Logger, LoggerPayload};
