//! Rule table loading for the MIDI stem splitter
//!
//! A rule table is a comma-separated file with a header row and seven columns.
//! Each row either remaps a program change (both note columns `-999`) or
//! manipulates notes played under an original program: a specific note remap,
//! a general shift of every note, or a layered copy of every note.
//!
//! # Examples
//!
//! ```
//! use stemsplit_rules::{ChannelType, RuleIndex};
//!
//! let index = RuleIndex::parse(
//!     "TrackName,Orig,Remap,OrigNote,RemapNote,Layered,Type\n\
//!      Kit,60,40,-999,-999,false,DRUM",
//! )
//! .unwrap();
//!
//! let rule = index.program_rule(60).unwrap();
//! assert_eq!(rule.remapped_program, 40);
//! assert_eq!(rule.channel_type, ChannelType::Drum);
//! ```

pub mod error;
pub mod index;
pub mod parser;
pub mod rule;

pub use error::{Result, RuleLoadError, RuleWarning, RuleWarningKind};
pub use index::{IndexSummary, RuleIndex};
pub use rule::{ChannelType, Rule, RuleKind, ANY, PROGRAM_RULE_SENTINEL};
