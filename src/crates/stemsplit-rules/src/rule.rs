use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker used in both note columns of a program-change row
pub const PROGRAM_RULE_SENTINEL: i32 = -999;

/// Wildcard value: "all notes" in the note column, "unset" in the program columns
pub const ANY: i32 = -1;

/// Whether content belongs on the fixed drum channel or on a melodic channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelType {
    Drum,
    Melodic,
}

impl ChannelType {
    /// Parse a channel-type token, ignoring case and surrounding whitespace
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_uppercase().as_str() {
            "DRUM" => Some(ChannelType::Drum),
            "MELODIC" => Some(ChannelType::Melodic),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelType::Drum => "DRUM",
            ChannelType::Melodic => "MELODIC",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the rule table.
///
/// A row whose two note columns both hold [`PROGRAM_RULE_SENTINEL`] remaps a
/// program change; every other row manipulates notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub original_program: i32,
    pub remapped_program: i32,
    pub original_note: i32,
    pub remapped_note_or_offset: i32,
    pub layered: bool,
    pub channel_type: ChannelType,
}

/// What a rule does once classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    ProgramChange,
    /// Replace one note with `target`
    SpecificNote { note: u8, target: i32 },
    /// Shift every note by `offset`
    GeneralShift { offset: i32 },
    /// Add a copy of every note shifted by `offset`
    Layering { offset: i32 },
    /// Note row carrying the program sentinel in only one column; matches nothing
    Inert,
}

impl Rule {
    pub fn is_program_change(&self) -> bool {
        self.original_note == PROGRAM_RULE_SENTINEL
            && self.remapped_note_or_offset == PROGRAM_RULE_SENTINEL
    }

    pub fn is_note_manipulation(&self) -> bool {
        !self.is_program_change()
    }

    pub fn kind(&self) -> RuleKind {
        if self.is_program_change() {
            return RuleKind::ProgramChange;
        }
        match u8::try_from(self.original_note) {
            Ok(note) if note <= 127 => RuleKind::SpecificNote {
                note,
                target: self.remapped_note_or_offset,
            },
            _ if self.original_note != ANY => RuleKind::Inert,
            _ if self.layered => RuleKind::Layering {
                offset: self.remapped_note_or_offset,
            },
            _ => RuleKind::GeneralShift {
                offset: self.remapped_note_or_offset,
            },
        }
    }

    /// The original program as a MIDI program number, if it is one
    pub fn original_program_number(&self) -> Option<u8> {
        midi_program(self.original_program)
    }

    /// The remapped program as a MIDI program number, if it is one
    pub fn remapped_program_number(&self) -> Option<u8> {
        midi_program(self.remapped_program)
    }
}

fn midi_program(value: i32) -> Option<u8> {
    u8::try_from(value).ok().filter(|p| *p <= 127)
}
