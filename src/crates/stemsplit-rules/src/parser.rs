//! Row-level parsing of the comma-separated rule table.
//!
//! Column order is fixed:
//! `TrackName, OriginalProgramChange, RemappedProgramChange, OriginalNote,
//! RemappedNoteOrOffset, LayeredNotes, ChannelType`. The track name is read
//! and ignored.

use crate::error::RuleWarningKind;
use crate::rule::{ChannelType, Rule, ANY, PROGRAM_RULE_SENTINEL};

pub const COLUMN_COUNT: usize = 7;

/// A row that parsed, plus any non-fatal remarks about it
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub rule: Rule,
    pub remarks: Vec<RuleWarningKind>,
}

/// Parse one data row. `Err` means the row must be skipped.
pub fn parse_row(line: &str) -> Result<ParsedRow, RuleWarningKind> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < COLUMN_COUNT {
        return Err(RuleWarningKind::TooFewColumns { found: fields.len() });
    }

    let original_program = parse_int(fields[1], "OriginalProgramChange")?;
    let remapped_program = parse_int(fields[2], "RemappedProgramChange")?;
    let original_note = parse_int(fields[3], "OriginalNote")?;
    let remapped_note_or_offset = parse_int(fields[4], "RemappedNoteOrOffset")?;
    let layered = fields[5].trim().eq_ignore_ascii_case("true");
    let channel_token = fields[6].trim();

    if !is_program_or_any(original_program) {
        return Err(RuleWarningKind::OriginalProgramOutOfRange(original_program));
    }
    if !is_program_or_any(remapped_program) {
        return Err(RuleWarningKind::RemappedProgramOutOfRange(remapped_program));
    }
    let note_ok = original_note == ANY
        || original_note == PROGRAM_RULE_SENTINEL
        || is_midi_value(original_note);
    if !note_ok {
        return Err(RuleWarningKind::OriginalNoteOutOfRange(original_note));
    }

    let mut remarks = Vec::new();
    if original_note != PROGRAM_RULE_SENTINEL
        && remapped_note_or_offset != PROGRAM_RULE_SENTINEL
        && !(-127..=127).contains(&remapped_note_or_offset)
    {
        remarks.push(RuleWarningKind::OffsetOutsideTypicalRange(remapped_note_or_offset));
    }

    let is_program_row =
        original_note == PROGRAM_RULE_SENTINEL && remapped_note_or_offset == PROGRAM_RULE_SENTINEL;
    let channel_type = match ChannelType::parse(channel_token) {
        Some(t) => t,
        // A program-change row still has to route somewhere
        None if is_program_row => {
            remarks.push(RuleWarningKind::UnknownChannelType(channel_token.to_string()));
            ChannelType::Melodic
        }
        None => return Err(RuleWarningKind::UnknownChannelType(channel_token.to_string())),
    };

    Ok(ParsedRow {
        rule: Rule {
            original_program,
            remapped_program,
            original_note,
            remapped_note_or_offset,
            layered,
            channel_type,
        },
        remarks,
    })
}

fn parse_int(field: &str, column: &'static str) -> Result<i32, RuleWarningKind> {
    let trimmed = field.trim();
    trimmed.parse::<i32>().map_err(|_| RuleWarningKind::InvalidNumber {
        column,
        value: trimmed.to_string(),
    })
}

fn is_midi_value(v: i32) -> bool {
    (0..=127).contains(&v)
}

fn is_program_or_any(v: i32) -> bool {
    v == ANY || is_midi_value(v)
}
