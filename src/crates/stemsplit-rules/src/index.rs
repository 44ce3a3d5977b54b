use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Result, RuleLoadError, RuleWarning, RuleWarningKind};
use crate::parser::parse_row;
use crate::rule::{ChannelType, Rule, RuleKind};

/// Read-only lookup structures built from a rule table.
///
/// Every lookup that has to pick one rule returns the first match in table
/// order. The index is immutable after loading and can be shared between
/// concurrent runs.
#[derive(Debug, Clone, Default)]
pub struct RuleIndex {
    rules: Vec<Rule>,
    /// Position in `rules` of the first program-change rule per original program
    program_rules: HashMap<i32, usize>,
    drum_note_rules: HashMap<i32, Vec<Rule>>,
    melodic_note_rules: HashMap<i32, Vec<Rule>>,
    remapped_default_type: HashMap<u8, ChannelType>,
    original_default_type: HashMap<u8, ChannelType>,
    warnings: Vec<RuleWarning>,
}

/// Counts describing a loaded index, for status output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub rules: usize,
    pub program_rules: usize,
    pub drum_rule_sets: usize,
    pub melodic_rule_sets: usize,
    pub remapped_defaults: usize,
    pub original_defaults: usize,
    pub skipped_rows: usize,
}

impl RuleIndex {
    /// An index with no rules: every program maps to itself
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a rule table from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RuleLoadError::NotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path).map_err(|source| RuleLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::parse(&String::from_utf8_lossy(bytes))
    }

    /// Parse table text. The first line is the header and is skipped.
    ///
    /// Row problems are collected in [`RuleIndex::warnings`] for the caller to
    /// report; they are not logged here.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().enumerate();
        if lines.next().is_none() {
            return Err(RuleLoadError::MissingHeader);
        }

        let mut index = Self::empty();
        for (i, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            index.ingest(i + 1, line);
        }

        log::debug!(
            "Parsed {} rules with {} row warnings",
            index.rules.len(),
            index.warnings.len()
        );
        Ok(index)
    }

    fn ingest(&mut self, line_number: usize, line: &str) {
        let warn = |kind| RuleWarning {
            line_number,
            line: line.to_string(),
            kind,
        };

        let parsed = match parse_row(line) {
            Ok(parsed) => parsed,
            Err(kind) => {
                self.warnings.push(warn(kind));
                return;
            }
        };
        let rule = parsed.rule;
        self.warnings.extend(parsed.remarks.into_iter().map(warn));

        if rule.is_note_manipulation() {
            let list = match rule.channel_type {
                ChannelType::Drum => &mut self.drum_note_rules,
                ChannelType::Melodic => &mut self.melodic_note_rules,
            }
            .entry(rule.original_program)
            .or_default();
            if list.contains(&rule) {
                self.warnings.push(warn(RuleWarningKind::Redundant));
                return;
            }
            list.push(rule);
        } else {
            self.program_rules
                .entry(rule.original_program)
                .or_insert(self.rules.len());
        }

        if let Some(program) = rule.remapped_program_number() {
            // MELODIC overrides DRUM, never the other way round
            self.remapped_default_type
                .entry(program)
                .and_modify(|t| {
                    if *t == ChannelType::Drum && rule.channel_type == ChannelType::Melodic {
                        *t = ChannelType::Melodic;
                    }
                })
                .or_insert(rule.channel_type);
        }
        if let Some(program) = rule.original_program_number() {
            // Once tagged DRUM, an original program stays DRUM
            let entry = self
                .original_default_type
                .entry(program)
                .or_insert(rule.channel_type);
            if rule.channel_type == ChannelType::Drum {
                *entry = ChannelType::Drum;
            }
        }

        self.rules.push(rule);
    }

    /// All accepted rules in table order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn warnings(&self) -> &[RuleWarning] {
        &self.warnings
    }

    /// Rows dropped while loading
    pub fn skipped_rows(&self) -> impl Iterator<Item = &RuleWarning> {
        self.warnings.iter().filter(|w| w.kind.skips_row())
    }

    /// First program-change rule whose original program equals `key`.
    ///
    /// `key` is the bank-offset lookup key, so values above 127 never match.
    pub fn program_rule(&self, key: u16) -> Option<&Rule> {
        self.program_rules
            .get(&i32::from(key))
            .map(|&pos| &self.rules[pos])
    }

    /// Note-manipulation rules of one channel type for an original program, in table order
    pub fn note_rules(&self, channel_type: ChannelType, program: i32) -> &[Rule] {
        let map = match channel_type {
            ChannelType::Drum => &self.drum_note_rules,
            ChannelType::Melodic => &self.melodic_note_rules,
        };
        map.get(&program).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First specific-note rule for `note`, DRUM rules checked before MELODIC ones
    pub fn specific_note_rule(&self, program: i32, note: u8) -> Option<&Rule> {
        [ChannelType::Drum, ChannelType::Melodic]
            .into_iter()
            .flat_map(|t| self.note_rules(t, program))
            .find(|r| matches!(r.kind(), RuleKind::SpecificNote { note: n, .. } if n == note))
    }

    /// Offsets of every general-shift rule of one channel type, in table order
    pub fn general_shifts(
        &self,
        channel_type: ChannelType,
        program: i32,
    ) -> impl Iterator<Item = i32> + '_ {
        self.note_rules(channel_type, program)
            .iter()
            .filter_map(|r| match r.kind() {
                RuleKind::GeneralShift { offset } => Some(offset),
                _ => None,
            })
    }

    /// Layering rules of both channel types (DRUM first), in table order
    pub fn layering_rules(&self, program: i32) -> impl Iterator<Item = &Rule> {
        [ChannelType::Drum, ChannelType::Melodic]
            .into_iter()
            .flat_map(move |t| self.note_rules(t, program))
            .filter(|r| matches!(r.kind(), RuleKind::Layering { .. }))
    }

    pub fn original_default_type(&self, program: u8) -> Option<ChannelType> {
        self.original_default_type.get(&program).copied()
    }

    pub fn remapped_default_type(&self, program: u8) -> Option<ChannelType> {
        self.remapped_default_type.get(&program).copied()
    }

    pub fn summary(&self) -> IndexSummary {
        IndexSummary {
            rules: self.rules.len(),
            program_rules: self.program_rules.len(),
            drum_rule_sets: self.drum_note_rules.len(),
            melodic_rule_sets: self.melodic_note_rules.len(),
            remapped_defaults: self.remapped_default_type.len(),
            original_defaults: self.original_default_type.len(),
            skipped_rows: self.skipped_rows().count(),
        }
    }
}
