//! Per-channel program context for one run

use serde::Serialize;
use stemsplit_rules::{ChannelType, RuleIndex};

use crate::config::SplitterConfig;
use crate::runlog::RunLog;

pub const CHANNEL_COUNT: usize = 16;

/// The program context a channel is currently playing under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RemapInfo {
    /// Program that set this context; keys the note rules
    pub original_program: u8,
    pub remapped_program: u8,
    pub channel_type: ChannelType,
}

/// Mutable state of one channel once its first event has been seen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelContext {
    pub bank_msb: u8,
    pub bank_lsb: u8,
    pub active: RemapInfo,
    pub segment: u32,
}

impl ChannelContext {
    pub fn new(active: RemapInfo) -> Self {
        Self {
            bank_msb: 0,
            bank_lsb: 0,
            active,
            segment: 0,
        }
    }

    /// Program-rule lookup key for a program change under the current bank.
    ///
    /// Only the LSB enters the key; the MSB is tracked but not folded in.
    pub fn lookup_key(&self, program: u8) -> u16 {
        u16::from(self.bank_lsb) * 128 + u16::from(program)
    }

    /// Apply a bank-select controller. Returns false for any other controller.
    pub fn apply_bank_select(&mut self, controller: u8, value: u8) -> bool {
        match controller {
            0 => self.bank_msb = value,
            32 => self.bank_lsb = value,
            _ => return false,
        }
        true
    }
}

/// Channel contexts for all sixteen channels, plus the prescan result.
///
/// A channel is `None` until its first event, then holds the context seeded
/// from its first explicit program change.
#[derive(Debug, Clone)]
pub struct ChannelTable {
    states: [Option<ChannelContext>; CHANNEL_COUNT],
    first_programs: [Option<u8>; CHANNEL_COUNT],
}

impl ChannelTable {
    pub fn new(first_programs: [Option<u8>; CHANNEL_COUNT]) -> Self {
        Self {
            states: Default::default(),
            first_programs,
        }
    }

    pub fn get(&self, channel: u8) -> Option<&ChannelContext> {
        self.states[channel as usize].as_ref()
    }

    /// Context for `channel`, seeding it from the prescan on first use
    pub fn activate(
        &mut self,
        channel: u8,
        rules: &RuleIndex,
        config: &SplitterConfig,
        log: &mut RunLog,
    ) -> &mut ChannelContext {
        let first = self.first_programs[channel as usize];
        self.states[channel as usize]
            .get_or_insert_with(|| seed_context(channel, first, rules, config, log))
    }
}

fn seed_context(
    channel: u8,
    first_program: Option<u8>,
    rules: &RuleIndex,
    config: &SplitterConfig,
    log: &mut RunLog,
) -> ChannelContext {
    let program = match first_program {
        Some(p) => {
            log.info(format!("First explicit PC for Ch {} is P{}.", channel + 1, p));
            p
        }
        None => {
            log.info(format!(
                "No explicit PC found for Ch {}. Initializing to default program 0.",
                channel + 1
            ));
            0
        }
    };
    let active = resolve_program(u16::from(program), program, channel, rules, config, log);
    log.info(format!(
        "First event on Ch {}. Initial segment context: Orig P{}, Remap P{}, Type: {}.",
        channel + 1,
        active.original_program,
        active.remapped_program,
        active.channel_type
    ));
    ChannelContext::new(active)
}

/// Resolve a program through the program-change rules.
///
/// The first rule whose original program equals `key` wins. Without one the
/// program maps to itself, typed by the original-program default, else DRUM
/// on the drum channel and MELODIC anywhere else.
pub fn resolve_program(
    key: u16,
    program: u8,
    channel: u8,
    rules: &RuleIndex,
    config: &SplitterConfig,
    log: &mut RunLog,
) -> RemapInfo {
    if let Some(rule) = rules.program_rule(key) {
        let original = rule.original_program_number().unwrap_or(program);
        let remapped = match rule.remapped_program_number() {
            Some(p) => p,
            None => {
                log.warn(format!(
                    "Program rule for P{} has no remapped program ({}). Keeping P{}.",
                    original, rule.remapped_program, original
                ));
                original
            }
        };
        return RemapInfo {
            original_program: original,
            remapped_program: remapped,
            channel_type: rule.channel_type,
        };
    }

    let fallback = if config.is_drum_channel(channel) {
        ChannelType::Drum
    } else {
        ChannelType::Melodic
    };
    RemapInfo {
        original_program: program,
        remapped_program: program,
        channel_type: rules.original_default_type(program).unwrap_or(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(rows: &str) -> RuleIndex {
        RuleIndex::parse(&format!("header\n{}", rows)).unwrap()
    }

    #[test]
    fn test_channels_start_unseen() {
        let table = ChannelTable::new([None; CHANNEL_COUNT]);
        for ch in 0..16 {
            assert!(table.get(ch).is_none());
        }
    }

    #[test]
    fn test_activation_uses_prescan_program() {
        let index = rules("a,60,40,-999,-999,false,DRUM");
        let mut first = [None; CHANNEL_COUNT];
        first[3] = Some(60);
        let mut table = ChannelTable::new(first);
        let mut log = RunLog::new();

        let ctx = table.activate(3, &index, &SplitterConfig::default(), &mut log);
        assert_eq!(
            ctx.active,
            RemapInfo {
                original_program: 60,
                remapped_program: 40,
                channel_type: ChannelType::Drum
            }
        );
        assert_eq!(ctx.segment, 0);
        assert!(table.get(3).is_some());
        assert!(table.get(4).is_none());
    }

    #[test]
    fn test_activation_happens_once() {
        let index = RuleIndex::empty();
        let config = SplitterConfig::default();
        let mut table = ChannelTable::new([None; CHANNEL_COUNT]);
        let mut log = RunLog::new();

        table.activate(0, &index, &config, &mut log).segment = 4;
        let entries = log.entries().len();
        assert_eq!(table.activate(0, &index, &config, &mut log).segment, 4);
        assert_eq!(log.entries().len(), entries);
    }

    #[test]
    fn test_unscanned_channel_seeds_program_zero() {
        let index = rules("a,0,16,-999,-999,false,MELODIC");
        let mut first = [None; CHANNEL_COUNT];
        first[1] = Some(5);
        let mut table = ChannelTable::new(first);
        let mut log = RunLog::new();
        let config = SplitterConfig::default();

        assert_eq!(table.activate(0, &index, &config, &mut log).active.remapped_program, 16);
        assert_eq!(table.activate(1, &index, &config, &mut log).active.original_program, 5);
        assert_eq!(log.warnings(), 0);
    }

    #[test]
    fn test_fallback_type_depends_on_channel() {
        let index = RuleIndex::empty();
        let config = SplitterConfig::default();
        let mut log = RunLog::new();
        let melodic = resolve_program(5, 5, 0, &index, &config, &mut log);
        assert_eq!(melodic.channel_type, ChannelType::Melodic);
        let drum = resolve_program(5, 5, 9, &index, &config, &mut log);
        assert_eq!(drum.channel_type, ChannelType::Drum);
    }

    #[test]
    fn test_original_default_type_applies_without_program_rule() {
        let index = rules("a,5,5,36,38,false,DRUM");
        let mut log = RunLog::new();
        let info = resolve_program(5, 5, 0, &index, &SplitterConfig::default(), &mut log);
        assert_eq!(info.channel_type, ChannelType::Drum);
        assert_eq!(info.remapped_program, 5);
    }

    #[test]
    fn test_unset_remapped_program_keeps_original() {
        let index = rules("a,12,-1,-999,-999,false,MELODIC");
        let mut log = RunLog::new();
        let info = resolve_program(12, 12, 0, &index, &SplitterConfig::default(), &mut log);
        assert_eq!(info.remapped_program, 12);
        assert_eq!(log.warnings(), 1);
    }

    #[test]
    fn test_bank_lsb_offsets_lookup_key() {
        let mut ctx = ChannelContext::new(RemapInfo {
            original_program: 0,
            remapped_program: 0,
            channel_type: ChannelType::Melodic,
        });
        assert!(ctx.apply_bank_select(0, 3));
        assert_eq!(ctx.lookup_key(10), 10);
        assert!(ctx.apply_bank_select(32, 1));
        assert_eq!(ctx.lookup_key(10), 138);
        assert!(!ctx.apply_bank_select(7, 100));
        assert_eq!(ctx.bank_msb, 3);
    }
}
