//! Note remapping, shifting, layering and rechanneling

use midly::num::{u4, u7};
use midly::{MidiMessage, TrackEventKind};
use stemsplit_rules::{ChannelType, Rule, RuleIndex};

use crate::config::SplitterConfig;
use crate::context::ChannelContext;
use crate::multiplexer::TrackKey;
use crate::pool::{route_channel, MelodicChannelPool, PoolPurpose};
use crate::runlog::RunLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteCommand {
    On,
    Off,
}

/// A note-on or note-off with plain integer fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub command: NoteCommand,
    pub channel: u8,
    pub note: u8,
    pub velocity: u8,
}

impl NoteEvent {
    /// Read a note message; `None` for any other message
    pub fn from_message(channel: u8, message: &MidiMessage) -> Option<Self> {
        let (command, key, vel) = match *message {
            MidiMessage::NoteOn { key, vel } => (NoteCommand::On, key, vel),
            MidiMessage::NoteOff { key, vel } => (NoteCommand::Off, key, vel),
            _ => return None,
        };
        Some(Self {
            command,
            channel,
            note: key.as_int(),
            velocity: vel.as_int(),
        })
    }

    pub fn to_kind(self) -> TrackEventKind<'static> {
        let key = u7::new(self.note);
        let vel = u7::new(self.velocity);
        TrackEventKind::Midi {
            channel: u4::new(self.channel),
            message: match self.command {
                NoteCommand::On => MidiMessage::NoteOn { key, vel },
                NoteCommand::Off => MidiMessage::NoteOff { key, vel },
            },
        }
    }
}

/// The transformed note plus any layered copies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteOutcome {
    /// Emitted before `primary`, at the same tick
    pub layered: Vec<NoteEvent>,
    pub primary: NoteEvent,
    /// Type that decided the primary event's channel
    pub effective_type: ChannelType,
    pub key: TrackKey,
}

pub struct NoteTransformer<'r> {
    rules: &'r RuleIndex,
    config: &'r SplitterConfig,
}

impl<'r> NoteTransformer<'r> {
    pub fn new(rules: &'r RuleIndex, config: &'r SplitterConfig) -> Self {
        Self { rules, config }
    }

    /// Transform one note under the channel's active context.
    ///
    /// Rules are looked up by the program that set the context. A specific
    /// note rule wins over general shifts; layering applies regardless.
    pub fn transform(
        &self,
        input: NoteEvent,
        ctx: &ChannelContext,
        pool: &mut MelodicChannelPool,
        log: &mut RunLog,
    ) -> NoteOutcome {
        let program = i32::from(ctx.active.original_program);
        let mut note = i32::from(input.note);
        let mut effective_type = ctx.active.channel_type;

        let mut specific_applied = false;
        if let Some(rule) = self.rules.specific_note_rule(program, input.note) {
            let target = rule.remapped_note_or_offset;
            if is_note(target) {
                note = target;
                effective_type = rule.channel_type;
                specific_applied = true;
                log.detail(format_args!(
                    "Specific note remap: {} -> {} ({})",
                    input.note, target, effective_type
                ));
            } else {
                log.warn(format!(
                    "Specific note remapping for note {} results in out-of-range target note: {}. Rule skipped.",
                    input.note, target
                ));
            }
        }

        if !specific_applied {
            for offset in self.rules.general_shifts(ctx.active.channel_type, program) {
                let shifted = note + offset;
                if is_note(shifted) {
                    note = shifted;
                } else {
                    log.warn(format!(
                        "All notes shift for note {} results in out-of-range note: {}. Rule skipped.",
                        note, shifted
                    ));
                }
            }
        }

        let layered = self
            .rules
            .layering_rules(program)
            .filter_map(|rule| self.layer(rule, input, ctx, pool, log))
            .collect();

        let channel = route_channel(input.channel, effective_type, ctx, pool, self.config, log);
        let primary = NoteEvent {
            channel,
            note: note as u8,
            ..input
        };

        NoteOutcome {
            layered,
            primary,
            effective_type,
            key: TrackKey::Content {
                remapped_program: ctx.active.remapped_program,
                channel,
                channel_type: effective_type,
                segment: ctx.segment,
            },
        }
    }

    fn layer(
        &self,
        rule: &Rule,
        input: NoteEvent,
        ctx: &ChannelContext,
        pool: &mut MelodicChannelPool,
        log: &mut RunLog,
    ) -> Option<NoteEvent> {
        let offset = rule.remapped_note_or_offset;
        let layered_note = i32::from(input.note) + offset;
        if !is_note(layered_note) {
            log.warn(format!(
                "Layering for note {} results in out-of-range note: {}. Layering rule skipped.",
                input.note, layered_note
            ));
            return None;
        }

        let channel = match rule.channel_type {
            ChannelType::Drum => self.config.drum_channel,
            ChannelType::Melodic if !self.config.is_drum_channel(input.channel) => input.channel,
            ChannelType::Melodic => {
                let purpose = PoolPurpose::Layer {
                    source: input.channel,
                    segment: ctx.segment,
                    remapped_program: ctx.active.remapped_program,
                    offset,
                };
                match pool.allocate(purpose) {
                    Some(ch) => ch,
                    None => {
                        log.warn(format!(
                            "Layered note is MELODIC, but no available melodic channel found. Keeping on original Ch {}.",
                            input.channel + 1
                        ));
                        input.channel
                    }
                }
            }
        };

        log.detail(format_args!(
            "Layering note {} -> {} on Ch {} ({})",
            input.note,
            layered_note,
            channel + 1,
            rule.channel_type
        ));
        Some(NoteEvent {
            channel,
            note: layered_note as u8,
            ..input
        })
    }
}

fn is_note(value: i32) -> bool {
    (0..=127).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RemapInfo;

    fn rules(rows: &[&str]) -> RuleIndex {
        RuleIndex::parse(&format!("header\n{}", rows.join("\n"))).unwrap()
    }

    fn ctx(program: u8, channel_type: ChannelType) -> ChannelContext {
        ChannelContext::new(RemapInfo {
            original_program: program,
            remapped_program: program,
            channel_type,
        })
    }

    fn on(channel: u8, note: u8) -> NoteEvent {
        NoteEvent {
            command: NoteCommand::On,
            channel,
            note,
            velocity: 90,
        }
    }

    fn run(
        index: &RuleIndex,
        input: NoteEvent,
        c: &ChannelContext,
        pool: &mut MelodicChannelPool,
    ) -> (NoteOutcome, RunLog) {
        let config = SplitterConfig::default();
        let mut log = RunLog::new();
        let out = NoteTransformer::new(index, &config).transform(input, c, pool, &mut log);
        (out, log)
    }

    #[test]
    fn test_no_rules_leaves_melodic_note_alone() {
        let index = RuleIndex::empty();
        let mut pool = MelodicChannelPool::new(9, 15);
        let (out, log) = run(&index, on(2, 60), &ctx(0, ChannelType::Melodic), &mut pool);
        assert_eq!(out.primary, on(2, 60));
        assert!(out.layered.is_empty());
        assert!(pool.is_claimed(2));
        assert_eq!(log.warnings(), 0);
    }

    #[test]
    fn test_specific_rule_overrides_type() {
        let index = rules(&["a,0,0,60,36,false,DRUM"]);
        let mut pool = MelodicChannelPool::new(9, 15);
        let (out, _) = run(&index, on(2, 60), &ctx(0, ChannelType::Melodic), &mut pool);
        assert_eq!(out.primary.note, 36);
        assert_eq!(out.primary.channel, 9);
        assert_eq!(out.effective_type, ChannelType::Drum);
        assert_eq!(
            out.key,
            TrackKey::Content {
                remapped_program: 0,
                channel: 9,
                channel_type: ChannelType::Drum,
                segment: 0
            }
        );
    }

    #[test]
    fn test_specific_rule_skips_general_shift() {
        let index = rules(&["a,0,0,60,61,false,MELODIC", "b,0,0,-1,12,false,MELODIC"]);
        let mut pool = MelodicChannelPool::new(9, 15);
        let (out, _) = run(&index, on(0, 60), &ctx(0, ChannelType::Melodic), &mut pool);
        assert_eq!(out.primary.note, 61);
        let (out, _) = run(&index, on(0, 50), &ctx(0, ChannelType::Melodic), &mut pool);
        assert_eq!(out.primary.note, 62);
    }

    #[test]
    fn test_out_of_range_specific_falls_through_to_shift() {
        let index = rules(&["a,0,0,60,200,false,DRUM", "b,0,0,-1,12,false,MELODIC"]);
        let mut pool = MelodicChannelPool::new(9, 15);
        let (out, log) = run(&index, on(0, 60), &ctx(0, ChannelType::Melodic), &mut pool);
        assert_eq!(out.primary.note, 72);
        assert_eq!(out.effective_type, ChannelType::Melodic);
        assert_eq!(out.primary.channel, 0);
        assert_eq!(log.warnings(), 1);
    }

    #[test]
    fn test_shifts_are_cumulative_and_individually_discarded() {
        let index = rules(&[
            "a,0,0,-1,12,false,MELODIC",
            "b,0,0,-1,60,false,MELODIC",
            "c,0,0,-1,-5,false,MELODIC",
        ]);
        let mut pool = MelodicChannelPool::new(9, 15);
        // 100 + 12 = 112, 112 + 60 out of range, 112 - 5 = 107
        let (out, log) = run(&index, on(0, 100), &ctx(0, ChannelType::Melodic), &mut pool);
        assert_eq!(out.primary.note, 107);
        assert_eq!(log.warnings(), 1);
    }

    #[test]
    fn test_shift_uses_segment_type() {
        let index = rules(&["a,0,0,-1,12,false,DRUM"]);
        let mut pool = MelodicChannelPool::new(9, 15);
        let (out, _) = run(&index, on(0, 60), &ctx(0, ChannelType::Melodic), &mut pool);
        assert_eq!(out.primary.note, 60);
        let (out, _) = run(&index, on(9, 60), &ctx(0, ChannelType::Drum), &mut pool);
        assert_eq!(out.primary.note, 72);
    }

    #[test]
    fn test_layering_is_additive() {
        let index = rules(&["a,0,0,-1,12,true,MELODIC", "b,0,0,-1,-70,true,MELODIC"]);
        let mut pool = MelodicChannelPool::new(9, 15);
        let (out, log) = run(&index, on(1, 60), &ctx(0, ChannelType::Melodic), &mut pool);
        assert_eq!(out.primary, on(1, 60));
        assert_eq!(out.layered, vec![on(1, 72)]);
        assert_eq!(log.warnings(), 1);
    }

    #[test]
    fn test_layer_uses_original_note_not_shifted_note() {
        let index = rules(&["a,0,0,-1,5,false,MELODIC", "b,0,0,-1,12,true,MELODIC"]);
        let mut pool = MelodicChannelPool::new(9, 15);
        let (out, _) = run(&index, on(1, 60), &ctx(0, ChannelType::Melodic), &mut pool);
        assert_eq!(out.primary.note, 65);
        assert_eq!(out.layered[0].note, 72);
    }

    #[test]
    fn test_drum_layer_goes_to_drum_channel() {
        let index = rules(&["a,0,0,-1,-24,true,DRUM"]);
        let mut pool = MelodicChannelPool::new(9, 15);
        let (out, _) = run(&index, on(3, 60), &ctx(0, ChannelType::Melodic), &mut pool);
        assert_eq!(out.layered[0].channel, 9);
        assert_eq!(out.layered[0].note, 36);
        assert_eq!(out.layered[0].velocity, 90);
    }

    #[test]
    fn test_melodic_layer_from_drum_channel_uses_pool() {
        let index = rules(&["a,0,0,-1,12,true,MELODIC"]);
        let mut pool = MelodicChannelPool::new(9, 15);
        pool.claim(0);
        let (out, _) = run(&index, on(9, 40), &ctx(0, ChannelType::Drum), &mut pool);
        assert_eq!(out.primary.channel, 9);
        assert_eq!(out.layered[0].channel, 1);
    }

    #[test]
    fn test_melodic_on_drum_channel_is_redirected_consistently() {
        let index = RuleIndex::empty();
        let mut pool = MelodicChannelPool::new(9, 15);
        let c = ctx(0, ChannelType::Melodic);
        let (note_on, _) = run(&index, on(9, 60), &c, &mut pool);
        let off = NoteEvent {
            command: NoteCommand::Off,
            ..on(9, 60)
        };
        let (note_off, _) = run(&index, off, &c, &mut pool);
        assert_eq!(note_on.primary.channel, 0);
        assert_eq!(note_off.primary.channel, 0);
        assert_eq!(note_on.key, note_off.key);
    }

    #[test]
    fn test_pool_exhaustion_falls_back_to_drum_channel() {
        let index = RuleIndex::empty();
        let mut pool = MelodicChannelPool::new(9, 15);
        for ch in (0..=15).filter(|&c| c != 9) {
            pool.claim(ch);
        }
        let (out, log) = run(&index, on(9, 60), &ctx(0, ChannelType::Melodic), &mut pool);
        assert_eq!(out.primary.channel, 9);
        assert_eq!(log.warnings(), 1);
        assert!(pool.is_claimed(9));
    }

    #[test]
    fn test_note_event_round_trips_through_midly() {
        let event = on(4, 61);
        match event.to_kind() {
            TrackEventKind::Midi { channel, message } => {
                assert_eq!(NoteEvent::from_message(channel.as_int(), &message), Some(event));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
