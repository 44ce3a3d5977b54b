//! Single pass over an input sequence that drives remapping and track routing

use midly::num::{u4, u7};
use midly::{Arena, MetaMessage, MidiMessage, Smf, TrackEvent, TrackEventKind};
use std::borrow::Cow;
use stemsplit_rules::RuleIndex;

use crate::config::SplitterConfig;
use crate::context::{ChannelContext, ChannelTable, CHANNEL_COUNT};
use crate::multiplexer::{OutputTrack, TrackKey, TrackMultiplexer};
use crate::notes::{NoteEvent, NoteTransformer};
use crate::pool::MelodicChannelPool;
use crate::program::handle_program_change;
use crate::runlog::RunLog;

/// First explicit program change per channel, across all tracks in order
pub fn prescan_programs(smf: &Smf) -> [Option<u8>; CHANNEL_COUNT] {
    let mut first = [None; CHANNEL_COUNT];
    for event in smf.tracks.iter().flatten() {
        if let TrackEventKind::Midi {
            channel,
            message: MidiMessage::ProgramChange { program },
        } = event.kind
        {
            first[channel.as_int() as usize].get_or_insert(program.as_int());
        }
    }
    first
}

/// Replace `[` and `]` with the loop tokens. Borrows when there is nothing to replace.
pub fn substitute_loop_brackets<'t>(text: &'t str, start: &str, end: &str) -> Cow<'t, str> {
    if !text.contains(['[', ']']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + start.len() + end.len());
    for c in text.chars() {
        match c {
            '[' => out.push_str(start),
            ']' => out.push_str(end),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Per-run state: channel contexts, the melodic pool and the output tracks.
///
/// One assembler handles exactly one input sequence, the one it was built
/// from. Rewritten marker text is stored in `arena`, which must outlive the
/// produced tracks.
pub struct SequenceAssembler<'a, 'r> {
    rules: &'r RuleIndex,
    config: &'r SplitterConfig,
    arena: &'a Arena,
    channels: ChannelTable,
    pool: MelodicChannelPool,
    mux: TrackMultiplexer<'a>,
}

impl<'a, 'r> SequenceAssembler<'a, 'r> {
    /// Assembler for `smf`, with channels seeded from its program-change prescan
    pub fn new(
        rules: &'r RuleIndex,
        config: &'r SplitterConfig,
        arena: &'a Arena,
        smf: &Smf,
    ) -> Self {
        Self {
            rules,
            config,
            arena,
            channels: ChannelTable::new(prescan_programs(smf)),
            pool: MelodicChannelPool::new(config.drum_channel, config.max_channel),
            mux: TrackMultiplexer::new(config.drum_channel),
        }
    }

    /// Process every event of `smf`, the sequence passed to [`new`](Self::new),
    /// and return the finished output tracks
    pub fn assemble(mut self, smf: &Smf<'a>, log: &mut RunLog) -> Vec<Vec<TrackEvent<'a>>> {
        let interval = self.config.progress_interval;

        for (track_idx, track) in smf.tracks.iter().enumerate() {
            log.info(format!(
                "Processing original track {} ({} events)",
                track_idx,
                track.len()
            ));
            let mut tick = 0u64;
            for (count, event) in track.iter().enumerate() {
                tick += u64::from(event.delta.as_int());
                self.feed(tick, event.kind, log);
                if interval > 0 && (count + 1) % interval == 0 {
                    log.info(format!(
                        "  Processed {} of {} events in track {}",
                        count + 1,
                        track.len(),
                        track_idx
                    ));
                }
            }
        }

        self.finish(log)
    }

    /// Route one event at absolute `tick`
    pub fn feed(&mut self, tick: u64, kind: TrackEventKind<'a>, log: &mut RunLog) {
        match kind {
            TrackEventKind::Midi { channel, message } => {
                self.handle_midi(tick, channel.as_int(), message, log)
            }
            TrackEventKind::Meta(MetaMessage::EndOfTrack) => {}
            TrackEventKind::Meta(MetaMessage::Marker(text)) => {
                let text = self.loop_text(text, tick, log);
                self.push_global(tick, TrackEventKind::Meta(MetaMessage::Marker(text)), log);
            }
            TrackEventKind::Meta(MetaMessage::CuePoint(text)) => {
                let text = self.loop_text(text, tick, log);
                self.push_global(tick, TrackEventKind::Meta(MetaMessage::CuePoint(text)), log);
            }
            other => self.push_global(tick, other, log),
        }
    }

    /// Channels that have seen an event, with their contexts
    pub fn active_channels(&self) -> impl Iterator<Item = (u8, &ChannelContext)> + '_ {
        (0..CHANNEL_COUNT as u8).filter_map(|ch| self.channels.get(ch).map(|ctx| (ch, ctx)))
    }

    pub fn tracks(&self) -> &[OutputTrack<'a>] {
        self.mux.tracks()
    }

    pub fn finish(self, log: &mut RunLog) -> Vec<Vec<TrackEvent<'a>>> {
        if log.errors() > 0 {
            log.warn(format!(
                "{} errors occurred while processing individual events.",
                log.errors()
            ));
        }
        log.info(format!("Finalizing {} output tracks", self.mux.len()));
        self.mux.finish(log)
    }

    fn handle_midi(&mut self, tick: u64, channel: u8, message: MidiMessage, log: &mut RunLog) {
        let ctx = self.channels.activate(channel, self.rules, self.config, log);

        match message {
            MidiMessage::ProgramChange { program } => {
                let outcome = handle_program_change(
                    ctx,
                    channel,
                    program.as_int(),
                    tick,
                    &mut self.pool,
                    self.rules,
                    self.config,
                    log,
                );
                let kind = TrackEventKind::Midi {
                    channel: u4::new(outcome.channel),
                    message: MidiMessage::ProgramChange {
                        program: u7::new(outcome.program),
                    },
                };
                self.mux.get_or_create(outcome.key, log).push(tick, kind);
            }
            MidiMessage::NoteOn { .. } | MidiMessage::NoteOff { .. } => {
                let Some(note) = NoteEvent::from_message(channel, &message) else {
                    return;
                };
                let outcome = NoteTransformer::new(self.rules, self.config).transform(
                    note,
                    ctx,
                    &mut self.pool,
                    log,
                );
                let track = self.mux.get_or_create(outcome.key, log);
                for layered in outcome.layered {
                    track.push(tick, layered.to_kind());
                }
                track.push(tick, outcome.primary.to_kind());
            }
            other => {
                if let MidiMessage::Controller { controller, value } = other {
                    if ctx.apply_bank_select(controller.as_int(), value.as_int()) {
                        log.detail(format_args!(
                            "Bank select CC{} = {} on Ch {} at tick {}",
                            controller.as_int(),
                            value.as_int(),
                            channel + 1,
                            tick
                        ));
                    }
                }
                let key = TrackKey::Content {
                    remapped_program: ctx.active.remapped_program,
                    channel,
                    channel_type: ctx.active.channel_type,
                    segment: ctx.segment,
                };
                let kind = TrackEventKind::Midi {
                    channel: u4::new(channel),
                    message: other,
                };
                self.mux.get_or_create(key, log).push(tick, kind);
            }
        }
    }

    fn loop_text(&self, text: &'a [u8], tick: u64, log: &mut RunLog) -> &'a [u8] {
        let original = String::from_utf8_lossy(text);
        match substitute_loop_brackets(
            &original,
            &self.config.loop_start_token,
            &self.config.loop_end_token,
        ) {
            Cow::Borrowed(_) => text,
            Cow::Owned(rewritten) => {
                log.info(format!(
                    "Marker text modified: '{}' -> '{}' at tick {}",
                    original, rewritten, tick
                ));
                self.arena.add(rewritten.as_bytes())
            }
        }
    }

    fn push_global(&mut self, tick: u64, kind: TrackEventKind<'a>, log: &mut RunLog) {
        self.mux.get_or_create(TrackKey::Global, log).push(tick, kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use midly::num::{u15, u24, u28};
    use midly::{Format, Header, Timing};
    use stemsplit_rules::ChannelType;

    fn ev(delta: u32, kind: TrackEventKind<'static>) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind,
        }
    }

    fn midi(channel: u8, message: MidiMessage) -> TrackEventKind<'static> {
        TrackEventKind::Midi {
            channel: u4::new(channel),
            message,
        }
    }

    fn pc(channel: u8, program: u8) -> TrackEventKind<'static> {
        midi(
            channel,
            MidiMessage::ProgramChange {
                program: u7::new(program),
            },
        )
    }

    fn note_on(channel: u8, key: u8) -> TrackEventKind<'static> {
        midi(
            channel,
            MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(100),
            },
        )
    }

    fn smf(tracks: Vec<Vec<TrackEvent<'static>>>) -> Smf<'static> {
        Smf {
            header: Header::new(Format::Parallel, Timing::Metrical(u15::new(480))),
            tracks,
        }
    }

    fn rules(rows: &str) -> RuleIndex {
        RuleIndex::parse(&format!("header\n{}", rows)).unwrap()
    }

    fn run(smf: &Smf<'static>, index: &RuleIndex) -> (Vec<Vec<TrackEvent<'static>>>, RunLog) {
        run_with(smf, index, &SplitterConfig::default())
    }

    fn run_with(
        smf: &Smf<'static>,
        index: &RuleIndex,
        config: &SplitterConfig,
    ) -> (Vec<Vec<TrackEvent<'static>>>, RunLog) {
        // Leaked so the arena outlives the returned tracks
        let arena: &'static Arena = Box::leak(Box::new(Arena::new()));
        let mut log = RunLog::new();
        let tracks = SequenceAssembler::new(index, config, arena, smf).assemble(smf, &mut log);
        (tracks, log)
    }

    fn progress_entries(log: &RunLog) -> usize {
        log.entries()
            .iter()
            .filter(|e| e.message.contains("Processed"))
            .count()
    }

    fn track_name<'a>(track: &[TrackEvent<'a>]) -> &'a [u8] {
        match track[0].kind {
            TrackEventKind::Meta(MetaMessage::TrackName(name)) => name,
            other => panic!("first event is not a track name: {:?}", other),
        }
    }

    #[test]
    fn test_loop_brackets() {
        assert_eq!(
            substitute_loop_brackets("[A][B]", "loopStart", "loopEnd"),
            "loopStartAloopEndloopStartBloopEnd"
        );
        assert!(matches!(
            substitute_loop_brackets("Verse", "loopStart", "loopEnd"),
            Cow::Borrowed("Verse")
        ));
    }

    #[test]
    fn test_prescan_takes_first_program_per_channel() {
        let input = smf(vec![
            vec![ev(0, note_on(2, 60)), ev(10, pc(2, 7)), ev(10, pc(2, 8))],
            vec![ev(0, pc(2, 9)), ev(0, pc(4, 1))],
        ]);
        let first = prescan_programs(&input);
        assert_eq!(first[2], Some(7));
        assert_eq!(first[4], Some(1));
        assert_eq!(first[0], None);
    }

    #[test]
    fn test_drum_program_and_note_share_a_track() {
        let input = smf(vec![vec![ev(0, pc(3, 60)), ev(10, note_on(3, 36))]]);
        let (tracks, _) = run(&input, &rules("Kit,60,40,-999,-999,false,DRUM"));

        assert_eq!(tracks.len(), 1);
        let track = &tracks[0];
        assert_eq!(track_name(track), b"Brush Kit");
        assert_eq!(track[1].kind, pc(9, 40));
        assert_eq!(track[2].kind, note_on(9, 36));
        assert_eq!(track[2].delta.as_int(), 10);
        assert!(matches!(
            track[3].kind,
            TrackEventKind::Meta(MetaMessage::EndOfTrack)
        ));
    }

    #[test]
    fn test_layered_events_precede_primary() {
        let input = smf(vec![vec![ev(0, note_on(0, 60))]]);
        let (tracks, _) = run(&input, &rules("a,0,0,-1,12,true,MELODIC"));
        assert_eq!(tracks[0][1].kind, note_on(0, 72));
        assert_eq!(tracks[0][2].kind, note_on(0, 60));
        assert_eq!(tracks[0][2].delta.as_int(), 0);
    }

    #[test]
    fn test_meta_events_go_to_global_track() {
        let input = smf(vec![vec![
            ev(0, TrackEventKind::Meta(MetaMessage::Tempo(u24::new(500_000)))),
            ev(0, TrackEventKind::Meta(MetaMessage::Marker(b"[Intro]".as_slice()))),
            ev(5, note_on(1, 64)),
            ev(0, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
        ]]);
        let (tracks, log) = run(&input, &RuleIndex::empty());

        assert_eq!(tracks.len(), 2);
        let global = &tracks[0];
        assert_eq!(track_name(global), b"Global Events");
        assert_eq!(
            global[1].kind,
            TrackEventKind::Meta(MetaMessage::Tempo(u24::new(500_000)))
        );
        assert_eq!(
            global[2].kind,
            TrackEventKind::Meta(MetaMessage::Marker(b"loopStartIntroloopEnd".as_slice()))
        );
        // Only the appended end-of-track survives
        let ends = tracks
            .iter()
            .flatten()
            .filter(|e| matches!(e.kind, TrackEventKind::Meta(MetaMessage::EndOfTrack)))
            .count();
        assert_eq!(ends, 2);
        assert_eq!(log.warnings(), 0);
    }

    #[test]
    fn test_controllers_follow_the_segment() {
        let volume = midi(
            5,
            MidiMessage::Controller {
                controller: u7::new(7),
                value: u7::new(90),
            },
        );
        let input = smf(vec![vec![
            ev(0, pc(5, 10)),
            ev(0, volume),
            ev(10, note_on(5, 60)),
            ev(10, pc(5, 11)),
            ev(0, volume),
        ]]);
        let (tracks, _) = run(&input, &RuleIndex::empty());

        assert_eq!(tracks.len(), 2);
        assert_eq!(track_name(&tracks[0]), b"Music Box");
        assert_eq!(track_name(&tracks[1]), b"Vibraphone");
        assert_eq!(tracks[0][2].kind, volume);
        assert_eq!(tracks[1][2].kind, volume);
    }

    #[test]
    fn test_bank_lsb_changes_program_lookup() {
        let lsb = midi(
            2,
            MidiMessage::Controller {
                controller: u7::new(32),
                value: u7::new(1),
            },
        );
        let input = smf(vec![vec![ev(0, lsb), ev(0, pc(2, 60)), ev(0, note_on(2, 40))]]);
        let (tracks, _) = run(&input, &rules("Kit,60,40,-999,-999,false,DRUM"));

        // Channel seeded from the prescan (60 -> 40 DRUM). The banked PC misses the
        // rule and keeps program 60, still typed DRUM by its default.
        let pcs: Vec<_> = tracks
            .iter()
            .flatten()
            .filter(|e| {
                matches!(
                    e.kind,
                    TrackEventKind::Midi {
                        message: MidiMessage::ProgramChange { .. },
                        ..
                    }
                )
            })
            .map(|e| e.kind)
            .collect();
        assert_eq!(pcs, vec![pc(9, 60)]);
    }

    #[test]
    fn test_fed_events_use_the_prescan_program() {
        // The program change comes after the first note on channel 4
        let input = smf(vec![vec![ev(0, note_on(4, 60)), ev(10, pc(4, 60))]]);
        let index = rules("Kit,60,40,-999,-999,false,DRUM");
        let config = SplitterConfig::default();
        let arena = Arena::new();
        let mut log = RunLog::new();

        let mut assembler = SequenceAssembler::new(&index, &config, &arena, &input);
        assembler.feed(0, note_on(4, 60), &mut log);
        let (channel, ctx) = assembler.active_channels().next().unwrap();
        assert_eq!(channel, 4);
        assert_eq!(ctx.active.original_program, 60);
        assert_eq!(ctx.active.remapped_program, 40);
        assert_eq!(ctx.active.channel_type, ChannelType::Drum);
    }

    #[test]
    fn test_progress_is_reported_per_interval() {
        let events: Vec<_> = (0..2000).map(|i| ev(1, note_on(0, (i % 100) as u8))).collect();
        let input = smf(vec![events]);

        let (_, log) = run(&input, &RuleIndex::empty());
        assert_eq!(progress_entries(&log), 2);
        assert!(log
            .entries()
            .iter()
            .any(|e| e.message == "  Processed 2000 of 2000 events in track 0"));

        let quiet = SplitterConfig {
            progress_interval: 0,
            ..SplitterConfig::default()
        };
        let (_, log) = run_with(&input, &RuleIndex::empty(), &quiet);
        assert_eq!(progress_entries(&log), 0);
    }
}
