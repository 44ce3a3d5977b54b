use midly::num::u28;
use midly::{MetaMessage, TrackEvent, TrackEventKind};
use serde::Serialize;
use std::collections::HashMap;
use stemsplit_rules::ChannelType;

use crate::gm::{track_name, GLOBAL_TRACK_NAME};
use crate::runlog::RunLog;

/// Largest delta time a track event can carry (28 bits)
const MAX_DELTA: u32 = 0x0FFF_FFFF;

/// Grouping key for output tracks. Equal keys always share a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TrackKey {
    /// Channel-independent meta and system-exclusive events
    Global,
    Content {
        remapped_program: u8,
        channel: u8,
        channel_type: ChannelType,
        segment: u32,
    },
}

/// An event at an absolute tick
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEvent<'a> {
    pub tick: u64,
    pub kind: TrackEventKind<'a>,
}

#[derive(Debug, Clone)]
pub struct OutputTrack<'a> {
    pub key: TrackKey,
    pub name: &'static str,
    events: Vec<TimedEvent<'a>>,
}

impl<'a> OutputTrack<'a> {
    fn new(key: TrackKey, name: &'static str) -> Self {
        let events = vec![TimedEvent {
            tick: 0,
            kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
        }];
        Self { key, name, events }
    }

    pub fn push(&mut self, tick: u64, kind: TrackEventKind<'a>) {
        self.events.push(TimedEvent { tick, kind });
    }

    /// Events in insertion order, the name event first
    pub fn events(&self) -> &[TimedEvent<'a>] {
        &self.events
    }

    /// Convert to a delta-timed track, ordered by tick and closed with an
    /// end-of-track one tick after the last event
    fn into_track(mut self, log: &mut RunLog) -> Vec<TrackEvent<'a>> {
        // Stable: events at one tick keep their insertion order
        self.events.sort_by_key(|e| e.tick);
        let end_tick = self.events.last().map_or(0, |e| e.tick) + 1;
        self.events.push(TimedEvent {
            tick: end_tick,
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });

        let max_delta = u64::from(MAX_DELTA);
        let mut last_tick = 0u64;
        let mut track = Vec::with_capacity(self.events.len());
        for event in self.events {
            let mut delta = event.tick - last_tick;
            if delta > max_delta {
                log.error(format!(
                    "Gap of {} ticks before tick {} in track '{}' exceeds the MIDI delta limit. Clamped.",
                    delta, event.tick, self.name
                ));
                delta = max_delta;
            }
            track.push(TrackEvent {
                delta: u28::new(delta as u32),
                kind: event.kind,
            });
            last_tick = event.tick;
        }
        track
    }
}

/// Output tracks of one run, created lazily per [`TrackKey`] and kept in
/// creation order
#[derive(Debug, Clone)]
pub struct TrackMultiplexer<'a> {
    drum_channel: u8,
    tracks: Vec<OutputTrack<'a>>,
    by_key: HashMap<TrackKey, usize>,
}

impl<'a> TrackMultiplexer<'a> {
    pub fn new(drum_channel: u8) -> Self {
        Self {
            drum_channel,
            tracks: Vec::new(),
            by_key: HashMap::new(),
        }
    }

    /// Track for `key`, created and named on first use
    pub fn get_or_create(&mut self, key: TrackKey, log: &mut RunLog) -> &mut OutputTrack<'a> {
        let idx = match self.by_key.get(&key) {
            Some(&idx) => idx,
            None => {
                let name = match key {
                    TrackKey::Global => GLOBAL_TRACK_NAME,
                    TrackKey::Content {
                        remapped_program,
                        channel,
                        ..
                    } => track_name(remapped_program, channel == self.drum_channel),
                };
                log.info(format!("Creating new track for {} ({})", name, describe(&key)));
                self.tracks.push(OutputTrack::new(key, name));
                self.by_key.insert(key, self.tracks.len() - 1);
                self.tracks.len() - 1
            }
        };
        &mut self.tracks[idx]
    }

    /// Position of the track for `key` in output order
    pub fn position(&self, key: &TrackKey) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    pub fn tracks(&self) -> &[OutputTrack<'a>] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Finalize every track in creation order
    pub fn finish(self, log: &mut RunLog) -> Vec<Vec<TrackEvent<'a>>> {
        self.tracks
            .into_iter()
            .map(|track| track.into_track(log))
            .collect()
    }
}

fn describe(key: &TrackKey) -> String {
    match key {
        TrackKey::Global => "global".to_string(),
        TrackKey::Content {
            remapped_program,
            channel,
            channel_type,
            segment,
        } => format!(
            "P{}, Ch {}, {}, segment {}",
            remapped_program,
            channel + 1,
            channel_type,
            segment
        ),
    }
}
