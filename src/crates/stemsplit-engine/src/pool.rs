use std::collections::{BTreeSet, HashMap};
use stemsplit_rules::ChannelType;

use crate::config::SplitterConfig;
use crate::context::ChannelContext;
use crate::runlog::RunLog;

/// What a redirected channel is being claimed for.
///
/// Every event of the same stream asks with the same purpose, so a note-off
/// lands on the channel its note-on was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolPurpose {
    /// Melodic content moved off the drum channel
    Redirect {
        source: u8,
        segment: u32,
        remapped_program: u8,
    },
    /// Melodic layer generated from drum-channel content
    Layer {
        source: u8,
        segment: u32,
        remapped_program: u8,
        offset: i32,
    },
}

/// Channels claimed for melodic content during one run.
///
/// Allocation is first-fit in ascending order, skipping the drum channel.
/// Claims are never released.
#[derive(Debug, Clone)]
pub struct MelodicChannelPool {
    drum_channel: u8,
    max_channel: u8,
    claimed: BTreeSet<u8>,
    assignments: HashMap<PoolPurpose, u8>,
}

impl MelodicChannelPool {
    pub fn new(drum_channel: u8, max_channel: u8) -> Self {
        Self {
            drum_channel,
            max_channel,
            claimed: BTreeSet::new(),
            assignments: HashMap::new(),
        }
    }

    /// Mark a channel as in use by the content already playing on it
    pub fn claim(&mut self, channel: u8) {
        self.claimed.insert(channel);
    }

    /// Channel for `purpose`, allocating one on first request.
    ///
    /// Returns `None` when every melodic channel is already claimed.
    pub fn allocate(&mut self, purpose: PoolPurpose) -> Option<u8> {
        if let Some(&channel) = self.assignments.get(&purpose) {
            return Some(channel);
        }
        let channel = (0..=self.max_channel)
            .filter(|&ch| ch != self.drum_channel)
            .find(|ch| !self.claimed.contains(ch))?;
        self.claimed.insert(channel);
        self.assignments.insert(purpose, channel);
        Some(channel)
    }

    pub fn is_claimed(&self, channel: u8) -> bool {
        self.claimed.contains(&channel)
    }

    /// Claimed channels in ascending order
    pub fn claimed(&self) -> impl Iterator<Item = u8> + '_ {
        self.claimed.iter().copied()
    }
}

/// Output channel for content of `channel_type` played on `channel` under `ctx`.
///
/// DRUM content goes to the drum channel. MELODIC content stays where it is
/// unless it sits on the drum channel, in which case it is moved to a pool
/// channel, or kept in place with a warning once the pool is exhausted.
pub fn route_channel(
    channel: u8,
    channel_type: ChannelType,
    ctx: &ChannelContext,
    pool: &mut MelodicChannelPool,
    config: &SplitterConfig,
    log: &mut RunLog,
) -> u8 {
    if channel_type == ChannelType::Drum {
        return config.drum_channel;
    }
    if !config.is_drum_channel(channel) {
        pool.claim(channel);
        return channel;
    }
    let purpose = PoolPurpose::Redirect {
        source: channel,
        segment: ctx.segment,
        remapped_program: ctx.active.remapped_program,
    };
    match pool.allocate(purpose) {
        Some(ch) => {
            log.detail(format_args!(
                "MELODIC content rechanneled from Ch {} to Ch {}",
                channel + 1,
                ch + 1
            ));
            ch
        }
        None => {
            log.warn(format!(
                "Content is MELODIC, but no available melodic channel found. Keeping on original Ch {}.",
                channel + 1
            ));
            pool.claim(channel);
            channel
        }
    }
}
