use stemsplit_rules::RuleIndex;

use crate::config::SplitterConfig;
use crate::context::{resolve_program, ChannelContext};
use crate::multiplexer::TrackKey;
use crate::pool::{route_channel, MelodicChannelPool};
use crate::runlog::RunLog;

/// Result of handling one program change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramChangeOutcome {
    /// Program number to emit
    pub program: u8,
    /// Channel to emit on, the one the segment's notes are routed to
    pub channel: u8,
    /// Whether the emitted program differs from the input one
    pub rewritten: bool,
    pub new_segment: bool,
    pub key: TrackKey,
}

/// Resolve a program change against the rules and advance the channel's segment.
///
/// A new segment starts when the resolved context differs field-wise from the
/// active one. The event is routed like a note of the segment's type, so a
/// DRUM program lands beside the drum notes it selects.
#[allow(clippy::too_many_arguments)]
pub fn handle_program_change(
    ctx: &mut ChannelContext,
    channel: u8,
    program: u8,
    tick: u64,
    pool: &mut MelodicChannelPool,
    rules: &RuleIndex,
    config: &SplitterConfig,
    log: &mut RunLog,
) -> ProgramChangeOutcome {
    let key = ctx.lookup_key(program);
    let resolved = resolve_program(key, program, channel, rules, config, log);

    let new_segment = resolved != ctx.active;
    if new_segment {
        ctx.segment += 1;
        ctx.active = resolved;
        log.info(format!(
            "PC at tick {} on Ch {} starts segment {}.",
            tick,
            channel + 1,
            ctx.segment
        ));
    }
    log.detail(format_args!(
        "PC: original P{} (key {}), remapped P{}, type {} at tick {}",
        program, key, resolved.remapped_program, resolved.channel_type, tick
    ));

    let out_channel = route_channel(channel, resolved.channel_type, ctx, pool, config, log);
    let rewritten = resolved.remapped_program != program;
    if rewritten {
        log.info(format!(
            "Program change remapped: {} -> {} at tick {}",
            program, resolved.remapped_program, tick
        ));
    }

    ProgramChangeOutcome {
        program: resolved.remapped_program,
        channel: out_channel,
        rewritten,
        new_segment,
        key: TrackKey::Content {
            remapped_program: resolved.remapped_program,
            channel: out_channel,
            channel_type: resolved.channel_type,
            segment: ctx.segment,
        },
    }
}
