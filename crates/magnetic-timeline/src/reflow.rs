//! The reflow kernel.
//!
//! Given the blocks of a day in roughly the right places, [`reflow`]
//! produces the legal day they describe. Locked blocks are anchors that
//! partition the day into segments. Inside each segment the unlocked
//! blocks are laid out back to back in their existing order, then
//! stretched or squeezed until the segment is exactly full:
//!
//! - **Too little time**: blocks marked `is_flexible` shrink
//!   proportionally, never below the configured floor. Each shrunk block
//!   remembers its previous duration in `original_duration_minutes`.
//! - **Too much time**: previously shrunk blocks are restored first, and
//!   whatever is left is absorbed by growing one block. This is the
//!   "magnetic" pull that closes the hole left by a delete or a shrink.
//!
//! Edits run the same kernel with a *focus* (the block the user touched).
//! The focus keeps its duration. Time is taken from the blocks after it
//! first, and released time goes to the block right after it. This is why
//! growing a block pushes into its successor rather than its predecessor.
//!
//! A reflow that cannot succeed fails as a whole. It never drops blocks,
//! overlaps them, or pushes through an anchor.

use tracing::{debug, trace};

use crate::block::{sort_canonical, validate_blocks, TimeBlock, MINUTES_PER_DAY};
use crate::config::ReflowConfig;
use crate::coverage::validate_full_coverage;
use crate::error::{ReflowError, Result};

/// Recompute every unlocked block's position and duration so the day is
/// gapless and overlap-free around its locked anchors.
///
/// The result is an idempotent projection: reflowing a reflowed day
/// returns it unchanged.
///
/// # Errors
///
/// - [`ReflowError::InvalidBlock`] / [`ReflowError::DuplicateId`] for malformed input
/// - [`ReflowError::LockedAnchorViolation`] if two anchors overlap
/// - [`ReflowError::InfeasibleLayout`] if a segment cannot fit its blocks at the floor
/// - [`ReflowError::UnfillableGap`] if a segment has time but no unlocked block
///
/// # Examples
///
/// ```
/// use magnetic_timeline::{reflow, ReflowConfig, TimeBlock};
///
/// let blocks = vec![
///     TimeBlock::new("a", 0, 60),
///     TimeBlock::new("b", 100, 60),
///     TimeBlock::new("lunch", 720, 60).locked(),
///     TimeBlock::new("c", 780, 660),
/// ];
/// let day = reflow(&blocks, &ReflowConfig::default()).unwrap();
/// // "b" slides up against "a" and grows until it meets lunch.
/// assert_eq!((day[1].start_offset_minutes, day[1].duration_minutes), (60, 660));
/// assert_eq!(day[2].start_offset_minutes, 720);
/// ```
pub fn reflow(blocks: &[TimeBlock], config: &ReflowConfig) -> Result<Vec<TimeBlock>> {
    let mut ordered = blocks.to_vec();
    sort_canonical(&mut ordered);
    reflow_ordered(ordered, None, config)
}

/// Reflow blocks that are already in their intended logical order.
///
/// Edits build the order themselves (a moved block has been re-ranked, an
/// inserted one placed) and pass the edited block as `focus`.
pub(crate) fn reflow_ordered(
    ordered: Vec<TimeBlock>,
    focus: Option<&str>,
    config: &ReflowConfig,
) -> Result<Vec<TimeBlock>> {
    config.validate()?;
    validate_blocks(&ordered)?;
    check_anchors(&ordered)?;

    debug!(
        blocks = ordered.len(),
        anchors = ordered.iter().filter(|b| b.is_locked).count(),
        focus = focus.unwrap_or("-"),
        "reflowing day"
    );

    let mut out = Vec::with_capacity(ordered.len());
    let mut members = Vec::new();
    let mut segment_start = 0;
    for block in ordered {
        if block.is_locked {
            let segment_end = block.start_offset_minutes;
            out.extend(layout_segment(
                segment_start,
                segment_end,
                std::mem::take(&mut members),
                focus,
                config,
            )?);
            segment_start = block.end_offset_minutes();
            out.push(block);
        } else {
            members.push(block);
        }
    }
    out.extend(layout_segment(
        segment_start,
        MINUTES_PER_DAY,
        members,
        focus,
        config,
    )?);

    if !validate_full_coverage(&out)? {
        return Err(ReflowError::CoverageViolation(
            "reflow produced a sequence that does not tile the day".to_string(),
        ));
    }
    Ok(out)
}

/// Anchors must appear in start order and must not overlap one another.
fn check_anchors(ordered: &[TimeBlock]) -> Result<()> {
    let mut previous: Option<&TimeBlock> = None;
    for anchor in ordered.iter().filter(|b| b.is_locked) {
        if let Some(prev) = previous {
            if anchor.start_offset_minutes < prev.end_offset_minutes() {
                debug!(first = %prev.id, second = %anchor.id, "anchors collide");
                return Err(ReflowError::LockedAnchorViolation(format!(
                    "locked blocks '{}' and '{}' overlap",
                    prev.id, anchor.id
                )));
            }
        }
        previous = Some(anchor);
    }
    Ok(())
}

/// Lay out the unlocked `members` of `[start, end)` so they fill it exactly.
fn layout_segment(
    start: i64,
    end: i64,
    mut members: Vec<TimeBlock>,
    focus: Option<&str>,
    config: &ReflowConfig,
) -> Result<Vec<TimeBlock>> {
    let span = end - start;
    if members.is_empty() {
        if span > 0 {
            debug!(start, end, "segment has no unlocked block");
            return Err(ReflowError::UnfillableGap { start, end });
        }
        return Ok(members);
    }

    let focus_index = focus.and_then(|id| members.iter().position(|b| b.id == id));
    let total: i64 = members.iter().map(|b| b.duration_minutes).sum();
    trace!(start, end, total, blocks = members.len(), "laying out segment");

    if total < span {
        absorb(&mut members, span - total, focus_index);
    } else if total > span {
        shrink(&mut members, total - span, focus_index, config).map_err(|capacity| {
            debug!(start, end, total, capacity, "segment is infeasible");
            ReflowError::InfeasibleLayout {
                start,
                end,
                required: total - capacity,
                available: span,
            }
        })?;
    }

    let mut cursor = start;
    for block in &mut members {
        block.start_offset_minutes = cursor;
        cursor += block.duration_minutes;
    }
    Ok(members)
}

/// Member indices ordered outward from the focus: the blocks after it
/// (nearest first), then the blocks before it (nearest first). Without a
/// focus, plain segment order.
fn outward_order(len: usize, focus: Option<usize>) -> Vec<usize> {
    match focus {
        Some(f) => (f + 1..len).chain((0..f).rev()).collect(),
        None => (0..len).collect(),
    }
}

/// Hand `extra` minutes to the segment: restore shrunk blocks first, then
/// grow one block with the rest.
fn absorb(members: &mut [TimeBlock], mut extra: i64, focus: Option<usize>) {
    let order = outward_order(members.len(), focus);

    for &i in &order {
        if extra == 0 {
            break;
        }
        let block = &mut members[i];
        if let Some(original) = block.original_duration_minutes {
            let give = (original - block.duration_minutes).clamp(0, extra);
            block.duration_minutes += give;
            extra -= give;
            if block.duration_minutes >= original {
                block.original_duration_minutes = None;
            }
        }
    }

    if extra > 0 {
        let absorber = match focus {
            Some(f) => order.first().copied().unwrap_or(f),
            None => members.len() - 1,
        };
        let block = &mut members[absorber];
        trace!(id = %block.id, extra, "absorbing released time");
        block.duration_minutes += extra;
        if block
            .original_duration_minutes
            .is_some_and(|original| block.duration_minutes >= original)
        {
            block.original_duration_minutes = None;
        }
    }
}

/// Remove `needed` minutes from the shrinkable members.
///
/// With a focus the blocks after it give first and the blocks before it
/// only make up the remainder. On failure returns the total the segment
/// could have given up.
fn shrink(
    members: &mut [TimeBlock],
    needed: i64,
    focus: Option<usize>,
    config: &ReflowConfig,
) -> std::result::Result<(), i64> {
    let floor = config.min_duration_minutes;
    let slack = |block: &TimeBlock| (block.duration_minutes - floor).max(0);

    let eligible: Vec<usize> = outward_order(members.len(), focus)
        .into_iter()
        .filter(|&i| members[i].is_flexible)
        .collect();
    let capacity: i64 = eligible.iter().map(|&i| slack(&members[i])).sum();
    if capacity < needed {
        return Err(capacity);
    }

    let tiers: Vec<Vec<usize>> = match focus {
        Some(f) => {
            let (after, before): (Vec<usize>, Vec<usize>) =
                eligible.into_iter().partition(|&i| i > f);
            vec![after, before]
        }
        None => vec![eligible],
    };

    let before: Vec<i64> = members.iter().map(|b| b.duration_minutes).collect();
    let mut remaining = needed;
    for tier in &tiers {
        let take = remaining.min(tier.iter().map(|&i| slack(&members[i])).sum());
        shrink_proportionally(members, tier, take, floor);
        remaining -= take;
    }

    for (block, previous) in members.iter_mut().zip(before) {
        if block.duration_minutes < previous && block.original_duration_minutes.is_none() {
            block.original_duration_minutes = Some(previous);
        }
    }
    Ok(())
}

/// Integer water-filling: cut `needed` minutes from `tier`, each block in
/// proportion to its current duration and never below `floor`. The caller
/// guarantees the tier has at least `needed` minutes of slack.
fn shrink_proportionally(members: &mut [TimeBlock], tier: &[usize], mut needed: i64, floor: i64) {
    while needed > 0 {
        let active: Vec<usize> = tier
            .iter()
            .copied()
            .filter(|&i| members[i].duration_minutes > floor)
            .collect();
        if active.is_empty() {
            return;
        }
        let weight: i64 = active.iter().map(|&i| members[i].duration_minutes).sum();

        let mut cut_total = 0;
        for &i in &active {
            let block = &mut members[i];
            let cut = (needed * block.duration_minutes / weight).min(block.duration_minutes - floor);
            block.duration_minutes -= cut;
            cut_total += cut;
        }
        if cut_total == 0 {
            // Every share rounded down to zero: take single minutes from
            // the far end of the tier.
            for &i in active.iter().rev() {
                if cut_total == needed {
                    break;
                }
                members[i].duration_minutes -= 1;
                cut_total += 1;
            }
        }
        needed -= cut_total;
    }
}
