//! Mutating operations on a day.
//!
//! Each operation borrows the complete current day, applies one local
//! edit, and (except for [`split_block`]) hands the result to the reflow
//! kernel with the edited block as focus. The caller's slice is never
//! touched, so a failed edit leaves the day exactly as it was.
//!
//! The caller owns serialization: two edits computed against the same
//! starting day produce incompatible results, so always pass the
//! authoritative current day.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::block::{placeholder_id, sort_canonical, validate_blocks, TimeBlock, MINUTES_PER_DAY};
use crate::config::ReflowConfig;
use crate::coverage::{coverage_report, validate_full_coverage, Gap, Overlap};
use crate::error::{ReflowError, Result};
use crate::reflow::{reflow, reflow_ordered};

/// Validated copy of `blocks` in canonical order.
fn canonical(blocks: &[TimeBlock]) -> Result<Vec<TimeBlock>> {
    validate_blocks(blocks)?;
    let mut ordered = blocks.to_vec();
    sort_canonical(&mut ordered);
    Ok(ordered)
}

fn index_of(blocks: &[TimeBlock], id: &str) -> Result<usize> {
    blocks
        .iter()
        .position(|b| b.id == id)
        .ok_or_else(|| ReflowError::BlockNotFound(id.to_string()))
}

/// Insert `new_block` at `target_minute`, displacing what follows.
///
/// A target strictly inside an unlocked block divides that block: the
/// head keeps its id, the tail gets a placeholder id (`"{id}#2"`, ...)
/// for the persistence layer to resolve, and the new block goes between
/// them. A target on a block boundary inserts before that block. The new
/// block keeps its duration; the blocks after it give up time first.
///
/// A locked `new_block` becomes an anchor starting exactly at `target_minute`.
///
/// # Errors
///
/// - [`ReflowError::LockedAnchorViolation`] if the target is inside a locked block
/// - [`ReflowError::DuplicateId`] if `new_block.id` is already in the day
/// - [`ReflowError::InvalidBlock`] if the target is outside `[0, 1440]`
/// - any reflow error, e.g. [`ReflowError::InfeasibleLayout`]
pub fn insert_at_position(
    blocks: &[TimeBlock],
    mut new_block: TimeBlock,
    target_minute: i64,
    config: &ReflowConfig,
) -> Result<Vec<TimeBlock>> {
    let mut ordered = canonical(blocks)?;
    if !(0..=MINUTES_PER_DAY).contains(&target_minute) {
        return Err(ReflowError::InvalidBlock(format!(
            "insert target {target_minute} is outside [0, {MINUTES_PER_DAY}]"
        )));
    }
    if ordered.iter().any(|b| b.id == new_block.id) {
        return Err(ReflowError::DuplicateId(new_block.id));
    }

    new_block.start_offset_minutes = if new_block.is_locked {
        target_minute
    } else {
        target_minute.min(MINUTES_PER_DAY - 1)
    };
    new_block.original_duration_minutes = None;
    new_block.validate()?;
    let focus = new_block.id.clone();

    match ordered.iter().position(|b| b.covers(target_minute)) {
        Some(i) if ordered[i].start_offset_minutes < target_minute => {
            let host = &mut ordered[i];
            if host.is_locked {
                return Err(ReflowError::LockedAnchorViolation(format!(
                    "minute {target_minute} falls inside locked block '{}'",
                    host.id
                )));
            }
            let mut tail = host.clone();
            tail.start_offset_minutes = target_minute;
            tail.duration_minutes = host.end_offset_minutes() - target_minute;
            tail.original_duration_minutes = None;
            host.duration_minutes = target_minute - host.start_offset_minutes;
            host.original_duration_minutes = None;

            ordered.insert(i + 1, new_block);
            tail.id = placeholder_id(&ordered, &tail.id);
            debug!(host = %ordered[i].id, tail = %tail.id, target_minute, "dividing host block");
            ordered.insert(i + 2, tail);
        }
        Some(i) => ordered.insert(i, new_block),
        None => {
            let rank = ordered
                .iter()
                .take_while(|b| b.start_offset_minutes < target_minute)
                .count();
            ordered.insert(rank, new_block);
        }
    }

    reflow_ordered(ordered, Some(&focus), config)
}

/// Move block `id` so it starts as near `new_start` as the day allows.
///
/// An unlocked block is re-ranked: it lands after every other block whose
/// midpoint is at or before `new_start`, and reflow then recomputes every
/// offset. The relative order of all other blocks is unchanged.
///
/// A locked block is an explicit target here: it becomes an anchor at
/// exactly `new_start`, and the unlocked blocks flow around its new
/// position.
///
/// # Errors
///
/// - [`ReflowError::BlockNotFound`] if `id` is not in the day
/// - [`ReflowError::InvalidBlock`] if `new_start` is outside the day, or a
///   moved locked block would run past midnight
/// - [`ReflowError::LockedAnchorViolation`] if a moved anchor lands on another
/// - any reflow error
pub fn move_block(
    blocks: &[TimeBlock],
    id: &str,
    new_start: i64,
    config: &ReflowConfig,
) -> Result<Vec<TimeBlock>> {
    let mut ordered = canonical(blocks)?;
    let index = index_of(&ordered, id)?;
    if !(0..MINUTES_PER_DAY).contains(&new_start) {
        return Err(ReflowError::InvalidBlock(format!(
            "'{id}': move target {new_start} is outside [0, {MINUTES_PER_DAY})"
        )));
    }

    let mut target = ordered.remove(index);
    target.start_offset_minutes = new_start;
    target.validate()?;

    let rank = ordered
        .iter()
        .take_while(|b| b.midpoint_x2() <= new_start * 2)
        .count();
    debug!(id, new_start, from = index, to = rank, locked = target.is_locked, "moving block");
    ordered.insert(rank, target);

    reflow_ordered(ordered, Some(id), config)
}

/// Set block `id` to `new_duration` minutes (never below the floor).
///
/// Growth pulls time from the blocks that follow; shrinking releases time
/// to the next block. Any stale shrink memory on the target is dropped.
///
/// # Errors
///
/// - [`ReflowError::BlockNotFound`] if `id` is not in the day
/// - [`ReflowError::InvalidBlock`] if `new_duration` is outside `(0, 1440]`,
///   or a resized locked block would run past midnight
/// - [`ReflowError::LockedAnchorViolation`] if a resized anchor reaches another
/// - [`ReflowError::InfeasibleLayout`] if the segment cannot make room
pub fn resize_block(
    blocks: &[TimeBlock],
    id: &str,
    new_duration: i64,
    config: &ReflowConfig,
) -> Result<Vec<TimeBlock>> {
    let mut ordered = canonical(blocks)?;
    let index = index_of(&ordered, id)?;
    if new_duration <= 0 {
        return Err(ReflowError::InvalidBlock(format!(
            "'{id}': duration must be positive, got {new_duration}"
        )));
    }
    if new_duration > MINUTES_PER_DAY {
        return Err(ReflowError::InvalidBlock(format!(
            "'{id}': duration {new_duration} is longer than a day"
        )));
    }

    let target = &mut ordered[index];
    target.duration_minutes = new_duration.max(config.min_duration_minutes);
    target.original_duration_minutes = None;
    target.validate()?;
    debug!(id, duration = target.duration_minutes, "resizing block");

    reflow_ordered(ordered, Some(id), config)
}

/// Split block `id` at `split_minute` into two contiguous halves.
///
/// The first half keeps `id`; the second takes `second_id` or a
/// placeholder. Titles get `(1/2)` / `(2/2)` suffixes, both halves inherit
/// the flags, and template links and shrink memory are cleared: a split
/// item is no longer a template instance. Coverage is unchanged, so no
/// reflow runs, but the result is still checked.
///
/// # Errors
///
/// - [`ReflowError::BlockNotFound`] if `id` is not in the day
/// - [`ReflowError::LockedAnchorViolation`] if the block is locked
/// - [`ReflowError::SplitOutOfRange`] unless `start < split_minute < end`
/// - [`ReflowError::DuplicateId`] if `second_id` is already taken
/// - [`ReflowError::CoverageViolation`] if the day did not tile to begin with
pub fn split_block(
    blocks: &[TimeBlock],
    id: &str,
    split_minute: i64,
    second_id: Option<&str>,
) -> Result<Vec<TimeBlock>> {
    let mut ordered = canonical(blocks)?;
    let index = index_of(&ordered, id)?;
    let target = &ordered[index];
    if target.is_locked {
        return Err(ReflowError::LockedAnchorViolation(format!(
            "cannot split locked block '{id}'"
        )));
    }
    if !target.strictly_contains(split_minute) {
        return Err(ReflowError::SplitOutOfRange {
            minute: split_minute,
            start: target.start_offset_minutes,
            end: target.end_offset_minutes(),
        });
    }

    let second_id = match second_id {
        Some(given) if ordered.iter().any(|b| b.id == given) => {
            return Err(ReflowError::DuplicateId(given.to_string()));
        }
        Some(given) => given.to_string(),
        None => placeholder_id(&ordered, id),
    };

    let mut first = target.clone();
    first.duration_minutes = split_minute - target.start_offset_minutes;
    first.title = part_title(&target.title, 1);
    first.template_id = None;
    first.original_duration_minutes = None;

    let mut second = first.clone();
    second.id = second_id;
    second.start_offset_minutes = split_minute;
    second.duration_minutes = target.end_offset_minutes() - split_minute;
    second.title = part_title(&target.title, 2);

    debug!(id, split_minute, second = %second.id, "splitting block");
    ordered[index] = first;
    ordered.insert(index + 1, second);

    if !validate_full_coverage(&ordered)? {
        return Err(ReflowError::CoverageViolation(
            "day does not tile after split".to_string(),
        ));
    }
    Ok(ordered)
}

fn part_title(title: &str, part: u8) -> String {
    if title.is_empty() {
        format!("({part}/2)")
    } else {
        format!("{title} ({part}/2)")
    }
}

/// Remove block `id`; the rest of its segment closes over the hole.
///
/// # Errors
///
/// - [`ReflowError::BlockNotFound`] if `id` is not in the day
/// - [`ReflowError::UnfillableGap`] if it was the only unlocked block between anchors
pub fn delete_block(blocks: &[TimeBlock], id: &str, config: &ReflowConfig) -> Result<Vec<TimeBlock>> {
    let mut ordered = canonical(blocks)?;
    let index = index_of(&ordered, id)?;
    let removed = ordered.remove(index);
    debug!(id, locked = removed.is_locked, "deleting block");
    reflow_ordered(ordered, None, config)
}

/// Result of [`manual_reflow`]: the corrected day plus what was wrong with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualReflow {
    pub blocks: Vec<TimeBlock>,
    pub gaps_before: Vec<Gap>,
    pub overlaps_before: Vec<Overlap>,
}

/// Reflow on demand, e.g. after a bulk import left gaps or overlaps.
///
/// # Errors
///
/// Any error [`reflow`] can return.
pub fn manual_reflow(blocks: &[TimeBlock], config: &ReflowConfig) -> Result<ManualReflow> {
    let report = coverage_report(blocks)?;
    let corrected = reflow(blocks, config)?;
    Ok(ManualReflow {
        blocks: corrected,
        gaps_before: report.gaps,
        overlaps_before: report.overlaps,
    })
}

/// One edit, as a serializable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    Insert {
        block: TimeBlock,
        at: i64,
    },
    Move {
        id: String,
        to: i64,
    },
    Resize {
        id: String,
        duration: i64,
    },
    Split {
        id: String,
        at: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_id: Option<String>,
    },
    Delete {
        id: String,
    },
    Reflow,
}

impl Edit {
    pub fn apply(&self, blocks: &[TimeBlock], config: &ReflowConfig) -> Result<Vec<TimeBlock>> {
        match self {
            Edit::Insert { block, at } => insert_at_position(blocks, block.clone(), *at, config),
            Edit::Move { id, to } => move_block(blocks, id, *to, config),
            Edit::Resize { id, duration } => resize_block(blocks, id, *duration, config),
            Edit::Split { id, at, new_id } => split_block(blocks, id, *at, new_id.as_deref()),
            Edit::Delete { id } => delete_block(blocks, id, config),
            Edit::Reflow => reflow(blocks, config),
        }
    }
}

/// Apply `edits` in order, all or nothing.
///
/// # Errors
///
/// The first failing edit's error; none of the edits take effect.
pub fn apply_edits(
    blocks: &[TimeBlock],
    edits: &[Edit],
    config: &ReflowConfig,
) -> Result<Vec<TimeBlock>> {
    edits
        .iter()
        .enumerate()
        .try_fold(blocks.to_vec(), |day, (n, edit)| {
            edit.apply(&day, config).inspect_err(|e| {
                debug!(edit = n, error = %e, "edit batch rejected");
            })
        })
}
