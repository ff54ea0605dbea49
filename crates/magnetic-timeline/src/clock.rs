//! Minute/clock conversion and caller-driven "now" handling.
//!
//! The engine never reads the system clock. A caller-owned timer passes the
//! current local time to [`advance`], the same way every other input
//! reaches the engine: as an explicit argument.

use chrono::{NaiveTime, Timelike};
use tracing::debug;

use crate::block::{sort_canonical, validate_blocks, TimeBlock, MINUTES_PER_DAY};
use crate::error::Result;

/// Whole minutes since midnight for a wall-clock time.
pub fn minute_of_day(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight() / 60)
}

/// The wall-clock time at `minute`, or `None` outside `[0, 1440)`.
pub fn time_of_minute(minute: i64) -> Option<NaiveTime> {
    let seconds = u32::try_from(minute).ok()?.checked_mul(60)?;
    if minute >= MINUTES_PER_DAY {
        return None;
    }
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
}

/// `HH:MM` for a day offset; the day-end boundary renders as `24:00`.
pub fn format_minute(minute: i64) -> String {
    match time_of_minute(minute) {
        Some(time) => time.format("%H:%M").to_string(),
        None if minute == MINUTES_PER_DAY => "24:00".to_string(),
        None => format!("{minute}m"),
    }
}

/// Freeze the elapsed part of the day.
///
/// Every block that has ended by `now` becomes locked and rigid and
/// forgets any shrink memory, so later reflows cannot rewrite history.
/// Offsets and durations never change, so coverage is preserved.
///
/// # Errors
///
/// [`ReflowError::InvalidBlock`](crate::error::ReflowError::InvalidBlock) or
/// [`ReflowError::DuplicateId`](crate::error::ReflowError::DuplicateId) for
/// malformed input.
pub fn advance(blocks: &[TimeBlock], now: NaiveTime) -> Result<Vec<TimeBlock>> {
    validate_blocks(blocks)?;
    let now = minute_of_day(now);
    let mut day = blocks.to_vec();
    sort_canonical(&mut day);

    let mut frozen = 0;
    for block in day
        .iter_mut()
        .filter(|b| b.end_offset_minutes() <= now && !b.is_locked)
    {
        block.is_locked = true;
        block.is_flexible = false;
        block.original_duration_minutes = None;
        frozen += 1;
    }
    debug!(now, frozen, "advanced day");
    Ok(day)
}

/// The block in progress at `now`.
pub fn current_block(blocks: &[TimeBlock], now: NaiveTime) -> Option<&TimeBlock> {
    let now = minute_of_day(now);
    blocks.iter().find(|b| b.covers(now))
}
