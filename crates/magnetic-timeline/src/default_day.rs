//! Seed sequences for a new day.

use tracing::debug;

use crate::block::{TimeBlock, MINUTES_PER_DAY};
use crate::config::ReflowConfig;
use crate::error::Result;
use crate::reflow::reflow;

/// Title of the block a default day starts with.
pub const DEFAULT_DAY_TITLE: &str = "Unplanned";

/// A single unlocked, flexible block spanning the whole day.
///
/// ```
/// use magnetic_timeline::{create_default_day, validate_full_coverage};
///
/// let day = create_default_day("2026-10-18");
/// assert!(validate_full_coverage(&day).unwrap());
/// ```
pub fn create_default_day(id: impl Into<String>) -> Vec<TimeBlock> {
    vec![TimeBlock::new(id, 0, MINUTES_PER_DAY).with_title(DEFAULT_DAY_TITLE)]
}

/// Turn a caller-supplied template (e.g. a locked "Sleep" block and a
/// flexible "Morning Routine") into a complete day.
///
/// The template need not tile the day; it is reflowed, so unlocked blocks
/// stretch to fill whatever the template leaves uncovered.
///
/// # Errors
///
/// Any error [`reflow`] can return, notably
/// [`ReflowError::UnfillableGap`](crate::error::ReflowError::UnfillableGap)
/// when a stretch of the day has no unlocked block to fill it.
pub fn seed_from_template(template: &[TimeBlock], config: &ReflowConfig) -> Result<Vec<TimeBlock>> {
    debug!(blocks = template.len(), "seeding day from template");
    reflow(template, config)
}
