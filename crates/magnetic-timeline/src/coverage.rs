//! Coverage validation and diagnostics.
//!
//! Nothing here mutates or repairs a sequence. [`validate_full_coverage`]
//! answers "is this a legal day", [`find_gaps`] and [`find_overlaps`] say
//! where it is not. Malformed blocks fail fast with
//! [`ReflowError::InvalidBlock`](crate::error::ReflowError::InvalidBlock)
//! instead of being quietly skipped.

use serde::Serialize;

use crate::block::{TimeBlock, MINUTES_PER_DAY};
use crate::error::Result;

/// An uncovered interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Gap {
    pub start: i64,
    pub end: i64,
}

impl Gap {
    pub fn duration_minutes(&self) -> i64 {
        self.end - self.start
    }
}

/// Two blocks claiming the same interval `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overlap {
    pub first: String,
    pub second: String,
    pub start: i64,
    pub end: i64,
}

/// Everything wrong with a sequence's coverage, in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    pub gaps: Vec<Gap>,
    pub overlaps: Vec<Overlap>,
    /// Minutes scheduled past the end of the day.
    pub overrun_minutes: i64,
}

impl CoverageReport {
    pub fn is_valid(&self) -> bool {
        self.gaps.is_empty() && self.overlaps.is_empty() && self.overrun_minutes == 0
    }
}

fn checked_spans(blocks: &[TimeBlock]) -> Result<Vec<(i64, i64)>> {
    let mut spans = Vec::with_capacity(blocks.len());
    for block in blocks {
        block.validate()?;
        spans.push((block.start_offset_minutes, block.end_offset_minutes()));
    }
    spans.sort_unstable();
    Ok(spans)
}

/// Whether `blocks` tile `[0, 1440)` exactly, with no gap and no overlap.
///
/// An empty sequence covers nothing and is reported as `false`.
///
/// # Errors
///
/// Returns [`ReflowError::InvalidBlock`](crate::error::ReflowError::InvalidBlock)
/// for any malformed block.
pub fn validate_full_coverage(blocks: &[TimeBlock]) -> Result<bool> {
    let spans = checked_spans(blocks)?;
    let (Some(first), Some(last)) = (spans.first(), spans.last()) else {
        return Ok(false);
    };
    let contiguous = spans.windows(2).all(|pair| pair[0].1 == pair[1].0);
    Ok(first.0 == 0 && last.1 == MINUTES_PER_DAY && contiguous)
}

/// Lazily enumerate the uncovered intervals of a day.
///
/// # Errors
///
/// Returns [`ReflowError::InvalidBlock`](crate::error::ReflowError::InvalidBlock)
/// for any malformed block.
pub fn find_gaps(blocks: &[TimeBlock]) -> Result<Gaps> {
    Ok(Gaps::new(checked_spans(blocks)?))
}

/// Iterator over the gaps of a day, including the boundary gaps at
/// midnight and at day end.
///
/// The spans are sorted once up front; gaps are produced on demand. The
/// iterator is finite, and [`Gaps::restart`] (or a clone taken earlier)
/// replays it from the beginning.
#[derive(Debug, Clone)]
pub struct Gaps {
    spans: Vec<(i64, i64)>,
    next: usize,
    cursor: i64,
    finished: bool,
}

impl Gaps {
    fn new(spans: Vec<(i64, i64)>) -> Self {
        Self {
            spans,
            next: 0,
            cursor: 0,
            finished: false,
        }
    }

    pub fn restart(&mut self) {
        self.next = 0;
        self.cursor = 0;
        self.finished = false;
    }
}

impl Iterator for Gaps {
    type Item = Gap;

    fn next(&mut self) -> Option<Gap> {
        while let Some(&(start, end)) = self.spans.get(self.next) {
            self.next += 1;
            let gap = (start > self.cursor).then_some(Gap {
                start: self.cursor,
                end: start,
            });
            // Overlapping spans may end before the cursor; never move it back.
            self.cursor = self.cursor.max(end);
            if gap.is_some() {
                return gap;
            }
        }
        if self.finished {
            return None;
        }
        self.finished = true;
        (self.cursor < MINUTES_PER_DAY).then_some(Gap {
            start: self.cursor,
            end: MINUTES_PER_DAY,
        })
    }
}

/// Every pairwise overlap, ordered by the earlier block's start.
///
/// # Errors
///
/// Returns [`ReflowError::InvalidBlock`](crate::error::ReflowError::InvalidBlock)
/// for any malformed block.
pub fn find_overlaps(blocks: &[TimeBlock]) -> Result<Vec<Overlap>> {
    for block in blocks {
        block.validate()?;
    }
    let mut sorted: Vec<&TimeBlock> = blocks.iter().collect();
    sorted.sort_by(|a, b| {
        a.start_offset_minutes
            .cmp(&b.start_offset_minutes)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut overlaps = Vec::new();
    for (i, a) in sorted.iter().enumerate() {
        for b in sorted[i + 1..]
            .iter()
            .take_while(|b| b.start_offset_minutes < a.end_offset_minutes())
        {
            overlaps.push(Overlap {
                first: a.id.clone(),
                second: b.id.clone(),
                start: b.start_offset_minutes,
                end: a.end_offset_minutes().min(b.end_offset_minutes()),
            });
        }
    }
    Ok(overlaps)
}

/// Gaps, overlaps and day-end overrun of `blocks`.
///
/// # Errors
///
/// Returns [`ReflowError::InvalidBlock`](crate::error::ReflowError::InvalidBlock)
/// for any malformed block.
pub fn coverage_report(blocks: &[TimeBlock]) -> Result<CoverageReport> {
    let gaps = find_gaps(blocks)?.collect();
    let overlaps = find_overlaps(blocks)?;
    let overrun_minutes = blocks
        .iter()
        .map(|b| (b.end_offset_minutes() - MINUTES_PER_DAY).max(0))
        .max()
        .unwrap_or(0);
    Ok(CoverageReport {
        gaps,
        overlaps,
        overrun_minutes,
    })
}
