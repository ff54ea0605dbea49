//! The time block value type.
//!
//! A [`TimeBlock`] is one contiguous span of a single day, measured in
//! minutes since local midnight. The engine interprets only the scheduling
//! fields; `title`, `template_id` and `metadata` are caller payload that
//! rides along untouched (except that [`split_block`](crate::edit::split_block)
//! suffixes titles and clears template links).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ReflowError, Result};

/// Length of a day in minutes. Every valid day sequence covers `[0, MINUTES_PER_DAY)`.
pub const MINUTES_PER_DAY: i64 = 1440;

fn default_true() -> bool {
    true
}

/// One contiguous span of a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBlock {
    /// Caller-assigned identity, opaque to the engine.
    pub id: String,
    /// Minutes since local midnight.
    pub start_offset_minutes: i64,
    /// Length of the block; always positive in a valid block.
    pub duration_minutes: i64,
    /// Locked blocks are anchors: reflow never moves or resizes them.
    #[serde(default)]
    pub is_locked: bool,
    /// Whether reflow may implicitly shrink this block to resolve a collision.
    #[serde(default = "default_true")]
    pub is_flexible: bool,
    /// Duration before the most recent automatic shrink, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_duration_minutes: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    /// Arbitrary caller data (color, category, ...). Never read by the engine.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl TimeBlock {
    /// An unlocked, flexible block with no payload.
    pub fn new(id: impl Into<String>, start_offset_minutes: i64, duration_minutes: i64) -> Self {
        Self {
            id: id.into(),
            start_offset_minutes,
            duration_minutes,
            is_locked: false,
            is_flexible: true,
            original_duration_minutes: None,
            title: String::new(),
            template_id: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_template(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = Some(template_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Mark the block as a fixed anchor.
    pub fn locked(mut self) -> Self {
        self.is_locked = true;
        self
    }

    /// Forbid implicit shrinking. The block may still slide.
    pub fn rigid(mut self) -> Self {
        self.is_flexible = false;
        self
    }

    /// Exclusive end of the block. Saturates on unvalidated input.
    pub fn end_offset_minutes(&self) -> i64 {
        self.start_offset_minutes.saturating_add(self.duration_minutes)
    }

    /// Whether `minute` falls in the half-open span `[start, end)`.
    pub fn covers(&self, minute: i64) -> bool {
        self.start_offset_minutes <= minute && minute < self.end_offset_minutes()
    }

    /// Whether `minute` is strictly between start and end.
    pub fn strictly_contains(&self, minute: i64) -> bool {
        self.start_offset_minutes < minute && minute < self.end_offset_minutes()
    }

    /// Twice the midpoint, so ranking stays in integer arithmetic.
    pub(crate) fn midpoint_x2(&self) -> i64 {
        self.start_offset_minutes * 2 + self.duration_minutes
    }

    /// Check the block on its own, independent of any day sequence.
    ///
    /// # Errors
    ///
    /// Returns [`ReflowError::InvalidBlock`] for an empty id, a duration or
    /// shrink memory outside `(0, 1440]`, a start outside `[0, 1440)`, or a
    /// locked block that runs past the end of the day.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(ReflowError::InvalidBlock("block id is empty".to_string()));
        }
        if self.duration_minutes <= 0 {
            return Err(ReflowError::InvalidBlock(format!(
                "'{}': duration must be positive, got {}",
                self.id, self.duration_minutes
            )));
        }
        if self.duration_minutes > MINUTES_PER_DAY {
            return Err(ReflowError::InvalidBlock(format!(
                "'{}': duration {} is longer than a day",
                self.id, self.duration_minutes
            )));
        }
        if !(0..MINUTES_PER_DAY).contains(&self.start_offset_minutes) {
            return Err(ReflowError::InvalidBlock(format!(
                "'{}': start {} is outside [0, {MINUTES_PER_DAY})",
                self.id, self.start_offset_minutes
            )));
        }
        if let Some(original) = self.original_duration_minutes {
            if original <= 0 || original > MINUTES_PER_DAY {
                return Err(ReflowError::InvalidBlock(format!(
                    "'{}': original duration must be in (0, {MINUTES_PER_DAY}], got {original}",
                    self.id
                )));
            }
        }
        if self.is_locked && self.end_offset_minutes() > MINUTES_PER_DAY {
            return Err(ReflowError::InvalidBlock(format!(
                "'{}': locked block ends at {}, past the end of the day",
                self.id,
                self.end_offset_minutes()
            )));
        }
        Ok(())
    }
}

/// Validate every block and check that ids are unique.
///
/// # Errors
///
/// The first [`ReflowError::InvalidBlock`] encountered, or
/// [`ReflowError::DuplicateId`] if two blocks share an id.
pub fn validate_blocks(blocks: &[TimeBlock]) -> Result<()> {
    let mut seen = HashSet::with_capacity(blocks.len());
    for block in blocks {
        block.validate()?;
        if !seen.insert(block.id.as_str()) {
            return Err(ReflowError::DuplicateId(block.id.clone()));
        }
    }
    Ok(())
}

/// Sort into canonical day order: by start, locked blocks first on a tie,
/// then by id.
pub(crate) fn sort_canonical(blocks: &mut [TimeBlock]) {
    blocks.sort_by(|a, b| {
        a.start_offset_minutes
            .cmp(&b.start_offset_minutes)
            .then_with(|| b.is_locked.cmp(&a.is_locked))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// First placeholder id of the form `"{base}#N"` (N ≥ 2) not used in `blocks`.
///
/// The persistence layer is expected to swap placeholders for real row ids.
pub(crate) fn placeholder_id(blocks: &[TimeBlock], base: &str) -> String {
    let taken: HashSet<&str> = blocks.iter().map(|b| b.id.as_str()).collect();
    (2..)
        .map(|n| format!("{base}#{n}"))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| format!("{base}#"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_offset_is_start_plus_duration() {
        let block = TimeBlock::new("a", 540, 30);
        assert_eq!(block.end_offset_minutes(), 570);
    }

    #[test]
    fn test_end_offset_saturates() {
        assert_eq!(TimeBlock::new("a", 1, i64::MAX).end_offset_minutes(), i64::MAX);
    }

    #[test]
    fn test_covers_is_half_open() {
        let block = TimeBlock::new("a", 540, 30);
        assert!(block.covers(540));
        assert!(block.covers(569));
        assert!(!block.covers(570));
        assert!(!block.strictly_contains(540));
        assert!(block.strictly_contains(541));
    }

    #[test]
    fn test_validate_rejects_zero_duration() {
        let err = TimeBlock::new("a", 0, 0).validate().unwrap_err();
        assert!(matches!(err, ReflowError::InvalidBlock(_)));
    }

    #[test]
    fn test_validate_rejects_negative_duration() {
        let err = TimeBlock::new("a", 0, -15).validate().unwrap_err();
        assert!(err.to_string().contains("duration must be positive"));
    }

    #[test]
    fn test_validate_rejects_duration_longer_than_day() {
        let err = TimeBlock::new("a", 0, 4_000_000_000).validate().unwrap_err();
        assert!(err.to_string().contains("longer than a day"));
        assert!(TimeBlock::new("a", 1, i64::MAX).validate().is_err());
        assert!(TimeBlock::new("a", 0, MINUTES_PER_DAY).validate().is_ok());

        let mut shrunk = TimeBlock::new("a", 0, 60);
        shrunk.original_duration_minutes = Some(i64::MAX);
        assert!(matches!(shrunk.validate(), Err(ReflowError::InvalidBlock(_))));
    }

    #[test]
    fn test_validate_rejects_start_outside_day() {
        assert!(TimeBlock::new("a", -1, 10).validate().is_err());
        assert!(TimeBlock::new("a", 1440, 10).validate().is_err());
        assert!(TimeBlock::new("a", 1439, 10).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_locked_overrun() {
        let err = TimeBlock::new("a", 1430, 20).locked().validate().unwrap_err();
        assert!(err.to_string().contains("past the end of the day"));
    }

    #[test]
    fn test_validate_blocks_detects_duplicates() {
        let blocks = vec![TimeBlock::new("a", 0, 720), TimeBlock::new("a", 720, 720)];
        assert_eq!(
            validate_blocks(&blocks),
            Err(ReflowError::DuplicateId("a".to_string()))
        );
    }

    #[test]
    fn test_canonical_order_puts_locked_first_on_tie() {
        let mut blocks = vec![
            TimeBlock::new("b", 60, 10),
            TimeBlock::new("z", 60, 10).locked(),
            TimeBlock::new("a", 0, 60),
        ];
        sort_canonical(&mut blocks);
        let ids: Vec<_> = blocks.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, ["a", "z", "b"]);
    }

    #[test]
    fn test_placeholder_id_skips_taken() {
        let blocks = vec![TimeBlock::new("a", 0, 60), TimeBlock::new("a#2", 60, 60)];
        assert_eq!(placeholder_id(&blocks, "a"), "a#3");
    }

    #[test]
    fn test_deserialize_defaults() {
        let block: TimeBlock = serde_json::from_str(
            r#"{"id":"a","start_offset_minutes":0,"duration_minutes":1440}"#,
        )
        .unwrap();
        assert!(!block.is_locked);
        assert!(block.is_flexible);
        assert!(block.original_duration_minutes.is_none());
        assert!(block.metadata.is_null());
    }

    #[test]
    fn test_serialize_omits_empty_optionals() {
        let json = serde_json::to_string(&TimeBlock::new("a", 0, 1440)).unwrap();
        assert!(!json.contains("original_duration_minutes"));
        assert!(!json.contains("template_id"));
        assert!(!json.contains("metadata"));
    }
}
