//! Error types for magnetic-timeline operations.

use thiserror::Error;

/// Every way an engine call can fail.
///
/// Operations borrow the caller's sequence immutably, so any error leaves
/// that sequence exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReflowError {
    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    #[error("Locked anchor violation: {0}")]
    LockedAnchorViolation(String),

    #[error(
        "Infeasible layout: [{start}, {end}) needs at least {required} minutes but only {available} are available"
    )]
    InfeasibleLayout {
        start: i64,
        end: i64,
        required: i64,
        available: i64,
    },

    #[error("Split out of range: minute {minute} is not strictly inside [{start}, {end})")]
    SplitOutOfRange { minute: i64, start: i64, end: i64 },

    #[error("Block not found: {0}")]
    BlockNotFound(String),

    #[error("Duplicate block id: {0}")]
    DuplicateId(String),

    #[error("Unfillable gap: [{start}, {end}) has no unlocked block to absorb it")]
    UnfillableGap { start: i64, end: i64 },

    #[error("Coverage violation: {0}")]
    CoverageViolation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ReflowError>;
