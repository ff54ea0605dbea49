//! # magnetic-timeline
//!
//! A reflow engine that keeps one day as a contiguous, gapless,
//! non-overlapping sequence of time blocks.
//!
//! Edits behave like clips on a ripple-editing timeline: inserting, moving,
//! resizing, splitting or deleting a block slides its neighbours to close
//! gaps and resolve overlaps, while locked blocks stay put as anchors the
//! rest of the day flows around. Every function is a pure transform over
//! the complete day; nothing here touches storage or the system clock.
//!
//! ## Modules
//!
//! - [`block`] — The [`TimeBlock`] value type and its validity predicate
//! - [`config`] — Engine tunables (minimum block duration)
//! - [`coverage`] — Full-coverage check, gap and overlap enumeration
//! - [`reflow`] — The layout kernel that restores coverage around anchors
//! - [`edit`] — Insert, move, resize, split, delete and manual reflow
//! - [`default_day`] — Seed sequences for a brand-new day
//! - [`clock`] — Caller-driven "now" handling and minute/clock conversion
//! - [`error`] — Error types

pub mod block;
pub mod clock;
pub mod config;
pub mod coverage;
pub mod default_day;
pub mod edit;
pub mod error;
pub mod reflow;

pub use block::{validate_blocks, TimeBlock, MINUTES_PER_DAY};
pub use clock::{advance, current_block, format_minute, minute_of_day, time_of_minute};
pub use config::ReflowConfig;
pub use coverage::{
    coverage_report, find_gaps, find_overlaps, validate_full_coverage, CoverageReport, Gap, Gaps,
    Overlap,
};
pub use default_day::{create_default_day, seed_from_template};
pub use edit::{
    apply_edits, delete_block, insert_at_position, manual_reflow, move_block, resize_block,
    split_block, Edit, ManualReflow,
};
pub use error::{ReflowError, Result};
pub use reflow::reflow;
