//! Trajectory cleaning stages.
//!
//! This module provides:
//! - `Deduplicator` - resolves several readings of one tag in one frame
//! - `JumpFilter` - flags implausible single-frame jumps
//! - `GapInterpolator` - fills short gaps with tagged synthetic detections
//!
//! Every stage takes its input by value and returns a new detection list
//! sorted by (entity, frame) together with counters for the report.

mod dedup;
mod jumps;
mod interpolation;

pub use dedup::{DedupConfig, DedupOutcome, Deduplicator, UnresolvablePolicy, DEFAULT_DEDUP_WINDOW};
pub use jumps::{JumpConfig, JumpFilter, JumpOutcome, DEFAULT_JUMP_STEP, DEFAULT_JUMP_THRESHOLD};
pub use interpolation::{GapConfig, GapInterpolator, InterpolationOutcome};
