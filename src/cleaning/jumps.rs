//! Single-frame jump flagging.
//!
//! A tag that is misread for one frame shows up far from where it was just
//! before and just after. Such detections are flagged, not moved.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::detection::{from_trajectories, into_trajectories};
use crate::{Detection, EntityId, FrameIndex};

/// Default displacement, in pixels, above which a step counts as a jump.
pub const DEFAULT_JUMP_THRESHOLD: f64 = 500.0;

/// Default frame spacing of the three detections compared.
pub const DEFAULT_JUMP_STEP: i64 = 1;

/// Configuration for the jump filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpConfig {
    /// Pixel distance that both steps must exceed.
    pub threshold: f64,

    /// Required frame difference on both sides of the middle detection.
    pub step: i64,

    /// Remove flagged detections from the output instead of keeping them.
    pub drop_jumps: bool,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_JUMP_THRESHOLD,
            step: DEFAULT_JUMP_STEP,
            drop_jumps: false,
        }
    }
}

/// Result of a jump filtering pass.
#[derive(Debug, Clone, Default)]
pub struct JumpOutcome {
    /// Detections sorted by (entity, frame), flagged ones included unless dropped.
    pub detections: Vec<Detection>,

    /// (entity, frame) of every flagged detection.
    pub flagged: Vec<(EntityId, FrameIndex)>,

    /// Number of flagged detections removed.
    pub dropped: usize,
}

/// Flags detections that jump away and straight back.
#[derive(Debug, Clone, Default)]
pub struct JumpFilter {
    config: JumpConfig,
}

impl JumpFilter {
    pub fn new(config: JumpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &JumpConfig {
        &self.config
    }

    /// Flag the middle detection of every prev-curr-next run whose frames are
    /// `step` apart and whose two displacements both exceed the threshold.
    ///
    /// Flags are decided on the input positions, so one flag never masks or
    /// creates another. Runs spanning a gap are never flagged. Rows flagged
    /// as unresolvable duplicates are skipped.
    ///
    /// Only the middle of a triple can be flagged. A spurious first detection
    /// of a trajectory, or a spurious run of two or more frames, is never
    /// flagged.
    pub fn run(&self, detections: Vec<Detection>) -> JumpOutcome {
        let mut outcome = JumpOutcome::default();
        let JumpConfig { threshold, step, .. } = self.config;

        let mut trajectories = into_trajectories(detections);

        for trajectory in trajectories.values_mut() {
            let candidates: Vec<usize> = (0..trajectory.len())
                .filter(|&i| !trajectory[i].unresolvable_duplicate)
                .collect();

            let mut to_flag = Vec::new();
            for w in candidates.windows(3) {
                let (prev, curr, next) = (&trajectory[w[0]], &trajectory[w[1]], &trajectory[w[2]]);
                if curr.frame - prev.frame != step || next.frame - curr.frame != step {
                    continue;
                }
                if prev.distance_to(curr) > threshold && curr.distance_to(next) > threshold {
                    to_flag.push(w[1]);
                }
            }

            for i in to_flag {
                let det = &mut trajectory[i];
                det.jump = true;
                outcome.flagged.push((det.entity_id, det.frame));
            }

            if self.config.drop_jumps {
                let before = trajectory.len();
                trajectory.retain(|d| !d.jump);
                outcome.dropped += before - trajectory.len();
            }
        }

        outcome.detections = from_trajectories(trajectories);

        debug!(
            "jumps: {} flagged, {} dropped (threshold {} px, step {})",
            outcome.flagged.len(),
            outcome.dropped,
            threshold,
            step
        );

        outcome
    }
}
