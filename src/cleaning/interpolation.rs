//! Linear gap interpolation.

use std::collections::HashSet;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::detection::{from_trajectories, into_trajectories};
use crate::{Detection, Error, Result};

/// Frame rate and maximum gap duration.
///
/// Gaps longer than `floor(frame_rate * max_gap_seconds)` frames are left
/// unfilled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GapConfigFields")]
pub struct GapConfig {
    frame_rate: f64,
    max_gap_seconds: f64,
}

/// Unvalidated form read by serde, checked by `GapConfig::new`.
#[derive(Deserialize)]
struct GapConfigFields {
    frame_rate: f64,
    max_gap_seconds: f64,
}

impl TryFrom<GapConfigFields> for GapConfig {
    type Error = Error;

    fn try_from(fields: GapConfigFields) -> Result<Self> {
        GapConfig::new(fields.frame_rate, fields.max_gap_seconds)
    }
}

impl GapConfig {
    /// Create a validated gap configuration.
    ///
    /// # Arguments
    /// * `frame_rate` - Frames per second, must be positive
    /// * `max_gap_seconds` - Longest gap to fill in seconds, must be positive
    pub fn new(frame_rate: f64, max_gap_seconds: f64) -> Result<Self> {
        if !(frame_rate.is_finite() && frame_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "frame_rate must be positive, got {}",
                frame_rate
            )));
        }
        if !(max_gap_seconds.is_finite() && max_gap_seconds > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "max_gap_seconds must be positive, got {}",
                max_gap_seconds
            )));
        }
        Ok(Self {
            frame_rate,
            max_gap_seconds,
        })
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    pub fn max_gap_seconds(&self) -> f64 {
        self.max_gap_seconds
    }

    /// Largest frame difference between anchors that is still filled.
    pub fn max_frame_gap(&self) -> i64 {
        (self.frame_rate * self.max_gap_seconds).floor() as i64
    }
}

/// Result of an interpolation pass.
#[derive(Debug, Clone, Default)]
pub struct InterpolationOutcome {
    /// Input plus synthetic detections, sorted by (entity, frame).
    pub detections: Vec<Detection>,

    /// Number of synthetic detections created.
    pub synthesized: usize,

    /// Gaps that were filled.
    pub gaps_filled: usize,

    /// Gaps longer than the maximum, left open.
    pub gaps_skipped: usize,
}

/// Fills short gaps between real detections.
#[derive(Debug, Clone)]
pub struct GapInterpolator {
    config: GapConfig,
}

impl GapInterpolator {
    pub fn new(config: GapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GapConfig {
        &self.config
    }

    /// Interpolate every gap between consecutive anchors of each trajectory.
    ///
    /// For anchors `a` and `b` that are `d` frames apart with
    /// `1 < d <= max_frame_gap`, the detection at `a.frame + n` is placed at
    /// `a + (b - a) * n / d`. Front points are interpolated only when both
    /// anchors carry one. Frames that already hold a usable detection are
    /// left alone.
    pub fn run(&self, detections: Vec<Detection>) -> InterpolationOutcome {
        let mut outcome = InterpolationOutcome::default();
        let max_gap = self.config.max_frame_gap();

        let mut trajectories = into_trajectories(detections);

        for trajectory in trajectories.values_mut() {
            let occupied: HashSet<i64> = trajectory.iter().filter(|d| d.is_usable()).map(|d| d.frame).collect();
            let anchors: Vec<&Detection> = trajectory.iter().filter(|d| d.is_anchor()).collect();

            let mut synthetic = Vec::new();
            for pair in anchors.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                let d = b.frame - a.frame;
                if d <= 1 {
                    continue;
                }
                if d > max_gap {
                    outcome.gaps_skipped += 1;
                    continue;
                }

                for n in 1..d {
                    let frame = a.frame + n;
                    if occupied.contains(&frame) {
                        continue;
                    }
                    synthetic.push(interpolate(a, b, n, d));
                }
                outcome.gaps_filled += 1;
            }

            outcome.synthesized += synthetic.len();
            trajectory.extend(synthetic);
            // Stable: originals stay ahead of synthetic rows at the same frame.
            trajectory.sort_by_key(|d| d.frame);
        }

        outcome.detections = from_trajectories(trajectories);

        debug!(
            "interpolation: {} detections synthesized over {} gaps, {} gaps over {} frames skipped",
            outcome.synthesized, outcome.gaps_filled, outcome.gaps_skipped, max_gap
        );

        outcome
    }
}

fn interpolate(a: &Detection, b: &Detection, n: i64, d: i64) -> Detection {
    let ratio = n as f64 / d as f64;
    let front = match (a.front, b.front) {
        (Some(fa), Some(fb)) => Some(fa + (fb - fa) * ratio),
        _ => None,
    };

    Detection {
        entity_id: a.entity_id,
        frame: a.frame + n,
        centroid: a.centroid + (b.centroid - a.centroid) * ratio,
        front,
        source: a.source.clone(),
        interpolated: true,
        resolved_duplicate: false,
        unresolvable_duplicate: false,
        jump: false,
    }
}
