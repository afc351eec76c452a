//! Duplicate-detection resolution.
//!
//! A tag can be read more than once in the same frame (reflections, a
//! misread neighbouring tag). The reading closest to where the same tag was
//! seen in the temporally nearest other frame is kept.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::detection::{from_trajectories, into_trajectories};
use crate::internal::scipy::cdist;
use crate::{Detection, EntityId, FrameIndex};

/// Default maximum frame distance to the reference reading.
pub const DEFAULT_DEDUP_WINDOW: i64 = 16;

/// What happens to duplicate groups without a usable reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvablePolicy {
    /// Remove every member of the group.
    #[default]
    Drop,
    /// Keep every member, flagged `unresolvable_duplicate`.
    Flag,
}

/// Configuration for the deduplicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Maximum absolute frame difference to the reference reading.
    pub window: i64,

    /// Handling of groups that cannot be resolved.
    pub policy: UnresolvablePolicy,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_DEDUP_WINDOW,
            policy: UnresolvablePolicy::Drop,
        }
    }
}

/// Result of a deduplication pass.
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    /// Cleaned detections, sorted by (entity, frame).
    pub detections: Vec<Detection>,

    /// Number of duplicate groups resolved to a single reading.
    pub resolved_groups: usize,

    /// (entity, frame) of every group that could not be resolved.
    pub unresolvable_groups: Vec<(EntityId, FrameIndex)>,

    /// Fully identical rows collapsed before grouping.
    pub exact_duplicates_removed: usize,

    /// Candidate readings discarded, including dropped unresolvable groups.
    pub candidates_dropped: usize,
}

/// Resolves multiple readings of one tag within a single frame.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    config: DedupConfig,
}

/// All readings of one trajectory in one frame.
struct FrameGroup {
    frame: FrameIndex,
    rows: Vec<Detection>,
}

impl Deduplicator {
    pub fn new(config: DedupConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Resolve duplicate groups.
    ///
    /// Groups are visited in frame order per trajectory. The reference for a
    /// group is the first reading of the nearest other frame as it stands at
    /// that point, so groups resolved earlier contribute their kept reading.
    pub fn run(&self, detections: Vec<Detection>) -> DedupOutcome {
        let mut outcome = DedupOutcome::default();
        if detections.is_empty() {
            return outcome;
        }

        let mut trajectories = into_trajectories(detections);

        for (key, trajectory) in trajectories.iter_mut() {
            let mut groups = group_by_frame(std::mem::take(trajectory), &mut outcome);

            for i in 0..groups.len() {
                if groups[i].rows.len() < 2 {
                    continue;
                }

                let reference = nearest_reference(&groups, i)
                    .filter(|(gap, _)| *gap <= self.config.window)
                    .map(|(_, reference)| reference.clone());

                match reference {
                    Some(reference) => {
                        let group = &mut groups[i];
                        let candidates: Vec<_> = group.rows.iter().map(|d| d.centroid).collect();
                        let distances = cdist(&candidates, &[reference.centroid]);

                        let mut best = 0;
                        for (idx, &dist) in distances.column(0).iter().enumerate() {
                            if dist < distances[(best, 0)] {
                                best = idx;
                            }
                        }

                        let mut kept = group.rows.swap_remove(best);
                        kept.resolved_duplicate = true;
                        outcome.candidates_dropped += group.rows.len();
                        group.rows = vec![kept];
                        outcome.resolved_groups += 1;
                    }
                    None => {
                        let group = &mut groups[i];
                        for det in group.rows.iter_mut() {
                            det.unresolvable_duplicate = true;
                        }
                        outcome.unresolvable_groups.push((key.entity_id, group.frame));
                    }
                }
            }

            let policy = self.config.policy;
            *trajectory = groups
                .into_iter()
                .flat_map(|g| g.rows)
                .filter(|d| {
                    let keep = !(policy == UnresolvablePolicy::Drop && d.unresolvable_duplicate);
                    if !keep {
                        outcome.candidates_dropped += 1;
                    }
                    keep
                })
                .collect();
        }

        outcome.detections = from_trajectories(trajectories);

        debug!(
            "dedup: {} resolved, {} unresolvable, {} exact duplicates, {} candidates dropped",
            outcome.resolved_groups,
            outcome.unresolvable_groups.len(),
            outcome.exact_duplicates_removed,
            outcome.candidates_dropped
        );

        outcome
    }
}

/// Split a frame-sorted trajectory into frame groups, collapsing identical rows.
fn group_by_frame(trajectory: Vec<Detection>, outcome: &mut DedupOutcome) -> Vec<FrameGroup> {
    let mut groups: Vec<FrameGroup> = Vec::new();

    for det in trajectory {
        match groups.last_mut() {
            Some(group) if group.frame == det.frame => {
                if group.rows.iter().any(|r| r.same_reading(&det)) {
                    outcome.exact_duplicates_removed += 1;
                } else {
                    group.rows.push(det);
                }
            }
            _ => groups.push(FrameGroup {
                frame: det.frame,
                rows: vec![det],
            }),
        }
    }

    groups
}

/// Temporally nearest other frame group and its first reading.
///
/// Ties go to the earlier frame.
fn nearest_reference(groups: &[FrameGroup], target: usize) -> Option<(i64, &Detection)> {
    let frame = groups[target].frame;
    let mut best: Option<(i64, &Detection)> = None;

    for (j, group) in groups.iter().enumerate() {
        if j == target {
            continue;
        }
        let gap = (group.frame - frame).abs();
        if best.map_or(true, |(best_gap, _)| gap < best_gap) {
            best = group.rows.first().map(|d| (gap, d));
        }
    }

    best
}
