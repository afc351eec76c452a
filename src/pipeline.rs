//! Recording pipeline.
//!
//! Chains partitioning, deduplication, jump filtering, interpolation,
//! restructuring and the distance engines for one recording.

use std::fmt;
use std::path::Path;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::cleaning::{
    DedupConfig, Deduplicator, GapConfig, GapInterpolator, JumpConfig, JumpFilter,
};
use crate::distances::{compute_geometry_distances, compute_pairwise, GeometryDistances, PairwiseDistanceTable};
use crate::static_object::{build_static_objects, AnnotationRow, ARENA_PERIMETER_LABEL};
use crate::wide_frame::RestructureConfig;
use crate::{ArenaPartition, Detection, Error, PartitionMode, Result, StaticObject, WideFrame};

/// Interpolation settings.
///
/// Disabled by default because the frame rate is a property of the
/// recording setup and has no sensible default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    pub enabled: bool,
    pub frame_rate: Option<f64>,
    pub max_gap_seconds: Option<f64>,
}

impl InterpolationConfig {
    /// Enabled interpolation with the given rate and maximum gap.
    pub fn new(frame_rate: f64, max_gap_seconds: f64) -> Self {
        Self {
            enabled: true,
            frame_rate: Some(frame_rate),
            max_gap_seconds: Some(max_gap_seconds),
        }
    }

    /// Validated gap configuration, `None` when disabled.
    pub fn gap_config(&self) -> Result<Option<GapConfig>> {
        if !self.enabled {
            return Ok(None);
        }
        match (self.frame_rate, self.max_gap_seconds) {
            (Some(rate), Some(seconds)) => GapConfig::new(rate, seconds).map(Some),
            _ => Err(Error::InvalidConfig(
                "interpolation requires frame_rate and max_gap_seconds".to_string(),
            )),
        }
    }
}

/// Static-object distance settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub enabled: bool,

    /// Annotation labels that are not nest objects.
    pub excluded_labels: Vec<String>,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            excluded_labels: vec![ARENA_PERIMETER_LABEL.to_string()],
        }
    }
}

/// Configuration for the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Arena split.
    pub partition: PartitionMode,

    /// Duplicate resolution.
    pub dedup: DedupConfig,

    /// Jump filtering, skipped when `None`.
    pub jumps: Option<JumpConfig>,

    /// Gap interpolation.
    pub interpolation: InterpolationConfig,

    /// Wide table construction.
    pub restructure: RestructureConfig,

    /// Compute inter-entity distances.
    pub pairwise: bool,

    /// Compute distances to static objects.
    pub geometry: GeometryConfig,

    /// Recordings processed in parallel by the batch runner.
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            partition: PartitionMode::default(),
            dedup: DedupConfig::default(),
            jumps: Some(JumpConfig::default()),
            interpolation: InterpolationConfig::default(),
            restructure: RestructureConfig::default(),
            pairwise: true,
            geometry: GeometryConfig::default(),
            workers: 1,
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check every setting, so that no recording starts with a bad config.
    pub fn validate(&self) -> Result<()> {
        if let PartitionMode::Split { threshold } = self.partition {
            if !threshold.is_finite() {
                return Err(Error::InvalidConfig(format!(
                    "partition threshold must be finite, got {}",
                    threshold
                )));
            }
        }

        if self.dedup.window < 0 {
            return Err(Error::InvalidConfig(format!(
                "dedup window must be non-negative, got {}",
                self.dedup.window
            )));
        }

        if let Some(jumps) = &self.jumps {
            if !(jumps.threshold.is_finite() && jumps.threshold >= 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "jump threshold must be a non-negative number, got {}",
                    jumps.threshold
                )));
            }
            if jumps.step < 1 {
                return Err(Error::InvalidConfig(format!(
                    "jump step must be at least 1, got {}",
                    jumps.step
                )));
            }
        }

        self.interpolation.gap_config()?;

        if self.workers == 0 {
            return Err(Error::InvalidConfig("workers must be at least 1".to_string()));
        }

        Ok(())
    }
}

/// Category of a non-fatal condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A duplicate group had no reference frame within the window.
    UnresolvableDuplicate,
    /// Geometry was requested but the recording has no annotations.
    GeometryDataMissing,
    /// Too few entities for inter-entity distances.
    NumericDegenerate,
    /// A malformed annotation object was left out.
    SkippedStaticObject,
}

/// A non-fatal condition met while processing a recording.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Partition concerned, `None` for recording-wide conditions.
    pub partition: Option<ArenaPartition>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.partition {
            Some(p) => write!(f, "[{:?}] {}: {}", self.kind, p, self.message),
            None => write!(f, "[{:?}] {}", self.kind, self.message),
        }
    }
}

enum StaticSource {
    Annotations(Vec<AnnotationRow>),
    Objects(Vec<StaticObject>),
}

/// One recording: its detections and optionally its nest annotations.
pub struct Recording {
    pub name: String,
    pub detections: Vec<Detection>,
    static_source: Option<StaticSource>,
}

impl Recording {
    pub fn new(name: impl Into<String>, detections: Vec<Detection>) -> Self {
        Self {
            name: name.into(),
            detections,
            static_source: None,
        }
    }

    /// Attach raw annotation rows, assembled into objects during processing.
    pub fn with_annotations(mut self, rows: Vec<AnnotationRow>) -> Self {
        self.static_source = Some(StaticSource::Annotations(rows));
        self
    }

    /// Attach ready-made static objects.
    pub fn with_static_objects(mut self, objects: Vec<StaticObject>) -> Self {
        self.static_source = Some(StaticSource::Objects(objects));
        self
    }

    pub fn has_static_objects(&self) -> bool {
        self.static_source.is_some()
    }
}

/// Output of one arena partition.
#[derive(Debug, Clone)]
pub struct PartitionResult {
    pub partition: ArenaPartition,
    /// Cleaned detections, flagged jumps and synthetic rows included.
    pub detections: Vec<Detection>,
    pub wide: WideFrame,
    pub pairwise: Option<PairwiseDistanceTable>,
    pub geometry: Option<GeometryDistances>,
}

/// Stage counters summed over all partitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageCounters {
    pub input_detections: usize,
    pub exact_duplicates_removed: usize,
    pub resolved_duplicates: usize,
    pub unresolvable_duplicates: usize,
    pub jumps_flagged: usize,
    pub jumps_dropped: usize,
    pub interpolated: usize,
    pub output_detections: usize,
}

/// Everything produced for one recording.
#[derive(Debug, Clone)]
pub struct RecordingReport {
    pub name: String,
    pub partitions: Vec<PartitionResult>,
    pub counters: StageCounters,
    pub diagnostics: Vec<Diagnostic>,
}

impl RecordingReport {
    pub fn partition(&self, partition: ArenaPartition) -> Option<&PartitionResult> {
        self.partitions.iter().find(|p| p.partition == partition)
    }

    /// Diagnostics of one kind.
    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }
}

/// Runs every stage for one recording.
///
/// Construction validates the configuration, so a pipeline that exists is
/// ready to process any number of recordings.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    deduplicator: Deduplicator,
    jump_filter: Option<JumpFilter>,
    interpolator: Option<GapInterpolator>,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let interpolator = config.interpolation.gap_config()?.map(GapInterpolator::new);

        Ok(Self {
            deduplicator: Deduplicator::new(config.dedup.clone()),
            jump_filter: config.jumps.clone().map(JumpFilter::new),
            interpolator,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one recording.
    ///
    /// # Returns
    /// Per-partition results, counters and diagnostics.
    ///
    /// # Errors
    /// Fails only on conditions that make the recording unusable, e.g. a
    /// repeated (entity, frame) pair reaching the restructurer.
    pub fn process(&self, recording: Recording) -> Result<RecordingReport> {
        let Recording {
            name,
            detections,
            static_source,
        } = recording;

        let mut diagnostics = Vec::new();
        let mut counters = StageCounters {
            input_detections: detections.len(),
            ..Default::default()
        };

        let objects = self.prepare_static_objects(&name, static_source, &mut diagnostics);

        let mut partitions = Vec::new();
        for (partition, dets) in self.config.partition.split_detections(detections) {
            let result = self.process_partition(
                &name,
                partition,
                dets,
                objects.as_deref(),
                &mut counters,
                &mut diagnostics,
            )?;
            partitions.push(result);
        }

        info!(
            "recording {}: {} partitions, {} -> {} detections, {} diagnostics",
            name,
            partitions.len(),
            counters.input_detections,
            counters.output_detections,
            diagnostics.len()
        );

        Ok(RecordingReport {
            name,
            partitions,
            counters,
            diagnostics,
        })
    }

    /// Assemble the recording's static objects, `None` when geometry is off
    /// or there is nothing to assemble from.
    fn prepare_static_objects(
        &self,
        name: &str,
        source: Option<StaticSource>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Vec<StaticObject>> {
        if !self.config.geometry.enabled {
            return None;
        }

        let excluded = &self.config.geometry.excluded_labels;
        match source {
            None => {
                let message = format!("recording {} has no static objects, geometry skipped", name);
                warn!("{}", message);
                diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::GeometryDataMissing,
                    partition: None,
                    message,
                });
                None
            }
            Some(StaticSource::Annotations(rows)) => {
                let (objects, rejected) = build_static_objects(&rows, excluded);
                for err in rejected {
                    warn!("recording {}: {}", name, err);
                    diagnostics.push(Diagnostic {
                        kind: DiagnosticKind::SkippedStaticObject,
                        partition: None,
                        message: err.to_string(),
                    });
                }
                Some(objects)
            }
            Some(StaticSource::Objects(objects)) => Some(
                objects
                    .into_iter()
                    .filter(|o| !excluded.iter().any(|l| *l == o.label))
                    .collect(),
            ),
        }
    }

    fn process_partition(
        &self,
        name: &str,
        partition: ArenaPartition,
        detections: Vec<Detection>,
        objects: Option<&[StaticObject]>,
        counters: &mut StageCounters,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<PartitionResult> {
        debug!("recording {} {}: {} detections", name, partition, detections.len());

        let dedup = self.deduplicator.run(detections);
        counters.exact_duplicates_removed += dedup.exact_duplicates_removed;
        counters.resolved_duplicates += dedup.resolved_groups;
        counters.unresolvable_duplicates += dedup.unresolvable_groups.len();
        for (entity_id, frame) in &dedup.unresolvable_groups {
            let message = format!(
                "entity {} frame {}: duplicate readings without a reference within {} frames",
                entity_id, frame, self.config.dedup.window
            );
            warn!("recording {} {}: {}", name, partition, message);
            diagnostics.push(Diagnostic {
                kind: DiagnosticKind::UnresolvableDuplicate,
                partition: Some(partition),
                message,
            });
        }
        let mut detections = dedup.detections;

        if let Some(filter) = &self.jump_filter {
            let jumps = filter.run(detections);
            counters.jumps_flagged += jumps.flagged.len();
            counters.jumps_dropped += jumps.dropped;
            detections = jumps.detections;
        }

        if let Some(interpolator) = &self.interpolator {
            let gaps = interpolator.run(detections);
            counters.interpolated += gaps.synthesized;
            detections = gaps.detections;
        }

        counters.output_detections += detections.len();

        let wide = WideFrame::from_detections(detections.clone(), &self.config.restructure)?;

        let pairwise = if self.config.pairwise {
            let table = compute_pairwise(&wide);
            if table.is_none() {
                diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::NumericDegenerate,
                    partition: Some(partition),
                    message: format!(
                        "{} entities, no inter-entity distances",
                        wide.entity_ids().len()
                    ),
                });
            }
            table
        } else {
            None
        };

        let geometry = objects.map(|all| {
            let own = self.config.partition.objects_for(partition, all);
            compute_geometry_distances(&wide, &own)
        });

        Ok(PartitionResult {
            partition,
            detections,
            wide,
            pairwise,
            geometry,
        })
    }
}
