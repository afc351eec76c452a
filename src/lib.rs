//! # beetrail - trajectory cleaning and nest-geometry analytics
//!
//! Cleans multi-animal tag-tracking output (one row per tag detection per
//! video frame) and derives the dense spatial relationships used by
//! downstream behavioural metrics.
//!
//! ## Features
//!
//! - Duplicate-detection resolution by proximity to the nearest neighbouring frame
//! - Single-frame jump flagging
//! - Bounded linear gap interpolation with provenance flags
//! - Frame-indexed wide tables with explicit `(field, entity)` column keys
//! - Per-frame inter-entity distance matrices
//! - Distances to annotated nest objects (points, circles, polygons)
//! - Parallel batch processing with per-recording failure isolation
//!
//! ## Example
//!
//! ```rust,ignore
//! use beetrail_rs::{Detection, Pipeline, PipelineConfig, Recording};
//!
//! let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
//! let detections = vec![
//!     Detection::new(7, 1, 100.0, 100.0).unwrap(),
//!     Detection::new(7, 2, 101.0, 100.0).unwrap(),
//! ];
//! let report = pipeline.process(Recording::new("video1", detections)).unwrap();
//! ```

// Internal numeric helpers (condensed distances, NaN-aware reductions)
pub(crate) mod internal;

// Public modules
pub mod detection;
pub mod partition;
pub mod cleaning;
pub mod wide_frame;
pub mod static_object;
pub mod distances;
pub mod pipeline;
pub mod batch;
pub mod io;

// Re-exports for convenience
pub use detection::{Detection, EntityId, FrameIndex, SourceTag};
pub use partition::{ArenaPartition, PartitionMode};
pub use wide_frame::{CellOrigin, Field, WideFrame};
pub use static_object::{ObjectKey, Shape, StaticObject};
pub use distances::{GeometryDistanceTable, GeometryDistances, PairwiseDistanceTable};
pub use pipeline::{Diagnostic, DiagnosticKind, Pipeline, PipelineConfig, Recording, RecordingReport};
pub use batch::{BatchReport, BatchRunner};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur while cleaning or analysing a recording
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Schema error: {0}")]
        Schema(String),

        #[error("Invalid detection: {0}")]
        InvalidDetection(String),

        #[error("Duplicate detection for entity {entity_id} in frame {frame}")]
        DuplicateDetection { entity_id: i64, frame: i64 },

        #[error("Invalid geometry: {0}")]
        InvalidGeometry(String),

        #[error("IO error: {0}")]
        IoError(#[from] std::io::Error),

        #[error("CSV error: {0}")]
        CsvError(#[from] csv::Error),

        #[error("JSON error: {0}")]
        JsonError(#[from] serde_json::Error),
    }

    /// Result type for beetrail operations
    pub type Result<T> = std::result::Result<T, Error>;
}
