//! Reading and writing the external CSV tables.
//!
//! This module provides:
//! - `read_detections` - the long tracking table
//! - `read_annotations` / `read_static_objects` - the nest annotation table
//! - `write_wide_frame` - the cleaned wide table with its distance columns
//! - `write_detections` - the cleaned long table with provenance flags

mod detection_reader;
mod annotation_reader;
mod table_writer;

pub use detection_reader::{read_detections, DETECTION_REQUIRED_COLUMNS};
pub use annotation_reader::{read_annotations, read_static_objects, ANNOTATION_REQUIRED_COLUMNS};
pub use table_writer::{write_detections, write_wide_frame};

use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::pipeline::Recording;
use crate::{Error, Result};

/// Files making up one recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingFiles {
    pub detections: PathBuf,
    pub annotations: Option<PathBuf>,
}

impl RecordingFiles {
    pub fn new(detections: impl Into<PathBuf>) -> Self {
        Self {
            detections: detections.into(),
            annotations: None,
        }
    }

    pub fn with_annotations(mut self, annotations: impl Into<PathBuf>) -> Self {
        self.annotations = Some(annotations.into());
        self
    }

    /// Recording name: the detection file's stem.
    pub fn name(&self) -> String {
        self.detections
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.detections.display().to_string())
    }
}

impl AsRef<Path> for RecordingFiles {
    fn as_ref(&self) -> &Path {
        &self.detections
    }
}

/// Load a recording and its annotations, if any.
pub fn load_recording(files: &RecordingFiles) -> Result<Recording> {
    let detections = read_detections(&files.detections)?;
    let mut recording = Recording::new(files.name(), detections);
    if let Some(path) = &files.annotations {
        recording = recording.with_annotations(read_annotations(path)?);
    }
    Ok(recording)
}

/// Fail with `Error::Schema` naming every required column the header lacks.
fn require_columns(headers: &StringRecord, required: &[&str], path: &Path) -> Result<()> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Schema(format!(
            "{} is missing required columns: {}",
            path.display(),
            missing.join(", ")
        )))
    }
}
