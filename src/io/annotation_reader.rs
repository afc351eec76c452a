//! Nest annotation table reader.

use std::path::Path;

use log::debug;

use super::require_columns;
use crate::static_object::{build_static_objects, AnnotationRow};
use crate::{Error, Result, StaticObject};

/// Columns every annotation table must have.
pub const ANNOTATION_REQUIRED_COLUMNS: [&str; 4] = ["object index", "label", "x", "y"];

/// Read the raw annotation rows.
///
/// `shape` and `radius` are optional; an empty radius means "not a circle".
pub fn read_annotations<P: AsRef<Path>>(path: P) -> Result<Vec<AnnotationRow>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_path(path)?;
    require_columns(reader.headers()?, &ANNOTATION_REQUIRED_COLUMNS, path)?;

    let rows = reader.deserialize().collect::<std::result::Result<Vec<AnnotationRow>, _>>()?;
    debug!("read {} annotation rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Read and assemble static objects.
///
/// # Returns
/// The objects and the errors of the groups that were left out.
pub fn read_static_objects<P: AsRef<Path>>(
    path: P,
    excluded_labels: &[String],
) -> Result<(Vec<StaticObject>, Vec<Error>)> {
    let rows = read_annotations(path)?;
    Ok(build_static_objects(&rows, excluded_labels))
}
