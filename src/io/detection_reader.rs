//! Tracking table reader.

use std::path::Path;

use log::debug;
use serde::Deserialize;

use super::require_columns;
use crate::{Detection, Result, SourceTag};

/// Columns every tracking table must have.
pub const DETECTION_REQUIRED_COLUMNS: [&str; 4] = ["frame", "ID", "centroidX", "centroidY"];

/// One row of the tracking table. Unknown columns are ignored.
#[derive(Debug, Deserialize)]
struct DetectionRow {
    frame: i64,
    #[serde(rename = "ID")]
    id: i64,
    #[serde(rename = "centroidX")]
    centroid_x: Option<f64>,
    #[serde(rename = "centroidY")]
    centroid_y: Option<f64>,
    #[serde(rename = "frontX", default)]
    front_x: Option<f64>,
    #[serde(rename = "frontY", default)]
    front_y: Option<f64>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(rename = "colony number", default)]
    colony: Option<String>,
}

/// Read a tracking table.
///
/// Required columns are `frame`, `ID`, `centroidX` and `centroidY`;
/// `frontX`, `frontY`, `filename` and `colony number` are optional. Rows
/// without a finite centroid are skipped.
///
/// # Errors
/// `Error::Schema` if a required column is absent, `Error::CsvError` for
/// malformed rows.
pub fn read_detections<P: AsRef<Path>>(path: P) -> Result<Vec<Detection>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_path(path)?;
    require_columns(reader.headers()?, &DETECTION_REQUIRED_COLUMNS, path)?;

    let mut detections = Vec::new();
    let mut skipped = 0usize;

    for result in reader.deserialize() {
        let row: DetectionRow = result?;

        let (Some(x), Some(y)) = (row.centroid_x, row.centroid_y) else {
            skipped += 1;
            continue;
        };
        let Ok(mut det) = Detection::new(row.id, row.frame, x, y) else {
            skipped += 1;
            continue;
        };

        if let (Some(fx), Some(fy)) = (row.front_x, row.front_y) {
            det = det.with_front(fx, fy);
        }
        if row.filename.is_some() || row.colony.is_some() {
            det = det.with_source(SourceTag::new(
                row.filename.unwrap_or_default(),
                row.colony.unwrap_or_default(),
            ));
        }
        detections.push(det);
    }

    debug!(
        "read {} detections from {} ({} rows without centroid)",
        detections.len(),
        path.display(),
        skipped
    );

    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_minimal_columns() {
        let file = write_csv("frame,ID,centroidX,centroidY\n1,7,10.5,20.0\n2,7,11.0,21.0\n");
        let dets = read_detections(file.path()).unwrap();

        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].entity_id, 7);
        assert_eq!(dets[1].frame, 2);
        assert_eq!(dets[0].centroid.x, 10.5);
        assert!(dets[0].front.is_none());
    }

    #[test]
    fn test_read_optional_columns_and_extras() {
        let file = write_csv(
            "frame,ID,centroidX,centroidY,frontX,frontY,filename,colony number,score\n\
             3,1,1.0,2.0,3.0,4.0,vid_a,5,0.9\n\
             4,1,1.0,2.0,,,vid_a,5,0.8\n",
        );
        let dets = read_detections(file.path()).unwrap();

        assert_eq!(dets[0].front.map(|p| (p.x, p.y)), Some((3.0, 4.0)));
        assert!(dets[1].front.is_none());
        assert_eq!(dets[0].source, SourceTag::new("vid_a", "5"));
    }

    #[test]
    fn test_rows_without_centroid_skipped() {
        let file = write_csv("frame,ID,centroidX,centroidY\n1,7,,\n2,7,1.0,1.0\n");
        let dets = read_detections(file.path()).unwrap();
        assert_eq!(dets.len(), 1);
    }

    #[test]
    fn test_padded_headers_accepted() {
        let file = write_csv("frame, ID ,centroidX, centroidY,colony number \n1,7,10.5,20.0,3\n");
        let dets = read_detections(file.path()).unwrap();

        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].entity_id, 7);
        assert_eq!(dets[0].centroid.y, 20.0);
        assert_eq!(dets[0].source.colony, "3");
    }

    #[test]
    fn test_missing_required_column() {
        let file = write_csv("frame,centroidX,centroidY\n1,1.0,1.0\n");
        let err = read_detections(file.path()).unwrap_err();
        assert!(matches!(err, Error::Schema(ref m) if m.contains("ID")));
    }

    #[test]
    fn test_missing_file() {
        assert!(read_detections("/nonexistent/tracks.csv").is_err());
    }
}
