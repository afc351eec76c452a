//! Cleaned table writers.

use std::path::Path;

use log::debug;
use serde::Serialize;

use crate::distances::GeometryDistances;
use crate::{Detection, Result, WideFrame};

/// Write the wide table with its distance columns.
///
/// Header: `frame`, then `<field>_<id>` for every column key, then for every
/// geometry table and object `distC_<label>_<index>_<id>` or
/// `distM_<label>_<index>_<id>`. Missing values are written as empty fields.
///
/// # Arguments
/// * `path` - Output file, created or truncated
/// * `wide` - Wide table of one partition
/// * `geometry` - Distance tables over the same frames and entities
pub fn write_wide_frame<P: AsRef<Path>>(
    path: P,
    wide: &WideFrame,
    geometry: Option<&GeometryDistances>,
) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;

    let keys = wide.column_keys();
    let mut header = vec!["frame".to_string()];
    header.extend(keys.iter().map(|(field, id)| format!("{}_{}", field, id)));
    if let Some(geometry) = geometry {
        for table in geometry.tables() {
            for (key, _) in table.columns() {
                let name = table.column_name(key);
                header.extend(wide.entity_ids().iter().map(|id| format!("{}_{}", name, id)));
            }
        }
    }
    writer.write_record(&header)?;

    for (row, frame) in wide.frames().iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(frame.to_string());

        for (field, id) in &keys {
            let value = match (wide.field(*field), wide.entity_column(*id)) {
                (Some(m), Some(col)) => m[(row, col)],
                _ => f64::NAN,
            };
            record.push(format_value(value));
        }

        if let Some(geometry) = geometry {
            for table in geometry.tables() {
                for (_, distances) in table.columns() {
                    record.extend(distances.row(row).iter().map(|&v| format_value(v)));
                }
            }
        }

        writer.write_record(&record)?;
    }

    writer.flush()?;
    debug!("wrote {} rows x {} columns to {}", wide.frames().len(), header.len(), path.display());
    Ok(())
}

#[derive(Serialize)]
struct DetectionRecord<'a> {
    frame: i64,
    #[serde(rename = "ID")]
    id: i64,
    #[serde(rename = "centroidX")]
    centroid_x: f64,
    #[serde(rename = "centroidY")]
    centroid_y: f64,
    #[serde(rename = "frontX")]
    front_x: Option<f64>,
    #[serde(rename = "frontY")]
    front_y: Option<f64>,
    filename: &'a str,
    #[serde(rename = "colony number")]
    colony: &'a str,
    interpolated: bool,
    resolved_duplicate: bool,
    unresolvable_duplicate: bool,
    jump: bool,
}

/// Write cleaned detections as a long table with their provenance flags.
pub fn write_detections<P: AsRef<Path>>(path: P, detections: &[Detection]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;

    for det in detections {
        writer.serialize(DetectionRecord {
            frame: det.frame,
            id: det.entity_id,
            centroid_x: det.centroid.x,
            centroid_y: det.centroid.y,
            front_x: det.front.map(|p| p.x),
            front_y: det.front.map(|p| p.y),
            filename: &det.source.filename,
            colony: &det.source.colony,
            interpolated: det.interpolated,
            resolved_duplicate: det.resolved_duplicate,
            unresolvable_duplicate: det.unresolvable_duplicate,
            jump: det.jump,
        })?;
    }

    writer.flush()?;
    Ok(())
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}
