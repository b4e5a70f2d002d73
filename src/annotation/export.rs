//! Annotation export to JSON and CSV

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::tiling::errors::TilingResult;

use super::bbox::BoundingBox;

/// Map corners of a box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsBox {
    pub top_left: [f64; 2],
    pub bottom_right: [f64; 2],
}

/// One detected box of one tile, as exported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Tile file name
    pub image: String,
    pub pixel_bbox: [u32; 4],
    pub gps_bbox: GpsBox,
}

impl AnnotationRecord {
    pub fn new(image: impl Into<String>, bbox: &BoundingBox) -> Self {
        let (tl, br) = (bbox.top_left(), bbox.bottom_right());
        AnnotationRecord {
            image: image.into(),
            pixel_bbox: bbox.pixel().to_array(),
            gps_bbox: GpsBox {
                top_left: [tl.x, tl.y],
                bottom_right: [br.x, br.y],
            },
        }
    }
}

const CSV_HEADER: [&str; 10] = [
    "id", "image", "x1", "y1", "x2", "y2", "top_left_x", "top_left_y", "bottom_right_x", "bottom_right_y",
];

/// Flat CSV row with a sequential id
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: usize,
    image: &'a str,
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
    top_left_x: f64,
    top_left_y: f64,
    bottom_right_x: f64,
    bottom_right_y: f64,
}

/// Write records as a pretty-printed JSON array
pub fn write_json(records: &[AnnotationRecord], path: &Path) -> TilingResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush()?;
    info!("Exported {} annotation(s) to {}", records.len(), path.display());
    Ok(())
}

/// Write records as CSV rows numbered from 0
pub fn write_csv(records: &[AnnotationRecord], path: &Path) -> TilingResult<()> {
    // Header written by hand so an empty export still has one
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(CSV_HEADER)?;
    for (id, record) in records.iter().enumerate() {
        let [x1, y1, x2, y2] = record.pixel_bbox;
        writer.serialize(CsvRow {
            id,
            image: &record.image,
            x1,
            y1,
            x2,
            y2,
            top_left_x: record.gps_bbox.top_left[0],
            top_left_y: record.gps_bbox.top_left[1],
            bottom_right_x: record.gps_bbox.bottom_right[0],
            bottom_right_y: record.gps_bbox.bottom_right[1],
        })?;
    }
    writer.flush()?;
    info!("Exported {} annotation(s) to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::bbox::PixelBox;
    use crate::raster::GeoTransform;
    use std::fs;

    fn records() -> Vec<AnnotationRecord> {
        let transform = GeoTransform::new(100.0, 200.0, 1.0, -1.0);
        vec![
            AnnotationRecord::new("tile_0_0.tif", &BoundingBox::from_pixel(PixelBox::new(1, 2, 3, 4, 8, 8).unwrap(), &transform)),
            AnnotationRecord::new("tile_0_8.tif", &BoundingBox::from_pixel(PixelBox::new(0, 0, 8, 8, 8, 8).unwrap(), &transform)),
        ]
    }

    #[test]
    fn test_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotations.json");
        write_json(&records(), &path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let first = &value[0];
        assert_eq!(first["image"], "tile_0_0.tif");
        assert_eq!(first["pixel_bbox"], serde_json::json!([1, 2, 3, 4]));
        assert_eq!(first["gps_bbox"]["top_left"], serde_json::json!([101.0, 198.0]));
        assert_eq!(first["gps_bbox"]["bottom_right"], serde_json::json!([103.0, 196.0]));
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_csv_rows_are_numbered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotations.csv");
        write_csv(&records(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "id,image,x1,y1,x2,y2,top_left_x,top_left_y,bottom_right_x,bottom_right_y");
        assert!(lines[1].starts_with("0,tile_0_0.tif,1,2,3,4,"));
        assert!(lines[2].starts_with("1,tile_0_8.tif,0,0,8,8,"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_empty_csv_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_csv(&[], &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().trim_end(), CSV_HEADER.join(","));
    }
}
