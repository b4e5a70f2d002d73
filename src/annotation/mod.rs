//! Per-tile annotation
//!
//! Detectors return pixel boxes per tile; this module turns them into map
//! boxes through each tile's transform, optionally burns them into the
//! tiles and exports them.

pub mod adapter;
pub mod annotator;
pub mod bbox;
pub mod export;

pub use adapter::{burn_boxes, AnnotationAdapter, Outline, SyntheticDetector};
pub use annotator::{AnnotateOptions, Annotator};
pub use bbox::{BoundingBox, MapPoint, PixelBox};
pub use export::{write_csv, write_json, AnnotationRecord, GpsBox};
