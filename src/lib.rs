pub mod io;
pub mod tiff;
pub mod utils;
pub mod compression;
pub mod raster;
pub mod tiling;
pub mod annotation;
pub mod config;
pub mod commands;
pub mod api;

pub use crate::api::{run_pipeline, PipelineReport, RasterTile};

pub use tiff::TiffReader;
pub use raster::{GeoTransform, Raster, RasterSource, Window};
pub use tiling::{GridPlanner, Stitcher, Tiler, TilingError, TilingResult, TilingStrategy};
pub use annotation::{AnnotationAdapter, BoundingBox, PixelBox, SyntheticDetector};
pub use config::PipelineConfig;
