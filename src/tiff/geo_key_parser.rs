//! GeoTIFF georeferencing parser
//!
//! Reads the affine transform and the GeoKey blocks from an IFD.

use log::{debug, warn};

use crate::io::seekable::SeekableReader;
use crate::raster::georef::GeoReference;
use crate::raster::transform::GeoTransform;
use crate::tiff::constants::tags;
use crate::tiff::errors::TiffResult;
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;

/// Parser for GeoTIFF geographic metadata
pub struct GeoKeyParser;

impl GeoKeyParser {
    /// Read the pixel to map transform of an IFD
    ///
    /// ModelTransformationTag wins when present. Otherwise the first
    /// tiepoint and the pixel scale are combined. Without either the
    /// identity transform is returned, so pixel coordinates double as map
    /// coordinates.
    pub fn read_transform(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
    ) -> TiffResult<GeoTransform> {
        if ifd.has_tag(tags::MODEL_TRANSFORMATION_TAG) {
            let matrix = tiff_reader.read_f64_values(reader, ifd, tags::MODEL_TRANSFORMATION_TAG)?;
            match GeoTransform::from_model_transformation(&matrix) {
                Some(transform) => {
                    debug!("Transform from ModelTransformation: {:?}", transform.to_gdal());
                    return Ok(transform);
                }
                None => warn!("ModelTransformation has {} values, expected 16", matrix.len()),
            }
        }

        if ifd.has_tag(tags::MODEL_TIEPOINT_TAG) && ifd.has_tag(tags::MODEL_PIXEL_SCALE_TAG) {
            let tiepoint = tiff_reader.read_f64_values(reader, ifd, tags::MODEL_TIEPOINT_TAG)?;
            let scale = tiff_reader.read_f64_values(reader, ifd, tags::MODEL_PIXEL_SCALE_TAG)?;
            match GeoTransform::from_tiepoint_and_scale(&tiepoint, &scale) {
                Some(transform) => {
                    debug!("Transform from tiepoint and pixel scale: {:?}", transform.to_gdal());
                    return Ok(transform);
                }
                None => warn!("Incomplete tiepoint ({} values) or pixel scale ({} values)",
                              tiepoint.len(), scale.len()),
            }
        }

        debug!("No georeferencing tags, using identity transform");
        Ok(GeoTransform::identity())
    }

    /// Read the GeoKey directory and its parameter blocks
    ///
    /// The blocks are returned raw so they can be written back unchanged.
    pub fn read_georeference(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
    ) -> TiffResult<GeoReference> {
        if !ifd.has_tag(tags::GEO_KEY_DIRECTORY_TAG) {
            return Ok(GeoReference::none());
        }

        let key_directory: Vec<u16> = tiff_reader
            .read_tag_values(reader, ifd, tags::GEO_KEY_DIRECTORY_TAG)?
            .into_iter()
            .map(|v| v as u16)
            .collect();

        let double_params = if ifd.has_tag(tags::GEO_DOUBLE_PARAMS_TAG) {
            tiff_reader.read_f64_values(reader, ifd, tags::GEO_DOUBLE_PARAMS_TAG)?
        } else {
            Vec::new()
        };

        let ascii_params = if ifd.has_tag(tags::GEO_ASCII_PARAMS_TAG) {
            tiff_reader.read_ascii(reader, ifd, tags::GEO_ASCII_PARAMS_TAG)?
        } else {
            String::new()
        };

        let georef = GeoReference {
            key_directory,
            double_params,
            ascii_params,
        };
        debug!("GeoKey directory with {} keys, CRS {}", georef.keys().len(), georef);
        Ok(georef)
    }
}
