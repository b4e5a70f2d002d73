//! GeoTIFF tag strategies
//!
//! Writes the tags that place an image on the map: the affine transform and
//! the coordinate reference blocks.

use log::debug;

use crate::raster::georef::GeoReference;
use crate::raster::transform::GeoTransform;
use crate::tiff::constants::tags;
use crate::tiff::ifd::IFD;
use crate::utils::tiff_utils::{self, ExternalData};

/// Handles GeoTIFF tags and transformations
pub struct GeoTagsBuilder;

impl GeoTagsBuilder {
    /// Write the pixel to map transform
    ///
    /// North-up transforms become a tiepoint at raster (0, 0) plus a pixel
    /// scale, which every GeoTIFF reader understands. Rotated or south-up
    /// transforms need the full ModelTransformation matrix. Identity
    /// transforms mark an image without georeferencing and write nothing.
    pub fn add_transform(
        ifd: &mut IFD,
        external_data: &mut ExternalData,
        ifd_index: usize,
        transform: &GeoTransform,
        is_big_tiff: bool,
    ) {
        for tag in [tags::MODEL_TIEPOINT_TAG, tags::MODEL_PIXEL_SCALE_TAG, tags::MODEL_TRANSFORMATION_TAG] {
            ifd.remove_entry(tag);
            external_data.remove(&(ifd_index, tag));
        }

        if transform.is_identity() {
            debug!("Identity transform, no georeferencing tags written");
            return;
        }

        if transform.is_tiepoint_expressible() {
            debug!("Writing tiepoint and pixel scale: origin ({}, {}), pixel size {} x {}",
                  transform.origin_x, transform.origin_y, transform.pixel_width, transform.pixel_height);
            tiff_utils::add_double_tag(ifd, external_data, ifd_index,
                                       tags::MODEL_TIEPOINT_TAG, &transform.tiepoint(), is_big_tiff);
            tiff_utils::add_double_tag(ifd, external_data, ifd_index,
                                       tags::MODEL_PIXEL_SCALE_TAG, &transform.pixel_scale(), is_big_tiff);
        } else {
            debug!("Writing ModelTransformation: {:?}", transform.to_gdal());
            tiff_utils::add_double_tag(ifd, external_data, ifd_index,
                                       tags::MODEL_TRANSFORMATION_TAG, &transform.to_model_transformation(), is_big_tiff);
        }
    }

    /// Write the GeoKey directory and its parameter blocks verbatim
    pub fn add_georeference(
        ifd: &mut IFD,
        external_data: &mut ExternalData,
        ifd_index: usize,
        georef: &GeoReference,
        is_big_tiff: bool,
    ) {
        if georef.is_empty() {
            debug!("No coordinate reference to write");
            return;
        }

        debug!("Writing GeoKey directory ({} keys, CRS {})", georef.keys().len(), georef);
        tiff_utils::add_short_tag(ifd, external_data, ifd_index,
                                  tags::GEO_KEY_DIRECTORY_TAG, &georef.key_directory, is_big_tiff);

        if !georef.double_params.is_empty() {
            tiff_utils::add_double_tag(ifd, external_data, ifd_index,
                                       tags::GEO_DOUBLE_PARAMS_TAG, &georef.double_params, is_big_tiff);
        }
        if !georef.ascii_params.is_empty() {
            tiff_utils::add_ascii_tag(ifd, external_data, ifd_index,
                                      tags::GEO_ASCII_PARAMS_TAG, &georef.ascii_params, is_big_tiff);
        }
    }
}
