//! TIFF file construction
//!
//! `TiffBuilder` collects IFDs, tag data and strips, then hands them to the
//! writer. Tag construction is delegated to the strategies in `builders`.

use std::path::Path;

use log::{debug, error};

use crate::raster::data_type::DataType;
use crate::raster::georef::GeoReference;
use crate::raster::transform::GeoTransform;
use crate::tiff::builders::basic_tags::{BasicTagsBuilder, StripData};
use crate::tiff::builders::geo_tags::GeoTagsBuilder;
use crate::tiff::builders::writer::WriterBuilder;
use crate::tiff::constants::tags;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::utils::logger::Logger;
use crate::utils::tiff_utils::{self, ExternalData};

/// Builder for creating TIFF files
pub struct TiffBuilder<'a> {
    logger: Option<&'a Logger>,
    is_big_tiff: bool,
    pub ifds: Vec<IFD>,
    image_data: StripData,
    external_data: ExternalData,
}

impl<'a> TiffBuilder<'a> {
    /// Create a new TIFF builder
    pub fn new(is_big_tiff: bool) -> Self {
        debug!("Creating new TiffBuilder (is_big_tiff: {})", is_big_tiff);
        TiffBuilder {
            logger: None,
            is_big_tiff,
            ifds: Vec::new(),
            image_data: StripData::new(),
            external_data: ExternalData::new(),
        }
    }

    /// Record written files in a run log
    pub fn with_logger(mut self, logger: &'a Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Whether the file will be written as BigTIFF
    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    /// Add an IFD to the TIFF
    pub fn add_ifd(&mut self, ifd: IFD) -> usize {
        let ifd_index = self.ifds.len();
        debug!("Adding IFD #{} to TiffBuilder", ifd_index);
        self.ifds.push(ifd);
        ifd_index
    }

    fn check_index(&self, ifd_index: usize) -> TiffResult<()> {
        if ifd_index >= self.ifds.len() {
            error!("Invalid IFD index {}, only have {} IFDs", ifd_index, self.ifds.len());
            return Err(TiffError::GenericError(format!(
                "Invalid IFD index {}, only have {} IFDs", ifd_index, self.ifds.len())));
        }
        Ok(())
    }

    /// Add dimensions, sample layout and photometric tags
    pub fn add_image_structure(
        &mut self,
        ifd_index: usize,
        width: u32,
        height: u32,
        bands: u16,
        data_type: DataType,
        compression: u16,
    ) -> TiffResult<()> {
        self.check_index(ifd_index)?;
        BasicTagsBuilder::add_image_structure(
            &mut self.ifds[ifd_index],
            &mut self.external_data,
            ifd_index,
            width,
            height,
            bands,
            data_type,
            compression,
            self.is_big_tiff,
        );
        Ok(())
    }

    /// Attach encoded strips of `rows_per_strip` rows each
    pub fn setup_strips(&mut self, ifd_index: usize, strips: Vec<Vec<u8>>, rows_per_strip: u32) -> TiffResult<()> {
        self.check_index(ifd_index)?;
        BasicTagsBuilder::setup_strips(
            &mut self.ifds[ifd_index],
            &mut self.external_data,
            &mut self.image_data,
            ifd_index,
            strips,
            rows_per_strip,
            self.is_big_tiff,
        );
        Ok(())
    }

    /// Add the pixel to map transform
    pub fn add_transform(&mut self, ifd_index: usize, transform: &GeoTransform) -> TiffResult<()> {
        self.check_index(ifd_index)?;
        GeoTagsBuilder::add_transform(
            &mut self.ifds[ifd_index],
            &mut self.external_data,
            ifd_index,
            transform,
            self.is_big_tiff,
        );
        Ok(())
    }

    /// Add the GeoKey directory and parameter blocks
    pub fn add_georeference(&mut self, ifd_index: usize, georef: &GeoReference) -> TiffResult<()> {
        self.check_index(ifd_index)?;
        GeoTagsBuilder::add_georeference(
            &mut self.ifds[ifd_index],
            &mut self.external_data,
            ifd_index,
            georef,
            self.is_big_tiff,
        );
        Ok(())
    }

    /// Add the Software tag
    pub fn add_software_tag(&mut self, ifd_index: usize, software: &str) -> TiffResult<()> {
        self.check_index(ifd_index)?;
        tiff_utils::add_ascii_tag(
            &mut self.ifds[ifd_index],
            &mut self.external_data,
            ifd_index,
            tags::SOFTWARE,
            software,
            self.is_big_tiff,
        );
        Ok(())
    }

    /// Write the TIFF file to disk, returning its size in bytes
    pub fn write(&self, output_path: &Path) -> TiffResult<u64> {
        debug!("Writing TIFF to {}", output_path.display());

        let size = WriterBuilder::write(
            self.is_big_tiff,
            &self.ifds,
            &self.image_data,
            &self.external_data,
            output_path,
        )?;

        if let Some(logger) = self.logger {
            logger.log(&format!("Wrote {} ({} bytes)", output_path.display(), size))?;
        }
        Ok(size)
    }
}
