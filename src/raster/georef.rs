//! Coordinate reference metadata carried by a raster
//!
//! GeoTIFF describes the CRS with a GeoKey directory plus optional double
//! and ASCII parameter blocks. Tiling and stitching never interpret the CRS,
//! they only carry it from input to output, so the three blocks are kept
//! raw and copied verbatim.

use std::fmt;

use crate::tiff::constants::{geo_keys, model_type, raster_type};

/// One key of a GeoKey directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeyEntry {
    pub key_id: u16,
    pub tiff_tag_location: u16,
    pub count: u16,
    pub value_offset: u16,
}

impl GeoKeyEntry {
    /// Create a new GeoKey entry
    pub fn new(key_id: u16, tiff_tag_location: u16, count: u16, value_offset: u16) -> Self {
        GeoKeyEntry {
            key_id,
            tiff_tag_location,
            count,
            value_offset,
        }
    }
}

/// Raw GeoTIFF coordinate reference blocks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoReference {
    /// GeoKeyDirectoryTag values (header of 4 shorts, then 4 shorts per key)
    pub key_directory: Vec<u16>,
    /// GeoDoubleParamsTag values
    pub double_params: Vec<f64>,
    /// GeoAsciiParamsTag contents, without the trailing NUL
    pub ascii_params: String,
}

impl GeoReference {
    /// A raster without coordinate reference information
    pub fn none() -> Self {
        Self::default()
    }

    /// Minimal GeoKey directory for an EPSG code
    ///
    /// Codes in the 4000-4999 range are geographic CRSs, everything else is
    /// recorded as a projected CRS.
    pub fn from_epsg(epsg: u16) -> Self {
        let geographic = (4000..5000).contains(&epsg);
        let (model, crs_key) = if geographic {
            (model_type::GEOGRAPHIC, geo_keys::GEOGRAPHIC_TYPE)
        } else {
            (model_type::PROJECTED, geo_keys::PROJECTED_CS_TYPE)
        };

        let keys = [
            GeoKeyEntry::new(geo_keys::MODEL_TYPE, 0, 1, model),
            GeoKeyEntry::new(geo_keys::RASTER_TYPE, 0, 1, raster_type::PIXEL_IS_AREA),
            GeoKeyEntry::new(crs_key, 0, 1, epsg),
        ];

        let mut key_directory = vec![1, 1, 0, keys.len() as u16];
        for key in keys {
            key_directory.extend_from_slice(&[key.key_id, key.tiff_tag_location, key.count, key.value_offset]);
        }

        GeoReference {
            key_directory,
            double_params: Vec::new(),
            ascii_params: String::new(),
        }
    }

    /// Whether no GeoKey directory is present
    pub fn is_empty(&self) -> bool {
        self.key_directory.is_empty()
    }

    /// Parse the key entries out of the directory
    ///
    /// A directory whose header announces more keys than it holds yields the
    /// keys that are actually present.
    pub fn keys(&self) -> Vec<GeoKeyEntry> {
        if self.key_directory.len() < 4 {
            return Vec::new();
        }
        let announced = self.key_directory[3] as usize;

        self.key_directory[4..]
            .chunks_exact(4)
            .take(announced)
            .map(|k| GeoKeyEntry::new(k[0], k[1], k[2], k[3]))
            .collect()
    }

    /// EPSG code of the CRS, if the directory names one
    ///
    /// ProjectedCSTypeGeoKey wins over GeographicTypeGeoKey; user-defined
    /// codes are not EPSG codes.
    pub fn epsg(&self) -> Option<u32> {
        let keys = self.keys();
        let lookup = |key_id: u16| {
            keys.iter()
                .find(|k| k.key_id == key_id && k.tiff_tag_location == 0)
                .map(|k| k.value_offset)
                .filter(|&v| v != 0 && v != geo_keys::USER_DEFINED)
        };

        lookup(geo_keys::PROJECTED_CS_TYPE)
            .or_else(|| lookup(geo_keys::GEOGRAPHIC_TYPE))
            .map(u32::from)
    }

    /// Citation string from the ASCII parameters, if any
    pub fn citation(&self) -> Option<&str> {
        let key = self.keys().into_iter().find(|k| k.key_id == geo_keys::CITATION)?;
        let start = key.value_offset as usize;
        let end = start + key.count as usize;
        self.ascii_params
            .get(start..end.min(self.ascii_params.len()))
            .map(|s| s.trim_end_matches('|'))
    }
}

impl fmt::Display for GeoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.epsg(), self.is_empty()) {
            (Some(code), _) => write!(f, "EPSG:{}", code),
            (None, true) => write!(f, "none"),
            (None, false) => write!(f, "custom ({} keys)", self.keys().len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsg_round_trip() {
        assert_eq!(GeoReference::from_epsg(32633).epsg(), Some(32633));
        assert_eq!(GeoReference::from_epsg(4326).epsg(), Some(4326));
        assert_eq!(GeoReference::none().epsg(), None);
    }

    #[test]
    fn test_user_defined_code_is_not_epsg() {
        let mut georef = GeoReference::from_epsg(32633);
        let last = georef.key_directory.len() - 1;
        georef.key_directory[last] = geo_keys::USER_DEFINED;
        assert_eq!(georef.epsg(), None);
        assert_eq!(georef.to_string(), "custom (3 keys)");
    }

    #[test]
    fn test_truncated_directory_keeps_present_keys() {
        let mut georef = GeoReference::from_epsg(3857);
        georef.key_directory[3] = 10;
        assert_eq!(georef.keys().len(), 3);
    }

    #[test]
    fn test_citation_lookup() {
        let georef = GeoReference {
            key_directory: vec![1, 1, 0, 1, geo_keys::CITATION, 34737, 8, 0],
            double_params: Vec::new(),
            ascii_params: "UTM 33N|".to_string(),
        };
        assert_eq!(georef.citation(), Some("UTM 33N"));
    }
}
