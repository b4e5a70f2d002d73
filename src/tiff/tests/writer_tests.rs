//! Builder and writer tests, read back through the reader

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use crate::raster::data_type::DataType;
use crate::raster::georef::GeoReference;
use crate::raster::transform::GeoTransform;
use crate::tiff::builder::TiffBuilder;
use crate::tiff::constants::{compression, tags};
use crate::tiff::geo_key_parser::GeoKeyParser;
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use crate::utils::logger::Logger;

fn write_small(path: &Path, big_tiff: bool, logger: Option<&Logger>) -> u64 {
    let mut builder = TiffBuilder::new(big_tiff);
    if let Some(logger) = logger {
        builder = builder.with_logger(logger);
    }
    let ifd = builder.add_ifd(IFD::new(0, 0));
    builder.add_image_structure(ifd, 4, 3, 1, DataType::U8, compression::NONE).unwrap();
    builder.setup_strips(ifd, vec![(0u8..8).collect(), (8u8..12).collect()], 2).unwrap();
    builder.add_transform(ifd, &GeoTransform::new(500000.0, 4100000.0, 10.0, -10.0)).unwrap();
    builder.add_georeference(ifd, &GeoReference::from_epsg(32633)).unwrap();
    builder.add_software_tag(ifd, "rastertile test").unwrap();
    builder.write(path).unwrap()
}

#[test]
fn test_written_tags_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.tif");
    let size = write_small(&path, false, None);
    assert_eq!(size, fs::metadata(&path).unwrap().len());

    let mut tiff_reader = TiffReader::new();
    let tiff = tiff_reader.load(&path).unwrap();
    assert!(!tiff.is_big_tiff);
    let ifd = tiff.require_main_ifd().unwrap();
    assert_eq!(ifd.get_dimensions(), Some((4, 3)));
    assert_eq!(ifd.get_tag_value(tags::ROWS_PER_STRIP), Some(2));

    let mut reader = BufReader::new(File::open(&path).unwrap());
    assert_eq!(tiff_reader.read_ascii(&mut reader, ifd, tags::SOFTWARE).unwrap(), "rastertile test");
    assert_eq!(tiff_reader.read_tag_values(&mut reader, ifd, tags::STRIP_BYTE_COUNTS).unwrap(), vec![8, 4]);

    let transform = GeoKeyParser::read_transform(&tiff_reader, &mut reader, ifd).unwrap();
    assert!(transform.approx_eq(&GeoTransform::new(500000.0, 4100000.0, 10.0, -10.0), 1e-9));
    let georef = GeoKeyParser::read_georeference(&tiff_reader, &mut reader, ifd).unwrap();
    assert_eq!(georef.epsg(), Some(32633));
}

#[test]
fn test_bigtiff_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.tif");
    write_small(&path, true, None);

    let tiff = TiffReader::new().load(&path).unwrap();
    assert!(tiff.is_big_tiff);
    assert_eq!(tiff.require_main_ifd().unwrap().get_dimensions(), Some((4, 3)));
}

#[test]
fn test_writes_are_logged() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("run.log");
    let logger = Logger::new(log_path.to_str().unwrap()).unwrap();

    let path = dir.path().join("logged.tif");
    write_small(&path, false, Some(&logger));

    let log = fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("logged.tif"));
}

#[test]
fn test_invalid_ifd_index() {
    let mut builder = TiffBuilder::new(false);
    assert!(builder.add_image_structure(0, 4, 3, 1, DataType::U8, compression::NONE).is_err());
    assert!(builder.add_software_tag(2, "x").is_err());
}
