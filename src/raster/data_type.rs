//! Pixel sample datatypes

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tiff::constants::sample_format;
use crate::tiff::errors::{TiffError, TiffResult};

/// Sample datatype of a raster band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl DataType {
    /// Size of one sample in bytes
    pub fn size(&self) -> usize {
        match self {
            DataType::U8 | DataType::I8 => 1,
            DataType::U16 | DataType::I16 => 2,
            DataType::U32 | DataType::I32 | DataType::F32 => 4,
            DataType::U64 | DataType::I64 | DataType::F64 => 8,
        }
    }

    /// Bits per sample as written to the BitsPerSample tag
    pub fn bits(&self) -> u16 {
        (self.size() * 8) as u16
    }

    /// Value for the TIFF SampleFormat tag
    pub fn sample_format(&self) -> u16 {
        match self {
            DataType::U8 | DataType::U16 | DataType::U32 | DataType::U64 => sample_format::UNSIGNED,
            DataType::I8 | DataType::I16 | DataType::I32 | DataType::I64 => sample_format::SIGNED,
            DataType::F32 | DataType::F64 => sample_format::IEEEFP,
        }
    }

    /// Resolves the datatype from TIFF SampleFormat and BitsPerSample values
    ///
    /// A missing or VOID sample format is read as unsigned, which is what
    /// TIFF 6.0 readers assume.
    pub fn from_tiff(format: u16, bits: u16) -> TiffResult<Self> {
        let data_type = match (format, bits) {
            (sample_format::UNSIGNED | sample_format::VOID, 8) => DataType::U8,
            (sample_format::UNSIGNED | sample_format::VOID, 16) => DataType::U16,
            (sample_format::UNSIGNED | sample_format::VOID, 32) => DataType::U32,
            (sample_format::UNSIGNED | sample_format::VOID, 64) => DataType::U64,
            (sample_format::SIGNED, 8) => DataType::I8,
            (sample_format::SIGNED, 16) => DataType::I16,
            (sample_format::SIGNED, 32) => DataType::I32,
            (sample_format::SIGNED, 64) => DataType::I64,
            (sample_format::IEEEFP, 32) => DataType::F32,
            (sample_format::IEEEFP, 64) => DataType::F64,
            _ => {
                return Err(TiffError::UnsupportedSampleLayout(format!(
                    "sample format {} with {} bits per sample", format, bits
                )))
            }
        };
        Ok(data_type)
    }

    /// Little-endian encoding of the largest value of this type
    ///
    /// Used to paint annotation outlines that stand out in any band.
    pub fn max_value_le(&self) -> Vec<u8> {
        match self {
            DataType::U8 => u8::MAX.to_le_bytes().to_vec(),
            DataType::I8 => i8::MAX.to_le_bytes().to_vec(),
            DataType::U16 => u16::MAX.to_le_bytes().to_vec(),
            DataType::I16 => i16::MAX.to_le_bytes().to_vec(),
            DataType::U32 => u32::MAX.to_le_bytes().to_vec(),
            DataType::I32 => i32::MAX.to_le_bytes().to_vec(),
            DataType::U64 => u64::MAX.to_le_bytes().to_vec(),
            DataType::I64 => i64::MAX.to_le_bytes().to_vec(),
            DataType::F32 => f32::MAX.to_le_bytes().to_vec(),
            DataType::F64 => f64::MAX.to_le_bytes().to_vec(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::U8 => "uint8",
            DataType::I8 => "int8",
            DataType::U16 => "uint16",
            DataType::I16 => "int16",
            DataType::U32 => "uint32",
            DataType::I32 => "int32",
            DataType::U64 => "uint64",
            DataType::I64 => "int64",
            DataType::F32 => "float32",
            DataType::F64 => "float64",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiff_codes_resolve() {
        assert_eq!(DataType::from_tiff(1, 8).unwrap(), DataType::U8);
        assert_eq!(DataType::from_tiff(2, 16).unwrap(), DataType::I16);
        assert_eq!(DataType::from_tiff(3, 32).unwrap(), DataType::F32);
        assert_eq!(DataType::from_tiff(4, 16).unwrap(), DataType::U16);
        assert!(DataType::from_tiff(1, 12).is_err());
        assert!(DataType::from_tiff(3, 16).is_err());
    }

    #[test]
    fn test_sizes_match_bits() {
        for dt in [DataType::U8, DataType::I16, DataType::F32, DataType::F64] {
            assert_eq!(dt.bits() as usize, dt.size() * 8);
            assert_eq!(dt.max_value_le().len(), dt.size());
            assert_eq!(DataType::from_tiff(dt.sample_format(), dt.bits()).unwrap(), dt);
        }
    }
}
