//! Helpers for decoding strip and tile blocks
//!
//! Blocks arrive decompressed with samples already converted to
//! little-endian; these functions undo the predictor and scatter samples
//! into band-sequential rasters.

use crate::tiff::errors::{TiffError, TiffResult};

/// Undo TIFF horizontal differencing (Predictor = 2) in place
///
/// Each sample is stored as the difference to the same band of the pixel
/// on its left, so rows are re-accumulated with wrapping integer adds.
///
/// # Arguments
/// * `data` - Block samples, little-endian
/// * `row_pixels` - Pixels per block row
/// * `samples_per_pixel` - Interleaved samples per pixel in this block
/// * `sample_size` - Bytes per sample
pub fn undo_horizontal_predictor(
    data: &mut [u8],
    row_pixels: usize,
    samples_per_pixel: usize,
    sample_size: usize,
) -> TiffResult<()> {
    let row_samples = row_pixels * samples_per_pixel;
    let row_bytes = row_samples * sample_size;
    if row_bytes == 0 {
        return Ok(());
    }

    for row in data.chunks_exact_mut(row_bytes) {
        match sample_size {
            1 => {
                for i in samples_per_pixel..row_samples {
                    row[i] = row[i].wrapping_add(row[i - samples_per_pixel]);
                }
            }
            2 => accumulate::<2>(row, samples_per_pixel, |a, b| {
                u16::from_le_bytes(a).wrapping_add(u16::from_le_bytes(b)).to_le_bytes()
            }),
            4 => accumulate::<4>(row, samples_per_pixel, |a, b| {
                u32::from_le_bytes(a).wrapping_add(u32::from_le_bytes(b)).to_le_bytes()
            }),
            8 => accumulate::<8>(row, samples_per_pixel, |a, b| {
                u64::from_le_bytes(a).wrapping_add(u64::from_le_bytes(b)).to_le_bytes()
            }),
            other => {
                return Err(TiffError::UnsupportedSampleLayout(format!(
                    "horizontal predictor on {}-byte samples", other
                )))
            }
        }
    }
    Ok(())
}

fn accumulate<const N: usize>(row: &mut [u8], stride: usize, add: impl Fn([u8; N], [u8; N]) -> [u8; N]) {
    let samples = row.len() / N;
    for i in stride..samples {
        let mut current = [0u8; N];
        let mut left = [0u8; N];
        current.copy_from_slice(&row[i * N..(i + 1) * N]);
        left.copy_from_slice(&row[(i - stride) * N..(i - stride + 1) * N]);
        row[i * N..(i + 1) * N].copy_from_slice(&add(current, left));
    }
}

/// Copy one row of interleaved samples into a single band row
///
/// Picks sample `band` out of every `samples_per_pixel` group.
pub fn deinterleave_row(src: &[u8], dst: &mut [u8], band: usize, samples_per_pixel: usize, sample_size: usize) {
    let pixel_size = samples_per_pixel * sample_size;
    let offset = band * sample_size;
    for (pixel, out) in dst.chunks_exact_mut(sample_size).enumerate() {
        let start = pixel * pixel_size + offset;
        out.copy_from_slice(&src[start..start + sample_size]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predictor_bytes_per_band() {
        // Two pixels of RGB, second pixel stored as differences
        let mut data = vec![10, 20, 30, 1, 2, 3];
        undo_horizontal_predictor(&mut data, 2, 3, 1).unwrap();
        assert_eq!(data, vec![10, 20, 30, 11, 22, 33]);
    }

    #[test]
    fn test_predictor_u16_wraps() {
        let mut data = Vec::new();
        for v in [65535u16, 2, 3] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        undo_horizontal_predictor(&mut data, 3, 1, 2).unwrap();
        let values: Vec<u16> = data.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
        assert_eq!(values, vec![65535, 1, 4]);
    }

    #[test]
    fn test_predictor_rows_are_independent() {
        let mut data = vec![1, 1, 5, 1];
        undo_horizontal_predictor(&mut data, 2, 1, 1).unwrap();
        assert_eq!(data, vec![1, 2, 5, 6]);
    }

    #[test]
    fn test_deinterleave() {
        let src = [1u8, 2, 3, 4, 5, 6];
        let mut dst = [0u8; 2];
        deinterleave_row(&src, &mut dst, 1, 3, 1);
        assert_eq!(dst, [2, 5]);
    }
}
