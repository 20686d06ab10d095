//! Color-keyed transparency for finished mosaics.

use tracing::warn;

use super::buffer::{PixelBuffer, RasterError, SampleType};

/// Builds an RGBA copy of `src` with `color` keyed out.
///
/// Every pixel whose first three bands match `color` exactly gets a
/// zero alpha; everything else keeps its original alpha (or becomes
/// fully opaque when the source has no alpha band). Only 8-bit
/// three and four band buffers can be keyed; anything else returns
/// `Ok(None)` and the caller is expected to pass the mosaic through
/// unchanged.
///
/// # Errors
///
/// Fails when the RGBA copy cannot be allocated.
pub fn transparent_mask(
    src: &PixelBuffer,
    color: [u8; 3],
) -> Result<Option<PixelBuffer>, RasterError> {
    if src.sample_type() != SampleType::U8 || !matches!(src.bands(), 3 | 4) {
        warn!(
            bands = src.bands(),
            sample_type = ?src.sample_type(),
            "transparency requested on a buffer that cannot be keyed"
        );
        return Ok(None);
    }

    let mut out = PixelBuffer::try_blank(src.width(), src.height(), 4, SampleType::U8)?;
    let stride = src.pixel_stride();
    let has_alpha = src.bands() == 4;

    for (from, to) in src
        .data()
        .chunks_exact(stride)
        .zip(out.data_mut().chunks_exact_mut(4))
    {
        to[..3].copy_from_slice(&from[..3]);
        if from[..3] == color {
            to[3] = 0;
        } else if has_alpha {
            to[3] = from[3];
        } else {
            to[3] = u8::MAX;
        }
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_pair(keyed: [u8; 3], other: [u8; 3]) -> PixelBuffer {
        let data = [keyed, other].concat();
        PixelBuffer::new(2, 1, 3, SampleType::U8, data).unwrap()
    }

    #[test]
    fn test_keyed_color_becomes_transparent() {
        let src = rgb_pair([10, 20, 30], [40, 50, 60]);
        let out = transparent_mask(&src, [10, 20, 30]).unwrap().unwrap();
        assert_eq!(out.bands(), 4);
        assert_eq!(out.data(), &[10, 20, 30, 0, 40, 50, 60, 255]);
    }

    #[test]
    fn test_rgba_source_keeps_unmatched_alpha() {
        let data = vec![1, 2, 3, 128, 9, 9, 9, 128];
        let src = PixelBuffer::new(2, 1, 4, SampleType::U8, data).unwrap();
        let out = transparent_mask(&src, [9, 9, 9]).unwrap().unwrap();
        assert_eq!(out.data(), &[1, 2, 3, 128, 9, 9, 9, 0]);
    }

    #[test]
    fn test_partial_match_stays_opaque() {
        let src = rgb_pair([10, 20, 30], [10, 20, 31]);
        let out = transparent_mask(&src, [10, 20, 30]).unwrap().unwrap();
        assert_eq!(out.sample(0, 0, 3), 0.0);
        assert_eq!(out.sample(1, 0, 3), 255.0);
    }

    #[test]
    fn test_unsupported_layouts_pass_through() {
        let gray = PixelBuffer::try_blank(2, 2, 1, SampleType::U8).unwrap();
        assert!(transparent_mask(&gray, [0, 0, 0]).unwrap().is_none());

        let deep = PixelBuffer::try_blank(2, 2, 3, SampleType::U16).unwrap();
        assert!(transparent_mask(&deep, [0, 0, 0]).unwrap().is_none());
    }
}
