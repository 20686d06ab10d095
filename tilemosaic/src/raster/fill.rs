//! Start-buffer fill values.
//!
//! Before any tile is pasted, the mosaic buffer is primed so that
//! uncovered pixels read as "no data". Levels that declare a no-data
//! value get it in every band, cast to the buffer's sample type; levels
//! without one fall back to the request's background color.

use super::buffer::{PixelBuffer, SampleType};

/// Fills every pixel of `buf` according to the no-data policy.
///
/// With a declared `no_data` value, all samples receive that value cast
/// (saturating) to the buffer's sample type. Without one, each band
/// receives the matching background color component; bands past the
/// fourth repeat the alpha component.
pub fn fill(buf: &mut PixelBuffer, no_data: Option<f64>, background: [u8; 4]) {
    match no_data {
        Some(value) => fill_uniform(buf, value),
        None => fill_background(buf, background),
    }
}

fn fill_uniform(buf: &mut PixelBuffer, value: f64) {
    let ty = buf.sample_type();
    if ty == SampleType::U8 {
        // Single-byte samples collapse to a plain byte fill.
        #[allow(clippy::cast_possible_truncation)]
        let byte = value.round() as u8;
        buf.data_mut().fill(byte);
        return;
    }
    let (pattern, len) = sample_pattern(ty, value);
    for chunk in buf.data_mut().chunks_exact_mut(len) {
        chunk.copy_from_slice(&pattern[..len]);
    }
}

fn fill_background(buf: &mut PixelBuffer, background: [u8; 4]) {
    let ty = buf.sample_type();
    let bands = buf.bands();
    let size = ty.size_bytes();

    // Build one full pixel's byte pattern, then stamp it across.
    let mut pixel = vec![0u8; usize::from(bands) * size];
    for band in 0..bands {
        let component = background[usize::from(band.min(3))];
        ty.write(&mut pixel[usize::from(band) * size..], f64::from(component));
    }
    for chunk in buf.data_mut().chunks_exact_mut(pixel.len()) {
        chunk.copy_from_slice(&pixel);
    }
}

fn sample_pattern(ty: SampleType, value: f64) -> ([u8; 8], usize) {
    let mut pattern = [0u8; 8];
    ty.write(&mut pattern, value);
    (pattern, ty.size_bytes())
}
