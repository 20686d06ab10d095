//! Resampling a source buffer onto a target window.
//!
//! The mosaic buffer covers the expanded request envelope at the
//! level's native resolution; the caller wants an exact output
//! rectangle at its own resolution. [`resample_window`] bridges the
//! two: output pixel centers map into source pixel space, the chosen
//! kernel interpolates there, and the result always has exactly the
//! requested dimensions.

use crate::geo;

use super::buffer::{PixelBuffer, RasterError};

/// Interpolation kernel for the final resample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Nearest neighbor, the cheapest and the default
    #[default]
    Nearest,
    /// Weighted average of the four surrounding pixels
    Bilinear,
    /// Catmull-Rom cubic over a 4x4 neighborhood
    Bicubic,
}

/// Resamples `src` onto an `out_w` x `out_h` buffer of the same layout.
///
/// `origin` is the output window's top-left corner in source pixel
/// units and `step` the source pixels advanced per output pixel, so an
/// integral origin with a step of one is an exact copy. Output pixel
/// `(ox, oy)` samples the source at
/// `origin + (o + 0.5) * step - 0.5`, clamped to the source edges.
///
/// # Errors
///
/// Fails when the output shape is degenerate or its backing memory
/// cannot be allocated.
pub fn resample_window(
    src: &PixelBuffer,
    origin: (f64, f64),
    step: (f64, f64),
    out_w: u32,
    out_h: u32,
    kernel: Interpolation,
) -> Result<PixelBuffer, RasterError> {
    let mut out = PixelBuffer::try_blank(out_w, out_h, src.bands(), src.sample_type())?;
    match kernel {
        Interpolation::Nearest => resample_nearest(src, &mut out, origin, step),
        Interpolation::Bilinear => resample_linear(src, &mut out, origin, step),
        Interpolation::Bicubic => resample_cubic(src, &mut out, origin, step),
    }
    Ok(out)
}

/// Source coordinate sampled by output pixel `index`.
#[inline]
fn source_coord(index: u32, origin: f64, step: f64) -> f64 {
    origin + (f64::from(index) + 0.5) * step - 0.5
}

/// Rounds a source coordinate to its nearest in-bounds pixel index.
fn nearest_index(coord: f64, max_index: u32) -> u32 {
    let clamped = geo::round_px(coord).clamp(0, i64::from(max_index));
    #[allow(clippy::cast_sign_loss)]
    {
        clamped as u32
    }
}

/// Clamps a tap index into the valid range.
fn tap(base: i64, delta: i64, max_index: u32) -> u32 {
    let clamped = (base + delta).clamp(0, i64::from(max_index));
    #[allow(clippy::cast_sign_loss)]
    {
        clamped as u32
    }
}

fn resample_nearest(
    src: &PixelBuffer,
    out: &mut PixelBuffer,
    origin: (f64, f64),
    step: (f64, f64),
) {
    let ps = src.pixel_stride();
    let max_x = src.width() - 1;
    let max_y = src.height() - 1;
    let out_w = out.width();
    let out_h = out.height();

    for oy in 0..out_h {
        let sy = nearest_index(source_coord(oy, origin.1, step.1), max_y);
        for ox in 0..out_w {
            let sx = nearest_index(source_coord(ox, origin.0, step.0), max_x);
            let from = (sy as usize * src.width() as usize + sx as usize) * ps;
            let to = (oy as usize * out_w as usize + ox as usize) * ps;
            out.data_mut()[to..to + ps].copy_from_slice(&src.data()[from..from + ps]);
        }
    }
}

fn resample_linear(src: &PixelBuffer, out: &mut PixelBuffer, origin: (f64, f64), step: (f64, f64)) {
    let max_x = src.width() - 1;
    let max_y = src.height() - 1;

    for oy in 0..out.height() {
        let sy = source_coord(oy, origin.1, step.1).clamp(0.0, f64::from(max_y));
        let y_base = sy.floor();
        let fy = sy - y_base;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let y0 = y_base as u32;
        let y1 = (y0 + 1).min(max_y);

        for ox in 0..out.width() {
            let sx = source_coord(ox, origin.0, step.0).clamp(0.0, f64::from(max_x));
            let x_base = sx.floor();
            let fx = sx - x_base;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let x0 = x_base as u32;
            let x1 = (x0 + 1).min(max_x);

            for band in 0..src.bands() {
                let v00 = src.sample(x0, y0, band);
                let v10 = src.sample(x1, y0, band);
                let v01 = src.sample(x0, y1, band);
                let v11 = src.sample(x1, y1, band);
                let top = v00 + (v10 - v00) * fx;
                let bottom = v01 + (v11 - v01) * fx;
                out.put_sample(ox, oy, band, top + (bottom - top) * fy);
            }
        }
    }
}

fn resample_cubic(src: &PixelBuffer, out: &mut PixelBuffer, origin: (f64, f64), step: (f64, f64)) {
    let max_x = src.width() - 1;
    let max_y = src.height() - 1;

    for oy in 0..out.height() {
        let sy = source_coord(oy, origin.1, step.1).clamp(0.0, f64::from(max_y));
        let y_base = sy.floor();
        let fy = sy - y_base;
        #[allow(clippy::cast_possible_truncation)]
        let yb = y_base as i64;
        let ys = [
            tap(yb, -1, max_y),
            tap(yb, 0, max_y),
            tap(yb, 1, max_y),
            tap(yb, 2, max_y),
        ];
        let wy = [
            cubic_weight(fy + 1.0),
            cubic_weight(fy),
            cubic_weight(1.0 - fy),
            cubic_weight(2.0 - fy),
        ];

        for ox in 0..out.width() {
            let sx = source_coord(ox, origin.0, step.0).clamp(0.0, f64::from(max_x));
            let x_base = sx.floor();
            let fx = sx - x_base;
            #[allow(clippy::cast_possible_truncation)]
            let xb = x_base as i64;
            let xs = [
                tap(xb, -1, max_x),
                tap(xb, 0, max_x),
                tap(xb, 1, max_x),
                tap(xb, 2, max_x),
            ];
            let wx = [
                cubic_weight(fx + 1.0),
                cubic_weight(fx),
                cubic_weight(1.0 - fx),
                cubic_weight(2.0 - fx),
            ];

            for band in 0..src.bands() {
                let mut acc = 0.0;
                for (row, &weight_y) in wy.iter().enumerate() {
                    let mut row_acc = 0.0;
                    for (col, &weight_x) in wx.iter().enumerate() {
                        row_acc += weight_x * src.sample(xs[col], ys[row], band);
                    }
                    acc += weight_y * row_acc;
                }
                out.put_sample(ox, oy, band, acc);
            }
        }
    }
}

/// Catmull-Rom cubic kernel (a = -0.5).
fn cubic_weight(t: f64) -> f64 {
    const A: f64 = -0.5;
    let t = t.abs();
    if t <= 1.0 {
        ((A + 2.0) * t - (A + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((A * t - 5.0 * A) * t + 8.0 * A) * t - 4.0 * A
    } else {
        0.0
    }
}
