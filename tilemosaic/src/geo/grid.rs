//! Pixel-grid arithmetic shared by the clip and paste steps.
//!
//! Tile pixels land on the mosaic grid through one rule: world offsets
//! divided by the level resolution, rounded to the nearest pixel with
//! ties away from zero. The decode step uses it to cut a tile's clip
//! window and the compositor uses it to place the result, so both sides
//! always agree on the same grid cell even when envelopes do not fall
//! exactly on pixel boundaries.

use super::Envelope;

/// Rounds a pixel-space coordinate to the nearest integer.
///
/// Ties round away from zero: `2.5` becomes `3` and `-2.5` becomes `-3`.
#[inline]
pub fn round_px(value: f64) -> i64 {
    #[allow(clippy::cast_possible_truncation)]
    {
        value.round() as i64
    }
}

/// Pixel offset of `inner`'s top-left corner within `outer`.
///
/// X grows rightward from `outer.min_x`, Y grows downward from
/// `outer.max_y`; both are rounded with [`round_px`]. The offset may be
/// negative when `inner` sticks out of `outer`.
pub fn paste_offset(outer: &Envelope, inner: &Envelope, res_x: f64, res_y: f64) -> (i64, i64) {
    (
        round_px((inner.min_x - outer.min_x) / res_x),
        round_px((outer.max_y - inner.max_y) / res_y),
    )
}

/// Pixel span of an envelope at the given resolution.
///
/// A span of zero means the envelope is narrower than half a pixel and
/// carries nothing worth rendering.
pub fn pixel_span(env: &Envelope, res_x: f64, res_y: f64) -> (i64, i64) {
    (
        round_px(env.width() / res_x),
        round_px(env.height() / res_y),
    )
}

/// Grows `env` outward until every edge lands on the level's pixel grid.
///
/// The grid is anchored at `anchor` (the level extent's minimum corner)
/// and its unit is `span_px` whole pixels, so boundary tiles that only
/// partially overlap the request still fall inside the grown envelope.
/// An envelope already on the grid comes back unchanged.
pub fn snap_outward(
    env: &Envelope,
    anchor: (f64, f64),
    res_x: f64,
    res_y: f64,
    span_px: u32,
) -> Envelope {
    let unit_x = res_x * f64::from(span_px.max(1));
    let unit_y = res_y * f64::from(span_px.max(1));
    Envelope {
        min_x: anchor.0 + ((env.min_x - anchor.0) / unit_x).floor() * unit_x,
        min_y: anchor.1 + ((env.min_y - anchor.1) / unit_y).floor() * unit_y,
        max_x: anchor.0 + ((env.max_x - anchor.0) / unit_x).ceil() * unit_x,
        max_y: anchor.1 + ((env.max_y - anchor.1) / unit_y).ceil() * unit_y,
    }
}

/// Converts a pixel count to `u32`, rejecting negatives and overflow.
#[inline]
pub fn px_to_u32(value: i64) -> Option<u32> {
    u32::try_from(value).ok()
}
