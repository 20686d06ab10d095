//! Request model for mosaic reads.
//!
//! A [`MosaicRequest`] is what the caller asks for. Once a pyramid
//! level is chosen it becomes a [`RequestContext`], the immutable state
//! every stage of the pipeline shares for the lifetime of the request.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::geo::{self, Envelope};
use crate::level::LevelInfo;

/// Global counter for generating unique request IDs.
static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a mosaic request.
///
/// Request IDs are monotonically increasing and unique within a
/// process lifetime. Every log line a request emits carries its id, so
/// interleaved requests can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Creates a new unique request ID.
    pub fn new() -> Self {
        Self(REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric value of this request ID.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request-{}", self.0)
    }
}

/// Output raster dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetWindow {
    pub width: u32,
    pub height: u32,
}

impl TargetWindow {
    /// Creates a target window.
    ///
    /// # Panics
    ///
    /// Panics when either dimension is zero.
    pub fn new(width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0, "target window must not be empty");
        Self { width, height }
    }
}

/// One read request against a coverage.
///
/// `original` is the envelope exactly as the caller stated it. Callers
/// that reproject coordinates before querying set the store-side
/// envelope with [`with_transformed`](Self::with_transformed); the two
/// start out identical.
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicRequest {
    /// Requested envelope in the caller's reference system
    pub original: Envelope,

    /// The same request expressed in the store's reference system
    pub transformed: Envelope,

    /// Output raster dimensions
    pub target: TargetWindow,

    /// Whether the store's axis order is flipped relative to the caller's
    pub axis_swap: bool,

    /// Fill for pixels no tile covers, as RGBA components
    pub background: [u8; 4],

    /// Color to key out of the finished mosaic, when set
    pub transparent: Option<[u8; 3]>,
}

impl MosaicRequest {
    /// Creates a request for `envelope` rendered at `target` size.
    pub fn new(envelope: Envelope, target: TargetWindow) -> Self {
        Self {
            original: envelope,
            transformed: envelope,
            target,
            axis_swap: false,
            background: [0, 0, 0, 0],
            transparent: None,
        }
    }

    /// Set the store-side envelope when it differs from the original.
    pub fn with_transformed(mut self, envelope: Envelope) -> Self {
        self.transformed = envelope;
        self
    }

    /// Mark the store's axis order as flipped relative to the caller's.
    pub fn with_axis_swap(mut self, swap: bool) -> Self {
        self.axis_swap = swap;
        self
    }

    /// Set the fill for pixels no tile covers. Default: transparent black.
    pub fn with_background(mut self, background: [u8; 4]) -> Self {
        self.background = background;
        self
    }

    /// Key the given color out of the finished mosaic.
    pub fn with_transparent(mut self, color: [u8; 3]) -> Self {
        self.transparent = Some(color);
        self
    }

    /// Ground units per output pixel implied by the request.
    pub fn requested_resolution(&self) -> (f64, f64) {
        (
            self.transformed.width() / f64::from(self.target.width),
            self.transformed.height() / f64::from(self.target.height),
        )
    }
}

/// The three envelopes a request travels as.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelopes {
    /// Envelope in the caller's reference system
    pub original: Envelope,

    /// Envelope in the store's reference system
    pub transformed: Envelope,

    /// `transformed` grown outward onto the level's pixel grid
    pub expanded: Envelope,
}

impl RequestEnvelopes {
    /// Derives the expanded envelope for a pyramid level.
    ///
    /// The transformed envelope snaps outward onto the level's pixel
    /// grid so boundary tiles are queried whole and the mosaic never
    /// starts mid-pixel.
    pub fn expand(
        original: Envelope,
        transformed: Envelope,
        level: &LevelInfo,
        snap_px: u32,
    ) -> Self {
        let expanded = geo::snap_outward(
            &transformed,
            (level.extent.min_x, level.extent.min_y),
            level.res_x,
            level.res_y,
            snap_px,
        );
        Self {
            original,
            transformed,
            expanded,
        }
    }
}

/// Shared, immutable state of one in-flight request.
///
/// Built once by the reader after level selection and handed to every
/// decode task and the compositor behind an `Arc`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Original, transformed and expanded request envelopes
    pub envelopes: RequestEnvelopes,

    /// Output raster dimensions
    pub target: TargetWindow,

    /// Whether the result envelope must be axis-swapped
    pub axis_swap: bool,

    /// Fill for pixels no tile covers
    pub background: [u8; 4],

    /// Color to key out of the finished mosaic
    pub transparent: Option<[u8; 3]>,

    /// The pyramid level serving this request
    pub level: LevelInfo,
}

impl RequestContext {
    /// Builds the context for a request served by `level`.
    pub fn new(request: &MosaicRequest, level: &LevelInfo, snap_px: u32) -> Self {
        Self {
            envelopes: RequestEnvelopes::expand(
                request.original,
                request.transformed,
                level,
                snap_px,
            ),
            target: request.target,
            axis_swap: request.axis_swap,
            background: request.background,
            transparent: request.transparent,
            level: level.clone(),
        }
    }

    /// Mosaic canvas dimensions covering the expanded envelope at the
    /// level's resolution.
    ///
    /// Spans that cannot fit a `u32` saturate; the canvas allocation
    /// then fails and the request takes its out-of-memory path.
    pub fn start_dimensions(&self) -> (u32, u32) {
        let (w, h) = geo::pixel_span(
            &self.envelopes.expanded,
            self.level.res_x,
            self.level.res_y,
        );
        (
            geo::px_to_u32(w.max(1)).unwrap_or(u32::MAX),
            geo::px_to_u32(h.max(1)).unwrap_or(u32::MAX),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meter_level() -> LevelInfo {
        LevelInfo {
            coverage: "osm".to_string(),
            tile_table: "osm_0".to_string(),
            res_x: 1.0,
            res_y: 1.0,
            extent: Envelope::new(0.0, 0.0, 1000.0, 1000.0),
            no_data: None,
            srid: 4326,
        }
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b);
        assert_eq!(format!("{a}"), format!("request-{}", a.as_u64()));
    }

    #[test]
    #[should_panic(expected = "target window must not be empty")]
    fn test_target_window_rejects_zero() {
        TargetWindow::new(0, 100);
    }

    #[test]
    fn test_new_request_defaults() {
        let env = Envelope::new(0.0, 0.0, 100.0, 50.0);
        let request = MosaicRequest::new(env, TargetWindow::new(200, 100));

        assert_eq!(request.original, env);
        assert_eq!(request.transformed, env);
        assert!(!request.axis_swap);
        assert_eq!(request.background, [0, 0, 0, 0]);
        assert_eq!(request.transparent, None);
    }

    #[test]
    fn test_requested_resolution() {
        let env = Envelope::new(0.0, 0.0, 100.0, 50.0);
        let request = MosaicRequest::new(env, TargetWindow::new(200, 200));
        assert_eq!(request.requested_resolution(), (0.5, 0.25));
    }

    #[test]
    fn test_expand_snaps_to_grid() {
        let env = Envelope::new(0.5, 0.5, 9.5, 9.5);
        let envelopes = RequestEnvelopes::expand(env, env, &meter_level(), 1);

        assert_eq!(envelopes.transformed, env);
        assert_eq!(envelopes.expanded, Envelope::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_expand_keeps_aligned_envelope() {
        let env = Envelope::new(2.0, 3.0, 12.0, 13.0);
        let envelopes = RequestEnvelopes::expand(env, env, &meter_level(), 1);
        assert_eq!(envelopes.expanded, env);
    }

    #[test]
    fn test_context_dimensions_match_expanded_envelope() {
        let env = Envelope::new(0.25, 0.25, 7.75, 3.75);
        let request = MosaicRequest::new(env, TargetWindow::new(8, 4));
        let ctx = RequestContext::new(&request, &meter_level(), 1);

        assert_eq!(ctx.envelopes.expanded, Envelope::new(0.0, 0.0, 8.0, 4.0));
        assert_eq!(ctx.start_dimensions(), (8, 4));
    }

    #[test]
    fn test_context_carries_request_fields() {
        let env = Envelope::new(0.0, 0.0, 10.0, 10.0);
        let request = MosaicRequest::new(env, TargetWindow::new(10, 10))
            .with_axis_swap(true)
            .with_background([1, 2, 3, 4])
            .with_transparent([9, 9, 9]);
        let ctx = RequestContext::new(&request, &meter_level(), 1);

        assert!(ctx.axis_swap);
        assert_eq!(ctx.background, [1, 2, 3, 4]);
        assert_eq!(ctx.transparent, Some([9, 9, 9]));
        assert_eq!(ctx.level.tile_table, "osm_0");
    }
}
