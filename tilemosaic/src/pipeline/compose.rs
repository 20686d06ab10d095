//! Compose stage: pastes decoded tiles into one mosaic.
//!
//! The single consumer of the tile queue. Tiles arrive in completion
//! order; the first one decides the mosaic's band count and sample
//! type, and every later tile lands at its grid position computed from
//! the shared expanded envelope. After the end sentinel the mosaic is
//! resampled onto the caller's target window and, when requested, the
//! background color is keyed to transparent.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, instrument, warn};

use crate::error::MosaicError;
use crate::geo::{self, Envelope};
use crate::pipeline::config::MosaicConfig;
use crate::pipeline::element::{DecodedTile, TileQueueElement};
use crate::pipeline::request::{RequestContext, RequestId};
use crate::raster::{PixelBuffer, SampleType, fill, resample_window, transparent_mask};

/// The finished product of a mosaic read.
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicRaster {
    /// Pixels at exactly the requested target dimensions
    pub pixels: PixelBuffer,

    /// Georeferenced extent of `pixels` in the store's reference
    /// system, axis-swapped when the request asked for it
    pub envelope: Envelope,
}

/// Consumes the tile queue and produces the final mosaic.
///
/// Returns an error when the queue closes without the end sentinel,
/// which means the fetch stage died, or when a mosaic-level buffer
/// cannot be built.
#[instrument(skip(ctx, config, queue), fields(request_id = %request_id))]
pub async fn compose_stage(
    request_id: RequestId,
    ctx: Arc<RequestContext>,
    config: &MosaicConfig,
    mut queue: UnboundedReceiver<TileQueueElement>,
) -> Result<MosaicRaster, MosaicError> {
    let start = Instant::now();
    let mut canvas: Option<PixelBuffer> = None;
    let mut pasted = 0usize;
    let mut rejected = 0usize;
    let mut ended = false;

    while let Some(element) = queue.recv().await {
        let tile = match element {
            TileQueueElement::Tile(tile) => tile,
            TileQueueElement::End => {
                ended = true;
                break;
            }
        };

        if canvas.is_none() {
            canvas = Some(allocate_canvas(request_id, &ctx, &tile)?);
        }
        let target = canvas
            .as_mut()
            .ok_or_else(|| MosaicError::Internal("mosaic canvas missing".to_string()))?;

        if target.layout() != tile.pixels.layout() {
            warn!(
                request_id = %request_id,
                tile = %tile.label,
                "Tile layout differs from the mosaic, skipping"
            );
            rejected += 1;
            continue;
        }

        let (x, y) = geo::paste_offset(
            &ctx.envelopes.expanded,
            &tile.envelope,
            ctx.level.res_x,
            ctx.level.res_y,
        );
        target.copy_from(&tile.pixels, x, y);
        pasted += 1;
    }

    if !ended {
        return Err(MosaicError::Internal(
            "tile queue closed before the end sentinel".to_string(),
        ));
    }

    let canvas = match canvas {
        Some(canvas) => canvas,
        None => {
            debug!(request_id = %request_id, "No tiles arrived, composing background only");
            let (width, height) = ctx.start_dimensions();
            let mut blank = PixelBuffer::try_blank(width, height, 4, SampleType::U8)?;
            fill(&mut blank, ctx.level.no_data, ctx.background);
            blank
        }
    };

    // The canvas covers the expanded envelope at level resolution; cut
    // the transformed envelope out of it at the requested resolution.
    let level = &ctx.level;
    let resolution = (
        ctx.envelopes.transformed.width() / f64::from(ctx.target.width),
        ctx.envelopes.transformed.height() / f64::from(ctx.target.height),
    );
    let origin = (
        (ctx.envelopes.transformed.min_x - ctx.envelopes.expanded.min_x) / level.res_x,
        (ctx.envelopes.expanded.max_y - ctx.envelopes.transformed.max_y) / level.res_y,
    );
    let step = (resolution.0 / level.res_x, resolution.1 / level.res_y);
    let mut mosaic = resample_window(
        &canvas,
        origin,
        step,
        ctx.target.width,
        ctx.target.height,
        config.interpolation(),
    )?;

    if let Some(color) = ctx.transparent {
        if let Some(keyed) = transparent_mask(&mosaic, color)? {
            mosaic = keyed;
        }
    }

    let envelope = if ctx.axis_swap {
        ctx.envelopes.transformed.swapped()
    } else {
        ctx.envelopes.transformed
    };

    debug!(
        request_id = %request_id,
        pasted,
        rejected,
        width = mosaic.width(),
        height = mosaic.height(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Compose stage complete"
    );

    Ok(MosaicRaster {
        pixels: mosaic,
        envelope,
    })
}

/// Allocates and primes the mosaic canvas from the first tile's layout.
fn allocate_canvas(
    request_id: RequestId,
    ctx: &RequestContext,
    first: &DecodedTile,
) -> Result<PixelBuffer, MosaicError> {
    let (bands, sample_type) = first.pixels.layout();
    let (width, height) = ctx.start_dimensions();
    let mut canvas = PixelBuffer::try_blank(width, height, bands, sample_type)?;
    fill(&mut canvas, ctx.level.no_data, ctx.background);
    debug!(
        request_id = %request_id,
        width,
        height,
        bands,
        sample_type = ?sample_type,
        "Mosaic canvas allocated"
    );
    Ok(canvas)
}
