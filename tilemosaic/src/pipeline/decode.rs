//! Per-tile decode task.
//!
//! Each tile returned by the spatial query runs through one of these:
//! decode the payload on a blocking worker, clip the pixels to the
//! part inside the request envelope and publish the result on the tile
//! queue. Tiles that have nothing to contribute finish silently.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::codec::{DecodeError, TileCodec};
use crate::geo;
use crate::pipeline::element::{DecodedTile, TileQueueElement};
use crate::pipeline::request::RequestContext;
use crate::store::TileRecord;

/// A tile whose decode did not produce pixels.
///
/// Reported to the fetch stage, which logs it and moves on; one broken
/// tile never fails the mosaic.
#[derive(Debug)]
pub(crate) struct TileFailure {
    pub(crate) label: String,
    pub(crate) error: DecodeError,
}

/// Decodes one tile record and publishes its clipped pixels.
///
/// Publishing can only fail when the compositor is gone, in which case
/// the pixels have no consumer and are dropped.
pub(crate) async fn decode_tile<C>(
    record: TileRecord,
    codec: Arc<C>,
    ctx: Arc<RequestContext>,
    queue: UnboundedSender<TileQueueElement>,
) -> Result<(), TileFailure>
where
    C: TileCodec,
{
    let TileRecord {
        location,
        envelope,
        data,
    } = record;

    if data.is_empty() {
        debug!(tile = %location, "Tile carries no payload, skipping");
        return Ok(());
    }

    let worker = {
        let codec = Arc::clone(&codec);
        tokio::task::spawn_blocking(move || codec.decode(&data))
    };
    let decoded = match worker.await {
        Ok(Ok(buffer)) => buffer,
        Ok(Err(error)) => {
            return Err(TileFailure {
                label: location,
                error,
            });
        }
        Err(join_err) => {
            return Err(TileFailure {
                label: location,
                error: DecodeError::Internal(format!("decode task panicked: {join_err}")),
            });
        }
    };

    // The common case: the tile sits entirely inside the expanded
    // envelope and travels whole.
    if ctx.envelopes.expanded.contains(&envelope) {
        let _ = queue.send(TileQueueElement::Tile(DecodedTile {
            label: location,
            pixels: decoded,
            envelope,
        }));
        return Ok(());
    }

    let Some(clip) = ctx.envelopes.expanded.intersection(&envelope) else {
        debug!(tile = %location, "Tile fell outside the request envelope, skipping");
        return Ok(());
    };

    let level = &ctx.level;
    let (x, y) = geo::paste_offset(&envelope, &clip, level.res_x, level.res_y);
    let (w, h) = geo::pixel_span(&clip, level.res_x, level.res_y);
    let x = x.clamp(0, i64::from(decoded.width()));
    let y = y.clamp(0, i64::from(decoded.height()));
    let w = w.min(i64::from(decoded.width()) - x);
    let h = h.min(i64::from(decoded.height()) - y);
    if w <= 0 || h <= 0 {
        debug!(tile = %location, "Tile overlap is narrower than a pixel, skipping");
        return Ok(());
    }

    // All values are clamped to the decoded size above.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pixels = decoded
        .window(x as u32, y as u32, w as u32, h as u32)
        .map_err(|e| TileFailure {
            label: location.clone(),
            error: DecodeError::Internal(e.to_string()),
        })?;

    let _ = queue.send(TileQueueElement::Tile(DecodedTile {
        label: location,
        pixels,
        envelope: clip,
    }));
    Ok(())
}
