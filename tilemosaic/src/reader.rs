//! Mosaic reader: orchestrates the pipeline stages.
//!
//! The reader takes a request and runs it through the pipeline:
//! 1. Pick the pyramid level matching the requested resolution
//! 2. Fetch and decode every intersecting tile from the store
//! 3. Compose the decoded tiles and resample onto the target window
//! 4. Return the assembled raster

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::codec::TileCodec;
use crate::error::MosaicError;
use crate::level::{LevelInfo, select_level};
use crate::pipeline::{
    MosaicConfig, MosaicRaster, MosaicRequest, RequestContext, RequestId, compose_stage,
    fetch_stage,
};
use crate::raster::RasterError;
use crate::store::TileStore;

/// Tile-store backed mosaic reader.
///
/// Owns the tile store, the payload codec, the pyramid level metadata
/// and the pipeline configuration. One reader serves any number of
/// requests; every `read` call runs its own fetch and compose stages.
#[derive(Clone)]
pub struct MosaicReader<S, C> {
    store: Arc<S>,
    codec: Arc<C>,
    levels: Vec<LevelInfo>,
    config: MosaicConfig,
}

impl<S, C> MosaicReader<S, C>
where
    S: TileStore,
    C: TileCodec,
{
    /// Creates a reader over the given store and codec.
    ///
    /// `levels` must be ordered finest resolution first; the first
    /// entry is the base level used when no coarser level matches a
    /// request.
    pub fn new(store: Arc<S>, codec: Arc<C>, levels: Vec<LevelInfo>, config: MosaicConfig) -> Self {
        Self {
            store,
            codec,
            levels,
            config,
        }
    }

    /// Pyramid levels this reader serves, finest first.
    pub fn levels(&self) -> &[LevelInfo] {
        &self.levels
    }

    /// Pipeline configuration in effect.
    pub fn config(&self) -> &MosaicConfig {
        &self.config
    }

    /// Assembles the mosaic for one request.
    ///
    /// # Flow
    ///
    /// ```text
    /// Request → Level Selection → Spatial Query → Decode → Compose → Resample
    /// ```
    ///
    /// # Error Handling
    ///
    /// Individual tile faults never fail the request: undecodable
    /// payloads are skipped and uncovered areas keep the background
    /// fill. A failed spatial query fails the whole request. A mosaic
    /// too large for memory yields `Ok(None)` rather than an error.
    ///
    /// # Errors
    ///
    /// Returns an error when the reader has no pyramid levels, when
    /// the spatial query fails, or when the pipeline breaks internally.
    pub async fn read(&self, request: &MosaicRequest) -> Result<Option<MosaicRaster>, MosaicError> {
        self.read_cancellable(request, CancellationToken::new())
            .await
    }

    /// Assembles the mosaic for one request with cancellation support.
    ///
    /// Cancelling the token aborts decodes that have not finished yet;
    /// tiles decoded before the signal still land in the mosaic, so a
    /// cancelled request returns a partially covered raster instead of
    /// an error.
    ///
    /// # Errors
    ///
    /// Same contract as [`MosaicReader::read`].
    pub async fn read_cancellable(
        &self,
        request: &MosaicRequest,
        cancel: CancellationToken,
    ) -> Result<Option<MosaicRaster>, MosaicError> {
        let start = Instant::now();
        let request_id = RequestId::new();

        // Stage 0: Pick the pyramid level for the requested resolution
        let level = select_level(&self.levels, request.requested_resolution())
            .ok_or(MosaicError::NoLevels)?;
        debug!(request_id = %request_id, level = %level, "Pyramid level selected");

        let ctx = Arc::new(RequestContext::new(
            request,
            level,
            self.config.grid_snap_px(),
        ));
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        // Stages 1 and 2 run concurrently, linked by the tile queue.
        let (fetched, composed) = tokio::join!(
            fetch_stage(
                request_id,
                Arc::clone(&self.store),
                Arc::clone(&self.codec),
                Arc::clone(&ctx),
                &self.config,
                queue_tx,
                cancel,
            ),
            compose_stage(request_id, Arc::clone(&ctx), &self.config, queue_rx),
        );

        // A dead fetch stage also breaks the compositor's queue; report
        // the store fault, not the secondary queue error.
        let summary = fetched?;

        let raster = match composed {
            Ok(raster) => raster,
            Err(MosaicError::Raster(RasterError::AllocationFailed {
                width,
                height,
                bytes,
            })) => {
                error!(
                    request_id = %request_id,
                    width,
                    height,
                    bytes,
                    "Mosaic does not fit in memory, yielding no raster"
                );
                return Ok(None);
            }
            Err(other) => return Err(other),
        };

        debug!(
            request_id = %request_id,
            fetched = summary.fetched,
            failed = summary.failed,
            aborted = summary.aborted,
            duration_ms = start.elapsed().as_millis() as u64,
            "Mosaic request complete"
        );

        Ok(Some(raster))
    }
}
