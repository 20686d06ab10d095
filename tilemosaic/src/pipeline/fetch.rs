//! Fetch stage: one spatial query, many decode tasks.
//!
//! The stage queries the tile store once for everything intersecting
//! the expanded request envelope, then spawns one decode task per tile
//! with a semaphore holding concurrency at the configured level. Tiles
//! stream to the compositor as they finish; when the last task is done
//! the stage publishes the end-of-stream sentinel.
//!
//! A failing tile is logged and skipped, never fatal. The only fatal
//! outcome is the spatial query itself failing, which happens before
//! anything is spawned.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::codec::TileCodec;
use crate::pipeline::config::MosaicConfig;
use crate::pipeline::decode::decode_tile;
use crate::pipeline::element::TileQueueElement;
use crate::pipeline::request::{RequestContext, RequestId};
use crate::store::{StoreError, TileStore};

/// Outcome counters of one fetch stage run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchSummary {
    /// Tiles the spatial query returned
    pub fetched: usize,

    /// Tiles whose decode failed and were skipped
    pub failed: usize,

    /// Tiles still in flight when the request was cancelled
    pub aborted: usize,
}

/// Queries the store and streams decoded tiles onto the queue.
///
/// Exactly one [`TileQueueElement::End`] is published after the last
/// decode task has terminated, on success and on cancellation alike.
/// Only a store failure skips the sentinel; nothing was spawned at
/// that point and the caller drops the queue along with the error.
#[instrument(skip(store, codec, ctx, config, queue, cancel), fields(request_id = %request_id))]
pub async fn fetch_stage<S, C>(
    request_id: RequestId,
    store: Arc<S>,
    codec: Arc<C>,
    ctx: Arc<RequestContext>,
    config: &MosaicConfig,
    queue: UnboundedSender<TileQueueElement>,
    cancel: CancellationToken,
) -> Result<FetchSummary, StoreError>
where
    S: TileStore,
    C: TileCodec,
{
    let start = Instant::now();

    if cancel.is_cancelled() {
        debug!(request_id = %request_id, "Fetch stage cancelled before the spatial query");
        let _ = queue.send(TileQueueElement::End);
        return Ok(FetchSummary::default());
    }

    let records = store
        .query_tiles(ctx.envelopes.expanded.ring(), &ctx.level)
        .await?;

    let mut summary = FetchSummary {
        fetched: records.len(),
        ..FetchSummary::default()
    };
    debug!(
        request_id = %request_id,
        tiles = summary.fetched,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Spatial query complete"
    );

    let limiter = Arc::new(Semaphore::new(config.decode_parallelism().max(1)));
    let mut tasks = JoinSet::new();

    for record in records {
        let codec = Arc::clone(&codec);
        let ctx = Arc::clone(&ctx);
        let queue = queue.clone();
        let limiter = Arc::clone(&limiter);

        tasks.spawn(async move {
            let _permit = limiter
                .acquire_owned()
                .await
                .expect("semaphore closed unexpectedly");
            decode_tile(record, codec, ctx, queue).await
        });
    }

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                summary.aborted = tasks.len();
                warn!(
                    request_id = %request_id,
                    aborted = summary.aborted,
                    "Fetch stage cancelled - aborting remaining decodes"
                );
                tasks.abort_all();
                // Aborted tasks may be mid-publish; wait for true
                // termination so the sentinel stays last.
                while tasks.join_next().await.is_some() {}
                break;
            }

            result = tasks.join_next() => {
                match result {
                    Some(Ok(Ok(()))) => {}
                    Some(Ok(Err(failure))) => {
                        warn!(
                            request_id = %request_id,
                            tile = %failure.label,
                            error = %failure.error,
                            "Tile decode failed, skipping"
                        );
                        summary.failed += 1;
                    }
                    Some(Err(join_err)) => {
                        if !join_err.is_cancelled() {
                            warn!(
                                request_id = %request_id,
                                error = %join_err,
                                "Decode task panicked"
                            );
                            summary.failed += 1;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    // The compositor reads until it sees this.
    let _ = queue.send(TileQueueElement::End);

    debug!(
        request_id = %request_id,
        fetched = summary.fetched,
        failed = summary.failed,
        aborted = summary.aborted,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Fetch stage complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DecodeError;
    use crate::geo::Envelope;
    use crate::level::LevelInfo;
    use crate::pipeline::request::{MosaicRequest, TargetWindow};
    use crate::raster::{PixelBuffer, SampleType};
    use crate::store::TileRecord;
    use tokio::sync::mpsc;

    /// Store serving a fixed list of records.
    struct FixtureStore {
        records: Vec<TileRecord>,
    }

    impl TileStore for FixtureStore {
        async fn query_tiles(
            &self,
            _ring: [(f64, f64); 5],
            _level: &LevelInfo,
        ) -> Result<Vec<TileRecord>, StoreError> {
            Ok(self.records.clone())
        }
    }

    /// Store that always fails.
    struct BrokenStore;

    impl TileStore for BrokenStore {
        async fn query_tiles(
            &self,
            _ring: [(f64, f64); 5],
            _level: &LevelInfo,
        ) -> Result<Vec<TileRecord>, StoreError> {
            Err(StoreError::Query("relation does not exist".to_string()))
        }
    }

    /// Codec that fails on the 0xFF marker payload and succeeds otherwise.
    struct SelectiveCodec;

    impl TileCodec for SelectiveCodec {
        fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
            if bytes == [0xFF] {
                return Err(DecodeError::Undecodable {
                    bytes: bytes.len(),
                    generic: "marked bad".to_string(),
                    fallback: "marked bad".to_string(),
                });
            }
            Ok(PixelBuffer::try_blank(10, 10, 1, SampleType::U8).unwrap())
        }

        fn name(&self) -> &str {
            "selective"
        }
    }

    /// Codec that blocks long enough for cancellation to land mid-run.
    struct SleepyCodec;

    impl TileCodec for SleepyCodec {
        fn decode(&self, _bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
            std::thread::sleep(std::time::Duration::from_millis(40));
            Ok(PixelBuffer::try_blank(10, 10, 1, SampleType::U8).unwrap())
        }

        fn name(&self) -> &str {
            "sleepy"
        }
    }

    fn context(envelope: Envelope) -> Arc<RequestContext> {
        let level = LevelInfo {
            coverage: "osm".to_string(),
            tile_table: "osm_0".to_string(),
            res_x: 1.0,
            res_y: 1.0,
            extent: Envelope::new(0.0, 0.0, 1000.0, 1000.0),
            no_data: None,
            srid: 4326,
        };
        let request = MosaicRequest::new(envelope, TargetWindow::new(10, 10));
        Arc::new(RequestContext::new(&request, &level, 1))
    }

    fn records(count: usize) -> Vec<TileRecord> {
        (0..count)
            .map(|i| {
                let x = i as f64 * 10.0;
                TileRecord {
                    location: format!("tile_{i}"),
                    envelope: Envelope::new(x, 0.0, x + 10.0, 10.0),
                    data: vec![1],
                }
            })
            .collect()
    }

    /// Drains the queue, returning (tile count, end count, end was last).
    async fn drain(mut rx: mpsc::UnboundedReceiver<TileQueueElement>) -> (usize, usize, bool) {
        let mut tiles = 0;
        let mut ends = 0;
        let mut last_was_end = false;
        while let Some(element) = rx.recv().await {
            last_was_end = element.is_end();
            if last_was_end {
                ends += 1;
            } else {
                tiles += 1;
            }
        }
        (tiles, ends, last_was_end)
    }

    #[tokio::test]
    async fn test_tiles_then_single_sentinel() {
        let (tx, rx) = mpsc::unbounded_channel();
        let summary = fetch_stage(
            RequestId::new(),
            Arc::new(FixtureStore { records: records(3) }),
            Arc::new(SelectiveCodec),
            context(Envelope::new(0.0, 0.0, 100.0, 100.0)),
            &MosaicConfig::new().with_decode_parallelism(2),
            tx,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary, FetchSummary { fetched: 3, failed: 0, aborted: 0 });
        assert_eq!(drain(rx).await, (3, 1, true));
    }

    #[tokio::test]
    async fn test_empty_query_still_ends() {
        let (tx, rx) = mpsc::unbounded_channel();
        let summary = fetch_stage(
            RequestId::new(),
            Arc::new(FixtureStore { records: Vec::new() }),
            Arc::new(SelectiveCodec),
            context(Envelope::new(0.0, 0.0, 100.0, 100.0)),
            &MosaicConfig::default(),
            tx,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.fetched, 0);
        assert_eq!(drain(rx).await, (0, 1, true));
    }

    #[tokio::test]
    async fn test_failed_decodes_are_skipped() {
        let mut rs = records(2);
        rs[1].data = vec![0xFF];

        let (tx, rx) = mpsc::unbounded_channel();
        let summary = fetch_stage(
            RequestId::new(),
            Arc::new(FixtureStore { records: rs }),
            Arc::new(SelectiveCodec),
            context(Envelope::new(0.0, 0.0, 100.0, 100.0)),
            &MosaicConfig::default(),
            tx,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.fetched, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(drain(rx).await, (1, 1, true));
    }

    #[tokio::test]
    async fn test_store_error_propagates_without_sentinel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let result = fetch_stage(
            RequestId::new(),
            Arc::new(BrokenStore),
            Arc::new(SelectiveCodec),
            context(Envelope::new(0.0, 0.0, 100.0, 100.0)),
            &MosaicConfig::default(),
            tx,
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(StoreError::Query(_))));
        // The sender is gone and nothing was published.
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_cancellation_keeps_sentinel_last() {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let stage = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                fetch_stage(
                    RequestId::new(),
                    Arc::new(FixtureStore { records: records(8) }),
                    Arc::new(SleepyCodec),
                    context(Envelope::new(0.0, 0.0, 100.0, 100.0)),
                    &MosaicConfig::new().with_decode_parallelism(2),
                    tx,
                    cancel,
                )
                .await
            }
        });

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        cancel.cancel();

        let summary = stage.await.unwrap().unwrap();
        assert!(summary.aborted > 0);

        let (_tiles, ends, last_was_end) = drain(rx).await;
        assert_eq!(ends, 1);
        assert!(last_was_end);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_sends_end() {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = fetch_stage(
            RequestId::new(),
            Arc::new(FixtureStore { records: records(4) }),
            Arc::new(SelectiveCodec),
            context(Envelope::new(0.0, 0.0, 100.0, 100.0)),
            &MosaicConfig::default(),
            tx,
            cancel,
        )
        .await
        .unwrap();

        assert_eq!(summary, FetchSummary::default());
        assert_eq!(drain(rx).await, (0, 1, true));
    }
}
