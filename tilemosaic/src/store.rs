//! Tile storage abstraction.
//!
//! A [`TileStore`] is the single seam between the mosaic pipeline and
//! whatever actually holds the tiles: a spatial database, an object
//! store, a test fixture. The pipeline issues exactly one spatial
//! query per request and treats everything the store returns as
//! candidate tiles for the mosaic.

use std::future::Future;

use crate::geo::Envelope;
use crate::level::LevelInfo;

/// One tile row returned by a spatial query.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRecord {
    /// Store-side identifier, used only for log messages
    pub location: String,
    /// Georeferenced extent of the tile
    pub envelope: Envelope,
    /// Encoded payload; empty when the store keeps no data for the row
    pub data: Vec<u8>,
}

/// Failure raised by a [`TileStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The spatial query itself failed
    #[error("tile query failed: {0}")]
    Query(String),
    /// The store could not be reached at all
    #[error("tile store connection failed: {0}")]
    Connection(String),
}

/// Source of tile records for the mosaic pipeline.
///
/// `ring` is the request envelope as a closed five-point polygon
/// (first vertex repeated last), ready to hand to a spatial predicate.
/// `level` names the pyramid level being read; its `tile_table` routes
/// the query to the right table and its `srid` is the reference system
/// the ring coordinates are in. Implementations return every tile
/// intersecting the ring; rows whose payload lives elsewhere should be
/// resolved here so the record carries the final bytes.
pub trait TileStore: Send + Sync + 'static {
    fn query_tiles(
        &self,
        ring: [(f64, f64); 5],
        level: &LevelInfo,
    ) -> impl Future<Output = Result<Vec<TileRecord>, StoreError>> + Send;
}
