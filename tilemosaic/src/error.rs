//! Error type for mosaic reads.
//!
//! Tile-level trouble (a payload that will not decode, a tile outside
//! the request) is absorbed inside the pipeline; what surfaces here are
//! the failures that sink a whole request.

use thiserror::Error;

use crate::raster::RasterError;
use crate::store::StoreError;

/// Errors that can fail a mosaic read.
#[derive(Debug, Error)]
pub enum MosaicError {
    /// The tile store or its spatial query failed
    #[error("tile store failed: {0}")]
    Store(#[from] StoreError),

    /// A mosaic-level raster could not be built or transformed
    #[error("mosaic raster failed: {0}")]
    Raster(#[from] RasterError),

    /// The coverage has no pyramid levels to serve from
    #[error("coverage has no pyramid levels")]
    NoLevels,

    /// A pipeline invariant was broken (e.g. channel closed unexpectedly)
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MosaicError::from(StoreError::Query("bad relation".to_string()));
        assert_eq!(
            format!("{err}"),
            "tile store failed: tile query failed: bad relation"
        );

        assert_eq!(
            format!("{}", MosaicError::NoLevels),
            "coverage has no pyramid levels"
        );

        let err = MosaicError::Internal("tile queue closed before the end sentinel".to_string());
        assert_eq!(
            format!("{err}"),
            "internal error: tile queue closed before the end sentinel"
        );
    }

    #[test]
    fn test_raster_errors_convert() {
        let err = MosaicError::from(RasterError::AllocationFailed {
            width: 65_536,
            height: 65_536,
            bytes: usize::MAX,
        });
        assert!(matches!(err, MosaicError::Raster(_)));
    }
}
