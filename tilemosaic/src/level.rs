//! Pyramid level metadata and resolution-based level selection.

use std::fmt;

use crate::geo::Envelope;

/// One pyramid level of a tiled coverage.
///
/// A coverage is stored as a stack of pre-scaled levels, each with its
/// own tile table and ground resolution. Level zero is the native
/// resolution and every further level is a coarser overview.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelInfo {
    /// Coverage this level belongs to
    pub coverage: String,
    /// Table (or equivalent collection) holding this level's tiles
    pub tile_table: String,
    /// Ground units covered by one pixel along x
    pub res_x: f64,
    /// Ground units covered by one pixel along y
    pub res_y: f64,
    /// Georeferenced extent of the whole level
    pub extent: Envelope,
    /// Sample value marking holes, if the coverage declares one
    pub no_data: Option<f64>,
    /// Spatial reference id the tile envelopes are expressed in
    pub srid: i32,
}

impl fmt::Display for LevelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} res {} x {} srid {}",
            self.coverage, self.tile_table, self.res_x, self.res_y, self.srid
        )
    }
}

/// Picks the pyramid level matching a requested ground resolution.
///
/// `levels` must be sorted finest first. The walk keeps the coarsest
/// level that still resolves at least as finely as `requested` on both
/// axes; when even the finest level is too coarse the finest wins, and
/// an empty slice yields `None`.
pub fn select_level(levels: &[LevelInfo], requested: (f64, f64)) -> Option<&LevelInfo> {
    let mut best = levels.first()?;
    for level in &levels[1..] {
        if level.res_x <= requested.0 && level.res_y <= requested.1 {
            best = level;
        } else {
            break;
        }
    }
    Some(best)
}
