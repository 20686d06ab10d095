//! Messages flowing from the decode tasks to the compositor.

use crate::geo::Envelope;
use crate::raster::PixelBuffer;

/// One decoded, clipped tile ready for compositing.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTile {
    /// Store-side tile identifier, carried for log messages
    pub label: String,
    /// Decoded pixels, already clipped to the request envelope
    pub pixels: PixelBuffer,
    /// Georeferenced extent of `pixels`
    pub envelope: Envelope,
}

/// Element of the tile queue.
///
/// Decode tasks publish `Tile` elements in completion order. After the
/// last task has finished, the fetch stage publishes exactly one `End`
/// so the compositor knows no further tiles can arrive.
#[derive(Debug, Clone, PartialEq)]
pub enum TileQueueElement {
    Tile(DecodedTile),
    End,
}

impl TileQueueElement {
    /// Whether this element is the end-of-stream sentinel.
    pub fn is_end(&self) -> bool {
        matches!(self, TileQueueElement::End)
    }
}
