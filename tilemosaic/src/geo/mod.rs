//! World-coordinate geometry and pixel-grid math.
//!
//! Everything here is plain data with small inherent methods. The grid
//! helpers carry the one rounding rule the whole pipeline shares; see
//! [`grid`] for why that matters.

mod envelope;
pub mod grid;

pub use envelope::Envelope;
pub use grid::{paste_offset, pixel_span, px_to_u32, round_px, snap_outward};
