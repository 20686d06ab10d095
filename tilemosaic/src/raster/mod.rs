//! In-memory raster buffers and the pixel operations the mosaic
//! pipeline performs on them.
//!
//! Everything here works on [`PixelBuffer`], a band-interleaved,
//! native-endian byte buffer tagged with a [`SampleType`]. Tiles are
//! decoded into one, clipped with [`PixelBuffer::window`], pasted with
//! [`PixelBuffer::copy_from`], primed with [`fill`], resampled with
//! [`resample_window`] and optionally keyed with [`transparent_mask`].

mod buffer;
mod fill;
mod mask;
mod resample;

pub use buffer::{PixelBuffer, RasterError, SampleType};
pub use fill::fill;
pub use mask::transparent_mask;
pub use resample::{Interpolation, resample_window};
