//! Tile payload decoding.
//!
//! Stores keep tiles as encoded blobs (PNG, JPEG, TIFF) and the
//! pipeline needs them as [`PixelBuffer`]s. [`StackedCodec`] is the
//! default implementation: a generic image decoder handles the common
//! web formats, and a TIFF-specific fallback picks up the scientific
//! layouts the generic path rejects, such as single band floating
//! point or signed integer rasters.

use std::io::Cursor;

use tiff::decoder::{Decoder, DecodingResult};

use crate::raster::{PixelBuffer, RasterError, SampleType};

/// Failure raised while decoding one tile payload.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// No decoder recognized the payload
    #[error("undecodable payload ({bytes} bytes): {generic}; {fallback}")]
    Undecodable {
        bytes: usize,
        generic: String,
        fallback: String,
    },
    /// The payload decoded to a pixel layout the pipeline cannot carry
    #[error("unsupported raster layout: {0}")]
    UnsupportedLayout(String),
    /// A decoder produced data inconsistent with its own header
    #[error("internal decoder error: {0}")]
    Internal(String),
}

/// Decodes one encoded tile payload into a pixel buffer.
///
/// `decode` is synchronous and CPU-bound; the pipeline calls it on a
/// blocking worker thread. Implementations must be shareable across
/// those workers.
pub trait TileCodec: Send + Sync + 'static {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, DecodeError>;

    /// Short name for log messages.
    fn name(&self) -> &str;
}

/// The default two-stage codec.
///
/// Payloads go to the generic [`image`] decoder first. When that
/// fails, the raw [`tiff`] decoder gets a turn, which covers the
/// deeper sample formats GeoTIFF tiles use. Only when both refuse is
/// the payload reported undecodable, with both messages attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct StackedCodec;

impl TileCodec for StackedCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
        let generic = match image::load_from_memory(bytes) {
            Ok(img) => return buffer_from_image(img),
            Err(error) => error.to_string(),
        };
        match decode_tiff(bytes) {
            Ok(buffer) => Ok(buffer),
            Err(TiffFallback::Unsupported(layout)) => Err(DecodeError::UnsupportedLayout(layout)),
            Err(TiffFallback::Failed(fallback)) => Err(DecodeError::Undecodable {
                bytes: bytes.len(),
                generic,
                fallback,
            }),
        }
    }

    fn name(&self) -> &str {
        "stacked"
    }
}

/// Repacks a decoded dynamic image into a band-interleaved buffer.
fn buffer_from_image(img: image::DynamicImage) -> Result<PixelBuffer, DecodeError> {
    use image::DynamicImage;

    let (width, height) = (img.width(), img.height());
    let (bands, sample_type, data) = match img {
        DynamicImage::ImageLuma8(i) => (1, SampleType::U8, i.into_raw()),
        DynamicImage::ImageLumaA8(i) => (2, SampleType::U8, i.into_raw()),
        DynamicImage::ImageRgb8(i) => (3, SampleType::U8, i.into_raw()),
        DynamicImage::ImageRgba8(i) => (4, SampleType::U8, i.into_raw()),
        DynamicImage::ImageLuma16(i) => {
            (1, SampleType::U16, native_bytes(i.into_raw(), u16::to_ne_bytes))
        }
        DynamicImage::ImageLumaA16(i) => {
            (2, SampleType::U16, native_bytes(i.into_raw(), u16::to_ne_bytes))
        }
        DynamicImage::ImageRgb16(i) => {
            (3, SampleType::U16, native_bytes(i.into_raw(), u16::to_ne_bytes))
        }
        DynamicImage::ImageRgba16(i) => {
            (4, SampleType::U16, native_bytes(i.into_raw(), u16::to_ne_bytes))
        }
        DynamicImage::ImageRgb32F(i) => {
            (3, SampleType::F32, native_bytes(i.into_raw(), f32::to_ne_bytes))
        }
        DynamicImage::ImageRgba32F(i) => {
            (4, SampleType::F32, native_bytes(i.into_raw(), f32::to_ne_bytes))
        }
        other => (4, SampleType::U8, other.to_rgba8().into_raw()),
    };
    wrap(width, height, bands, sample_type, data).map_err(|e| DecodeError::Internal(e.to_string()))
}

enum TiffFallback {
    /// The payload is not a TIFF, or is a broken one
    Failed(String),
    /// A valid TIFF whose layout the pipeline cannot carry
    Unsupported(String),
}

fn decode_tiff(bytes: &[u8]) -> Result<PixelBuffer, TiffFallback> {
    let mut decoder =
        Decoder::new(Cursor::new(bytes)).map_err(|e| TiffFallback::Failed(e.to_string()))?;
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| TiffFallback::Failed(e.to_string()))?;
    let color = decoder
        .colortype()
        .map_err(|e| TiffFallback::Failed(e.to_string()))?;
    let layout = format!("{color:?}");
    let bands = match color {
        tiff::ColorType::Gray(_) => 1,
        tiff::ColorType::GrayA(_) => 2,
        tiff::ColorType::RGB(_) => 3,
        tiff::ColorType::RGBA(_) => 4,
        _ => return Err(TiffFallback::Unsupported(layout)),
    };

    let result = decoder
        .read_image()
        .map_err(|e| TiffFallback::Failed(e.to_string()))?;
    let buffer = match result {
        DecodingResult::U8(v) => wrap(width, height, bands, SampleType::U8, v),
        DecodingResult::U16(v) => {
            wrap(width, height, bands, SampleType::U16, native_bytes(v, u16::to_ne_bytes))
        }
        DecodingResult::I16(v) => {
            wrap(width, height, bands, SampleType::I16, native_bytes(v, i16::to_ne_bytes))
        }
        DecodingResult::I32(v) => {
            wrap(width, height, bands, SampleType::I32, native_bytes(v, i32::to_ne_bytes))
        }
        DecodingResult::F32(v) => {
            wrap(width, height, bands, SampleType::F32, native_bytes(v, f32::to_ne_bytes))
        }
        DecodingResult::F64(v) => {
            wrap(width, height, bands, SampleType::F64, native_bytes(v, f64::to_ne_bytes))
        }
        _ => return Err(TiffFallback::Unsupported(layout)),
    };
    buffer.map_err(|e| TiffFallback::Failed(e.to_string()))
}

fn wrap(
    width: u32,
    height: u32,
    bands: u8,
    sample_type: SampleType,
    data: Vec<u8>,
) -> Result<PixelBuffer, RasterError> {
    PixelBuffer::new(width, height, bands, sample_type, data)
}

/// Flattens typed samples into native-endian bytes.
fn native_bytes<T: Copy, const N: usize>(samples: Vec<T>, encode: fn(T) -> [u8; N]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * N);
    for sample in samples {
        bytes.extend_from_slice(&encode(sample));
    }
    bytes
}
