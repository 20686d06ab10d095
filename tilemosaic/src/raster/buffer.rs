//! Typed pixel buffers.
//!
//! A [`PixelBuffer`] owns a flat, row-major, band-interleaved byte
//! buffer plus the shape needed to address it. Samples are stored in
//! native byte order; all typed access goes through [`SampleType`] so
//! the six supported encodings share one code path.

use thiserror::Error;

/// Per-sample storage encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    U8,
    I16,
    U16,
    I32,
    F32,
    F64,
}

impl SampleType {
    /// Storage size of one sample in bytes.
    #[inline]
    pub fn size_bytes(&self) -> usize {
        match self {
            SampleType::U8 => 1,
            SampleType::I16 | SampleType::U16 => 2,
            SampleType::I32 | SampleType::F32 => 4,
            SampleType::F64 => 8,
        }
    }

    /// Reads one sample from the start of `bytes` and widens it to f64.
    pub(crate) fn read(self, bytes: &[u8]) -> f64 {
        match self {
            SampleType::U8 => f64::from(bytes[0]),
            SampleType::I16 => f64::from(i16::from_ne_bytes([bytes[0], bytes[1]])),
            SampleType::U16 => f64::from(u16::from_ne_bytes([bytes[0], bytes[1]])),
            SampleType::I32 => {
                f64::from(i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            SampleType::F32 => {
                f64::from(f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            SampleType::F64 => f64::from_ne_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
        }
    }

    /// Writes `value` to the start of `bytes`.
    ///
    /// Integer targets round to the nearest value and saturate at the
    /// type's representable range.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn write(self, bytes: &mut [u8], value: f64) {
        match self {
            SampleType::U8 => bytes[0] = value.round() as u8,
            SampleType::I16 => bytes[..2].copy_from_slice(&(value.round() as i16).to_ne_bytes()),
            SampleType::U16 => bytes[..2].copy_from_slice(&(value.round() as u16).to_ne_bytes()),
            SampleType::I32 => bytes[..4].copy_from_slice(&(value.round() as i32).to_ne_bytes()),
            SampleType::F32 => bytes[..4].copy_from_slice(&(value as f32).to_ne_bytes()),
            SampleType::F64 => bytes[..8].copy_from_slice(&value.to_ne_bytes()),
        }
    }
}

/// Errors from pixel buffer construction and access.
#[derive(Debug, Error)]
pub enum RasterError {
    /// Buffer length does not match the declared shape
    #[error("shape {width}x{height} x{bands} {sample_type:?} needs {expected} bytes, got {actual}")]
    LengthMismatch {
        width: u32,
        height: u32,
        bands: u8,
        sample_type: SampleType,
        expected: usize,
        actual: usize,
    },

    /// The buffer's backing memory could not be reserved
    #[error("allocation of {bytes} bytes for a {width}x{height} raster failed")]
    AllocationFailed { width: u32, height: u32, bytes: usize },

    /// Requested window reaches outside the buffer
    #[error("window {x},{y} {width}x{height} exceeds {buffer_width}x{buffer_height} buffer")]
    WindowOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        buffer_width: u32,
        buffer_height: u32,
    },

    /// A raster dimension or the band count is zero
    #[error("degenerate raster shape {width}x{height} x{bands}")]
    EmptyShape { width: u32, height: u32, bands: u8 },
}

/// A band-interleaved pixel rectangle with typed samples.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    bands: u8,
    sample_type: SampleType,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps an existing byte buffer, validating its length against the
    /// declared shape.
    pub fn new(
        width: u32,
        height: u32,
        bands: u8,
        sample_type: SampleType,
        data: Vec<u8>,
    ) -> Result<Self, RasterError> {
        let expected = Self::byte_len(width, height, bands, sample_type)?;
        if data.len() != expected {
            return Err(RasterError::LengthMismatch {
                width,
                height,
                bands,
                sample_type,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            bands,
            sample_type,
            data,
        })
    }

    /// Allocates a zero-filled buffer of the given shape.
    ///
    /// Uses a fallible reservation, so running out of memory surfaces
    /// as [`RasterError::AllocationFailed`] instead of aborting the
    /// process.
    pub fn try_blank(
        width: u32,
        height: u32,
        bands: u8,
        sample_type: SampleType,
    ) -> Result<Self, RasterError> {
        let bytes = Self::byte_len(width, height, bands, sample_type)?;
        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|_| RasterError::AllocationFailed {
                width,
                height,
                bytes,
            })?;
        data.resize(bytes, 0);
        Ok(Self {
            width,
            height,
            bands,
            sample_type,
            data,
        })
    }

    fn byte_len(
        width: u32,
        height: u32,
        bands: u8,
        sample_type: SampleType,
    ) -> Result<usize, RasterError> {
        if width == 0 || height == 0 || bands == 0 {
            return Err(RasterError::EmptyShape {
                width,
                height,
                bands,
            });
        }
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(usize::from(bands)))
            .and_then(|samples| samples.checked_mul(sample_type.size_bytes()))
            .ok_or(RasterError::AllocationFailed {
                width,
                height,
                bytes: usize::MAX,
            })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn bands(&self) -> u8 {
        self.bands
    }

    #[inline]
    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    /// Band count and sample type as one comparable pair.
    #[inline]
    pub fn layout(&self) -> (u8, SampleType) {
        (self.bands, self.sample_type)
    }

    /// Raw native-endian backing bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consumes the buffer, returning the backing bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Bytes from one pixel to the next within a row.
    #[inline]
    pub(crate) fn pixel_stride(&self) -> usize {
        usize::from(self.bands) * self.sample_type.size_bytes()
    }

    #[inline]
    fn sample_offset(&self, x: u32, y: u32, band: u8) -> usize {
        (y as usize * self.width as usize + x as usize) * self.pixel_stride()
            + usize::from(band) * self.sample_type.size_bytes()
    }

    /// Reads one sample widened to f64.
    ///
    /// # Panics
    ///
    /// Panics when `x`, `y` or `band` is out of range.
    pub fn sample(&self, x: u32, y: u32, band: u8) -> f64 {
        assert!(x < self.width && y < self.height && band < self.bands);
        let off = self.sample_offset(x, y, band);
        self.sample_type.read(&self.data[off..])
    }

    /// Writes one sample, saturating at the sample type's range.
    ///
    /// # Panics
    ///
    /// Panics when `x`, `y` or `band` is out of range.
    pub fn put_sample(&mut self, x: u32, y: u32, band: u8, value: f64) {
        assert!(x < self.width && y < self.height && band < self.bands);
        let off = self.sample_offset(x, y, band);
        let ty = self.sample_type;
        ty.write(&mut self.data[off..], value);
    }

    /// Extracts a sub-rectangle as a new buffer.
    pub fn window(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::EmptyShape {
                width,
                height,
                bands: self.bands,
            });
        }
        if u64::from(x) + u64::from(width) > u64::from(self.width)
            || u64::from(y) + u64::from(height) > u64::from(self.height)
        {
            return Err(RasterError::WindowOutOfBounds {
                x,
                y,
                width,
                height,
                buffer_width: self.width,
                buffer_height: self.height,
            });
        }
        let ps = self.pixel_stride();
        let mut data = Vec::with_capacity(width as usize * height as usize * ps);
        for row in 0..height as usize {
            let start = ((y as usize + row) * self.width as usize + x as usize) * ps;
            data.extend_from_slice(&self.data[start..start + width as usize * ps]);
        }
        PixelBuffer::new(width, height, self.bands, self.sample_type, data)
    }

    /// Pastes `src` with its top-left corner at `(dst_x, dst_y)`.
    ///
    /// The offset may be negative or reach past the edges; anything
    /// falling outside this buffer is clipped. Pixels inside are
    /// overwritten row by row. A source with a different band count or
    /// sample type is not pasted.
    #[allow(clippy::cast_sign_loss)]
    pub fn copy_from(&mut self, src: &PixelBuffer, dst_x: i64, dst_y: i64) {
        if self.layout() != src.layout() {
            return;
        }
        let src_x = (-dst_x).max(0);
        let src_y = (-dst_y).max(0);
        let out_x = dst_x.max(0);
        let out_y = dst_y.max(0);
        let copy_w = (i64::from(src.width) - src_x).min(i64::from(self.width) - out_x);
        let copy_h = (i64::from(src.height) - src_y).min(i64::from(self.height) - out_y);
        if copy_w <= 0 || copy_h <= 0 {
            return;
        }

        // All values are clamped non-negative above.
        let (src_x, src_y) = (src_x as usize, src_y as usize);
        let (out_x, out_y) = (out_x as usize, out_y as usize);
        let (copy_w, copy_h) = (copy_w as usize, copy_h as usize);
        let ps = self.pixel_stride();
        for row in 0..copy_h {
            let from = ((src_y + row) * src.width as usize + src_x) * ps;
            let to = ((out_y + row) * self.width as usize + out_x) * ps;
            self.data[to..to + copy_w * ps].copy_from_slice(&src.data[from..from + copy_w * ps]);
        }
    }
}
