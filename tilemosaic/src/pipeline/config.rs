//! Mosaic pipeline configuration.

use crate::raster::Interpolation;

/// Decode workers to assume when the host will not say.
const DEFAULT_FALLBACK_PARALLELISM: usize = 4;

/// Default outward snap applied to the request envelope, in pixels.
const DEFAULT_GRID_SNAP_PX: u32 = 1;

/// Configuration for mosaic assembly.
///
/// Groups the tuning knobs of the pipeline, providing sensible
/// defaults while allowing customization.
///
/// # Example
///
/// ```
/// use tilemosaic::pipeline::MosaicConfig;
/// use tilemosaic::raster::Interpolation;
///
/// let config = MosaicConfig::new()
///     .with_decode_parallelism(8)
///     .with_interpolation(Interpolation::Bilinear);
/// assert_eq!(config.decode_parallelism(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MosaicConfig {
    /// Maximum tile decodes running at once
    decode_parallelism: usize,
    /// Outward snap applied to the request envelope, in level pixels
    grid_snap_px: u32,
    /// Kernel for the final resample
    interpolation: Interpolation,
}

impl MosaicConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of concurrent tile decodes.
    ///
    /// Decoding is CPU-bound, so the default follows the host's
    /// available parallelism. A zero is treated as one.
    pub fn with_decode_parallelism(mut self, workers: usize) -> Self {
        self.decode_parallelism = workers.max(1);
        self
    }

    /// Set how far the request envelope snaps outward onto the level's
    /// pixel grid.
    ///
    /// Snapping keeps tile seams off the requested edge. A zero is
    /// treated as one. Default: 1 pixel.
    pub fn with_grid_snap_px(mut self, pixels: u32) -> Self {
        self.grid_snap_px = pixels.max(1);
        self
    }

    /// Set the interpolation kernel used for the final resample.
    ///
    /// Default: nearest neighbor.
    pub fn with_interpolation(mut self, kernel: Interpolation) -> Self {
        self.interpolation = kernel;
        self
    }

    /// Get the maximum number of concurrent tile decodes.
    pub fn decode_parallelism(&self) -> usize {
        self.decode_parallelism
    }

    /// Get the outward snap in pixels.
    pub fn grid_snap_px(&self) -> u32 {
        self.grid_snap_px
    }

    /// Get the interpolation kernel.
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            decode_parallelism: std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(DEFAULT_FALLBACK_PARALLELISM),
            grid_snap_px: DEFAULT_GRID_SNAP_PX,
            interpolation: Interpolation::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MosaicConfig::default();
        assert!(config.decode_parallelism() >= 1);
        assert_eq!(config.grid_snap_px(), DEFAULT_GRID_SNAP_PX);
        assert_eq!(config.interpolation(), Interpolation::Nearest);
    }

    #[test]
    fn test_new_equals_default() {
        assert_eq!(MosaicConfig::new(), MosaicConfig::default());
    }

    #[test]
    fn test_zero_workers_become_one() {
        let config = MosaicConfig::new().with_decode_parallelism(0);
        assert_eq!(config.decode_parallelism(), 1);
    }

    #[test]
    fn test_zero_snap_becomes_one() {
        let config = MosaicConfig::new().with_grid_snap_px(0);
        assert_eq!(config.grid_snap_px(), 1);
    }

    #[test]
    fn test_builder_chain() {
        let config = MosaicConfig::new()
            .with_decode_parallelism(2)
            .with_grid_snap_px(3)
            .with_interpolation(Interpolation::Bicubic);

        assert_eq!(config.decode_parallelism(), 2);
        assert_eq!(config.grid_snap_px(), 3);
        assert_eq!(config.interpolation(), Interpolation::Bicubic);
    }
}
