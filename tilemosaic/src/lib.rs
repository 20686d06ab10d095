//! Tilemosaic - mosaic assembly for tiled raster stores
//!
//! This library assembles georeferenced rasters from tiles held in an
//! external store, typically a spatial database. Tile metadata is
//! organized as a resolution pyramid; a request names an area and an
//! output size, and the reader picks the matching level, fetches and
//! decodes every intersecting tile concurrently, composes them onto a
//! shared grid and resamples the result onto the requested window.
//!
//! # High-Level API
//!
//! For most use cases, [`reader::MosaicReader`] is the entry point:
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use tilemosaic::codec::StackedCodec;
//! use tilemosaic::geo::Envelope;
//! use tilemosaic::pipeline::{MosaicConfig, MosaicRequest, TargetWindow};
//! use tilemosaic::reader::MosaicReader;
//!
//! let reader = MosaicReader::new(store, Arc::new(StackedCodec), levels, MosaicConfig::new());
//!
//! let request = MosaicRequest::new(
//!     Envelope::new(10.0, 45.0, 12.0, 47.0),
//!     TargetWindow::new(1024, 1024),
//! );
//!
//! if let Some(raster) = reader.read(&request).await? {
//!     // raster.pixels holds 1024x1024 samples covering raster.envelope
//! }
//! ```

pub mod codec;
pub mod error;
pub mod geo;
pub mod level;
pub mod logging;
pub mod pipeline;
pub mod raster;
pub mod reader;
pub mod store;

/// Version of the tilemosaic library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
