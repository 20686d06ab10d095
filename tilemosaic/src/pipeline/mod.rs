//! Async mosaic assembly pipeline.
//!
//! This module implements a two-stage asynchronous pipeline for assembling
//! a mosaic raster from stored tiles. The fetch stage runs one spatial
//! query and decodes every hit concurrently; the compose stage pastes the
//! decoded tiles onto a shared canvas and resamples the result to the
//! requested window. The stages are linked by an unbounded in-memory queue
//! terminated by a single end sentinel.
//!
//! # Architecture
//!
//! ```text
//! Spatial Query → Decode Tasks → Tile Queue → Compositor → Resample → Mosaic
//! ```
//!
//! # Key Components
//!
//! - [`MosaicRequest`] - Describes the queried area, output size and rendering options
//! - [`RequestId`] - Unique identifier for tracking requests through the pipeline
//! - [`RequestContext`] - Immutable per-request state shared by both stages
//! - [`MosaicConfig`] - Tuning knobs for decode parallelism, grid snapping and resampling
//! - [`MosaicRaster`] - The assembled pixels with their georeferenced extent
//!
//! # Example
//!
//! ```ignore
//! use tilemosaic::geo::Envelope;
//! use tilemosaic::pipeline::{MosaicRequest, TargetWindow};
//!
//! let request = MosaicRequest::new(
//!     Envelope::new(10.0, 45.0, 12.0, 47.0),
//!     TargetWindow::new(1024, 1024),
//! );
//!
//! // Hand the request to a MosaicReader...
//! let raster = reader.read(&request).await?;
//! ```

mod compose;
mod config;
mod decode;
mod element;
mod fetch;
mod request;

pub use compose::{MosaicRaster, compose_stage};
pub use config::MosaicConfig;
pub use element::{DecodedTile, TileQueueElement};
pub use fetch::{FetchSummary, fetch_stage};
pub use request::{MosaicRequest, RequestContext, RequestEnvelopes, RequestId, TargetWindow};
