// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Tilepoly Extrusion
//!
//! Turns a batch of quantized vector-tile polygons into GPU-ready prisms.
//!
//! ## Overview
//!
//! One job carries a packed `f64` header and typed payload buffers describing many
//! features. Each feature ring is decompressed, clamped to the ellipsoid surface,
//! extruded between a bottom and a top height and written into shared buffers:
//!
//! - **Parameters**: header decoding ([`JobParameters`])
//! - **Decompression**: zigzag-delta decoding and dequantization
//! - **Planning**: features grouped by color into contiguous output ranges
//! - **Extrusion**: caps, side walls and a bounding volume per feature
//! - **Packing**: draw calls and bounding volumes in one flat buffer
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tilepoly_extrude::{extrude_polygons, PackedResult, PolygonBatchBuilder, Point2};
//! use tilepoly_model::Rectangle;
//!
//! let rectangle = Rectangle::from_degrees(10.0, 45.0, 10.01, 45.01);
//! let (header, payload) = PolygonBatchBuilder::geographic(rectangle)
//!     .with_heights(0.0, 30.0)
//!     .add_feature(&ring, 42, 0xff00_00ff)
//!     .build()?;
//!
//! let extruded = extrude_polygons(&header, payload)?;
//! let result = PackedResult::unpack(&extruded.packed_buffer)?;
//! println!("{} draw calls", result.draw_calls.len());
//! ```

pub mod decompress;
pub mod draw_calls;
pub mod encoder;
pub mod error;
pub mod extrusion;
pub mod packer;
pub mod params;
pub mod payload;
pub mod pipeline;
pub mod planner;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3};

pub use decompress::{decode_positions, zigzag_delta_decode, zigzag_delta_encode, MAX_SHORT};
pub use draw_calls::{finalize, DrawCall};
pub use encoder::PolygonBatchBuilder;
pub use error::{Error, Result};
pub use extrusion::{BatchedBuffers, FeatureBuilder};
pub use packer::{pack_result, PackedResult};
pub use params::{HeightRange, JobParameters, HEADER_LENGTH};
pub use payload::{Feature, FeatureHeights, IndexBuffer, JobPayload};
pub use pipeline::{extrude_polygon_batches, extrude_polygons, ExtrudedPolygons, PolygonJob};
pub use planner::{ColorGroup, ColorPlan, GroupState};
pub use triangulation::triangulate_polygon;
