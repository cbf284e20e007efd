// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! TilePoly Model - Shared types and ellipsoid math for extruded vector-tile polygons
//!
//! This crate holds the geometric collaborators used by `tilepoly-extrude`:
//!
//! - [`Ellipsoid`] - Reference ellipsoid with geodetic conversions
//! - [`EllipsoidTangentPlane`] - Local east/north plane used for 2D polygon analysis
//! - [`OrientedBoundingBox`] - Culling volumes fit to points or geographic rectangles
//! - [`Packable`] - Fixed-width `f64` packing shared by job headers and results
//!
//! Positions are `nalgebra` points in an Earth-centered, Earth-fixed frame (meters);
//! angles are radians.
//!
//! # Example
//!
//! ```ignore
//! use tilepoly_model::{Cartographic, Ellipsoid};
//!
//! let ellipsoid = Ellipsoid::wgs84();
//! let position = ellipsoid.cartographic_to_cartesian(&Cartographic::from_degrees(7.0, 46.0, 0.0));
//! let back = ellipsoid.cartesian_to_cartographic(&position).unwrap();
//! ```

pub mod ellipsoid;
pub mod error;
pub mod obb;
pub mod packing;
pub mod tangent_plane;
pub mod traits;
pub mod types;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector3};

// Re-export all public types
pub use ellipsoid::Ellipsoid;
pub use error::{PackError, Result};
pub use obb::OrientedBoundingBox;
pub use packing::{PackedReader, PackedWriter};
pub use tangent_plane::EllipsoidTangentPlane;
pub use traits::Packable;
pub use types::{Cartographic, Color, IndexDatatype, Rectangle};
