// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Job encoding
//!
//! Builds a header and payload from plain feature rings: rings are quantized onto
//! the `[0, 32767]` grid of the job rectangle, triangulated and zigzag-delta
//! encoded, which is the form tile data sources hand to [`crate::extrude_polygons`].

use crate::decompress::{zigzag_delta_encode, MAX_SHORT};
use crate::params::{HeightRange, JobParameters};
use crate::payload::{FeatureHeights, IndexBuffer, JobPayload};
use crate::triangulation::triangulate_polygon;
use crate::{Error, Result};
use nalgebra::{Matrix4, Point2, Point3};
use tilepoly_model::{Ellipsoid, IndexDatatype, Rectangle};

/// One ring waiting to be encoded
#[derive(Debug, Clone)]
struct PendingFeature {
    ring: Vec<Point2<f64>>,
    batch_id: u32,
    color: u32,
    heights: Option<HeightRange>,
}

/// Builder for polygon extrusion jobs
///
/// Ring coordinates are given in the rectangle's space: longitude/latitude in
/// radians for geographic jobs, raw x/y for planar ones.
///
/// # Example
///
/// ```rust,ignore
/// let (header, payload) = PolygonBatchBuilder::geographic(rectangle)
///     .with_heights(0.0, 25.0)
///     .add_feature(&ring, 7, 0xff00_00ff)
///     .build()?;
/// let extruded = extrude_polygons(&header, payload)?;
/// ```
#[derive(Debug, Clone)]
pub struct PolygonBatchBuilder {
    rectangle: Rectangle,
    is_geographic: bool,
    ellipsoid: Ellipsoid,
    heights: HeightRange,
    center: Point3<f64>,
    model_matrix: Matrix4<f64>,
    features: Vec<PendingFeature>,
}

impl PolygonBatchBuilder {
    fn new(rectangle: Rectangle, is_geographic: bool) -> Self {
        Self {
            rectangle,
            is_geographic,
            ellipsoid: Ellipsoid::wgs84(),
            heights: HeightRange::default(),
            center: Point3::origin(),
            model_matrix: Matrix4::identity(),
            features: Vec::new(),
        }
    }

    /// Jobs whose rectangle is a longitude/latitude extent in radians
    pub fn geographic(rectangle: Rectangle) -> Self {
        Self::new(rectangle, true)
    }

    /// Jobs whose rectangle is a raw x/y extent placed by the model matrix
    pub fn planar(rectangle: Rectangle) -> Self {
        Self::new(rectangle, false)
    }

    /// Default extrusion heights for features added without their own
    pub fn with_heights(mut self, minimum: f64, maximum: f64) -> Self {
        self.heights = HeightRange::new(minimum, maximum);
        self
    }

    /// Origin subtracted from every output position
    pub fn with_center(mut self, center: Point3<f64>) -> Self {
        self.center = center;
        self
    }

    pub fn with_ellipsoid(mut self, ellipsoid: Ellipsoid) -> Self {
        self.ellipsoid = ellipsoid;
        self
    }

    pub fn with_model_matrix(mut self, model_matrix: Matrix4<f64>) -> Self {
        self.model_matrix = model_matrix;
        self
    }

    /// Add a feature extruded between the default heights
    pub fn add_feature(self, ring: &[Point2<f64>], batch_id: u32, color: u32) -> Self {
        self.push(ring, batch_id, color, None)
    }

    /// Add a feature with its own extrusion heights
    ///
    /// Once any feature carries heights, the payload gets per-feature heights and
    /// the others use the builder's defaults.
    pub fn add_feature_with_heights(
        self,
        ring: &[Point2<f64>],
        batch_id: u32,
        color: u32,
        heights: HeightRange,
    ) -> Self {
        self.push(ring, batch_id, color, Some(heights))
    }

    fn push(
        mut self,
        ring: &[Point2<f64>],
        batch_id: u32,
        color: u32,
        heights: Option<HeightRange>,
    ) -> Self {
        self.features.push(PendingFeature {
            ring: ring.to_vec(),
            batch_id,
            color,
            heights,
        });
        self
    }

    /// Number of features added so far
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Job parameters for the current settings and vertex count
    pub fn parameters(&self) -> JobParameters {
        let vertex_count = self.features.iter().map(|f| f.ring.len()).sum();
        JobParameters {
            index_datatype: IndexDatatype::for_vertex_count(vertex_count),
            heights: self.heights,
            center: self.center,
            ellipsoid: self.ellipsoid,
            rectangle: self.rectangle,
            is_geographic: self.is_geographic,
            model_matrix: self.model_matrix,
        }
    }

    /// Snap a point onto the quantization grid
    fn quantize(&self, point: &Point2<f64>) -> (u16, u16) {
        let rectangle = &self.rectangle;
        let max = f64::from(MAX_SHORT);
        let snap = |value: f64, start: f64, end: f64| {
            let t = if end == start { 0.0 } else { (value - start) / (end - start) };
            (t.clamp(0.0, 1.0) * max).round() as u16
        };
        (
            snap(point.x, rectangle.west, rectangle.east),
            snap(point.y, rectangle.south, rectangle.north),
        )
    }

    /// Encode the header and payload
    ///
    /// Fails when a ring cannot be triangulated after quantization.
    pub fn build(&self) -> Result<(Vec<f64>, JobPayload)> {
        let params = self.parameters();

        let mut u = Vec::new();
        let mut v = Vec::new();
        let mut indices = Vec::new();
        let mut counts = Vec::with_capacity(self.features.len());
        let mut index_counts = Vec::with_capacity(self.features.len());

        for (i, feature) in self.features.iter().enumerate() {
            let vertex_offset = u.len();
            let mut grid = Vec::with_capacity(feature.ring.len());
            for point in &feature.ring {
                let (qu, qv) = self.quantize(point);
                u.push(qu);
                v.push(qv);
                grid.push(Point2::new(f64::from(qu), f64::from(qv)));
            }

            let triangles = triangulate_polygon(&grid)
                .map_err(|err| Error::triangulation(format!("feature {i}: {err}")))?;
            indices.extend(triangles.iter().map(|&t| (vertex_offset + t) as u32));

            counts.push(feature.ring.len() as u32);
            index_counts.push(triangles.len() as u32);
        }

        zigzag_delta_encode(&mut u, &mut v);
        u.extend_from_slice(&v);

        let heights = self
            .features
            .iter()
            .any(|f| f.heights.is_some())
            .then(|| {
                let ranges = self.features.iter().map(|f| f.heights.unwrap_or(self.heights));
                FeatureHeights {
                    minimum: ranges.clone().map(|h| h.minimum as f32).collect(),
                    maximum: ranges.map(|h| h.maximum as f32).collect(),
                }
            });

        let indices = match params.index_datatype {
            IndexDatatype::UnsignedShort => {
                IndexBuffer::U16(indices.into_iter().map(|i| i as u16).collect())
            }
            IndexDatatype::UnsignedInt => IndexBuffer::U32(indices),
        };

        let payload = JobPayload {
            indices,
            positions: u,
            counts,
            index_counts,
            batch_ids: self.features.iter().map(|f| f.batch_id).collect(),
            batch_table_colors: self.features.iter().map(|f| f.color).collect(),
            heights,
        };

        Ok((params.pack(), payload))
    }
}
