// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-feature extrusion into the batched output buffers
//!
//! Each feature ring is clamped to the ellipsoid surface, put in counter-clockwise
//! order (seen from above), offset along the surface normal to a bottom and a top
//! shell, and written into its color group's range. Cap triangles are remapped into
//! the shared vertex space and the side wall is stitched between the shells.
//!
//! Vertex `k` of a feature occupies two output slots: `2k` (top) and `2k + 1` (bottom).

use crate::params::JobParameters;
use crate::payload::{Feature, IndexBuffer};
use crate::planner::{GroupState, WALL_INDICES_PER_VERTEX};
use crate::triangulation::{signed_area, triangle_orientation, winding_order, WindingOrder};
use crate::{Error, Result};
use nalgebra::{Point2, Point3, Vector3};
use std::f64::consts::{PI, TAU};
use tilepoly_model::{EllipsoidTangentPlane, IndexDatatype, OrientedBoundingBox, Rectangle};

/// Shared output buffers of one job
///
/// Every feature writes only inside the ranges reserved for it by the color plan.
#[derive(Debug, Clone)]
pub struct BatchedBuffers {
    /// Center-relative xyz per output vertex
    pub positions: Vec<f32>,
    /// External feature id per output vertex
    pub batch_ids: Vec<u16>,
    pub indices: IndexBuffer,
    /// First output index of each feature
    pub index_offsets: Vec<u32>,
    /// Output index count of each feature
    pub index_counts: Vec<u32>,
}

impl BatchedBuffers {
    /// Allocate zeroed buffers for the planned sizes
    ///
    /// The index datatype is chosen from the output vertex count here, before any
    /// feature is written.
    pub fn new(vertex_slots: usize, index_length: usize, feature_count: usize) -> Self {
        Self {
            positions: vec![0.0; vertex_slots * 3],
            batch_ids: vec![0; vertex_slots],
            indices: IndexBuffer::zeroed(IndexDatatype::for_vertex_count(vertex_slots), index_length),
            index_offsets: vec![0; feature_count],
            index_counts: vec![0; feature_count],
        }
    }

    #[inline]
    fn write_position(&mut self, slot: usize, position: &Point3<f64>, center: &Point3<f64>) {
        let relative = position - center;
        self.positions[slot * 3] = relative.x as f32;
        self.positions[slot * 3 + 1] = relative.y as f32;
        self.positions[slot * 3 + 2] = relative.z as f32;
    }
}

/// Longitude/latitude/height extent of a feature
#[derive(Debug, Clone, Copy)]
struct GeographicExtent {
    west: f64,
    east: f64,
    // Same longitudes shifted into [0, 2pi) for rings crossing the antimeridian
    west_shifted: f64,
    east_shifted: f64,
    south: f64,
    north: f64,
    lowest: f64,
    highest: f64,
}

impl GeographicExtent {
    fn new() -> Self {
        Self {
            west: f64::INFINITY,
            east: f64::NEG_INFINITY,
            west_shifted: f64::INFINITY,
            east_shifted: f64::NEG_INFINITY,
            south: f64::INFINITY,
            north: f64::NEG_INFINITY,
            lowest: f64::INFINITY,
            highest: f64::NEG_INFINITY,
        }
    }

    fn include(&mut self, longitude: f64, latitude: f64, height: f64) {
        let shifted = if longitude < 0.0 { longitude + TAU } else { longitude };
        self.west = self.west.min(longitude);
        self.east = self.east.max(longitude);
        self.west_shifted = self.west_shifted.min(shifted);
        self.east_shifted = self.east_shifted.max(shifted);
        self.south = self.south.min(latitude);
        self.north = self.north.max(latitude);
        self.lowest = self.lowest.min(height);
        self.highest = self.highest.max(height);
    }

    /// Tightest rectangle, wrapping across the antimeridian when that is narrower
    fn rectangle(&self) -> Rectangle {
        if self.east - self.west > PI && self.east_shifted - self.west_shifted < PI {
            let wrap = |longitude: f64| if longitude > PI { longitude - TAU } else { longitude };
            Rectangle::new(
                wrap(self.west_shifted),
                self.south,
                wrap(self.east_shifted),
                self.north,
            )
        } else {
            Rectangle::new(self.west, self.south, self.east, self.north)
        }
    }
}

/// Scratch storage reused across features of one job
#[derive(Debug, Default)]
struct Scratch {
    surface: Vec<Point3<f64>>,
    normals: Vec<Vector3<f64>>,
    projected: Vec<Point2<f64>>,
    shell: Vec<Point3<f64>>,
}

impl Scratch {
    fn reset(&mut self) {
        self.surface.clear();
        self.normals.clear();
        self.projected.clear();
        self.shell.clear();
    }
}

/// Builds features one after another into shared buffers
pub struct FeatureBuilder<'a> {
    params: &'a JobParameters,
    decoded: &'a [Point3<f64>],
    indices: &'a IndexBuffer,
    scratch: Scratch,
}

impl<'a> FeatureBuilder<'a> {
    /// Create a builder over the decoded position table and source indices
    pub fn new(
        params: &'a JobParameters,
        decoded: &'a [Point3<f64>],
        indices: &'a IndexBuffer,
    ) -> Self {
        Self {
            params,
            decoded,
            indices,
            scratch: Scratch::default(),
        }
    }

    /// Extrude one feature at its group's cursor and advance the cursor
    ///
    /// Returns the feature's bounding volume. Fails on degenerate rings or
    /// indices that leave the feature's vertex range; nothing is written then.
    pub fn build(
        &mut self,
        feature: &Feature,
        state: &mut GroupState,
        out: &mut BatchedBuffers,
    ) -> Result<OrientedBoundingBox> {
        let n = feature.vertex_count;
        if n < 3 {
            return Err(Error::degenerate(
                feature.index,
                format!("ring has {n} vertices, need at least 3"),
            ));
        }

        self.scratch.reset();
        let extent = self.clamp_to_surface(feature)?;
        let reversed = self.normalize_winding(feature)?;
        let triangles = self.remap_triangles(feature, reversed)?;
        let bounding_volume = self.bounding_volume(feature, &extent)?;

        self.write_shells(feature, state.write_cursor, reversed, out);

        let start = state.index_cursor;
        let end = write_indices(&triangles, n, state.write_cursor, start, &mut out.indices);
        out.index_offsets[feature.index] = start as u32;
        out.index_counts[feature.index] = (end - start) as u32;

        state.write_cursor += 2 * n;
        state.index_cursor = end;

        Ok(bounding_volume)
    }

    fn ring(&self, feature: &Feature) -> &'a [Point3<f64>] {
        &self.decoded[feature.vertex_offset..feature.vertex_offset + feature.vertex_count]
    }

    /// Transform the ring, record its geographic extent and scale it onto the surface
    fn clamp_to_surface(&mut self, feature: &Feature) -> Result<GeographicExtent> {
        let ellipsoid = &self.params.ellipsoid;
        let at_center = || Error::degenerate(feature.index, "vertex at ellipsoid center");
        let mut extent = GeographicExtent::new();

        for position in self.ring(feature) {
            let position = self.params.model_matrix.transform_point(position);
            let cartographic = ellipsoid
                .cartesian_to_cartographic(&position)
                .ok_or_else(at_center)?;
            extent.include(
                cartographic.longitude,
                cartographic.latitude,
                cartographic.height,
            );

            let surface = ellipsoid
                .scale_to_geodetic_surface(&position)
                .ok_or_else(at_center)?;
            let normal = ellipsoid
                .geodetic_surface_normal(&surface)
                .ok_or_else(at_center)?;
            self.scratch.surface.push(surface);
            self.scratch.normals.push(normal);
        }

        Ok(extent)
    }

    /// Project the surface ring onto its tangent plane; returns whether it was clockwise
    fn normalize_winding(&mut self, feature: &Feature) -> Result<bool> {
        let plane =
            EllipsoidTangentPlane::from_points(&self.scratch.surface, &self.params.ellipsoid)
                .ok_or_else(|| Error::degenerate(feature.index, "no tangent plane"))?;
        let projected = plane.project_points(&self.scratch.surface).ok_or_else(|| {
            Error::degenerate(feature.index, "ring not projectable to tangent plane")
        })?;

        let area = signed_area(&projected);
        if area == 0.0 || !area.is_finite() {
            return Err(Error::degenerate(feature.index, "ring has zero area"));
        }
        self.scratch.projected = projected;

        Ok(winding_order(&self.scratch.projected) == WindingOrder::Clockwise)
    }

    /// Map source triangles to storage positions with counter-clockwise orientation
    fn remap_triangles(&self, feature: &Feature, reversed: bool) -> Result<Vec<[usize; 3]>> {
        let n = feature.vertex_count;
        let projected = &self.scratch.projected;
        let mut triangles = Vec::with_capacity(feature.index_count / 3);

        for t in (0..feature.index_count).step_by(3) {
            let mut corners = [0usize; 3];
            for (corner, slot) in corners.iter_mut().zip(feature.index_offset + t..) {
                let index = self.indices.get(slot).ok_or_else(|| {
                    Error::malformed(format!(
                        "feature {} reads past the index buffer",
                        feature.index
                    ))
                })?;
                *corner = (index as usize)
                    .checked_sub(feature.vertex_offset)
                    .filter(|&local| local < n)
                    .ok_or_else(|| Error::index_out_of_range(feature.index, index))?;
            }

            // Source triangulations may wind either way
            let [a, b, c] = corners;
            if triangle_orientation(&projected[a], &projected[b], &projected[c]) < 0.0 {
                corners.swap(1, 2);
            }

            triangles.push(if reversed {
                corners.map(|local| n - 1 - local)
            } else {
                corners
            });
        }

        Ok(triangles)
    }

    /// Fit the feature's culling volume
    ///
    /// Geographic jobs fit the lon/lat extent between the lowest and highest of the
    /// shell heights and the input vertex heights; planar jobs fit both shells and
    /// the transformed input vertices directly.
    fn bounding_volume(
        &mut self,
        feature: &Feature,
        extent: &GeographicExtent,
    ) -> Result<OrientedBoundingBox> {
        let heights = feature.heights;
        let ring = self.ring(feature);

        let bounding_volume = if self.params.is_geographic {
            OrientedBoundingBox::from_rectangle(
                &extent.rectangle(),
                heights.minimum.min(extent.lowest),
                heights.maximum.max(extent.highest),
                &self.params.ellipsoid,
            )
        } else {
            let shell = &mut self.scratch.shell;
            for (surface, normal) in self.scratch.surface.iter().zip(&self.scratch.normals) {
                shell.push(surface + normal * heights.minimum);
                shell.push(surface + normal * heights.maximum);
            }
            let model_matrix = &self.params.model_matrix;
            shell.extend(ring.iter().map(|p| model_matrix.transform_point(p)));
            OrientedBoundingBox::from_points(shell)
        };

        bounding_volume
            .ok_or_else(|| Error::degenerate(feature.index, "bounding volume fit failed"))
    }

    /// Write top/bottom shell positions and ids in counter-clockwise ring order
    fn write_shells(
        &self,
        feature: &Feature,
        first_slot: usize,
        reversed: bool,
        out: &mut BatchedBuffers,
    ) {
        let n = feature.vertex_count;
        let center = &self.params.center;
        let heights = feature.heights;

        for k in 0..n {
            let source = if reversed { n - 1 - k } else { k };
            let position = &self.scratch.surface[source];
            let normal = &self.scratch.normals[source];

            let bottom = position + normal * heights.minimum;
            let top = position + normal * heights.maximum;

            let slot = first_slot + 2 * k;
            out.write_position(slot, &top, center);
            out.write_position(slot + 1, &bottom, center);
            out.batch_ids[slot] = feature.batch_id;
            out.batch_ids[slot + 1] = feature.batch_id;
        }
    }
}

/// Emit cap and wall indices for a ring of `n` vertices starting at vertex slot `base`
///
/// Returns the index cursor after the last written index.
fn write_indices(
    triangles: &[[usize; 3]],
    n: usize,
    base: usize,
    start: usize,
    indices: &mut IndexBuffer,
) -> usize {
    let top = |k: usize| (base + 2 * k) as u32;
    let bottom = |k: usize| (base + 2 * k + 1) as u32;
    let mut cursor = start;
    let mut emit = |values: [u32; 3]| {
        for value in values {
            indices.set(cursor, value);
            cursor += 1;
        }
    };

    for &[i0, i1, i2] in triangles {
        emit([top(i0), top(i1), top(i2)]);
        emit([bottom(i2), bottom(i1), bottom(i0)]);
    }

    for v0 in 0..n {
        let v1 = (v0 + 1) % n;
        emit([bottom(v0), top(v1), top(v0)]);
        emit([bottom(v0), bottom(v1), top(v1)]);
    }

    debug_assert_eq!(
        cursor - start,
        triangles.len() * 6 + n * WALL_INDICES_PER_VERTEX
    );
    cursor
}
