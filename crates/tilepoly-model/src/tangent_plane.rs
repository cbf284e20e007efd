// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Local tangent plane of an ellipsoid
//!
//! Polygons given as Earth-centered positions are analysed in 2D by projecting
//! them onto the plane tangent to the ellipsoid under their center.

use crate::Ellipsoid;
use nalgebra::{Point2, Point3, Vector3};

/// Below this horizontal distance from the polar axis the east direction is undefined
const POLE_EPSILON: f64 = 1e-14;

/// Build the east and north axes of the local frame at a surface point
///
/// At the poles east is fixed to +Y so the frame stays right-handed.
pub(crate) fn east_north(origin: &Point3<f64>, up: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let east = if origin.x.abs() < POLE_EPSILON && origin.y.abs() < POLE_EPSILON {
        Vector3::y()
    } else {
        Vector3::new(-origin.y, origin.x, 0.0).normalize()
    };
    let north = up.cross(&east);
    (east, north)
}

/// Plane tangent to an ellipsoid with an east/north/up frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipsoidTangentPlane {
    origin: Point3<f64>,
    x_axis: Vector3<f64>,
    y_axis: Vector3<f64>,
    normal: Vector3<f64>,
}

impl EllipsoidTangentPlane {
    /// Create the plane tangent at the surface point under `origin`
    ///
    /// Returns `None` when `origin` is at the ellipsoid center.
    pub fn new(origin: &Point3<f64>, ellipsoid: &Ellipsoid) -> Option<Self> {
        let origin = ellipsoid.scale_to_geodetic_surface(origin)?;
        let normal = ellipsoid.geodetic_surface_normal(&origin)?;
        let (x_axis, y_axis) = east_north(&origin, &normal);

        Some(Self {
            origin,
            x_axis,
            y_axis,
            normal,
        })
    }

    /// Create the plane tangent under the center of the points' bounding box
    pub fn from_points(points: &[Point3<f64>], ellipsoid: &Ellipsoid) -> Option<Self> {
        let first = points.first()?;
        let (min, max) = points
            .iter()
            .fold((first.coords, first.coords), |(min, max), p| {
                (min.inf(&p.coords), max.sup(&p.coords))
            });

        Self::new(&Point3::from((min + max) * 0.5), ellipsoid)
    }

    /// Tangent point on the surface
    pub fn origin(&self) -> &Point3<f64> {
        &self.origin
    }

    /// East axis
    pub fn x_axis(&self) -> &Vector3<f64> {
        &self.x_axis
    }

    /// North axis
    pub fn y_axis(&self) -> &Vector3<f64> {
        &self.y_axis
    }

    /// Up axis (plane normal)
    pub fn normal(&self) -> &Vector3<f64> {
        &self.normal
    }

    /// Project a position onto the plane along its direction from the ellipsoid center
    ///
    /// Returns `None` when that line is parallel to the plane.
    pub fn project_point(&self, position: &Point3<f64>) -> Option<Point2<f64>> {
        let direction = position.coords.try_normalize(f64::MIN_POSITIVE)?;
        let denominator = self.normal.dot(&direction);
        if denominator.abs() < f64::EPSILON {
            return None;
        }

        let t = self.normal.dot(&(self.origin - position)) / denominator;
        let offset = (position + direction * t) - self.origin;
        Some(Point2::new(offset.dot(&self.x_axis), offset.dot(&self.y_axis)))
    }

    /// Project every position onto the plane
    ///
    /// Returns `None` if any position cannot be projected.
    pub fn project_points(&self, positions: &[Point3<f64>]) -> Option<Vec<Point2<f64>>> {
        positions.iter().map(|p| self.project_point(p)).collect()
    }
}
