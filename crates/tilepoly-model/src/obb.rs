// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Oriented bounding boxes for culling

use crate::tangent_plane::east_north;
use crate::traits::require;
use crate::{Cartographic, Ellipsoid, Packable, Rectangle, Result};
use nalgebra::{Matrix3, Point3, Vector3};

/// Columns shorter than this are treated as collapsed axes
const AXIS_EPSILON: f64 = 1e-12;

/// Box with arbitrary orientation
///
/// Each column of `half_axes` points from the center to the middle of one face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBoundingBox {
    pub center: Point3<f64>,
    pub half_axes: Matrix3<f64>,
}

impl OrientedBoundingBox {
    /// Create a box from its center and half axes
    pub fn new(center: Point3<f64>, half_axes: Matrix3<f64>) -> Self {
        Self { center, half_axes }
    }

    /// Fit a box to `points` in the frame given by the orthonormal columns of `rotation`
    fn fit_in_frame(rotation: &Matrix3<f64>, points: &[Point3<f64>]) -> Option<Self> {
        let inverse = rotation.transpose();
        let first = inverse * points.first()?.coords;

        let (min, max) = points.iter().fold((first, first), |(min, max), p| {
            let local = inverse * p.coords;
            (min.inf(&local), max.sup(&local))
        });

        let center = rotation * ((min + max) * 0.5);
        let half_axes = rotation * Matrix3::from_diagonal(&((max - min) * 0.5));
        Some(Self::new(Point3::from(center), half_axes))
    }

    /// Fit a box to the principal axes of a point set
    ///
    /// Returns `None` for an empty set.
    pub fn from_points(points: &[Point3<f64>]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let count = points.len() as f64;
        let mean = points.iter().fold(Vector3::zeros(), |sum, p| sum + p.coords) / count;

        let covariance = points.iter().fold(Matrix3::zeros(), |sum, p| {
            let d = p.coords - mean;
            sum + d * d.transpose()
        }) / count;

        let rotation = covariance.symmetric_eigen().eigenvectors;
        Self::fit_in_frame(&rotation, points)
    }

    /// Fit an east/north/up aligned box around a geographic rectangle between two heights
    ///
    /// The rectangle should span less than half the globe in longitude.
    pub fn from_rectangle(
        rectangle: &Rectangle,
        minimum_height: f64,
        maximum_height: f64,
        ellipsoid: &Ellipsoid,
    ) -> Option<Self> {
        let center = rectangle.center();
        let origin = ellipsoid.cartographic_to_cartesian(&center);
        let up = ellipsoid.geodetic_surface_normal_cartographic(&center);
        let (east, north) = east_north(&origin, &up);
        let rotation = Matrix3::from_columns(&[east, north, up]);

        // Extremes along each local axis occur on the rectangle edges, on the center
        // meridian/parallel, or on the parallel closest to the equator
        let east_limit = rectangle.west + rectangle.width();
        let longitudes = [rectangle.west, center.longitude, east_limit];
        let latitudes = [
            rectangle.south,
            center.latitude,
            rectangle.north,
            0.0f64.clamp(rectangle.south, rectangle.north),
        ];

        let mut samples = Vec::with_capacity(longitudes.len() * latitudes.len() * 2);
        for height in [minimum_height, maximum_height] {
            for &latitude in &latitudes {
                for &longitude in &longitudes {
                    samples.push(ellipsoid.cartographic_to_cartesian(&Cartographic::new(
                        longitude, latitude, height,
                    )));
                }
            }
        }

        Self::fit_in_frame(&rotation, &samples)
    }

    /// Check if a point lies inside the box, allowing `tolerance` meters of slack
    pub fn contains(&self, point: &Point3<f64>, tolerance: f64) -> bool {
        let mut residual = point - self.center;

        for axis in self.half_axes.column_iter() {
            let length = axis.norm();
            if length < AXIS_EPSILON {
                continue;
            }
            let direction = axis / length;
            let distance = residual.dot(&direction);
            if distance.abs() > length + tolerance {
                return false;
            }
            residual -= direction * distance;
        }

        // Whatever remains lies along collapsed axes
        residual.norm() <= tolerance
    }

    /// Corner points of the box
    pub fn corners(&self) -> [Point3<f64>; 8] {
        let a = self.half_axes.column(0).into_owned();
        let b = self.half_axes.column(1).into_owned();
        let c = self.half_axes.column(2).into_owned();
        let mut corners = [self.center; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let sign = |bit: usize| if i & bit == 0 { -1.0 } else { 1.0 };
            *corner = self.center + a * sign(1) + b * sign(2) + c * sign(4);
        }
        corners
    }
}

impl Packable for OrientedBoundingBox {
    const PACKED_LENGTH: usize = 12;

    fn pack_into(&self, buffer: &mut Vec<f64>) {
        self.center.pack_into(buffer);
        buffer.extend_from_slice(self.half_axes.as_slice());
    }

    fn unpack_from(buffer: &[f64]) -> Result<Self> {
        require(buffer, Self::PACKED_LENGTH)?;
        Ok(Self::new(
            Point3::unpack_from(buffer)?,
            Matrix3::from_column_slice(&buffer[3..12]),
        ))
    }
}
