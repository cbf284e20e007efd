// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reference ellipsoid and geodetic conversions

use crate::traits::require;
use crate::{Cartographic, Packable, Result};
use nalgebra::{Point3, Vector3};

/// Convergence threshold of the surface projection
const SCALE_EPSILON: f64 = 1e-12;

/// Positions this close (in scaled squared norm) to the center project radially
const CENTER_TOLERANCE_SQUARED: f64 = 0.1;

/// Newton iteration guard for surface projection
const MAX_SCALE_ITERATIONS: usize = 64;

/// Axis-aligned ellipsoid centered at the origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    radii: Vector3<f64>,
    radii_squared: Vector3<f64>,
    one_over_radii_squared: Vector3<f64>,
}

#[inline]
fn recip_or_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        1.0 / value
    }
}

impl Ellipsoid {
    /// Create an ellipsoid from its semi-axes in meters
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        let radii = Vector3::new(x, y, z);
        let radii_squared = radii.component_mul(&radii);
        Self {
            radii,
            radii_squared,
            one_over_radii_squared: radii_squared.map(recip_or_zero),
        }
    }

    /// WGS84 reference ellipsoid
    pub fn wgs84() -> Self {
        Self::new(6_378_137.0, 6_378_137.0, 6_356_752.314_245_179)
    }

    /// Sphere of radius one
    pub fn unit_sphere() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    /// Semi-axes in meters
    pub fn radii(&self) -> Vector3<f64> {
        self.radii
    }

    /// Largest semi-axis
    pub fn maximum_radius(&self) -> f64 {
        self.radii.max()
    }

    /// Outward normal of the surface through `position`
    ///
    /// Returns `None` at the ellipsoid center.
    pub fn geodetic_surface_normal(&self, position: &Point3<f64>) -> Option<Vector3<f64>> {
        position
            .coords
            .component_mul(&self.one_over_radii_squared)
            .try_normalize(f64::MIN_POSITIVE)
    }

    /// Outward surface normal at a geodetic position
    pub fn geodetic_surface_normal_cartographic(&self, position: &Cartographic) -> Vector3<f64> {
        let cos_latitude = position.latitude.cos();
        Vector3::new(
            cos_latitude * position.longitude.cos(),
            cos_latitude * position.longitude.sin(),
            position.latitude.sin(),
        )
        .normalize()
    }

    /// Convert a geodetic position to Earth-centered coordinates
    pub fn cartographic_to_cartesian(&self, position: &Cartographic) -> Point3<f64> {
        let normal = self.geodetic_surface_normal_cartographic(position);
        let k = self.radii_squared.component_mul(&normal);
        let gamma = normal.dot(&k).sqrt();
        Point3::from(k / gamma + normal * position.height)
    }

    /// Convert an Earth-centered position to a geodetic one
    ///
    /// Returns `None` at the ellipsoid center, where no surface point is defined.
    pub fn cartesian_to_cartographic(&self, position: &Point3<f64>) -> Option<Cartographic> {
        let surface = self.scale_to_geodetic_surface(position)?;
        let normal = self.geodetic_surface_normal(&surface)?;
        let offset = position - surface;
        let height = offset.dot(&position.coords).signum() * offset.norm();

        Some(Cartographic::new(
            normal.y.atan2(normal.x),
            normal.z.clamp(-1.0, 1.0).asin(),
            height,
        ))
    }

    /// Project a position onto the surface along the geodetic normal
    ///
    /// Solves for the surface point whose normal passes through `position`
    /// with Newton iteration. Returns `None` at the ellipsoid center.
    pub fn scale_to_geodetic_surface(&self, position: &Point3<f64>) -> Option<Point3<f64>> {
        let p = position.coords;
        let oors = self.one_over_radii_squared;

        let x2 = p.x * p.x * oors.x;
        let y2 = p.y * p.y * oors.y;
        let z2 = p.z * p.z * oors.z;

        let squared_norm = x2 + y2 + z2;
        let ratio = (1.0 / squared_norm).sqrt();
        if !ratio.is_finite() {
            return None;
        }

        // Radial projection is the starting guess
        let intersection = p * ratio;
        if squared_norm < CENTER_TOLERANCE_SQUARED {
            return Some(Point3::from(intersection));
        }

        let gradient = intersection.component_mul(&oors) * 2.0;
        let mut lambda = (1.0 - ratio) * p.norm() / (0.5 * gradient.norm());
        let mut correction = 0.0;
        let mut multiplier = Vector3::repeat(1.0);

        for _ in 0..MAX_SCALE_ITERATIONS {
            lambda -= correction;

            multiplier = Vector3::new(
                1.0 / (1.0 + lambda * oors.x),
                1.0 / (1.0 + lambda * oors.y),
                1.0 / (1.0 + lambda * oors.z),
            );
            let m2 = multiplier.component_mul(&multiplier);
            let m3 = m2.component_mul(&multiplier);

            let func = x2 * m2.x + y2 * m2.y + z2 * m2.z - 1.0;
            if func.abs() <= SCALE_EPSILON {
                break;
            }

            let denominator = x2 * m3.x * oors.x + y2 * m3.y * oors.y + z2 * m3.z * oors.z;
            correction = func / (-2.0 * denominator);
        }

        Some(Point3::from(p.component_mul(&multiplier)))
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl Packable for Ellipsoid {
    const PACKED_LENGTH: usize = 3;

    fn pack_into(&self, buffer: &mut Vec<f64>) {
        buffer.extend_from_slice(self.radii.as_slice());
    }

    fn unpack_from(buffer: &[f64]) -> Result<Self> {
        require(buffer, Self::PACKED_LENGTH)?;
        Ok(Self::new(buffer[0], buffer[1], buffer[2]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cartographic_round_trip() {
        let ellipsoid = Ellipsoid::wgs84();
        let position = Cartographic::from_degrees(-75.6, 40.04, 123.0);

        let cartesian = ellipsoid.cartographic_to_cartesian(&position);
        let back = ellipsoid.cartesian_to_cartographic(&cartesian).unwrap();

        assert_relative_eq!(back.longitude, position.longitude, epsilon = 1e-12);
        assert_relative_eq!(back.latitude, position.latitude, epsilon = 1e-12);
        assert_relative_eq!(back.height, position.height, epsilon = 1e-6);
    }

    #[test]
    fn test_equator_and_pole() {
        let ellipsoid = Ellipsoid::wgs84();

        let equator = ellipsoid.cartographic_to_cartesian(&Cartographic::new(0.0, 0.0, 0.0));
        assert_relative_eq!(equator, Point3::new(6_378_137.0, 0.0, 0.0), epsilon = 1e-6);

        let pole = ellipsoid.cartographic_to_cartesian(&Cartographic::from_degrees(0.0, 90.0, 0.0));
        assert_relative_eq!(pole.z, 6_356_752.314_245_179, epsilon = 1e-6);
    }

    #[test]
    fn test_scale_to_surface_keeps_normal() {
        let ellipsoid = Ellipsoid::wgs84();
        let on_surface =
            ellipsoid.cartographic_to_cartesian(&Cartographic::from_degrees(10.0, 45.0, 0.0));
        let normal = ellipsoid.geodetic_surface_normal(&on_surface).unwrap();
        let above = on_surface + normal * 5_000.0;

        let scaled = ellipsoid.scale_to_geodetic_surface(&above).unwrap();
        assert_relative_eq!(scaled, on_surface, epsilon = 1e-6);
    }

    #[test]
    fn test_unit_sphere_normals_are_radial() {
        let sphere = Ellipsoid::unit_sphere();
        assert_eq!(sphere.radii(), Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(sphere.maximum_radius(), 1.0);

        let position =
            sphere.cartographic_to_cartesian(&Cartographic::from_degrees(30.0, 60.0, 0.0));
        assert_relative_eq!(position.coords.norm(), 1.0, epsilon = 1e-12);
        let normal = sphere.geodetic_surface_normal(&position).unwrap();
        assert_relative_eq!(normal, position.coords, epsilon = 1e-12);
    }

    #[test]
    fn test_center_has_no_surface_point() {
        let ellipsoid = Ellipsoid::wgs84();
        assert!(ellipsoid.scale_to_geodetic_surface(&Point3::origin()).is_none());
        assert!(ellipsoid.cartesian_to_cartographic(&Point3::origin()).is_none());
        assert!(ellipsoid.geodetic_surface_normal(&Point3::origin()).is_none());
    }
}
