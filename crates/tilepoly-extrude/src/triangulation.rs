// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon winding and triangulation utilities
//!
//! Winding analysis runs on tangent-plane projections of feature rings;
//! triangulation wraps earcutr for building jobs from raw rings.

use crate::{Error, Result};
use nalgebra::Point2;

/// Orientation of a 2D ring or triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindingOrder {
    Clockwise,
    CounterClockwise,
}

/// Signed area of a ring (shoelace formula); positive when counter-clockwise
#[inline]
pub fn signed_area(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    let mut area = 0.0;
    for i in 0..n {
        let p0 = &points[i];
        let p1 = &points[(i + 1) % n];
        area += p0.x * p1.y - p1.x * p0.y;
    }
    area * 0.5
}

/// Winding order of a ring; zero-area rings count as clockwise
#[inline]
pub fn winding_order(points: &[Point2<f64>]) -> WindingOrder {
    if signed_area(points) > 0.0 {
        WindingOrder::CounterClockwise
    } else {
        WindingOrder::Clockwise
    }
}

/// Twice the signed area of triangle (a, b, c)
#[inline]
pub fn triangle_orientation(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Turns smaller than this (twice the triangle area) count as straight
const COLLINEAR_EPSILON: f64 = 1e-10;

/// Whether every turn of the ring bends the same way; straight runs are ignored
fn is_convex(points: &[Point2<f64>]) -> bool {
    let n = points.len();
    let mut turns = (0..n)
        .map(|i| triangle_orientation(&points[i], &points[(i + 1) % n], &points[(i + 2) % n]))
        .filter(|turn| turn.abs() > COLLINEAR_EPSILON)
        .map(|turn| turn > 0.0);

    match turns.next() {
        Some(first) => turns.all(|left| left == first),
        None => false,
    }
}

/// Triangles sharing the ring's first vertex
fn fan_triangulate(n: usize) -> Vec<usize> {
    (1..n - 1).flat_map(|i| [0, i, i + 1]).collect()
}

/// Triangulate a simple ring without holes
///
/// Returns indices into `points`, three per triangle. Triangles and small convex
/// rings skip earcut. Winding of the output follows the input.
pub fn triangulate_polygon(points: &[Point2<f64>]) -> Result<Vec<usize>> {
    let n = points.len();
    match n {
        0..=2 => {
            return Err(Error::triangulation(format!(
                "ring has {n} points, need at least 3"
            )))
        }
        3 => return Ok(vec![0, 1, 2]),
        _ if n <= 8 && is_convex(points) => return Ok(fan_triangulate(n)),
        _ => {}
    }

    let coordinates: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y]).collect();
    let indices = earcutr::earcut(&coordinates, &[], 2)
        .map_err(|err| Error::triangulation(format!("earcut failed: {err:?}")))?;

    if indices.is_empty() {
        return Err(Error::triangulation("ring has no area"));
    }
    Ok(indices)
}
