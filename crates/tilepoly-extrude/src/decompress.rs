// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Quantized position decoding
//!
//! Positions arrive as two u16 runs (all u, then all v) on a `[0, 32767]` grid over
//! the job rectangle, zigzag-delta encoded.

use crate::params::JobParameters;
use nalgebra::Point3;
use tilepoly_model::Cartographic;

/// Largest quantized grid coordinate
pub const MAX_SHORT: u16 = 32_767;

/// Map a signed delta to an unsigned code (0, -1, 1, -2, ... -> 0, 1, 2, 3, ...)
#[inline]
pub fn zigzag_encode(value: i16) -> u16 {
    ((value << 1) ^ (value >> 15)) as u16
}

/// Recover the signed delta from its zigzag code
#[inline]
pub fn zigzag_decode(code: u16) -> i32 {
    i32::from(code >> 1) ^ -i32::from(code & 1)
}

/// Replace each code with the running sum of decoded deltas, in place
///
/// Sums wrap modulo 2^16, so out-of-range payloads decode to some grid value
/// instead of overflowing.
pub fn zigzag_delta_decode(u: &mut [u16], v: &mut [u16]) {
    debug_assert_eq!(u.len(), v.len());
    let mut current_u = 0u16;
    let mut current_v = 0u16;

    for (u, v) in u.iter_mut().zip(v.iter_mut()) {
        current_u = current_u.wrapping_add(zigzag_decode(*u) as u16);
        current_v = current_v.wrapping_add(zigzag_decode(*v) as u16);
        *u = current_u;
        *v = current_v;
    }
}

/// Replace each value with the zigzag code of its delta from the previous one, in place
pub fn zigzag_delta_encode(u: &mut [u16], v: &mut [u16]) {
    debug_assert_eq!(u.len(), v.len());
    let mut previous_u = 0u16;
    let mut previous_v = 0u16;

    for (u, v) in u.iter_mut().zip(v.iter_mut()) {
        let (value_u, value_v) = (*u, *v);
        *u = zigzag_encode(value_u.wrapping_sub(previous_u) as i16);
        *v = zigzag_encode(value_v.wrapping_sub(previous_v) as i16);
        previous_u = value_u;
        previous_v = value_v;
    }
}

#[inline]
fn lerp(start: f64, end: f64, t: f64) -> f64 {
    (1.0 - t) * start + t * end
}

/// Decode the payload positions into Earth-centered (or planar) points
///
/// `positions` is decoded in place and left holding the absolute grid coordinates.
/// Geographic jobs place each point on the ellipsoid surface; planar jobs use the
/// dequantized values as x/y with z = 0.
pub fn decode_positions(positions: &mut [u16], params: &JobParameters) -> Vec<Point3<f64>> {
    let vertex_count = positions.len() / 2;
    let (u_buffer, v_buffer) = positions.split_at_mut(vertex_count);
    zigzag_delta_decode(u_buffer, v_buffer);

    let rectangle = &params.rectangle;
    let max = f64::from(MAX_SHORT);

    u_buffer
        .iter()
        .zip(v_buffer.iter())
        .map(|(&u, &v)| {
            let x = lerp(rectangle.west, rectangle.east, f64::from(u) / max);
            let y = lerp(rectangle.south, rectangle.north, f64::from(v) / max);

            if params.is_geographic {
                params
                    .ellipsoid
                    .cartographic_to_cartesian(&Cartographic::new(x, y, 0.0))
            } else {
                Point3::new(x, y, 0.0)
            }
        })
        .collect()
}
