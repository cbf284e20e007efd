// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core traits for flat buffer transport
//!
//! Job headers and job results cross the worker boundary as plain `f64` sequences.
//! Every value that appears in them has a fixed packed width.

use crate::{PackError, Result};
use nalgebra::{Matrix4, Point3};

/// Fixed-width `f64` packing
///
/// # Example
///
/// ```ignore
/// use tilepoly_model::{Packable, Rectangle};
///
/// let mut buffer = Vec::new();
/// Rectangle::new(0.0, 0.0, 0.1, 0.1).pack_into(&mut buffer);
/// assert_eq!(buffer.len(), Rectangle::PACKED_LENGTH);
/// let rectangle = Rectangle::unpack_from(&buffer)?;
/// ```
pub trait Packable: Sized {
    /// Number of `f64` values occupied by one packed value
    const PACKED_LENGTH: usize;

    /// Append the packed representation to `buffer`
    fn pack_into(&self, buffer: &mut Vec<f64>);

    /// Read a value from the start of `buffer`
    ///
    /// # Returns
    /// The unpacked value, or `PackError::BufferTooShort` when fewer than
    /// `PACKED_LENGTH` values are available
    fn unpack_from(buffer: &[f64]) -> Result<Self>;
}

/// Ensure `buffer` holds at least `needed` values
#[inline]
pub(crate) fn require(buffer: &[f64], needed: usize) -> Result<()> {
    if buffer.len() < needed {
        Err(PackError::too_short(0, needed, buffer.len()))
    } else {
        Ok(())
    }
}

impl Packable for Point3<f64> {
    const PACKED_LENGTH: usize = 3;

    fn pack_into(&self, buffer: &mut Vec<f64>) {
        buffer.extend_from_slice(&[self.x, self.y, self.z]);
    }

    fn unpack_from(buffer: &[f64]) -> Result<Self> {
        require(buffer, Self::PACKED_LENGTH)?;
        Ok(Point3::new(buffer[0], buffer[1], buffer[2]))
    }
}

/// 4x4 matrices are packed column-major
impl Packable for Matrix4<f64> {
    const PACKED_LENGTH: usize = 16;

    fn pack_into(&self, buffer: &mut Vec<f64>) {
        buffer.extend_from_slice(self.as_slice());
    }

    fn unpack_from(buffer: &[f64]) -> Result<Self> {
        require(buffer, Self::PACKED_LENGTH)?;
        Ok(Matrix4::from_column_slice(&buffer[..Self::PACKED_LENGTH]))
    }
}
