// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Job header decoding
//!
//! The header is a fixed-order `f64` sequence:
//! `[indexBytesPerElement, minHeight, maxHeight, center(3), ellipsoid(3),
//! rectangle(4), isGeographic, modelMatrix(16)]`.

use crate::{Error, Result};
use nalgebra::{Matrix4, Point3};
use tilepoly_model::{
    Ellipsoid, IndexDatatype, PackError, PackedReader, PackedWriter, Packable, Rectangle,
};

/// Number of values in a job header
pub const HEADER_LENGTH: usize = 1
    + 2
    + <Point3<f64> as Packable>::PACKED_LENGTH
    + Ellipsoid::PACKED_LENGTH
    + Rectangle::PACKED_LENGTH
    + 1
    + <Matrix4<f64> as Packable>::PACKED_LENGTH;

/// Extrusion heights in meters above the ellipsoid surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightRange {
    pub minimum: f64,
    pub maximum: f64,
}

impl HeightRange {
    /// Create a height range
    pub fn new(minimum: f64, maximum: f64) -> Self {
        Self { minimum, maximum }
    }
}

impl Default for HeightRange {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Scalar configuration of one extrusion job
#[derive(Debug, Clone, PartialEq)]
pub struct JobParameters {
    /// Element type of the incoming index buffer
    pub index_datatype: IndexDatatype,
    /// Heights used when the payload carries no per-feature heights
    pub heights: HeightRange,
    /// Subtracted from every output position
    pub center: Point3<f64>,
    pub ellipsoid: Ellipsoid,
    /// Dequantization extent of the u/v grid
    pub rectangle: Rectangle,
    /// Whether the rectangle is longitude/latitude (otherwise raw x/y)
    pub is_geographic: bool,
    pub model_matrix: Matrix4<f64>,
}

impl JobParameters {
    /// Decode a job header
    ///
    /// Fails with `MalformedInput` when the header is shorter than [`HEADER_LENGTH`]
    /// or the index element width is neither 2 nor 4.
    pub fn unpack(header: &[f64]) -> Result<Self> {
        if header.len() < HEADER_LENGTH {
            return Err(Error::malformed(format!(
                "header has {} values, expected {}",
                header.len(),
                HEADER_LENGTH
            )));
        }

        let mut reader = PackedReader::new(header);
        let index_bytes = reader.scalar()?;
        let index_datatype = IndexDatatype::from_bytes_per_element(index_bytes as usize)
            .filter(|_| index_bytes.fract() == 0.0)
            .ok_or_else(|| PackError::invalid("index bytes per element", index_bytes))?;

        let minimum = reader.scalar()?;
        let maximum = reader.scalar()?;
        let center = reader.read::<Point3<f64>>()?;
        let ellipsoid = reader.read::<Ellipsoid>()?;
        let rectangle = reader.read::<Rectangle>()?;
        let is_geographic = reader.scalar()? == 1.0;
        let model_matrix = reader.read::<Matrix4<f64>>()?;

        Ok(Self {
            index_datatype,
            heights: HeightRange::new(minimum, maximum),
            center,
            ellipsoid,
            rectangle,
            is_geographic,
            model_matrix,
        })
    }

    /// Encode a job header; inverse of [`JobParameters::unpack`]
    pub fn pack(&self) -> Vec<f64> {
        let mut writer = PackedWriter::with_capacity(HEADER_LENGTH);
        writer
            .scalar(self.index_datatype.bytes_per_element() as f64)
            .scalar(self.heights.minimum)
            .scalar(self.heights.maximum)
            .write(&self.center)
            .write(&self.ellipsoid)
            .write(&self.rectangle)
            .scalar(if self.is_geographic { 1.0 } else { 0.0 })
            .write(&self.model_matrix);
        writer.finish()
    }
}
