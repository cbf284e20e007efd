// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core value types shared by job headers, geometry and results

use crate::traits::require;
use crate::{PackError, Packable, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Geodetic position: longitude and latitude in radians, height in meters
#[derive(Clone, Copy, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Cartographic {
    pub longitude: f64,
    pub latitude: f64,
    pub height: f64,
}

impl Cartographic {
    /// Create a position from radians
    pub fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Self {
            longitude,
            latitude,
            height,
        }
    }

    /// Create a position from degrees
    pub fn from_degrees(longitude: f64, latitude: f64, height: f64) -> Self {
        Self::new(longitude.to_radians(), latitude.to_radians(), height)
    }
}

/// Geographic rectangle in radians
///
/// When the job is not geographic the same four values describe a planar
/// x/y extent instead.
#[derive(Clone, Copy, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Rectangle {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Rectangle {
    /// Create a rectangle from radians
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Create a rectangle from degrees
    pub fn from_degrees(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self::new(
            west.to_radians(),
            south.to_radians(),
            east.to_radians(),
            north.to_radians(),
        )
    }

    /// Longitudinal extent, accounting for rectangles crossing the antimeridian
    pub fn width(&self) -> f64 {
        let mut east = self.east;
        if east < self.west {
            east += TAU;
        }
        east - self.west
    }

    /// Latitudinal extent
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Center of the rectangle at height zero
    pub fn center(&self) -> Cartographic {
        let mut longitude = self.west + self.width() * 0.5;
        if longitude > PI {
            longitude -= TAU;
        }
        Cartographic::new(longitude, (self.south + self.north) * 0.5, 0.0)
    }

    /// Check if a position lies inside the rectangle (inclusive)
    pub fn contains(&self, position: &Cartographic) -> bool {
        let mut longitude = position.longitude;
        let mut east = self.east;
        if east < self.west {
            east += TAU;
            if longitude < 0.0 {
                longitude += TAU;
            }
        }
        longitude >= self.west
            && longitude <= east
            && position.latitude >= self.south
            && position.latitude <= self.north
    }
}

impl Packable for Rectangle {
    const PACKED_LENGTH: usize = 4;

    fn pack_into(&self, buffer: &mut Vec<f64>) {
        buffer.extend_from_slice(&[self.west, self.south, self.east, self.north]);
    }

    fn unpack_from(buffer: &[f64]) -> Result<Self> {
        require(buffer, Self::PACKED_LENGTH)?;
        Ok(Self::new(buffer[0], buffer[1], buffer[2], buffer[3]))
    }
}

/// RGBA color with components in `[0, 1]`
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

impl Color {
    /// Create a color from normalized components
    pub fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Create a color from 8-bit components
    pub fn from_bytes(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self::new(
            f32::from(red) / 255.0,
            f32::from(green) / 255.0,
            f32::from(blue) / 255.0,
            f32::from(alpha) / 255.0,
        )
    }

    /// Unpack a batch table color; the lowest byte holds red
    pub fn from_rgba(rgba: u32) -> Self {
        let [red, green, blue, alpha] = rgba.to_le_bytes();
        Self::from_bytes(red, green, blue, alpha)
    }

    /// Pack into a batch table color; inverse of [`Color::from_rgba`]
    pub fn to_rgba(&self) -> u32 {
        let byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        u32::from_le_bytes([
            byte(self.red),
            byte(self.green),
            byte(self.blue),
            byte(self.alpha),
        ])
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0, 1.0)
    }
}

impl Packable for Color {
    const PACKED_LENGTH: usize = 4;

    fn pack_into(&self, buffer: &mut Vec<f64>) {
        buffer.extend_from_slice(&[
            f64::from(self.red),
            f64::from(self.green),
            f64::from(self.blue),
            f64::from(self.alpha),
        ]);
    }

    fn unpack_from(buffer: &[f64]) -> Result<Self> {
        require(buffer, Self::PACKED_LENGTH)?;
        Ok(Self::new(
            buffer[0] as f32,
            buffer[1] as f32,
            buffer[2] as f32,
            buffer[3] as f32,
        ))
    }
}

/// Element type of an index buffer, tagged with its WebGL enum value
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[repr(u32)]
pub enum IndexDatatype {
    UnsignedShort = 5123,
    UnsignedInt = 5125,
}

impl IndexDatatype {
    /// Largest vertex count addressable with 16-bit indices
    pub const MAX_SHORT_VERTICES: usize = 65_535;

    /// Pick the narrowest datatype able to address `vertex_count` vertices
    pub fn for_vertex_count(vertex_count: usize) -> Self {
        if vertex_count > Self::MAX_SHORT_VERTICES {
            IndexDatatype::UnsignedInt
        } else {
            IndexDatatype::UnsignedShort
        }
    }

    /// Datatype for an index element width in bytes
    pub fn from_bytes_per_element(bytes: usize) -> Option<Self> {
        match bytes {
            2 => Some(IndexDatatype::UnsignedShort),
            4 => Some(IndexDatatype::UnsignedInt),
            _ => None,
        }
    }

    /// Index element width in bytes
    pub fn bytes_per_element(self) -> usize {
        match self {
            IndexDatatype::UnsignedShort => 2,
            IndexDatatype::UnsignedInt => 4,
        }
    }

    /// Value written into packed buffers
    pub fn to_wire(self) -> f64 {
        f64::from(self as u32)
    }

    /// Parse the value read from packed buffers
    pub fn from_wire(value: f64) -> Result<Self> {
        if value == f64::from(IndexDatatype::UnsignedShort as u32) {
            Ok(IndexDatatype::UnsignedShort)
        } else if value == f64::from(IndexDatatype::UnsignedInt as u32) {
            Ok(IndexDatatype::UnsignedInt)
        } else {
            Err(PackError::invalid("index datatype", value))
        }
    }
}
