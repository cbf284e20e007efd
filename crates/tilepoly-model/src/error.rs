// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for packing and unpacking flat `f64` buffers

use thiserror::Error;

/// Result type alias for packing operations
pub type Result<T> = std::result::Result<T, PackError>;

/// Errors that can occur while reading packed buffers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PackError {
    /// Buffer ended before a fixed-width value could be read
    #[error("Packed buffer too short: need {needed} values at offset {offset}, have {available}")]
    BufferTooShort {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A scalar field holds a value outside its domain
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: f64 },
}

impl PackError {
    /// Create a buffer-too-short error
    pub fn too_short(offset: usize, needed: usize, available: usize) -> Self {
        PackError::BufferTooShort {
            offset,
            needed,
            available,
        }
    }

    /// Create an invalid value error
    pub fn invalid(field: &'static str, value: f64) -> Self {
        PackError::InvalidValue { field, value }
    }
}
