// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for polygon extrusion jobs

use thiserror::Error;
use tilepoly_model::PackError;

/// Extrusion result type
pub type Result<T> = std::result::Result<T, Error>;

/// Extrusion job errors
///
/// Every error aborts the whole job; no partial output is produced.
#[derive(Error, Debug)]
pub enum Error {
    /// Packed header or result could not be read
    #[error("Packing error: {0}")]
    Pack(#[from] PackError),

    /// Input buffers violate the job contract
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A triangle index does not address a vertex of its own feature
    #[error("Feature {feature}: index {index} is outside its vertex range")]
    IndexOutOfRange { feature: usize, index: u32 },

    /// A feature's ring cannot be extruded
    #[error("Degenerate feature {feature}: {reason}")]
    DegenerateFeature { feature: usize, reason: String },

    /// Output vertex count exceeds what 32-bit indices can address
    #[error("Too many output vertices: {0}")]
    TooManyVertices(usize),

    /// Ring triangulation failed while building a job
    #[error("Triangulation error: {0}")]
    Triangulation(String),
}

impl Error {
    /// Create a malformed input error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedInput(msg.into())
    }

    /// Create a degenerate feature error
    pub fn degenerate(feature: usize, reason: impl Into<String>) -> Self {
        Error::DegenerateFeature {
            feature,
            reason: reason.into(),
        }
    }

    /// Create an index out of range error
    pub fn index_out_of_range(feature: usize, index: u32) -> Self {
        Error::IndexOutOfRange { feature, index }
    }

    /// Create a triangulation error
    pub fn triangulation(msg: impl Into<String>) -> Self {
        Error::Triangulation(msg.into())
    }
}
