// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed job payload buffers and their validation

use crate::params::{HeightRange, JobParameters};
use crate::{Error, Result};
use tilepoly_model::IndexDatatype;

/// Index buffer with 16- or 32-bit elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    /// Create a zero-filled buffer of the given datatype
    pub fn zeroed(datatype: IndexDatatype, len: usize) -> Self {
        match datatype {
            IndexDatatype::UnsignedShort => IndexBuffer::U16(vec![0; len]),
            IndexDatatype::UnsignedInt => IndexBuffer::U32(vec![0; len]),
        }
    }

    /// Element datatype
    pub fn datatype(&self) -> IndexDatatype {
        match self {
            IndexBuffer::U16(_) => IndexDatatype::UnsignedShort,
            IndexBuffer::U32(_) => IndexDatatype::UnsignedInt,
        }
    }

    /// Number of indices
    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U16(indices) => indices.len(),
            IndexBuffer::U32(indices) => indices.len(),
        }
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one index widened to 32 bits
    #[inline]
    pub fn get(&self, position: usize) -> Option<u32> {
        match self {
            IndexBuffer::U16(indices) => indices.get(position).map(|&i| u32::from(i)),
            IndexBuffer::U32(indices) => indices.get(position).copied(),
        }
    }

    /// Write one index
    ///
    /// The caller picks the datatype so that every written value fits.
    #[inline]
    pub(crate) fn set(&mut self, position: usize, value: u32) {
        match self {
            IndexBuffer::U16(indices) => {
                debug_assert!(value <= u32::from(u16::MAX));
                indices[position] = value as u16;
            }
            IndexBuffer::U32(indices) => indices[position] = value,
        }
    }

    /// Iterate over all indices widened to 32 bits
    pub fn iter(&self) -> Box<dyn Iterator<Item = u32> + '_> {
        match self {
            IndexBuffer::U16(indices) => Box::new(indices.iter().map(|&i| u32::from(i))),
            IndexBuffer::U32(indices) => Box::new(indices.iter().copied()),
        }
    }
}

/// Per-feature extrusion heights; both arrays have one entry per feature
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureHeights {
    pub minimum: Vec<f32>,
    pub maximum: Vec<f32>,
}

/// Typed buffers of one extrusion job
///
/// Features are described by parallel arrays; feature `i` owns the next
/// `counts[i]` vertices and `index_counts[i]` indices after feature `i - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct JobPayload {
    /// Triangle indices into the job's vertex list (not feature-local)
    pub indices: IndexBuffer,
    /// Zigzag-delta encoded quantized positions: all u values, then all v values
    pub positions: Vec<u16>,
    /// Vertex count per feature
    pub counts: Vec<u32>,
    /// Index count per feature
    pub index_counts: Vec<u32>,
    /// External id per feature
    pub batch_ids: Vec<u32>,
    /// Packed RGBA color per feature
    pub batch_table_colors: Vec<u32>,
    pub heights: Option<FeatureHeights>,
}

/// Layout of one feature within the job buffers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feature {
    /// Position in the job's feature arrays
    pub index: usize,
    pub vertex_offset: usize,
    pub vertex_count: usize,
    pub index_offset: usize,
    pub index_count: usize,
    pub batch_id: u16,
    pub color: u32,
    pub heights: HeightRange,
}

impl JobPayload {
    /// Number of features
    pub fn feature_count(&self) -> usize {
        self.counts.len()
    }

    /// Number of input vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 2
    }

    /// Check every structural invariant of the payload against its header
    pub fn validate(&self, params: &JobParameters) -> Result<()> {
        if self.indices.datatype() != params.index_datatype {
            return Err(Error::malformed(format!(
                "index buffer is {:?}, header declares {:?}",
                self.indices.datatype(),
                params.index_datatype
            )));
        }

        if self.positions.len() % 2 != 0 {
            return Err(Error::malformed(format!(
                "positions length {} is not a u/v pair count",
                self.positions.len()
            )));
        }

        let features = self.feature_count();
        let lengths = [
            ("indexCounts", self.index_counts.len()),
            ("batchIds", self.batch_ids.len()),
            ("batchTableColors", self.batch_table_colors.len()),
        ];
        for (name, len) in lengths {
            if len != features {
                return Err(Error::malformed(format!(
                    "{name} has {len} entries, counts has {features}"
                )));
            }
        }

        if let Some(heights) = &self.heights {
            if heights.minimum.len() != features || heights.maximum.len() != features {
                return Err(Error::malformed(format!(
                    "feature heights have {}/{} entries, expected {features}",
                    heights.minimum.len(),
                    heights.maximum.len()
                )));
            }
        }

        let vertex_total: u64 = self.counts.iter().map(|&c| u64::from(c)).sum();
        if vertex_total != self.vertex_count() as u64 {
            return Err(Error::malformed(format!(
                "counts sum to {vertex_total}, positions hold {} vertices",
                self.vertex_count()
            )));
        }

        let index_total: u64 = self.index_counts.iter().map(|&c| u64::from(c)).sum();
        if index_total != self.indices.len() as u64 {
            return Err(Error::malformed(format!(
                "indexCounts sum to {index_total}, index buffer holds {}",
                self.indices.len()
            )));
        }

        if let Some(i) = self.index_counts.iter().position(|&c| c % 3 != 0) {
            return Err(Error::malformed(format!(
                "feature {i} has {} indices, not a whole number of triangles",
                self.index_counts[i]
            )));
        }

        if let Some(i) = self
            .batch_ids
            .iter()
            .position(|&id| id > u32::from(u16::MAX))
        {
            return Err(Error::malformed(format!(
                "feature {i} batch id {} does not fit the 16-bit id buffer",
                self.batch_ids[i]
            )));
        }

        let output_vertices = self.vertex_count() * 2;
        if output_vertices > u32::MAX as usize {
            return Err(Error::TooManyVertices(output_vertices));
        }

        Ok(())
    }

    /// Lay out every feature, falling back to `defaults` without per-feature heights
    ///
    /// Assumes the payload passed [`JobPayload::validate`].
    pub fn features(&self, defaults: HeightRange) -> Vec<Feature> {
        let mut vertex_offset = 0;
        let mut index_offset = 0;

        (0..self.feature_count())
            .map(|i| {
                let heights = match &self.heights {
                    Some(h) => HeightRange::new(f64::from(h.minimum[i]), f64::from(h.maximum[i])),
                    None => defaults,
                };
                let feature = Feature {
                    index: i,
                    vertex_offset,
                    vertex_count: self.counts[i] as usize,
                    index_offset,
                    index_count: self.index_counts[i] as usize,
                    batch_id: self.batch_ids[i] as u16,
                    color: self.batch_table_colors[i],
                    heights,
                };
                vertex_offset += feature.vertex_count;
                index_offset += feature.index_count;
                feature
            })
            .collect()
    }
}
