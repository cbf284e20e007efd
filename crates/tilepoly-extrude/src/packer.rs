// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Result packing
//!
//! Bounding volumes and draw calls travel back to the renderer as one flat `f64`
//! array:
//!
//! ```text
//! [indexDatatype, numBVs, BV * numBVs (12 each),
//!  numDrawCalls, (color(4), offset, count, numIds, ids...) * numDrawCalls]
//! ```

use crate::draw_calls::DrawCall;
use crate::Result;
use tilepoly_model::{
    Color, IndexDatatype, OrientedBoundingBox, PackError, PackedReader, PackedWriter, Packable,
};

/// Pack the index datatype, bounding volumes and draw calls into one buffer
pub fn pack_result(
    index_datatype: IndexDatatype,
    bounding_volumes: &[OrientedBoundingBox],
    draw_calls: &[DrawCall],
) -> Vec<f64> {
    let draw_call_length: usize = draw_calls
        .iter()
        .map(|call| Color::PACKED_LENGTH + 3 + call.batch_ids.len())
        .sum();
    let length = 3 + bounding_volumes.len() * OrientedBoundingBox::PACKED_LENGTH + draw_call_length;

    let mut writer = PackedWriter::with_capacity(length);
    writer
        .scalar(index_datatype.to_wire())
        .scalar(bounding_volumes.len() as f64);
    for bounding_volume in bounding_volumes {
        writer.write(bounding_volume);
    }

    writer.scalar(draw_calls.len() as f64);
    for call in draw_calls {
        writer
            .write(&call.color)
            .scalar(call.offset as f64)
            .scalar(call.count as f64)
            .scalar(call.batch_ids.len() as f64);
        for &id in &call.batch_ids {
            writer.scalar(f64::from(id));
        }
    }

    debug_assert_eq!(writer.len(), length);
    writer.finish()
}

/// Decoded contents of a packed result buffer
#[derive(Debug, Clone, PartialEq)]
pub struct PackedResult {
    pub index_datatype: IndexDatatype,
    /// One per feature, in feature order
    pub bounding_volumes: Vec<OrientedBoundingBox>,
    /// One per color group
    pub draw_calls: Vec<DrawCall>,
}

impl PackedResult {
    /// Read a buffer produced by [`pack_result`]
    pub fn unpack(buffer: &[f64]) -> Result<Self> {
        let mut reader = PackedReader::new(buffer);
        let index_datatype = IndexDatatype::from_wire(reader.scalar()?)?;

        let bounding_volume_count = reader.count("numBVs")?;
        let mut bounding_volumes = Vec::with_capacity(bounding_volume_count.min(reader.remaining()));
        for _ in 0..bounding_volume_count {
            bounding_volumes.push(reader.read::<OrientedBoundingBox>()?);
        }

        let draw_call_count = reader.count("numDrawCalls")?;
        let mut draw_calls = Vec::with_capacity(draw_call_count.min(reader.remaining()));
        for _ in 0..draw_call_count {
            let color = reader.read::<Color>()?;
            let offset = reader.count("offset")?;
            let count = reader.count("count")?;
            let id_count = reader.count("numIds")?;
            let batch_ids = (0..id_count)
                .map(|_| {
                    let id = reader.count("batchId")?;
                    u32::try_from(id).map_err(|_| PackError::invalid("batchId", id as f64))
                })
                .collect::<std::result::Result<Vec<_>, PackError>>()?;
            draw_calls.push(DrawCall {
                color,
                offset,
                count,
                batch_ids,
            });
        }

        if reader.remaining() != 0 {
            return Err(crate::Error::malformed(format!(
                "{} trailing values after the last draw call",
                reader.remaining()
            )));
        }

        Ok(Self {
            index_datatype,
            bounding_volumes,
            draw_calls,
        })
    }
}
