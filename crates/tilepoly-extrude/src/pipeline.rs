// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Job entry points
//!
//! A job runs sequentially: decode the header, validate the payload, decompress
//! positions, plan color groups, build every feature, then finalize draw calls and
//! pack the result. Independent jobs can run in parallel on the rayon pool.

use crate::decompress::decode_positions;
use crate::draw_calls::finalize;
use crate::extrusion::{BatchedBuffers, FeatureBuilder};
use crate::packer::pack_result;
use crate::params::JobParameters;
use crate::payload::{IndexBuffer, JobPayload};
use crate::planner::ColorPlan;
use crate::Result;
use rayon::prelude::*;

/// Output buffers of one job, handed to the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct ExtrudedPolygons {
    /// Center-relative xyz per output vertex
    pub positions: Vec<f32>,
    /// Output triangle indices; 16-bit when the vertex count allows it
    pub indices: IndexBuffer,
    /// First output index of each feature
    pub index_offsets: Vec<u32>,
    /// Output index count of each feature
    pub index_counts: Vec<u32>,
    /// External feature id per output vertex
    pub batch_ids: Vec<u16>,
    /// Index datatype, bounding volumes and draw calls (see [`crate::packer`])
    pub packed_buffer: Vec<f64>,
}

impl ExtrudedPolygons {
    /// Number of output vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }
}

/// One unit of work for [`extrude_polygon_batches`]
#[derive(Debug, Clone)]
pub struct PolygonJob {
    pub header: Vec<f64>,
    pub payload: JobPayload,
}

impl PolygonJob {
    /// Create a job from a packed header and its payload
    pub fn new(header: Vec<f64>, payload: JobPayload) -> Self {
        Self { header, payload }
    }

    /// Run the job
    pub fn run(self) -> Result<ExtrudedPolygons> {
        extrude_polygons(&self.header, self.payload)
    }
}

/// Extrude every feature of a job
///
/// Either the whole batch succeeds or an error is returned; no partial output.
pub fn extrude_polygons(header: &[f64], mut payload: JobPayload) -> Result<ExtrudedPolygons> {
    let params = JobParameters::unpack(header)?;
    if let Err(err) = payload.validate(&params) {
        log::warn!("Rejecting polygon job: {err}");
        return Err(err);
    }

    let features = payload.features(params.heights);
    let plan = ColorPlan::new(&features);

    let mut buffers = BatchedBuffers::new(plan.vertex_slots(), plan.index_length(), features.len());
    log::debug!(
        "Extruding {} features ({} vertices) in {} color groups, {:?} indices",
        features.len(),
        payload.vertex_count(),
        plan.groups().len(),
        buffers.indices.datatype()
    );

    let decoded = decode_positions(&mut payload.positions, &params);
    let mut builder = FeatureBuilder::new(&params, &decoded, &payload.indices);
    let mut cursors = plan.cursors();
    let mut bounding_volumes = Vec::with_capacity(features.len());

    for feature in &features {
        let state = &mut cursors[plan.group_of(feature.index)];
        bounding_volumes.push(builder.build(feature, state, &mut buffers)?);
    }

    let draw_calls = finalize(&plan, &buffers.index_counts);
    let packed_buffer = pack_result(buffers.indices.datatype(), &bounding_volumes, &draw_calls);

    log::debug!(
        "Extruded {} vertices, {} indices, {} draw calls",
        plan.vertex_slots(),
        plan.index_length(),
        draw_calls.len()
    );

    Ok(ExtrudedPolygons {
        positions: buffers.positions,
        indices: buffers.indices,
        index_offsets: buffers.index_offsets,
        index_counts: buffers.index_counts,
        batch_ids: buffers.batch_ids,
        packed_buffer,
    })
}

/// Run independent jobs in parallel
///
/// Results come back in job order; one failing job does not affect the others.
pub fn extrude_polygon_batches(jobs: Vec<PolygonJob>) -> Vec<Result<ExtrudedPolygons>> {
    jobs.into_par_iter().map(PolygonJob::run).collect()
}
