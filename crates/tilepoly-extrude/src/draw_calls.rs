// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Draw-call finalization: one call per color group

use crate::planner::ColorPlan;
use serde::{Deserialize, Serialize};
use tilepoly_model::Color;

/// A contiguous index range rendered with one color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawCall {
    pub color: Color,
    /// First index of the range in the output index buffer
    pub offset: usize,
    /// Number of indices in the range
    pub count: usize,
    /// Job feature indices drawn by this call, in processing order
    pub batch_ids: Vec<u32>,
}

impl DrawCall {
    /// One past the last index of the range
    pub fn end(&self) -> usize {
        self.offset + self.count
    }
}

/// Turn the color plan and the per-feature index counts into draw calls
///
/// `index_counts` must be the counts written by the feature builder; the calls
/// come out in group order and together cover the whole index buffer.
pub fn finalize(plan: &ColorPlan, index_counts: &[u32]) -> Vec<DrawCall> {
    plan.groups()
        .iter()
        .map(|group| DrawCall {
            color: Color::from_rgba(group.rgba),
            offset: group.index_offset,
            count: group
                .features
                .iter()
                .map(|&feature| index_counts[feature] as usize)
                .sum(),
            batch_ids: group.features.iter().map(|&feature| feature as u32).collect(),
        })
        .collect()
}
