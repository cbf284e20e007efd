// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Color grouping
//!
//! Features sharing a batch table color are packed into one contiguous range of
//! the output vertex and index buffers so each color renders with one draw call.
//! Groups are ordered by first appearance of their color.

use crate::payload::Feature;
use rustc_hash::FxHashMap;

/// Indices emitted per ring vertex for the side wall (two triangles per edge)
pub const WALL_INDICES_PER_VERTEX: usize = 6;

/// Features sharing one color, with their reserved output ranges
#[derive(Debug, Clone, PartialEq)]
pub struct ColorGroup {
    /// Packed RGBA key
    pub rgba: u32,
    /// Feature indices in processing order
    pub features: Vec<usize>,
    /// Input vertices over all member features
    pub vertex_count: usize,
    /// Input indices over all member features
    pub source_index_count: usize,
    /// First output vertex slot
    pub vertex_offset: usize,
    /// First output index
    pub index_offset: usize,
}

impl ColorGroup {
    /// Output vertex slots reserved for the group (top and bottom shell)
    pub fn vertex_slots(&self) -> usize {
        self.vertex_count * 2
    }

    /// Output indices reserved for the group (both caps plus walls)
    pub fn index_length(&self) -> usize {
        self.source_index_count * 2 + self.vertex_count * WALL_INDICES_PER_VERTEX
    }
}

/// Write cursors of one color group while features are built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupState {
    /// Next free output vertex slot
    pub write_cursor: usize,
    /// Next free output index
    pub index_cursor: usize,
}

/// Output buffer layout for all color groups of a job
#[derive(Debug, Clone)]
pub struct ColorPlan {
    groups: Vec<ColorGroup>,
    feature_groups: Vec<usize>,
    vertex_slots: usize,
    index_length: usize,
}

impl ColorPlan {
    /// Group features by color and reserve disjoint output ranges
    pub fn new(features: &[Feature]) -> Self {
        let mut group_ids: FxHashMap<u32, usize> = FxHashMap::default();
        let mut groups: Vec<ColorGroup> = Vec::new();
        let mut feature_groups = Vec::with_capacity(features.len());

        for feature in features {
            let id = *group_ids.entry(feature.color).or_insert_with(|| {
                groups.push(ColorGroup {
                    rgba: feature.color,
                    features: Vec::new(),
                    vertex_count: 0,
                    source_index_count: 0,
                    vertex_offset: 0,
                    index_offset: 0,
                });
                groups.len() - 1
            });

            let group = &mut groups[id];
            group.features.push(feature.index);
            group.vertex_count += feature.vertex_count;
            group.source_index_count += feature.index_count;
            feature_groups.push(id);
        }

        let mut vertex_slots = 0;
        let mut index_length = 0;
        for group in &mut groups {
            group.vertex_offset = vertex_slots;
            group.index_offset = index_length;
            vertex_slots += group.vertex_slots();
            index_length += group.index_length();
            log::trace!(
                "color {:#010x}: {} features, vertices {}.., indices {}..",
                group.rgba,
                group.features.len(),
                group.vertex_offset,
                group.index_offset
            );
        }

        Self {
            groups,
            feature_groups,
            vertex_slots,
            index_length,
        }
    }

    /// Groups in first-appearance order
    pub fn groups(&self) -> &[ColorGroup] {
        &self.groups
    }

    /// Group id of a feature
    pub fn group_of(&self, feature: usize) -> usize {
        self.feature_groups[feature]
    }

    /// Total output vertex slots
    pub fn vertex_slots(&self) -> usize {
        self.vertex_slots
    }

    /// Total output index count
    pub fn index_length(&self) -> usize {
        self.index_length
    }

    /// Fresh cursors, one per group, positioned at the start of each range
    pub fn cursors(&self) -> Vec<GroupState> {
        self.groups
            .iter()
            .map(|group| GroupState {
                write_cursor: group.vertex_offset,
                index_cursor: group.index_offset,
            })
            .collect()
    }
}
