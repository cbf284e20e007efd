// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end extrusion tests through the public job API

use approx::assert_relative_eq;
use nalgebra::{Matrix4, Point2, Point3, Vector3};
use tilepoly_extrude::{
    decode_positions, extrude_polygons, zigzag_delta_encode, Error, ExtrudedPolygons, HeightRange,
    IndexBuffer, JobParameters, JobPayload, PackedResult, PolygonBatchBuilder,
};
use tilepoly_model::{Cartographic, Color, Ellipsoid, IndexDatatype, Rectangle};

const RED: u32 = 0xff00_00ff;
const GREEN: u32 = 0xff00_ff00;
const BLUE: u32 = 0xffff_0000;

fn degrees(lon: f64, lat: f64) -> Point2<f64> {
    Point2::new(lon.to_radians(), lat.to_radians())
}

fn tile() -> Rectangle {
    Rectangle::from_degrees(10.0, 45.0, 10.1, 45.1)
}

fn tile_center() -> Point3<f64> {
    Ellipsoid::wgs84().cartographic_to_cartesian(&tile().center())
}

fn triangle() -> Vec<Point2<f64>> {
    vec![
        degrees(10.01, 45.01),
        degrees(10.03, 45.01),
        degrees(10.02, 45.03),
    ]
}

fn square(lon: f64, lat: f64, size: f64) -> Vec<Point2<f64>> {
    vec![
        degrees(lon, lat),
        degrees(lon + size, lat),
        degrees(lon + size, lat + size),
        degrees(lon, lat + size),
    ]
}

/// Concave "L", listed clockwise
fn clockwise_ell() -> Vec<Point2<f64>> {
    vec![
        degrees(10.05, 45.05),
        degrees(10.05, 45.09),
        degrees(10.06, 45.09),
        degrees(10.06, 45.06),
        degrees(10.09, 45.06),
        degrees(10.09, 45.05),
    ]
}

/// Several colors, windings and heights in one job
fn mixed_batch() -> (Vec<f64>, JobPayload) {
    let mut ccw_hexagon: Vec<_> = (0..6)
        .map(|k| {
            let angle = f64::from(k) * std::f64::consts::FRAC_PI_3;
            degrees(10.02 + 0.01 * angle.cos(), 45.07 + 0.01 * angle.sin())
        })
        .collect();
    let cw_hexagon = {
        let mut ring = ccw_hexagon.clone();
        ring.reverse();
        ring.iter_mut().for_each(|p| p.x += 0.04f64.to_radians());
        ring
    };
    ccw_hexagon.rotate_left(2);

    PolygonBatchBuilder::geographic(tile())
        .with_heights(0.0, 20.0)
        .with_center(tile_center())
        .add_feature(&triangle(), 100, RED)
        .add_feature(&clockwise_ell(), 101, GREEN)
        .add_feature(&square(10.07, 45.01, 0.02), 102, RED)
        .add_feature_with_heights(&ccw_hexagon, 103, BLUE, HeightRange::new(5.0, 50.0))
        .add_feature(&cw_hexagon, 104, GREEN)
        .build()
        .unwrap()
}

/// Input vertices after decoding and the model matrix
fn transformed_inputs(header: &[f64], payload: &JobPayload) -> Vec<Point3<f64>> {
    let params = JobParameters::unpack(header).unwrap();
    let mut positions = payload.positions.clone();
    decode_positions(&mut positions, &params)
        .iter()
        .map(|p| params.model_matrix.transform_point(p))
        .collect()
}

fn output_position(extruded: &ExtrudedPolygons, center: &Point3<f64>, slot: u32) -> Point3<f64> {
    let p = &extruded.positions[slot as usize * 3..slot as usize * 3 + 3];
    center + Vector3::new(f64::from(p[0]), f64::from(p[1]), f64::from(p[2]))
}

fn feature_indices(extruded: &ExtrudedPolygons, feature: usize) -> Vec<u32> {
    let offset = extruded.index_offsets[feature] as usize;
    let count = extruded.index_counts[feature] as usize;
    extruded.indices.iter().skip(offset).take(count).collect()
}

#[test]
fn test_single_triangle() {
    let (header, payload) = PolygonBatchBuilder::geographic(tile())
        .with_heights(0.0, 10.0)
        .add_feature(&triangle(), 0, RED)
        .build()
        .unwrap();

    let extruded = extrude_polygons(&header, payload).unwrap();
    // Two cap triangles plus two wall triangles per edge
    assert_eq!(extruded.indices.len(), 2 * 3 + 6 * 3);
    assert_eq!(extruded.vertex_count(), 6);
    assert_eq!(extruded.index_offsets, vec![0]);
    assert_eq!(extruded.index_counts, vec![24]);

    let result = PackedResult::unpack(&extruded.packed_buffer).unwrap();
    assert_eq!(result.index_datatype, IndexDatatype::UnsignedShort);
    assert_eq!(result.bounding_volumes.len(), 1);
    assert_eq!(result.draw_calls.len(), 1);

    let call = &result.draw_calls[0];
    assert_eq!(call.batch_ids, vec![0]);
    assert_eq!(call.offset, 0);
    assert_eq!(call.count, 24);
    assert_eq!(call.color, Color::from_bytes(255, 0, 0, 255));
}

#[test]
fn test_two_features_sharing_a_color() {
    let (header, payload) = PolygonBatchBuilder::geographic(tile())
        .with_heights(0.0, 10.0)
        .add_feature(&triangle(), 7, RED)
        .add_feature(&square(10.05, 45.05, 0.02), 9, RED)
        .build()
        .unwrap();

    let extruded = extrude_polygons(&header, payload).unwrap();
    let result = PackedResult::unpack(&extruded.packed_buffer).unwrap();

    assert_eq!(result.draw_calls.len(), 1);
    let call = &result.draw_calls[0];
    assert_eq!(call.batch_ids, vec![0, 1]);
    assert_eq!(
        call.count,
        (extruded.index_counts[0] + extruded.index_counts[1]) as usize
    );

    // Contiguous: the square follows the triangle in both buffers
    assert_eq!(extruded.index_offsets[1], extruded.index_counts[0]);
    assert_eq!(&extruded.batch_ids[..6], &[7; 6]);
    assert_eq!(&extruded.batch_ids[6..], &[9; 8]);
    let square_slots = feature_indices(&extruded, 1);
    assert_eq!(square_slots.iter().min(), Some(&6));
    assert_eq!(square_slots.iter().max(), Some(&13));
}

#[test]
fn test_count_invariant() {
    let (header, payload) = mixed_batch();
    let input_vertices = payload.vertex_count();
    let extruded = extrude_polygons(&header, payload).unwrap();

    let total: u32 = extruded.index_counts.iter().sum();
    assert_eq!(total as usize, extruded.indices.len());
    assert_eq!(extruded.positions.len(), 6 * input_vertices);
    assert_eq!(extruded.batch_ids.len(), 2 * input_vertices);
}

#[test]
fn test_feature_slots_are_disjoint() {
    let (header, payload) = mixed_batch();
    let batch_ids = payload.batch_ids.clone();
    let extruded = extrude_polygons(&header, payload).unwrap();

    let mut slot_owner = vec![None; extruded.vertex_count()];
    let mut index_owner = vec![None; extruded.indices.len()];

    for feature in 0..batch_ids.len() {
        let offset = extruded.index_offsets[feature] as usize;
        let count = extruded.index_counts[feature] as usize;
        for owner in &mut index_owner[offset..offset + count] {
            assert_eq!(*owner, None, "index ranges overlap");
            *owner = Some(feature);
        }

        for slot in feature_indices(&extruded, feature) {
            let owner = slot_owner[slot as usize].get_or_insert(feature);
            assert_eq!(*owner, feature, "vertex slot {slot} shared");
            assert_eq!(u32::from(extruded.batch_ids[slot as usize]), batch_ids[feature]);
        }
    }

    assert!(index_owner.iter().all(Option::is_some));
    assert!(slot_owner.iter().all(Option::is_some));
}

#[test]
fn test_caps_face_outward_for_any_winding() {
    let (header, payload) = mixed_batch();
    let counts = payload.counts.clone();
    let center = tile_center();
    let ellipsoid = Ellipsoid::wgs84();
    let extruded = extrude_polygons(&header, payload).unwrap();

    for (feature, &n) in counts.iter().enumerate() {
        let indices = feature_indices(&extruded, feature);
        let cap_indices = indices.len() - 6 * n as usize;

        for (t, triangle) in indices[..cap_indices].chunks(3).enumerate() {
            let [a, b, c] = [0, 1, 2].map(|k| output_position(&extruded, &center, triangle[k]));
            let up = ellipsoid.geodetic_surface_normal(&a).unwrap();
            let facing = (b - a).cross(&(c - a)).dot(&up);

            // Caps alternate top, bottom
            if t % 2 == 0 {
                assert!(facing > 0.0, "feature {feature}: top cap faces down");
            } else {
                assert!(facing < 0.0, "feature {feature}: bottom cap faces up");
            }
        }
    }
}

#[test]
fn test_walls_close_the_ring() {
    let (header, payload) = PolygonBatchBuilder::geographic(tile())
        .with_heights(0.0, 10.0)
        .add_feature(&clockwise_ell(), 0, RED)
        .build()
        .unwrap();
    let extruded = extrude_polygons(&header, payload).unwrap();

    let indices = feature_indices(&extruded, 0);
    let walls = &indices[indices.len() - 6 * 6..];
    // Every top/bottom vertex pair is stitched to its neighbor
    for (k, quad) in walls.chunks(6).enumerate() {
        let (v0, v1) = (k as u32, ((k + 1) % 6) as u32);
        assert_eq!(quad, &[2 * v0 + 1, 2 * v1, 2 * v0, 2 * v0 + 1, 2 * v1 + 1, 2 * v1]);
    }
}

#[test]
fn test_geographic_bounding_volumes_contain_feature() {
    let (header, payload) = mixed_batch();
    let inputs = transformed_inputs(&header, &payload);
    let counts = payload.counts.clone();
    let center = tile_center();
    let extruded = extrude_polygons(&header, payload).unwrap();
    let result = PackedResult::unpack(&extruded.packed_buffer).unwrap();
    assert_eq!(result.bounding_volumes.len(), counts.len());

    let mut first = 0;
    for (feature, &n) in counts.iter().enumerate() {
        let bounding_volume = &result.bounding_volumes[feature];
        for input in &inputs[first..first + n as usize] {
            assert!(bounding_volume.contains(input, 1e-3));
        }
        for slot in feature_indices(&extruded, feature) {
            let output = output_position(&extruded, &center, slot);
            assert!(bounding_volume.contains(&output, 1e-2));
        }
        first += n as usize;
    }
}

#[test]
fn test_bounding_volume_across_antimeridian() {
    // Grid longitudes run past +180 and decode to both sides of the antimeridian
    let ellipsoid = Ellipsoid::wgs84();
    let center =
        ellipsoid.cartographic_to_cartesian(&Cartographic::from_degrees(180.0, 0.05, 0.0));
    let ring = square(179.95, 0.0, 0.1);
    let (header, payload) = PolygonBatchBuilder::geographic(Rectangle::from_degrees(
        179.9, -0.05, 180.1, 0.15,
    ))
    .with_heights(0.0, 15.0)
    .with_center(center)
    .add_feature(&ring, 0, BLUE)
    .build()
    .unwrap();

    let inputs = transformed_inputs(&header, &payload);
    let extruded = extrude_polygons(&header, payload).unwrap();
    let result = PackedResult::unpack(&extruded.packed_buffer).unwrap();
    let bounding_volume = &result.bounding_volumes[0];

    for input in &inputs {
        assert!(bounding_volume.contains(input, 1e-3));
    }
    for slot in 0..extruded.vertex_count() as u32 {
        let output = output_position(&extruded, &center, slot);
        assert!(bounding_volume.contains(&output, 1e-2));
    }

    // Fit to the 0.1 degree feature, not wrapped the long way round the globe
    let longest = bounding_volume
        .half_axes
        .column_iter()
        .map(|axis| axis.norm())
        .fold(0.0, f64::max);
    assert!(longest < 10_000.0, "half axis {longest} m");
}

#[test]
fn test_planar_bounding_volume_contains_feature() {
    // Local x/y plane placed tangent to the equator at longitude 0
    let radius = Ellipsoid::wgs84().maximum_radius();
    let model_matrix = Matrix4::new(
        0.0, 0.0, 1.0, radius + 3.0, //
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    );
    let ring = vec![
        Point2::new(-40.0, -30.0),
        Point2::new(60.0, -30.0),
        Point2::new(60.0, 10.0),
        Point2::new(0.0, 45.0),
    ];
    let (header, payload) = PolygonBatchBuilder::planar(Rectangle::new(-100.0, -100.0, 100.0, 100.0))
        .with_heights(-2.0, 12.0)
        .with_model_matrix(model_matrix)
        .with_center(Point3::new(radius, 0.0, 0.0))
        .add_feature(&ring, 1, GREEN)
        .build()
        .unwrap();

    let inputs = transformed_inputs(&header, &payload);
    let extruded = extrude_polygons(&header, payload).unwrap();
    let result = PackedResult::unpack(&extruded.packed_buffer).unwrap();
    let bounding_volume = &result.bounding_volumes[0];

    for input in &inputs {
        assert!(bounding_volume.contains(input, 1e-6));
    }
    for slot in 0..extruded.vertex_count() as u32 {
        let output = output_position(&extruded, &Point3::new(radius, 0.0, 0.0), slot);
        assert!(bounding_volume.contains(&output, 1e-2));
    }
}

#[test]
fn test_draw_call_totals() {
    let (header, payload) = mixed_batch();
    let extruded = extrude_polygons(&header, payload).unwrap();
    let result = PackedResult::unpack(&extruded.packed_buffer).unwrap();

    // Colors in first-appearance order
    let colors: Vec<u32> = result.draw_calls.iter().map(|c| c.color.to_rgba()).collect();
    assert_eq!(colors, vec![RED, GREEN, BLUE]);
    assert_eq!(result.draw_calls[0].batch_ids, vec![0, 2]);
    assert_eq!(result.draw_calls[1].batch_ids, vec![1, 4]);

    let mut end = 0;
    for call in &result.draw_calls {
        let expected: u32 = call
            .batch_ids
            .iter()
            .map(|&i| extruded.index_counts[i as usize])
            .sum();
        assert_eq!(call.count, expected as usize);
        assert_eq!(call.offset, end);
        end += call.count;
    }
    assert_eq!(end, extruded.indices.len());
}

#[test]
fn test_decompression_round_trip() {
    let u: Vec<u16> = vec![0, 32767, 16000, 16001, 12, 12, 30000];
    let v: Vec<u16> = vec![32767, 0, 5, 20000, 20000, 1, 16383];
    let mut positions = [u.clone(), v.clone()].concat();
    let (encoded_u, encoded_v) = positions.split_at_mut(u.len());
    zigzag_delta_encode(encoded_u, encoded_v);

    let rectangle = Rectangle::new(-10.0, 20.0, 30.0, 25.0);
    let (header, _) = PolygonBatchBuilder::planar(rectangle).build().unwrap();
    let params = JobParameters::unpack(&header).unwrap();
    let decoded = decode_positions(&mut positions, &params);

    for ((point, &u), &v) in decoded.iter().zip(&u).zip(&v) {
        let x = -10.0 + 40.0 * f64::from(u) / 32767.0;
        let y = 20.0 + 5.0 * f64::from(v) / 32767.0;
        assert_relative_eq!(point.x, x, epsilon = 1e-9);
        assert_relative_eq!(point.y, y, epsilon = 1e-9);
    }
}

#[test]
fn test_wide_output_switches_to_u32_indices() {
    // 13 225 triangles: 39 675 input vertices, 79 350 output vertices
    let side = 115;
    let step = 0.1 / f64::from(side);
    let mut builder = PolygonBatchBuilder::geographic(tile()).with_heights(0.0, 10.0);
    for row in 0..side {
        for column in 0..side {
            let lon = 10.0 + f64::from(column) * step;
            let lat = 45.0 + f64::from(row) * step;
            let ring = vec![
                degrees(lon + 0.2 * step, lat + 0.2 * step),
                degrees(lon + 0.8 * step, lat + 0.2 * step),
                degrees(lon + 0.5 * step, lat + 0.8 * step),
            ];
            builder = builder.add_feature(&ring, row * side + column, RED);
        }
    }
    let (header, payload) = builder.build().unwrap();
    assert_eq!(payload.indices.datatype(), IndexDatatype::UnsignedShort);

    let extruded = extrude_polygons(&header, payload).unwrap();
    assert!(matches!(extruded.indices, IndexBuffer::U32(_)));
    assert_eq!(extruded.vertex_count(), 79_350);
    assert_eq!(extruded.indices.iter().max(), Some(79_349));

    let result = PackedResult::unpack(&extruded.packed_buffer).unwrap();
    assert_eq!(result.index_datatype, IndexDatatype::UnsignedInt);
}

#[test]
fn test_two_vertex_feature_is_degenerate() {
    let (header, mut payload) = PolygonBatchBuilder::geographic(tile())
        .add_feature(&triangle(), 0, RED)
        .build()
        .unwrap();

    payload.positions = {
        let mut u = vec![100, 200, 300, 100, 200];
        let mut v = vec![100, 100, 300, 500, 500];
        zigzag_delta_encode(&mut u, &mut v);
        [u, v].concat()
    };
    payload.counts = vec![3, 2];
    payload.index_counts = vec![3, 0];
    payload.batch_ids = vec![0, 1];
    payload.batch_table_colors = vec![RED, RED];

    let err = extrude_polygons(&header, payload).unwrap_err();
    assert!(matches!(err, Error::DegenerateFeature { feature: 1, .. }));
}

#[test]
fn test_index_outside_feature_fails_the_job() {
    let (header, mut payload) = PolygonBatchBuilder::geographic(tile())
        .add_feature(&triangle(), 0, RED)
        .add_feature(&triangle(), 1, RED)
        .build()
        .unwrap();

    // Second feature points back into the first one's vertices
    payload.indices = IndexBuffer::U16(vec![0, 1, 2, 3, 4, 0]);
    let err = extrude_polygons(&header, payload).unwrap_err();
    assert!(matches!(
        err,
        Error::IndexOutOfRange {
            feature: 1,
            index: 0
        }
    ));
}

#[test]
fn test_malformed_payloads_are_rejected() {
    let (header, payload) = PolygonBatchBuilder::geographic(tile())
        .add_feature(&triangle(), 0, RED)
        .build()
        .unwrap();

    assert!(matches!(
        extrude_polygons(&header[..12], payload.clone()),
        Err(Error::MalformedInput(_))
    ));

    let mut bad = payload.clone();
    bad.index_counts = vec![3, 3];
    assert!(matches!(
        extrude_polygons(&header, bad),
        Err(Error::MalformedInput(_))
    ));

    let mut bad = payload;
    bad.positions.pop();
    assert!(extrude_polygons(&header, bad).is_err());
}
