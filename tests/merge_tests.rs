mod support;

use meshplate::{
    MergeMode, Plate, PlateError, PlatingConfig,
    export::save_merged,
    float_types::Real,
    merge::{concatenate, merge_boolean, merge_flat},
    mesh::{Mesh, shapes},
    progress::no_progress,
};
use nalgebra::{Matrix4, Vector3};
use std::io;
use std::path::{Path, PathBuf};
use support::{bounds_array, cube_at, surface_area, tetrahedron_at};

#[test]
fn flat_merge_keeps_every_face_before_cleaning() {
    let inputs = vec![
        shapes::cube(1.0),
        tetrahedron_at(2.0, [4.0, 0.0, 0.0]),
        shapes::cuboid(1.0, 2.0, 3.0),
    ];
    let expected: usize = inputs.iter().map(Mesh::face_count).sum();

    let raw = concatenate(&inputs, &mut no_progress());
    assert_eq!(raw.face_count(), expected);
    assert_eq!(raw.vertex_count(), 6 * 4 + 4 * 3 + 6 * 4);

    let cleaned = merge_flat(&inputs[..2], 1e-6, &mut no_progress());
    assert_eq!(cleaned.face_count(), 10);
    assert_eq!(cleaned.vertex_count(), 12);
}

#[test]
fn flat_merge_reports_progress_per_input() {
    let inputs = vec![shapes::cube(1.0), cube_at(1.0, [3.0, 0.0, 0.0])];
    let mut reports = Vec::new();
    merge_flat(&inputs, 1e-6, &mut |ratio: Real, _: &str| reports.push(ratio));
    assert_eq!(reports, vec![0.5, 1.0]);
}

#[test]
fn boolean_union_of_overlapping_cubes() {
    let a = shapes::cube(2.0);
    let b = cube_at(2.0, [1.0, 1.0, 1.0]);
    let merged = merge_boolean(&[a, b], 1e-6, &mut no_progress());

    assert_eq!(
        bounds_array(&merged.bounding_box()),
        [0.0, 0.0, 0.0, 3.0, 3.0, 3.0]
    );
    // two 24-unit shells minus the three unit squares each buries inside the other
    assert!((surface_area(&merged) - 42.0).abs() < 1e-6);

    // nothing survives strictly inside the overlap
    for face in 0..merged.face_count() {
        let corners: Vec<_> = merged.face_positions(face).collect();
        let centroid = corners.iter().fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords)
            / corners.len() as Real;
        let inside = centroid.iter().all(|&c| c > 1.0 + 1e-9 && c < 2.0 - 1e-9);
        assert!(!inside, "face {face} lies inside both cubes");
    }
}

#[test]
fn boolean_union_of_disjoint_solids_matches_flat_merge() {
    let inputs = vec![shapes::cube(1.0), cube_at(1.0, [3.0, 0.0, 0.0])];
    let boolean = merge_boolean(&inputs, 1e-6, &mut no_progress());
    let flat = merge_flat(&inputs, 1e-6, &mut no_progress());
    assert_eq!(boolean.face_count(), flat.face_count());
    assert!((surface_area(&boolean) - surface_area(&flat)).abs() < 1e-9);
}

#[test]
fn plate_merge_bakes_placements() {
    let mut plate = Plate::default();
    plate.add_solid(shapes::cube(10.0), Matrix4::identity()).unwrap();
    plate.add_solid(shapes::cube(10.0), Matrix4::identity()).unwrap();

    let merged = plate.merged(MergeMode::Flat, &mut no_progress());
    assert_eq!(merged.face_count(), 12);
    let bounds = bounds_array(&merged.bounding_box());
    assert!((bounds[3] - 24.0).abs() < 1e-9);
    assert_eq!(bounds[2], 0.0);
}

#[test]
fn save_hands_merged_mesh_to_writer() {
    let mut plate = Plate::default();
    plate.add_solid(shapes::cube(2.0), Matrix4::identity()).unwrap();

    let mut written: Vec<(usize, PathBuf)> = Vec::new();
    let mut writer = |mesh: &Mesh, path: &Path| -> io::Result<()> {
        written.push((mesh.face_count(), path.to_path_buf()));
        Ok(())
    };
    let merged = save_merged(
        &plate,
        &mut writer,
        Path::new("plate.stl"),
        MergeMode::Flat,
        &mut no_progress(),
    )
    .unwrap();

    assert_eq!(merged.face_count(), 6);
    assert_eq!(written, vec![(6, PathBuf::from("plate.stl"))]);
}

#[test]
fn write_failures_keep_their_io_kind() {
    let plate = Plate::default();
    let mut denied = |_: &Mesh, _: &Path| -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    };
    let result = save_merged(
        &plate,
        &mut denied,
        Path::new("/readonly/plate.stl"),
        MergeMode::Boolean,
        &mut no_progress(),
    );
    match result {
        Err(PlateError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::PermissionDenied),
        other => panic!("expected an I/O error, got {other:?}"),
    }
}

#[test]
fn zero_weld_tolerance_far_from_origin_still_merges() {
    let mut plate = Plate::new(PlatingConfig {
        weld_tolerance: 0.0,
        ..Default::default()
    });
    let id = plate
        .add_solid(shapes::cube(2.0), Matrix4::identity())
        .unwrap()
        .id()
        .unwrap();
    plate
        .set_transform(id, Matrix4::new_translation(&Vector3::new(5000.0, 0.0, 0.0)))
        .unwrap();

    let merged = plate.merged(MergeMode::Flat, &mut no_progress());
    assert_eq!(merged.face_count(), 6);
    assert_eq!(merged.vertex_count(), 8);
    assert!((merged.bounding_box().mins.x - 5000.0).abs() < 1e-9);
}
