mod support;

use approx::assert_relative_eq;
use meshplate::{
    FaceTriangulation, Plate, PlateError, PlatingConfig, SolidPickIndex,
    float_types::{Real, parry3d::query::Ray},
    mesh::{Mesh, shapes},
    progress::no_progress,
};
use nalgebra::{Matrix4, Point3, Vector3};
use support::init_tracing;

fn down_at(x: Real, y: Real) -> Ray {
    Ray::new(Point3::new(x, y, 50.0), Vector3::new(0.0, 0.0, -1.0))
}

fn plate_with_two_cubes() -> Plate {
    let mut plate = Plate::default();
    plate.add_solid(shapes::cube(10.0), Matrix4::identity()).unwrap();
    plate.add_solid(shapes::cube(10.0), Matrix4::identity()).unwrap();
    plate.build_pick_indices(&mut no_progress()).unwrap();
    plate
}

#[test]
fn ray_down_hits_top_of_cube() {
    init_tracing();
    let plate = plate_with_two_cubes();
    let first = plate.solids()[0].id;

    let hit = plate.cast_ray(&down_at(3.0, 7.0), Real::MAX).unwrap().unwrap();
    assert_eq!(hit.solid, first);
    assert_eq!(hit.face, 1); // top face of the cuboid fixture
    assert_relative_eq!(hit.distance, 40.0, epsilon = 1e-9);
    assert_relative_eq!(hit.point.z, 10.0, epsilon = 1e-9);
}

#[test]
fn owner_is_the_solid_whose_triangles_were_hit() {
    let plate = plate_with_two_cubes();
    let second = plate.solids()[1].id;

    // the second cube sits at x 14..24
    let hit = plate.cast_ray(&down_at(20.0, 2.0), Real::MAX).unwrap().unwrap();
    assert_eq!(hit.solid, second);
    assert_relative_eq!(hit.point.x, 20.0, epsilon = 1e-9);
}

#[test]
fn ray_beside_every_solid_misses() {
    let plate = plate_with_two_cubes();
    // between the two cubes
    assert!(plate.cast_ray(&down_at(12.0, 5.0), Real::MAX).unwrap().is_none());
    assert!(plate.cast_ray(&down_at(-30.0, -30.0), Real::MAX).unwrap().is_none());
    // pointing away
    let up = Ray::new(Point3::new(3.0, 3.0, 50.0), Vector3::new(0.0, 0.0, 1.0));
    assert!(plate.cast_ray(&up, Real::MAX).unwrap().is_none());
}

#[test]
fn max_distance_limits_hits() {
    let plate = plate_with_two_cubes();
    assert!(plate.cast_ray(&down_at(3.0, 7.0), 39.0).unwrap().is_none());
    assert!(plate.cast_ray(&down_at(3.0, 7.0), 41.0).unwrap().is_some());
}

#[test]
fn side_ray_picks_the_nearer_solid() {
    let plate = plate_with_two_cubes();
    let first = plate.solids()[0].id;
    let ray = Ray::new(Point3::new(-20.0, 3.0, 6.0), Vector3::new(1.0, 0.0, 0.0));
    let hit = plate.cast_ray(&ray, Real::MAX).unwrap().unwrap();
    assert_eq!(hit.solid, first);
    assert_relative_eq!(hit.distance, 20.0, epsilon = 1e-9);
}

#[test]
fn hits_follow_scaled_placements() {
    let mut plate = Plate::default();
    let id = plate
        .add_solid(shapes::cube(1.0), Matrix4::identity())
        .unwrap()
        .id()
        .unwrap();
    plate
        .set_transform(
            id,
            Matrix4::new_translation(&Vector3::new(100.0, 0.0, 0.0))
                * Matrix4::new_nonuniform_scaling(&Vector3::new(10.0, 10.0, 4.0)),
        )
        .unwrap();
    plate.build_pick_indices(&mut no_progress()).unwrap();

    let hit = plate.cast_ray(&down_at(103.0, 7.0), Real::MAX).unwrap().unwrap();
    assert_eq!(hit.solid, id);
    assert_relative_eq!(hit.point.z, 4.0, epsilon = 1e-9);
    assert_relative_eq!(hit.distance, 46.0, epsilon = 1e-9);
}

#[test]
fn solids_without_index_are_not_pickable() {
    let mut plate = Plate::default();
    plate.add_solid(shapes::cube(10.0), Matrix4::identity()).unwrap();
    let tree = plate.pick_tree().unwrap();
    assert!(tree.is_empty());
    assert!(tree.cast_ray(&down_at(3.0, 7.0), Real::MAX).is_none());
}

#[test]
fn singular_placement_cannot_be_picked() {
    let mut plate = Plate::default();
    let id = plate
        .add_solid(shapes::cube(1.0), Matrix4::identity())
        .unwrap()
        .id()
        .unwrap();
    plate.build_pick_indices(&mut no_progress()).unwrap();
    plate.set_transform(id, Matrix4::zeros()).unwrap();
    assert!(matches!(
        plate.pick_tree(),
        Err(PlateError::NonInvertibleTransform)
    ));
}

fn dart() -> Mesh {
    Mesh::from_indexed(
        &[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.5, 0.5, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ],
        &[vec![0, 1, 2, 3]],
    )
}

#[test]
fn require_convex_rejects_concave_face() {
    let result = SolidPickIndex::build(&dart(), FaceTriangulation::RequireConvex, &mut no_progress());
    assert!(matches!(result, Err(PlateError::NonConvexFace { face: 0 })));

    let fanned = SolidPickIndex::build(&dart(), FaceTriangulation::Fan, &mut no_progress()).unwrap();
    assert_eq!(fanned.triangle_count(), 2);
    assert_eq!(fanned.face_of_triangle(1), 0);
}

#[test]
fn plate_policy_comes_from_config() {
    let config = PlatingConfig {
        face_triangulation: FaceTriangulation::RequireConvex,
        ..Default::default()
    };
    let mut plate = Plate::new(config);
    plate.add_solid(dart(), Matrix4::identity()).unwrap();
    assert!(matches!(
        plate.build_pick_indices(&mut no_progress()),
        Err(PlateError::NonConvexFace { .. })
    ));
}

#[test]
fn index_build_reports_progress() {
    let mut statuses = Vec::new();
    let index = SolidPickIndex::build(
        &shapes::cube(1.0),
        FaceTriangulation::RequireConvex,
        &mut |ratio: Real, status: &str| statuses.push((ratio, status.to_string())),
    )
    .unwrap();
    assert_eq!(index.triangle_count(), 12);
    assert_eq!(statuses, vec![(0.0, "Creating Trace Polygons".to_string())]);
}
