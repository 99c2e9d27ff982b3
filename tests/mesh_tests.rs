mod support;

use meshplate::{
    FaceTriangulation, PlatingConfig,
    mesh::{Mesh, shapes},
};
use nalgebra::{Matrix4, Point3, Vector3};
use support::{approx_eq, bounds_array, surface_area};

#[test]
fn cube_topology_neighbours() {
    let cube = shapes::cube(1.0);
    let topology = cube.topology();

    for v in 0..cube.vertex_count() {
        assert_eq!(topology.faces_around_vertex(v).len(), 3);
    }
    // every face of a cube shares a vertex with the four faces around it
    let mut neighbours: Vec<usize> = topology.face_neighbors(0).collect();
    neighbours.sort_unstable();
    neighbours.dedup();
    assert_eq!(neighbours, vec![2, 3, 4, 5]);
    assert_eq!(topology.isolated_vertices().count(), 0);
}

#[test]
fn clean_welds_a_polygon_soup_back_into_a_cube() {
    let cube = shapes::cube(2.0);
    let soup: Vec<Vec<Point3<_>>> = (0..cube.face_count())
        .map(|f| cube.face_positions(f).collect())
        .collect();
    let mut welded = Mesh::from_polygons(&soup);
    assert_eq!(welded.vertex_count(), 24);

    let report = welded.clean_and_merge();
    assert_eq!(report.welded_vertices, 16);
    assert_eq!(report.removed_faces, 0);
    assert_eq!(welded.vertex_count(), 8);
    assert_eq!(welded.face_count(), 6);
    assert!(approx_eq(surface_area(&welded), 24.0, 1e-9));
}

#[test]
fn transformed_bounds_match_baked_mesh() {
    let mesh = shapes::cuboid(1.0, 2.0, 3.0);
    let transform = Matrix4::new_translation(&Vector3::new(5.0, 0.0, -1.0))
        * Matrix4::new_rotation(Vector3::new(0.0, 0.0, 0.7));

    let direct = mesh.transformed_bounding_box(&transform);
    let baked = mesh.transform(&transform).bounding_box();
    assert_eq!(bounds_array(&direct), bounds_array(&baked));
}

#[test]
fn config_round_trips_through_json() {
    let config = PlatingConfig {
        clearance: 3.5,
        angle_steps: 32,
        face_triangulation: FaceTriangulation::RequireConvex,
        ..Default::default()
    };
    let json = config.to_json().unwrap();
    assert!(json.contains("\"require_convex\""));
    assert_eq!(PlatingConfig::from_json(&json).unwrap(), config);
    assert!(PlatingConfig::from_json("{ \"clearance\": \"wide\" }").is_err());
}
