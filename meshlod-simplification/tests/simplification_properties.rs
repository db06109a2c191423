//! Behavioural tests for the progressive simplifier on closed and open meshes

use meshlod_core::{Error, Point3f, TriangleMesh, Vector3f};
use meshlod_simplification::{
    MeshSimplifier, ProgressiveMeshSimplifier, SimplifyOptions, SimplifyStatus,
};
use std::collections::HashSet;

fn make_cube() -> TriangleMesh {
    // Vertex i sits at (i & 1, (i >> 1) & 1, (i >> 2) & 1); faces wound outward
    let vertices = (0..8)
        .map(|i| Point3f::new((i & 1) as f32, ((i >> 1) & 1) as f32, ((i >> 2) & 1) as f32))
        .collect();
    let faces = vec![
        [0, 2, 3], [0, 3, 1], // z = 0
        [4, 5, 7], [4, 7, 6], // z = 1
        [0, 1, 5], [0, 5, 4], // y = 0
        [2, 6, 7], [2, 7, 3], // y = 1
        [0, 4, 6], [0, 6, 2], // x = 0
        [1, 3, 7], [1, 7, 5], // x = 1
    ];
    TriangleMesh::from_vertices_and_faces(vertices, faces)
}

fn make_torus(rings: usize, sides: usize) -> TriangleMesh {
    let (major, minor) = (3.0f32, 1.0f32);
    let mut vertices = Vec::with_capacity(rings * sides);
    let mut normals = Vec::with_capacity(rings * sides);
    let mut uvs = Vec::with_capacity(rings * sides);
    for i in 0..rings {
        let theta = i as f32 / rings as f32 * std::f32::consts::TAU;
        for j in 0..sides {
            let phi = j as f32 / sides as f32 * std::f32::consts::TAU;
            let ring = major + minor * phi.cos();
            vertices.push(Point3f::new(ring * theta.cos(), ring * theta.sin(), minor * phi.sin()));
            normals.push(Vector3f::new(
                phi.cos() * theta.cos(),
                phi.cos() * theta.sin(),
                phi.sin(),
            ));
            uvs.push([i as f32 / rings as f32, j as f32 / sides as f32]);
        }
    }
    let idx = |i: usize, j: usize| (i % rings) * sides + (j % sides);
    let mut faces = Vec::with_capacity(rings * sides * 2);
    for i in 0..rings {
        for j in 0..sides {
            let a = idx(i, j);
            let b = idx(i + 1, j);
            let c = idx(i + 1, j + 1);
            let d = idx(i, j + 1);
            faces.push([a, b, c]);
            faces.push([a, c, d]);
        }
    }
    let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
    mesh.set_normals(normals);
    mesh.set_uvs(uvs);
    mesh
}

fn make_plane_grid(size: usize) -> TriangleMesh {
    let mut vertices = Vec::new();
    for y in 0..size {
        for x in 0..size {
            vertices.push(Point3f::new(x as f32, y as f32, 0.0));
        }
    }
    let mut faces = Vec::new();
    for y in 0..(size - 1) {
        for x in 0..(size - 1) {
            let tl = y * size + x;
            let tr = tl + 1;
            let bl = (y + 1) * size + x;
            let br = bl + 1;
            faces.push([tl, bl, tr]);
            faces.push([tr, bl, br]);
        }
    }
    TriangleMesh::from_vertices_and_faces(vertices, faces)
}

/// Wavy height field over a jittered grid, wound so every normal points +z
fn make_bumpy_height_field(size: usize) -> TriangleMesh {
    let mut vertices = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let (fx, fy) = (x as f32, y as f32);
            vertices.push(Point3f::new(
                fx + 0.15 * (1.7 * fy + 0.9 * fx).sin(),
                fy,
                0.3 * (1.3 * fx).sin() * (0.9 * fy).cos(),
            ));
        }
    }
    let mut faces = Vec::new();
    for y in 0..(size - 1) {
        for x in 0..(size - 1) {
            let tl = y * size + x;
            let tr = tl + 1;
            let bl = tl + size;
            let br = bl + 1;
            faces.push([tl, tr, bl]);
            faces.push([tr, br, bl]);
        }
    }
    TriangleMesh::from_vertices_and_faces(vertices, faces)
}

fn face_normal_z(mesh: &TriangleMesh, face: &[usize; 3]) -> f32 {
    let [a, b, c] = face.map(|i| mesh.vertices[i]);
    (b - a).cross(&(c - a)).z
}

fn plain_simplifier() -> ProgressiveMeshSimplifier {
    ProgressiveMeshSimplifier::with_options(SimplifyOptions::default().with_preserve_texture(false))
}

#[test]
fn test_cube_half_stays_closed_manifold() {
    let cube = make_cube();
    assert!(cube.is_closed_manifold());

    let result = plain_simplifier().simplify_with_report(&cube, 0.5, None).unwrap();
    assert!(result.mesh.face_count() <= 6, "got {} faces", result.mesh.face_count());
    assert!(result.mesh.is_closed_manifold());
    assert_eq!(result.report.status, SimplifyStatus::Reached);
    assert_eq!(result.report.edges_collapsed, 3);
}

#[test]
fn test_cube_bottoms_out_at_tetrahedron() {
    let result = plain_simplifier()
        .simplify_with_report(&make_cube(), 0.0, None)
        .unwrap();
    assert_eq!(result.mesh.face_count(), 4);
    assert_eq!(result.mesh.vertex_count(), 4);
    assert!(result.mesh.is_closed_manifold());
    assert_eq!(result.report.status, SimplifyStatus::Infeasible);
}

#[test]
fn test_torus_reduction_reaches_target() {
    let torus = make_torus(12, 8);
    let original = torus.face_count();
    assert_eq!(original, 192);

    let result = ProgressiveMeshSimplifier::new()
        .simplify_with_report(&torus, 0.5, None)
        .unwrap();
    assert!(result.mesh.face_count() <= 96);
    assert!(result.mesh.face_count() >= 94);
    assert!(result.mesh.is_closed_manifold());
    assert!(result.mesh.validate().is_ok());

    let n = result.mesh.vertex_count();
    assert_eq!(result.mesh.normals.as_ref().map(Vec::len), Some(n));
    assert_eq!(result.mesh.uvs.as_ref().map(Vec::len), Some(n));
}

#[test]
fn test_full_ratio_keeps_every_face() {
    let torus = make_torus(10, 6);
    let result = ProgressiveMeshSimplifier::new().simplify(&torus, 1.0).unwrap();
    assert_eq!(result, torus);
}

#[test]
fn test_monotonic_in_ratio() {
    let torus = make_torus(12, 8);
    let s = plain_simplifier();
    let mut previous = 0;
    for ratio in [0.1, 0.25, 0.4, 0.6, 0.8, 1.0] {
        let faces = s.simplify(&torus, ratio).unwrap().face_count();
        assert!(faces >= previous, "ratio {} gave {} < {}", ratio, faces, previous);
        assert!(faces <= torus.face_count());
        previous = faces;
    }
}

#[test]
fn test_deterministic_output() {
    let torus = make_torus(16, 10);
    let s = ProgressiveMeshSimplifier::new();
    let a = s.simplify_with_report(&torus, 0.3, None).unwrap();
    let b = s.simplify_with_report(&torus, 0.3, None).unwrap();
    assert_eq!(a.mesh, b.mesh);
    assert_eq!(a.collapses, b.collapses);
}

#[test]
fn test_input_is_not_mutated() {
    let torus = make_torus(12, 8);
    let snapshot = torus.clone();
    let _ = ProgressiveMeshSimplifier::new().simplify(&torus, 0.2).unwrap();
    assert_eq!(torus, snapshot);
}

#[test]
fn test_lone_degenerate_triangle_is_invalid() {
    let mesh = TriangleMesh::from_vertices_and_faces(
        vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(2.0, 0.0, 0.0),
        ],
        vec![[0, 1, 2]],
    );
    let err = ProgressiveMeshSimplifier::new().simplify(&mesh, 0.5).unwrap_err();
    assert!(matches!(err, Error::InvalidMesh(_)));
}

#[test]
fn test_embedded_degenerate_triangle_is_dropped() {
    let mut cube = make_cube();
    let mid = cube.vertices.len();
    cube.vertices.push(Point3f::new(0.5, 0.0, 0.0));
    cube.faces.push([0, mid, 1]);

    let result = ProgressiveMeshSimplifier::new()
        .simplify_with_report(&cube, 1.0, None)
        .unwrap();
    assert_eq!(result.report.degenerate_faces_dropped, 1);
    assert_eq!(result.mesh.face_count(), 12);
    assert_eq!(result.mesh.vertex_count(), 8);
    assert!(result.mesh.is_closed_manifold());
}

#[test]
fn test_invalid_inputs() {
    let s = ProgressiveMeshSimplifier::new();
    assert!(s.simplify(&TriangleMesh::new(), 0.5).is_err());

    let mut nan = make_cube();
    nan.vertices[3].z = f32::NAN;
    assert!(matches!(s.simplify(&nan, 0.5), Err(Error::InvalidMesh(_))));

    let mut out_of_range = make_cube();
    out_of_range.faces.push([0, 1, 42]);
    assert!(matches!(s.simplify(&out_of_range, 0.5), Err(Error::InvalidMesh(_))));
}

#[test]
fn test_planar_grid_keeps_boundary() {
    let size = 6;
    let mesh = make_plane_grid(size);
    assert_eq!(mesh.face_count(), 50);

    let boundary: HashSet<(i32, i32)> = mesh
        .vertices
        .iter()
        .filter(|p| p.x == 0.0 || p.y == 0.0 || p.x == 5.0 || p.y == 5.0)
        .map(|p| (p.x as i32, p.y as i32))
        .collect();
    assert_eq!(boundary.len(), 20);

    let result = plain_simplifier().simplify_with_report(&mesh, 0.7, None).unwrap();
    assert!(result.mesh.face_count() <= 35);
    assert!(result.mesh.face_count() > 0);

    let kept: HashSet<(i32, i32)> = result
        .mesh
        .vertices
        .iter()
        .map(|p| (p.x as i32, p.y as i32))
        .collect();
    let preserved = boundary.intersection(&kept).count();
    assert!(
        preserved as f32 / boundary.len() as f32 > 0.9,
        "only {} of {} boundary vertices survived",
        preserved,
        boundary.len()
    );
}

#[test]
fn test_bumpy_height_field_keeps_orientation() {
    let mesh = make_bumpy_height_field(15);
    assert_eq!(mesh.face_count(), 392);
    assert!(mesh.faces.iter().all(|f| face_normal_z(&mesh, f) > 0.0));

    for ratio in [0.5, 0.3, 0.1] {
        let result = plain_simplifier().simplify_with_report(&mesh, ratio, None).unwrap();
        assert!(result.mesh.face_count() < mesh.face_count());
        for face in &result.mesh.faces {
            let z = face_normal_z(&result.mesh, face);
            assert!(z > 0.0, "face {:?} folded over at ratio {} (normal z {})", face, ratio, z);
        }
    }
}
