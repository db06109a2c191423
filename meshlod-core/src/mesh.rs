//! Mesh data structures and functionality

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Faces whose area falls below this are treated as degenerate
pub const AREA_EPSILON: f32 = 1e-10;

/// A triangle mesh with vertices, faces and optional per-vertex attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    #[serde(default)]
    pub normals: Option<Vec<Vector3f>>,
    #[serde(default)]
    pub uvs: Option<Vec<UV>>,
}

/// Flat indexed-triangle buffers, as handed over by model loaders and
/// consumed by renderers.
///
/// `positions` and `normals` hold xyz triples, `uvs` holds uv pairs and
/// `indices` holds one triple per triangle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexedBuffers {
    pub positions: Vec<f32>,
    #[serde(default)]
    pub uvs: Option<Vec<f32>>,
    #[serde(default)]
    pub normals: Option<Vec<f32>>,
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
            uvs: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
            uvs: None,
        }
    }

    /// Build a mesh from flat indexed buffers.
    ///
    /// Fails with [`Error::InvalidMesh`] when a buffer length is not a
    /// multiple of its stride or an attribute buffer disagrees with the
    /// vertex count. Index ranges are checked by [`TriangleMesh::validate`].
    pub fn from_indexed(buffers: &IndexedBuffers) -> Result<Self> {
        if buffers.positions.len() % 3 != 0 {
            return Err(Error::invalid_mesh(format!(
                "position buffer length {} is not a multiple of 3",
                buffers.positions.len()
            )));
        }
        if buffers.indices.len() % 3 != 0 {
            return Err(Error::invalid_mesh(format!(
                "index buffer length {} is not a multiple of 3",
                buffers.indices.len()
            )));
        }
        let vertex_count = buffers.positions.len() / 3;

        let vertices = buffers
            .positions
            .chunks_exact(3)
            .map(|c| Point3f::new(c[0], c[1], c[2]))
            .collect();
        let faces = buffers
            .indices
            .chunks_exact(3)
            .map(|c| [c[0] as usize, c[1] as usize, c[2] as usize])
            .collect();

        let uvs = match &buffers.uvs {
            Some(uvs) if uvs.len() != vertex_count * 2 => {
                return Err(Error::invalid_mesh(format!(
                    "uv buffer holds {} floats, expected {}",
                    uvs.len(),
                    vertex_count * 2
                )));
            }
            Some(uvs) => Some(uvs.chunks_exact(2).map(|c| [c[0], c[1]]).collect()),
            None => None,
        };
        let normals = match &buffers.normals {
            Some(normals) if normals.len() != vertex_count * 3 => {
                return Err(Error::invalid_mesh(format!(
                    "normal buffer holds {} floats, expected {}",
                    normals.len(),
                    vertex_count * 3
                )));
            }
            Some(normals) => Some(
                normals
                    .chunks_exact(3)
                    .map(|c| Vector3f::new(c[0], c[1], c[2]))
                    .collect(),
            ),
            None => None,
        };

        Ok(Self {
            vertices,
            faces,
            normals,
            uvs,
        })
    }

    /// Flatten the mesh into indexed buffers
    pub fn to_indexed(&self) -> IndexedBuffers {
        IndexedBuffers {
            positions: self.vertices.iter().flat_map(|p| [p.x, p.y, p.z]).collect(),
            uvs: self
                .uvs
                .as_ref()
                .map(|uvs| uvs.iter().flat_map(|uv| *uv).collect()),
            normals: self
                .normals
                .as_ref()
                .map(|normals| normals.iter().flat_map(|n| [n.x, n.y, n.z]).collect()),
            indices: self
                .faces
                .iter()
                .flat_map(|f| [f[0] as u32, f[1] as u32, f[2] as u32])
                .collect(),
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Area of the triangle spanned by `face`
    pub fn face_area(&self, face: &[usize; 3]) -> f32 {
        triangle_area(
            &self.vertices[face[0]],
            &self.vertices[face[1]],
            &self.vertices[face[2]],
        )
    }

    /// A face is degenerate if it repeats a vertex or has (near) zero area
    pub fn is_degenerate_face(&self, face: &[usize; 3]) -> bool {
        face[0] == face[1]
            || face[1] == face[2]
            || face[2] == face[0]
            || self.face_area(face) <= AREA_EPSILON
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Set vertex texture coordinates
    pub fn set_uvs(&mut self, uvs: Vec<UV>) {
        if uvs.len() == self.vertices.len() {
            self.uvs = Some(uvs);
        }
    }

    /// Check the structural invariants of the mesh.
    ///
    /// Requires at least 3 vertices and 1 face, finite coordinates, in-range
    /// indices and attribute arrays matching the vertex count. Degenerate
    /// faces are allowed here; callers decide what to do with them.
    pub fn validate(&self) -> Result<()> {
        if self.vertices.len() < 3 {
            return Err(Error::invalid_mesh(format!(
                "mesh needs at least 3 vertices, got {}",
                self.vertices.len()
            )));
        }
        if self.faces.is_empty() {
            return Err(Error::invalid_mesh("mesh has no faces"));
        }
        if let Some(i) = self.vertices.iter().position(|p| !is_finite_point(p)) {
            return Err(Error::invalid_mesh(format!(
                "vertex {} has a non-finite coordinate",
                i
            )));
        }
        let nv = self.vertices.len();
        if let Some((fi, face)) = self
            .faces
            .iter()
            .enumerate()
            .find(|(_, f)| f.iter().any(|&v| v >= nv))
        {
            return Err(Error::invalid_mesh(format!(
                "face {} {:?} references a vertex out of range (vertex count {})",
                fi, face, nv
            )));
        }
        if let Some(normals) = &self.normals {
            if normals.len() != nv {
                return Err(Error::invalid_mesh(format!(
                    "{} normals for {} vertices",
                    normals.len(),
                    nv
                )));
            }
        }
        if let Some(uvs) = &self.uvs {
            if uvs.len() != nv {
                return Err(Error::invalid_mesh(format!(
                    "{} texture coordinates for {} vertices",
                    uvs.len(),
                    nv
                )));
            }
        }
        Ok(())
    }

    /// Count the faces adjacent to every undirected edge
    pub fn edge_face_counts(&self) -> HashMap<(usize, usize), usize> {
        let mut counts = HashMap::with_capacity(self.faces.len() * 3 / 2);
        for face in &self.faces {
            for j in 0..3 {
                let a = face[j];
                let b = face[(j + 1) % 3];
                *counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        counts
    }

    /// True if every edge is shared by exactly two faces
    pub fn is_closed_manifold(&self) -> bool {
        !self.faces.is_empty() && self.edge_face_counts().values().all(|&c| c == 2)
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

/// Area of a triangle
pub fn triangle_area(a: &Point3f, b: &Point3f, c: &Point3f) -> f32 {
    (b - a).cross(&(c - a)).norm() * 0.5
}

/// Unit normal of a triangle, or zero when the triangle is degenerate
pub fn triangle_normal(a: &Point3f, b: &Point3f, c: &Point3f) -> Vector3f {
    let n = (b - a).cross(&(c - a));
    let len = n.norm();
    if len <= f32::EPSILON || !len.is_finite() {
        Vector3f::zeros()
    } else {
        n / len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn test_indexed_roundtrip_with_attributes() {
        let mut mesh = unit_square();
        mesh.set_uvs(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        mesh.set_normals(vec![Vector3f::z(); 4]);

        let buffers = mesh.to_indexed();
        assert_eq!(buffers.positions.len(), 12);
        assert_eq!(buffers.uvs.as_ref().map(Vec::len), Some(8));
        assert_eq!(buffers.indices, vec![0, 1, 2, 0, 2, 3]);

        let back = TriangleMesh::from_indexed(&buffers).unwrap();
        assert_eq!(back, mesh);
    }

    #[test]
    fn test_from_indexed_rejects_bad_strides() {
        let buffers = IndexedBuffers {
            positions: vec![0.0; 10],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        assert!(TriangleMesh::from_indexed(&buffers).unwrap_err().is_invalid_mesh());

        let buffers = IndexedBuffers {
            positions: vec![0.0; 9],
            uvs: Some(vec![0.0; 4]),
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        assert!(TriangleMesh::from_indexed(&buffers).is_err());

        let buffers = IndexedBuffers {
            positions: vec![0.0; 9],
            indices: vec![0, 1],
            ..Default::default()
        };
        assert!(TriangleMesh::from_indexed(&buffers).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(unit_square().validate().is_ok());

        let mut too_small = unit_square();
        too_small.vertices.truncate(2);
        too_small.faces.clear();
        assert!(too_small.validate().unwrap_err().is_invalid_mesh());

        let mut no_faces = unit_square();
        no_faces.faces.clear();
        assert!(no_faces.validate().is_err());

        let mut nan = unit_square();
        nan.vertices[1].y = f32::NAN;
        assert!(nan.validate().is_err());

        let mut out_of_range = unit_square();
        out_of_range.faces.push([0, 1, 7]);
        assert!(out_of_range.validate().is_err());

        let mut bad_uvs = unit_square();
        bad_uvs.uvs = Some(vec![[0.0, 0.0]]);
        assert!(bad_uvs.validate().is_err());
    }

    #[test]
    fn test_face_area_and_degeneracy() {
        let mut mesh = unit_square();
        assert_relative_eq!(mesh.face_area(&[0, 1, 2]), 0.5);
        assert!(!mesh.is_degenerate_face(&[0, 1, 2]));
        assert!(mesh.is_degenerate_face(&[0, 0, 2]));

        let collinear = mesh.vertices.len();
        mesh.vertices.push(Point3f::new(2.0, 0.0, 0.0));
        assert!(mesh.is_degenerate_face(&[0, 1, collinear]));
    }

    #[test]
    fn test_face_normals() {
        let mesh = unit_square();
        for f in &mesh.faces {
            let n = triangle_normal(
                &mesh.vertices[f[0]],
                &mesh.vertices[f[1]],
                &mesh.vertices[f[2]],
            );
            assert_relative_eq!(n, Vector3f::z(), epsilon = 1e-6);
        }
        let n = triangle_normal(
            &Point3f::origin(),
            &Point3f::new(1.0, 0.0, 0.0),
            &Point3f::new(2.0, 0.0, 0.0),
        );
        assert_eq!(n, Vector3f::zeros());
    }

    #[test]
    fn test_edge_counts_and_manifold() {
        let square = unit_square();
        let counts = square.edge_face_counts();
        assert_eq!(counts.len(), 5);
        assert_eq!(counts[&(0, 2)], 2);
        assert!(!square.is_closed_manifold());

        let tetra = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.5, 1.0, 0.0),
                Point3f::new(0.5, 0.5, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        );
        assert!(tetra.is_closed_manifold());
    }

    #[test]
    fn test_json_serialization() {
        let mesh = unit_square();
        let json = serde_json::to_string(&mesh).unwrap();
        let back: TriangleMesh = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mesh);
        assert!(back.uvs.is_none());
    }
}
