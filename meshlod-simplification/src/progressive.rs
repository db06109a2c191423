//! Progressive mesh simplification
//!
//! Greedy edge collapse in the style of Melax's progressive mesh reduction:
//! every vertex knows its cheapest neighbour to merge into, the globally
//! cheapest vertex is collapsed first, and only the neighbourhood touched by
//! a collapse is re-costed. Surviving vertices keep their positions and
//! attributes, so the output is a subset of the input vertices.
//!
//! The collapse cost of `u -> v` is
//!
//! ```text
//! length_weight * |v - u| * curvature(u, v) + texture_penalty(u, v)
//! ```
//!
//! where the curvature term is the largest normal deviation between a face
//! around `u` and the faces sharing the edge, so flat regions are reduced
//! before creases and silhouettes.

use crate::{CancellationToken, MeshSimplifier, SimplifyOptions};
use meshlod_core::{
    triangle_area, triangle_normal, uv_distance, Error, Point3f, Result, TriangleMesh,
    Vector3f, AREA_EPSILON, UV,
};
use priority_queue::PriorityQueue;
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, trace, warn};

/// Costs closer than this are considered equal
pub const COST_EPSILON: f64 = 1e-9;

/// Keeps the curvature term positive on perfectly flat surfaces
const CURVATURE_EPSILON: f64 = 0.001;

/// A collapse is rejected when a re-pointed face's new normal is 60 degrees
/// or more away from its current normal or from its input normal
const MIN_NORMAL_COSINE: f32 = 0.5;

// ============================================================
// Public result types
// ============================================================

/// A single edge collapse: vertex `from` merged into vertex `to`.
///
/// Indices refer to the input mesh's vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeCollapse {
    pub from: usize,
    pub to: usize,
    pub cost: f64,
}

/// Whether the requested face budget was met
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SimplifyStatus {
    /// The face count reached the target
    Reached,
    /// No legal collapse remained before the target was reached
    Infeasible,
}

/// Statistics of one simplification run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimplifyReport {
    pub original_vertex_count: usize,
    pub original_face_count: usize,
    pub target_face_count: usize,
    pub final_vertex_count: usize,
    pub final_face_count: usize,
    pub edges_collapsed: usize,
    pub degenerate_faces_dropped: usize,
    /// Queue entries discarded because their collapse had become illegal
    pub rejected_candidates: usize,
    pub max_collapse_cost: f64,
    pub status: SimplifyStatus,
}

impl SimplifyReport {
    /// Faces still above the target; zero when the target was reached
    pub fn shortfall(&self) -> usize {
        self.final_face_count.saturating_sub(self.target_face_count)
    }
}

/// Simplified mesh together with its report and the collapse sequence
#[derive(Debug, Clone)]
pub struct SimplifyResult {
    pub mesh: TriangleMesh,
    pub report: SimplifyReport,
    /// Collapses in the order they were applied
    pub collapses: Vec<EdgeCollapse>,
}

// ============================================================
// Working mesh with adjacency
// ============================================================

#[derive(Debug, Clone)]
struct Vertex {
    position: Point3f,
    /// Active incident faces, ascending
    faces: Vec<usize>,
    /// Adjacent vertices, ascending
    neighbors: Vec<usize>,
    removed: bool,
}

#[derive(Debug, Clone)]
struct Face {
    vertices: [usize; 3],
    normal: Vector3f,
    /// Normal of the input triangle this face started as
    reference_normal: Vector3f,
    removed: bool,
}

impl Face {
    fn contains(&self, v: usize) -> bool {
        self.vertices.contains(&v)
    }
}

/// Owned copy of the input mesh that collapses mutate in place
struct WorkingMesh {
    vertices: Vec<Vertex>,
    faces: Vec<Face>,
    uvs: Option<Vec<UV>>,
    normals: Option<Vec<Vector3f>>,
    active_faces: usize,
}

fn insert_sorted(list: &mut Vec<usize>, value: usize) {
    if let Err(pos) = list.binary_search(&value) {
        list.insert(pos, value);
    }
}

fn remove_sorted(list: &mut Vec<usize>, value: usize) {
    if let Ok(pos) = list.binary_search(&value) {
        list.remove(pos);
    }
}

fn sorted_intersection_count(a: &[usize], b: &[usize]) -> usize {
    let (mut i, mut j, mut count) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                count += 1;
                i += 1;
                j += 1;
            }
        }
    }
    count
}

fn same_vertex_set(a: [usize; 3], b: [usize; 3]) -> bool {
    let mut a = a;
    let mut b = b;
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

impl WorkingMesh {
    /// Build adjacency from a validated mesh, dropping degenerate faces.
    /// Returns the working mesh and the number of dropped faces.
    fn from_triangle_mesh(mesh: &TriangleMesh) -> (Self, usize) {
        let mut vertices: Vec<Vertex> = mesh
            .vertices
            .iter()
            .map(|&position| Vertex {
                position,
                faces: Vec::new(),
                neighbors: Vec::new(),
                removed: false,
            })
            .collect();

        let mut faces = Vec::with_capacity(mesh.faces.len());
        let mut dropped = 0usize;
        for face in &mesh.faces {
            if mesh.is_degenerate_face(face) {
                dropped += 1;
                continue;
            }
            let fi = faces.len();
            let normal = triangle_normal(
                &mesh.vertices[face[0]],
                &mesh.vertices[face[1]],
                &mesh.vertices[face[2]],
            );
            faces.push(Face {
                vertices: *face,
                normal,
                reference_normal: normal,
                removed: false,
            });
            for j in 0..3 {
                let v = face[j];
                vertices[v].faces.push(fi);
                insert_sorted(&mut vertices[v].neighbors, face[(j + 1) % 3]);
                insert_sorted(&mut vertices[v].neighbors, face[(j + 2) % 3]);
            }
        }

        let active_faces = faces.len();
        (
            WorkingMesh {
                vertices,
                faces,
                uvs: mesh.uvs.clone(),
                normals: mesh.normals.clone(),
                active_faces,
            },
            dropped,
        )
    }

    /// Active faces containing both `u` and `v`
    fn side_faces(&self, u: usize, v: usize) -> Vec<usize> {
        self.vertices[u]
            .faces
            .iter()
            .copied()
            .filter(|&f| self.faces[f].contains(v))
            .collect()
    }

    fn is_boundary_vertex(&self, u: usize) -> bool {
        self.vertices[u]
            .neighbors
            .iter()
            .any(|&n| self.side_faces(u, n).len() == 1)
    }

    /// Topology and geometry guard for collapsing `u` into `v`
    fn can_collapse(&self, u: usize, v: usize, side: &[usize]) -> bool {
        // Never collapse the last remaining faces away
        if self.active_faces <= side.len() {
            return false;
        }

        // Link condition: the only shared neighbours are the side-face apices
        let common =
            sorted_intersection_count(&self.vertices[u].neighbors, &self.vertices[v].neighbors);
        if common != side.len() {
            return false;
        }

        // An interior edge joining two boundary vertices would pinch the surface
        if side.len() == 2 && self.is_boundary_vertex(u) && self.is_boundary_vertex(v) {
            return false;
        }

        let target = self.vertices[v].position;
        for &f in &self.vertices[u].faces {
            if side.contains(&f) {
                continue;
            }
            let mut moved = self.faces[f].vertices;
            for slot in moved.iter_mut() {
                if *slot == u {
                    *slot = v;
                }
            }

            let positions = moved.map(|i| {
                if i == v {
                    target
                } else {
                    self.vertices[i].position
                }
            });
            if triangle_area(&positions[0], &positions[1], &positions[2]) <= AREA_EPSILON {
                return false;
            }

            // Faces may tilt but not fold over, in one step or accumulated
            let normal = triangle_normal(&positions[0], &positions[1], &positions[2]);
            let face = &self.faces[f];
            if normal.dot(&face.normal) <= MIN_NORMAL_COSINE
                || normal.dot(&face.reference_normal) <= MIN_NORMAL_COSINE
            {
                return false;
            }

            let duplicates = self.vertices[v]
                .faces
                .iter()
                .filter(|&&g| !side.contains(&g))
                .any(|&g| same_vertex_set(moved, self.faces[g].vertices));
            if duplicates {
                return false;
            }
        }

        true
    }

    /// Cost of collapsing `u` into `v`, or `None` if the collapse is illegal
    fn edge_cost(&self, u: usize, v: usize, options: &SimplifyOptions) -> Option<f64> {
        let side = self.side_faces(u, v);
        if side.is_empty() || side.len() > 2 {
            return None;
        }
        if !self.can_collapse(u, v, &side) {
            return None;
        }

        let length = (self.vertices[v].position - self.vertices[u].position).norm() as f64;

        let mut curvature = 0.0f64;
        for &f in &self.vertices[u].faces {
            let normal = self.faces[f].normal;
            let mut min_curvature = 1.0f64;
            for &s in &side {
                let dot = normal.dot(&self.faces[s].normal) as f64;
                min_curvature = min_curvature.min((1.0 + CURVATURE_EPSILON - dot) / 2.0);
            }
            curvature = curvature.max(min_curvature);
        }

        // Collapsing along or off the boundary reshapes the outline
        if side.len() == 1 || self.is_boundary_vertex(u) {
            curvature = curvature.max(options.boundary_curvature);
        }

        let mut cost = options.length_weight * length * curvature;

        if options.preserve_texture {
            if let Some(uvs) = &self.uvs {
                let d = uv_distance(&uvs[u], &uvs[v]);
                if d > options.uv_tolerance {
                    cost += options.texture_weight * (length + d as f64);
                }
            }
        }

        Some(cost)
    }

    /// Cheapest legal collapse for `u`. Neighbours are scanned in ascending
    /// order and only a strictly cheaper one (beyond `COST_EPSILON`) replaces
    /// the current best, so near ties go to the lowest index.
    fn best_collapse(&self, u: usize, options: &SimplifyOptions) -> Option<EdgeCollapse> {
        let vertex = &self.vertices[u];
        if vertex.removed || vertex.faces.is_empty() {
            return None;
        }

        let mut best: Option<EdgeCollapse> = None;
        for &v in &vertex.neighbors {
            let Some(cost) = self.edge_cost(u, v, options) else {
                continue;
            };
            if best.map_or(true, |b| cost < b.cost - COST_EPSILON) {
                best = Some(EdgeCollapse { from: u, to: v, cost });
            }
        }
        best
    }

    fn remove_face(&mut self, f: usize) {
        let face = &mut self.faces[f];
        face.removed = true;
        let verts = face.vertices;
        for v in verts {
            remove_sorted(&mut self.vertices[v].faces, f);
        }
        self.active_faces -= 1;
    }

    fn rebuild_neighbors(&mut self, u: usize) {
        let mut neighbors = Vec::new();
        for &f in &self.vertices[u].faces {
            for w in self.faces[f].vertices {
                if w != u {
                    neighbors.push(w);
                }
            }
        }
        neighbors.sort_unstable();
        neighbors.dedup();
        self.vertices[u].neighbors = neighbors;
    }

    /// Merge `u` into `v`. Returns the vertices whose adjacency changed.
    fn collapse(&mut self, u: usize, v: usize) -> Vec<usize> {
        for f in self.side_faces(u, v) {
            self.remove_face(f);
        }

        let former_neighbors = std::mem::take(&mut self.vertices[u].neighbors);
        let moved_faces = std::mem::take(&mut self.vertices[u].faces);

        for f in moved_faces {
            let face = &mut self.faces[f];
            for slot in face.vertices.iter_mut() {
                if *slot == u {
                    *slot = v;
                }
            }
            let [a, b, c] = face.vertices;
            face.normal = triangle_normal(
                &self.vertices[a].position,
                &self.vertices[b].position,
                &self.vertices[c].position,
            );
            insert_sorted(&mut self.vertices[v].faces, f);
        }

        self.vertices[u].removed = true;

        for &n in &former_neighbors {
            self.rebuild_neighbors(n);
        }
        if !former_neighbors.contains(&v) {
            self.rebuild_neighbors(v);
        }

        former_neighbors
    }

    /// Compact surviving vertices into a fresh mesh. Vertices left without
    /// faces are dropped.
    fn to_triangle_mesh(&self) -> TriangleMesh {
        let mut old_to_new = vec![usize::MAX; self.vertices.len()];
        let mut new_positions = Vec::new();
        let mut new_uvs = self.uvs.as_ref().map(|_| Vec::new());
        let mut new_normals = self.normals.as_ref().map(|_| Vec::new());

        for (i, vertex) in self.vertices.iter().enumerate() {
            if vertex.removed || vertex.faces.is_empty() {
                continue;
            }
            old_to_new[i] = new_positions.len();
            new_positions.push(vertex.position);
            if let (Some(src), Some(dst)) = (&self.uvs, new_uvs.as_mut()) {
                dst.push(src[i]);
            }
            if let (Some(src), Some(dst)) = (&self.normals, new_normals.as_mut()) {
                dst.push(src[i]);
            }
        }

        let faces = self
            .faces
            .iter()
            .filter(|f| !f.removed)
            .map(|f| f.vertices.map(|v| old_to_new[v]))
            .collect();

        TriangleMesh {
            vertices: new_positions,
            faces,
            normals: new_normals,
            uvs: new_uvs,
        }
    }
}

// ============================================================
// Queue priority
// ============================================================

/// Max-heap key: lowest cost first, then lowest vertex index
#[derive(Debug, Clone, Copy)]
struct CollapsePriority {
    cost: f64,
    vertex: usize,
}

impl PartialEq for CollapsePriority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for CollapsePriority {}

impl PartialOrd for CollapsePriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CollapsePriority {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

// ============================================================
// Progressive Mesh Simplifier
// ============================================================

/// Progressive mesh simplifier using greedy, curvature-weighted edge collapse.
///
/// The input mesh is never modified: each run copies it into a private
/// working mesh with vertex/face adjacency and collapses that copy.
#[derive(Debug, Clone, Default)]
pub struct ProgressiveMeshSimplifier {
    pub options: SimplifyOptions,
}

impl ProgressiveMeshSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SimplifyOptions) -> Self {
        Self { options }
    }

    /// Simplify keeping `ratio` of the faces and report what was achieved.
    ///
    /// `ratio` is clamped to `[0, 1]`. The target is
    /// `round(face_count * ratio)`; if topology stops the reduction early the
    /// best mesh reached is returned with [`SimplifyStatus::Infeasible`].
    ///
    /// # Errors
    /// - [`Error::InvalidMesh`] for malformed input or a mesh made only of
    ///   degenerate faces
    /// - [`Error::InvalidParameter`] for a NaN ratio or invalid options
    /// - [`Error::Cancelled`] if `cancel` is triggered mid-run
    pub fn simplify_with_report(
        &self,
        mesh: &TriangleMesh,
        ratio: f32,
        cancel: Option<&CancellationToken>,
    ) -> Result<SimplifyResult> {
        if ratio.is_nan() {
            return Err(Error::InvalidParameter("ratio is NaN".to_string()));
        }
        self.options.validate()?;
        mesh.validate()?;

        let ratio = ratio.clamp(0.0, 1.0);
        let original_face_count = mesh.face_count();
        let target_face_count = (original_face_count as f64 * ratio as f64).round() as usize;

        let (mut working, degenerate_faces_dropped) = WorkingMesh::from_triangle_mesh(mesh);
        if working.active_faces == 0 {
            return Err(Error::invalid_mesh("every face of the mesh is degenerate"));
        }
        if degenerate_faces_dropped > 0 {
            warn!(
                "dropped {} degenerate face(s) before simplification",
                degenerate_faces_dropped
            );
        }

        let options = &self.options;
        let vertex_count = working.vertices.len();

        // Initial costs are independent per vertex
        let mut best: Vec<Option<EdgeCollapse>> = {
            let w = &working;
            (0..vertex_count)
                .into_par_iter()
                .map(|u| w.best_collapse(u, options))
                .collect()
        };

        let mut queue: PriorityQueue<usize, CollapsePriority> =
            PriorityQueue::with_capacity(vertex_count);
        for (u, candidate) in best.iter().enumerate() {
            if let Some(c) = candidate {
                queue.push(u, CollapsePriority { cost: c.cost, vertex: u });
            }
        }

        let mut collapses = Vec::new();
        let mut rejected_candidates = 0usize;
        let mut max_collapse_cost = 0.0f64;
        let mut collapses_at_last_scan = 0usize;

        while working.active_faces > target_face_count {
            if cancel.is_some_and(|t| t.is_cancelled()) {
                debug!("simplification cancelled after {} collapses", collapses.len());
                return Err(Error::Cancelled);
            }

            let Some((u, priority)) = queue.pop() else {
                // Only the 1-ring of each collapse is re-costed; before giving
                // up, rescan everything once per batch of collapses.
                if collapses.len() == collapses_at_last_scan {
                    break;
                }
                collapses_at_last_scan = collapses.len();
                for v in 0..vertex_count {
                    best[v] = working.best_collapse(v, options);
                    if let Some(c) = best[v] {
                        queue.push(v, CollapsePriority { cost: c.cost, vertex: v });
                    }
                }
                continue;
            };

            // Neighbourhoods of neighbours may have changed since queuing
            let fresh = working.best_collapse(u, options);
            let candidate = match fresh {
                None => {
                    trace!("vertex {} no longer has a legal collapse", u);
                    rejected_candidates += 1;
                    best[u] = None;
                    continue;
                }
                Some(c) => c,
            };
            let stale = best[u].map_or(true, |b| b.to != candidate.to)
                || (candidate.cost - priority.cost).abs() > COST_EPSILON;
            best[u] = Some(candidate);
            if stale {
                queue.push(u, CollapsePriority { cost: candidate.cost, vertex: u });
                continue;
            }

            let touched = working.collapse(candidate.from, candidate.to);
            max_collapse_cost = max_collapse_cost.max(candidate.cost);
            collapses.push(candidate);
            best[u] = None;

            for n in touched {
                let updated = working.best_collapse(n, options);
                match updated {
                    None => {
                        queue.remove(&n);
                    }
                    Some(c) => {
                        let unchanged = best[n].is_some_and(|b| {
                            b.to == c.to && (b.cost - c.cost).abs() <= COST_EPSILON
                        }) && queue.get(&n).is_some();
                        if !unchanged {
                            queue.push(n, CollapsePriority { cost: c.cost, vertex: n });
                        }
                    }
                }
                best[n] = updated;
            }
        }

        let status = if working.active_faces <= target_face_count {
            SimplifyStatus::Reached
        } else {
            warn!(
                "target of {} faces is infeasible, stopped at {}",
                target_face_count, working.active_faces
            );
            SimplifyStatus::Infeasible
        };

        let simplified = working.to_triangle_mesh();
        let report = SimplifyReport {
            original_vertex_count: mesh.vertex_count(),
            original_face_count,
            target_face_count,
            final_vertex_count: simplified.vertex_count(),
            final_face_count: simplified.face_count(),
            edges_collapsed: collapses.len(),
            degenerate_faces_dropped,
            rejected_candidates,
            max_collapse_cost,
            status,
        };
        debug!(
            "simplified {} -> {} faces (target {}, {} collapses, {} rejected)",
            report.original_face_count,
            report.final_face_count,
            report.target_face_count,
            report.edges_collapsed,
            report.rejected_candidates
        );

        Ok(SimplifyResult {
            mesh: simplified,
            report,
            collapses,
        })
    }
}

impl MeshSimplifier for ProgressiveMeshSimplifier {
    fn simplify(&self, mesh: &TriangleMesh, ratio: f32) -> Result<TriangleMesh> {
        self.simplify_with_report(mesh, ratio, None)
            .map(|result| result.mesh)
    }
}
