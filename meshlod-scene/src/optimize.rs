//! Simplification of every mesh in a scene

use crate::{GeometryId, NodeId, Scene};
use meshlod_core::Result;
use meshlod_simplification::{
    CancellationToken, ProgressiveMeshSimplifier, SimplifyOptions, SimplifyReport,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Outcome for one shared geometry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometryReport {
    pub geometry: GeometryId,
    /// Nodes instancing the geometry, in traversal order
    pub nodes: Vec<NodeId>,
    pub report: SimplifyReport,
}

/// A simplified copy of a scene with one report per simplified geometry
#[derive(Debug, Clone)]
pub struct SceneOptimization {
    /// The scene this copy was computed from
    pub source: Arc<Scene>,
    pub scene: Scene,
    pub reports: Vec<GeometryReport>,
}

impl SceneOptimization {
    pub fn original_face_count(&self) -> usize {
        self.reports.iter().map(|r| r.report.original_face_count).sum()
    }

    pub fn final_face_count(&self) -> usize {
        self.reports.iter().map(|r| r.report.final_face_count).sum()
    }
}

/// Simplify every geometry reachable from the scene's roots.
///
/// A mesh instanced by several nodes is simplified once. Meshes no node
/// refers to are copied unchanged. The input scene is not modified.
pub fn optimize_scene(
    scene: &Arc<Scene>,
    options: &SimplifyOptions,
    ratio: f32,
    cancel: Option<&CancellationToken>,
) -> Result<SceneOptimization> {
    scene.validate()?;

    let mut users: Vec<Vec<NodeId>> = vec![Vec::new(); scene.geometry_count()];
    for instance in scene.geometry_nodes() {
        users[instance.geometry].push(instance.node);
    }

    let simplifier = ProgressiveMeshSimplifier::with_options(options.clone());
    let mut reports = Vec::new();
    let optimized = scene.map_geometry(|id, mesh| {
        if users[id].is_empty() {
            return Ok(mesh.clone());
        }
        let result = simplifier.simplify_with_report(mesh, ratio, cancel)?;
        debug!(
            "geometry {} ({} node(s)): {} -> {} faces",
            id,
            users[id].len(),
            result.report.original_face_count,
            result.report.final_face_count
        );
        reports.push(GeometryReport {
            geometry: id,
            nodes: std::mem::take(&mut users[id]),
            report: result.report,
        });
        Ok(result.mesh)
    })?;

    Ok(SceneOptimization {
        source: Arc::clone(scene),
        scene: optimized,
        reports,
    })
}
