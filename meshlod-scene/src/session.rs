//! A loaded model shown next to its optimized copy

use crate::{optimize_scene, GeometryReport, OptimizationRequest, Scene, SceneOptimization};
use meshlod_core::{Drawable, Error, Result, Vector3f};
use meshlod_simplification::SimplifyOptions;
use std::sync::Arc;
use tracing::{debug, info};

/// Holds the original scene and at most one optimized copy of it.
///
/// The copy is shifted along +X by the original's largest world-space
/// extent so both can be displayed side by side.
#[derive(Debug, Default)]
pub struct ModelSession {
    original: Option<Arc<Scene>>,
    optimized: Option<Scene>,
    reports: Vec<GeometryReport>,
}

impl ModelSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current model, discarding any optimized copy
    pub fn load(&mut self, scene: Scene) -> Result<()> {
        scene.validate()?;
        info!(
            "loaded model: {} node(s), {} geometry(ies), {} instanced face(s)",
            scene.node_count(),
            scene.geometry_count(),
            scene.instanced_face_count()
        );
        self.original = Some(Arc::new(scene));
        self.optimized = None;
        self.reports.clear();
        Ok(())
    }

    pub fn original(&self) -> Option<&Scene> {
        self.original.as_deref()
    }

    pub fn optimized(&self) -> Option<&Scene> {
        self.optimized.as_ref()
    }

    /// Reports of the current optimized copy
    pub fn reports(&self) -> &[GeometryReport] {
        &self.reports
    }

    /// Simplify the loaded model synchronously and install the result
    pub fn optimize(&mut self, options: &SimplifyOptions, ratio: f32) -> Result<&Scene> {
        let original = self.require_original()?;
        let result = optimize_scene(&original, options, ratio, None)?;
        self.install(result)
    }

    /// Build a background request for the loaded model
    pub fn request(&self, options: &SimplifyOptions, ratio: f32) -> Result<OptimizationRequest> {
        Ok(OptimizationRequest {
            scene: self.require_original()?,
            options: options.clone(),
            ratio,
        })
    }

    /// Place a finished optimization next to the original and keep it,
    /// replacing the previous copy.
    ///
    /// Fails unless the result was computed from the currently loaded
    /// model; reloading the same file still counts as a different model.
    pub fn install(&mut self, result: SceneOptimization) -> Result<&Scene> {
        let original = self.require_original()?;
        if !Arc::ptr_eq(&original, &result.source) {
            return Err(Error::InvalidParameter(
                "optimization result does not belong to the loaded model".to_string(),
            ));
        }

        let offset = original.max_extent();
        let mut scene = result.scene;
        scene.translate_roots(Vector3f::new(offset, 0.0, 0.0));
        debug!(
            "installed optimized copy at x + {} ({} -> {} faces)",
            offset,
            result.reports.iter().map(|r| r.report.original_face_count).sum::<usize>(),
            result.reports.iter().map(|r| r.report.final_face_count).sum::<usize>()
        );

        self.reports = result.reports;
        Ok(&*self.optimized.insert(scene))
    }

    fn require_original(&self) -> Result<Arc<Scene>> {
        self.original
            .clone()
            .ok_or_else(|| Error::InvalidParameter("no model loaded".to_string()))
    }
}
