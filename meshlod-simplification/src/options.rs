//! Tuning parameters for progressive simplification

use meshlod_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Collapse-cost weights and texture handling for [`ProgressiveMeshSimplifier`].
///
/// Every field has a default, so partial TOML/JSON tables deserialize.
///
/// [`ProgressiveMeshSimplifier`]: crate::ProgressiveMeshSimplifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifyOptions {
    /// Penalize collapses across diverging texture coordinates
    pub preserve_texture: bool,
    /// Multiplier on the edge-length times curvature term
    pub length_weight: f64,
    /// Minimum curvature assigned to edges that move the mesh boundary
    pub boundary_curvature: f64,
    /// Multiplier on the texture discontinuity penalty
    pub texture_weight: f64,
    /// UV distance above which two vertices count as discontinuous.
    ///
    /// Any edge whose endpoints differ in UV by more than this pays the
    /// texture penalty, not only real seams. With the small default, a mesh
    /// with smoothly varying UVs has nearly every edge penalized, so the
    /// penalty adds a roughly uniform `texture_weight * (length + uv step)`
    /// and ordering leans further toward short edges. Raise it above the
    /// per-edge UV step of the mesh to penalize only seams and atlas jumps.
    pub uv_tolerance: f32,
}

impl Default for SimplifyOptions {
    fn default() -> Self {
        Self {
            preserve_texture: true,
            length_weight: 1.0,
            boundary_curvature: 1.0,
            texture_weight: 1.0,
            uv_tolerance: 1e-4,
        }
    }
}

impl SimplifyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preserve_texture(mut self, preserve: bool) -> Self {
        self.preserve_texture = preserve;
        self
    }

    pub fn with_length_weight(mut self, weight: f64) -> Self {
        self.length_weight = weight;
        self
    }

    pub fn with_boundary_curvature(mut self, curvature: f64) -> Self {
        self.boundary_curvature = curvature;
        self
    }

    pub fn with_texture_weight(mut self, weight: f64) -> Self {
        self.texture_weight = weight;
        self
    }

    pub fn with_uv_tolerance(mut self, tolerance: f32) -> Self {
        self.uv_tolerance = tolerance;
        self
    }

    /// Reject negative or non-finite weights
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("length_weight", self.length_weight),
            ("boundary_curvature", self.boundary_curvature),
            ("texture_weight", self.texture_weight),
            ("uv_tolerance", self.uv_tolerance as f64),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidParameter(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
