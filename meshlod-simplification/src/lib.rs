//! Mesh simplification and decimation
//!
//! This crate reduces triangle counts while keeping the surface close to the
//! original:
//! - Progressive (Melax-style) greedy edge collapse with curvature, edge
//!   length and texture-seam costs
//! - Cooperative cancellation between collapse steps
//! - Per-run reports with target versus achieved face counts

pub mod cancel;
pub mod options;
pub mod progressive;

pub use cancel::*;
pub use options::*;
pub use progressive::*;

use meshlod_core::{Result, TriangleMesh};

/// Simplify a mesh by reducing the number of faces/vertices
pub trait MeshSimplifier {
    /// Simplify `mesh`, keeping `ratio` of its triangles (1.0 = keep all,
    /// 0.0 = reduce as far as topology allows). Out-of-range ratios are clamped.
    fn simplify(&self, mesh: &TriangleMesh, ratio: f32) -> Result<TriangleMesh>;
}
