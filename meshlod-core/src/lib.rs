//! Core data structures and traits for meshlod
//!
//! This crate provides the fundamental types shared by the simplification
//! and scene crates: triangle meshes with optional normals and texture
//! coordinates, the flat indexed-buffer interchange format, transforms,
//! bounds, and the common error type.

pub mod point;
pub mod mesh;
pub mod traits;
pub mod transform;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use traits::*;
pub use transform::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix4};
