//! 3D transformation utilities

use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// An affine transformation applied to scene nodes and their geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3D {
    pub matrix: Matrix4<f32>,
}

impl Transform3D {
    /// Create an identity transformation
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Create a translation transformation
    pub fn translation(translation: Vector3<f32>) -> Self {
        Self {
            matrix: Matrix4::new_translation(&translation),
        }
    }

    /// Apply the transformation to a point
    pub fn transform_point(&self, point: &Point3<f32>) -> Point3<f32> {
        let homogeneous = self.matrix * point.to_homogeneous();
        Point3::from_homogeneous(homogeneous).unwrap_or(*point)
    }

    /// Compose this transformation with another (`other` is applied first)
    pub fn compose(self, other: Self) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Return a copy of this transformation moved by `offset` in parent space
    pub fn translated(self, offset: Vector3<f32>) -> Self {
        Self::translation(offset).compose(self)
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::identity()
    }
}
