//! Point and vector types shared by every meshlod crate

use nalgebra::{Point3, Vector3};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// Texture coordinates (UV mapping)
pub type UV = [f32; 2];

/// Euclidean distance between two texture coordinates
pub fn uv_distance(a: &UV, b: &UV) -> f32 {
    let du = a[0] - b[0];
    let dv = a[1] - b[1];
    (du * du + dv * dv).sqrt()
}

/// Returns true if every component of the point is finite
pub fn is_finite_point(p: &Point3f) -> bool {
    p.iter().all(|c| c.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uv_distance() {
        assert_relative_eq!(uv_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(uv_distance(&[0.25, 0.5], &[0.25, 0.5]), 0.0);
    }

    #[test]
    fn test_is_finite_point() {
        assert!(is_finite_point(&Point3f::new(1.0, -2.0, 3.0)));
        assert!(!is_finite_point(&Point3f::new(f32::NAN, 0.0, 0.0)));
        assert!(!is_finite_point(&Point3f::new(0.0, f32::INFINITY, 0.0)));
    }
}
