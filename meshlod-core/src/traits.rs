//! Core traits for meshlod

use crate::{mesh::TriangleMesh, point::*};

/// Trait for drawable/renderable objects
pub trait Drawable {
    /// Get the bounding box of the object
    fn bounding_box(&self) -> (Point3f, Point3f);

    /// Get the center point of the object
    fn center(&self) -> Point3f {
        let (min, max) = self.bounding_box();
        nalgebra::center(&min, &max)
    }

    /// Length of the longest side of the bounding box
    fn max_extent(&self) -> f32 {
        let (min, max) = self.bounding_box();
        (max - min).max()
    }
}

/// Bounds of a set of points; the origin for an empty set
pub fn bounds_of<'a, I>(points: I) -> (Point3f, Point3f)
where
    I: IntoIterator<Item = &'a Point3f>,
{
    let mut iter = points.into_iter();
    let first = match iter.next() {
        Some(p) => *p,
        None => return (Point3f::origin(), Point3f::origin()),
    };

    iter.fold((first, first), |(min, max), p| {
        (min.inf(p), max.sup(p))
    })
}

impl Drawable for TriangleMesh {
    fn bounding_box(&self) -> (Point3f, Point3f) {
        bounds_of(&self.vertices)
    }
}
