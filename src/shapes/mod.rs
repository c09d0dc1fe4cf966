//! The geometric primitives of the tracer. `Shape` is a closed enum:
//! the traversal controllers know every primitive kind, and enum
//! dispatch keeps the per-ray intersection calls free of virtual
//! lookups.

pub mod hyperboloid;
pub mod paraboloid;
pub mod plane;
pub mod triangle;

// xrt
use crate::core::geometry::{Bounds3f, Ray};
use crate::shapes::hyperboloid::Hyperboloid;
use crate::shapes::paraboloid::Paraboloid;
use crate::shapes::plane::Plane;
use crate::shapes::triangle::TriangleMesh;

#[derive(Debug)]
pub enum Shape {
    Paraboloid(Paraboloid),
    Hyperboloid(Hyperboloid),
    Plane(Plane),
    TriangleMesh(TriangleMesh),
}

impl Shape {
    pub fn world_bound(&self) -> Bounds3f {
        match self {
            Shape::Paraboloid(shape) => shape.world_bound(),
            Shape::Hyperboloid(shape) => shape.world_bound(),
            Shape::Plane(shape) => shape.world_bound(),
            Shape::TriangleMesh(shape) => shape.world_bound(),
        }
    }
    /// Commit the nearest hit in `[t_near, t_far]` into the ray, if
    /// any. Returns true when the ray was updated.
    pub fn intersect(&self, ray: &mut Ray) -> bool {
        match self {
            Shape::Paraboloid(shape) => shape.intersect(ray),
            Shape::Hyperboloid(shape) => shape.intersect(ray),
            Shape::Plane(shape) => shape.intersect(ray),
            Shape::TriangleMesh(shape) => shape.intersect(ray),
        }
    }
}
