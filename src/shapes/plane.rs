//! Infinite plane `a x + b y + c z + d = 0` with a finite detector
//! extent that only enters through the world bound. The intersection
//! itself is unbounded; the acceleration structure culls queries that
//! leave the detector slab.

// xrt
use crate::core::geometry::{Bounds3f, Normal3f, Point3f, Ray, Vector3f};
use crate::core::xrt::Float;

const PLANE_EPSILON: Float = 1.0e-12;
/// Axial thickness of the detector slab used for the world bound.
const SLAB_DEPTH: Float = 10.0;

#[derive(Debug, Copy, Clone)]
pub struct Plane {
    pub a: Float,
    pub b: Float,
    pub c: Float,
    pub d: Float,
    /// detector half-extents are `extent_x / 2` and `extent_y / 2`
    pub extent_x: Float,
    pub extent_y: Float,
}

impl Plane {
    pub fn new(a: Float, b: Float, c: Float, d: Float, extent_x: Float, extent_y: Float) -> Self {
        Plane {
            a,
            b,
            c,
            d,
            extent_x,
            extent_y,
        }
    }
    /// The detector slab for an axis-aligned plane `z = -d`.
    pub fn world_bound(&self) -> Bounds3f {
        Bounds3f::new(
            Point3f::new(
                -self.extent_x / 2.0,
                -self.extent_y / 2.0,
                -self.d - SLAB_DEPTH,
            ),
            Point3f::new(self.extent_x / 2.0, self.extent_y / 2.0, -self.d),
        )
    }
    pub fn intersect(&self, ray: &mut Ray) -> bool {
        let a_term: Float = self.a * ray.o.x + self.b * ray.o.y + self.c * ray.o.z + self.d;
        let b_term: Float = self.a * ray.d.x + self.b * ray.d.y + self.c * ray.d.z;
        if b_term.abs() < PLANE_EPSILON {
            return false;
        }
        // a_term + t * b_term == 0
        let t: Float = -a_term / b_term;
        if t < ray.t_near || t > ray.t_far {
            return false;
        }
        ray.t_far = t;
        let mut n = Vector3f::new(self.a, self.b, self.c);
        if n.length() > 0.0 {
            n = n.normalize();
        }
        ray.n = Normal3f::from(-n);
        true
    }
}
