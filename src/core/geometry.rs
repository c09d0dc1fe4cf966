//! Points, vectors, normals, bounding boxes, and the mutable **Ray**
//! that is threaded through the whole tracer. A ray carries its own
//! valid parameter interval, the geometric normal of its most recent
//! hit, and an append-only bounce history for downstream analysis.

// std
use std::ops;
// xrt
use crate::core::xrt::Float;
use crate::core::xrt::RAY_EPSILON;

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Vector3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Vector3f {
    pub fn new(x: Float, y: Float, z: Float) -> Self {
        Vector3f { x, y, z }
    }
    pub fn has_nans(&self) -> bool {
        self.x.is_nan() || self.y.is_nan() || self.z.is_nan()
    }
    pub fn length_squared(&self) -> Float {
        self.x * self.x + self.y * self.y + self.z * self.z
    }
    pub fn length(&self) -> Float {
        self.length_squared().sqrt()
    }
    /// Compute a new vector pointing in the same direction but with unit
    /// length.
    pub fn normalize(&self) -> Vector3f {
        *self / self.length()
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Point3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Point3f {
    pub fn new(x: Float, y: Float, z: Float) -> Self {
        Point3f { x, y, z }
    }
}

/// A surface normal; superficially a vector, but kept as its own type
/// so that hit records and scattering code cannot silently mix the two.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Normal3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Normal3f {
    pub fn new(x: Float, y: Float, z: Float) -> Self {
        Normal3f { x, y, z }
    }
    pub fn length_squared(&self) -> Float {
        self.x * self.x + self.y * self.y + self.z * self.z
    }
    pub fn length(&self) -> Float {
        self.length_squared().sqrt()
    }
    pub fn normalize(&self) -> Normal3f {
        *self / self.length()
    }
}

impl From<Vector3f> for Normal3f {
    fn from(v: Vector3f) -> Self {
        Normal3f {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<Normal3f> for Vector3f {
    fn from(n: Normal3f) -> Self {
        Vector3f {
            x: n.x,
            y: n.y,
            z: n.z,
        }
    }
}

impl_op_ex!(+|a: &Vector3f, b: &Vector3f| -> Vector3f {
    Vector3f {
        x: a.x + b.x,
        y: a.y + b.y,
        z: a.z + b.z,
    }
});

impl_op_ex!(-|a: &Vector3f, b: &Vector3f| -> Vector3f {
    Vector3f {
        x: a.x - b.x,
        y: a.y - b.y,
        z: a.z - b.z,
    }
});

impl_op_ex!(-|a: &Vector3f| -> Vector3f {
    Vector3f {
        x: -a.x,
        y: -a.y,
        z: -a.z,
    }
});

impl_op_ex_commutative!(*|a: &Vector3f, s: Float| -> Vector3f {
    Vector3f {
        x: a.x * s,
        y: a.y * s,
        z: a.z * s,
    }
});

impl_op_ex!(/|a: &Vector3f, s: Float| -> Vector3f {
    Vector3f {
        x: a.x / s,
        y: a.y / s,
        z: a.z / s,
    }
});

impl_op_ex!(+|a: &Point3f, b: &Vector3f| -> Point3f {
    Point3f {
        x: a.x + b.x,
        y: a.y + b.y,
        z: a.z + b.z,
    }
});

impl_op_ex!(-|a: &Point3f, b: &Vector3f| -> Point3f {
    Point3f {
        x: a.x - b.x,
        y: a.y - b.y,
        z: a.z - b.z,
    }
});

impl_op_ex!(-|a: &Point3f, b: &Point3f| -> Vector3f {
    Vector3f {
        x: a.x - b.x,
        y: a.y - b.y,
        z: a.z - b.z,
    }
});

impl_op_ex!(+|a: &Point3f, b: &Point3f| -> Point3f {
    Point3f {
        x: a.x + b.x,
        y: a.y + b.y,
        z: a.z + b.z,
    }
});

impl_op_ex_commutative!(*|a: &Point3f, s: Float| -> Point3f {
    Point3f {
        x: a.x * s,
        y: a.y * s,
        z: a.z * s,
    }
});

impl_op_ex!(+|a: &Normal3f, b: &Normal3f| -> Normal3f {
    Normal3f {
        x: a.x + b.x,
        y: a.y + b.y,
        z: a.z + b.z,
    }
});

impl_op_ex!(-|a: &Normal3f| -> Normal3f {
    Normal3f {
        x: -a.x,
        y: -a.y,
        z: -a.z,
    }
});

impl_op_ex_commutative!(*|a: &Normal3f, s: Float| -> Normal3f {
    Normal3f {
        x: a.x * s,
        y: a.y * s,
        z: a.z * s,
    }
});

impl_op_ex!(/|a: &Normal3f, s: Float| -> Normal3f {
    Normal3f {
        x: a.x / s,
        y: a.y / s,
        z: a.z / s,
    }
});

impl ops::Index<u8> for Vector3f {
    type Output = Float;
    fn index(&self, index: u8) -> &Float {
        match index {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }
}

impl ops::Index<u8> for Point3f {
    type Output = Float;
    fn index(&self, index: u8) -> &Float {
        match index {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }
}

/// Product of the Euclidean magnitudes of the two vectors, multiplied
/// by the cosine of the angle between them.
pub fn vec3_dot_vec3(v1: &Vector3f, v2: &Vector3f) -> Float {
    v1.x * v2.x + v1.y * v2.y + v1.z * v2.z
}

pub fn vec3_dot_nrm(v: &Vector3f, n: &Normal3f) -> Float {
    v.x * n.x + v.y * n.y + v.z * n.z
}

/// Given two vectors in 3D, the cross product is a vector that is
/// perpendicular to both of them.
pub fn vec3_cross_vec3(v1: &Vector3f, v2: &Vector3f) -> Vector3f {
    Vector3f {
        x: v1.y * v2.z - v1.z * v2.y,
        y: v1.z * v2.x - v1.x * v2.z,
        z: v1.x * v2.y - v1.y * v2.x,
    }
}

/// Interior angle between two vectors, in radians.
pub fn vec3_angle_vec3(v1: &Vector3f, v2: &Vector3f) -> Float {
    let cos_theta: Float = vec3_dot_vec3(v1, v2) / (v1.length() * v2.length());
    cos_theta.clamp(-1.0, 1.0).acos()
}

/// Angle between a geometric normal and a direction, in radians.
pub fn nrm_angle_vec3(n: &Normal3f, v: &Vector3f) -> Float {
    let cos_theta: Float = vec3_dot_nrm(v, n) / (n.length() * v.length());
    cos_theta.clamp(-1.0, 1.0).acos()
}

/// Specular reflection of *v* about the normal *n*.
pub fn vec3_reflect(v: &Vector3f, n: &Vector3f) -> Vector3f {
    v - *n * (2.0 as Float * vec3_dot_vec3(v, n))
}

#[derive(Debug, Copy, Clone)]
pub struct Bounds3f {
    pub p_min: Point3f,
    pub p_max: Point3f,
}

impl Default for Bounds3f {
    fn default() -> Bounds3f {
        Bounds3f {
            p_min: Point3f {
                x: Float::MAX,
                y: Float::MAX,
                z: Float::MAX,
            },
            p_max: Point3f {
                x: Float::MIN,
                y: Float::MIN,
                z: Float::MIN,
            },
        }
    }
}

impl Bounds3f {
    pub fn new(p1: Point3f, p2: Point3f) -> Self {
        Bounds3f {
            p_min: Point3f {
                x: p1.x.min(p2.x),
                y: p1.y.min(p2.y),
                z: p1.z.min(p2.z),
            },
            p_max: Point3f {
                x: p1.x.max(p2.x),
                y: p1.y.max(p2.y),
                z: p1.z.max(p2.z),
            },
        }
    }
    pub fn diagonal(&self) -> Vector3f {
        self.p_max - self.p_min
    }
    pub fn centroid(&self) -> Point3f {
        self.p_min * 0.5 + self.p_max * 0.5
    }
    pub fn surface_area(&self) -> Float {
        let d: Vector3f = self.diagonal();
        2.0 as Float * (d.x * d.y + d.x * d.z + d.y * d.z)
    }
    /// Position of a point relative to the box corners, (0,0,0) at
    /// `p_min` and (1,1,1) at `p_max`.
    pub fn offset(&self, p: &Point3f) -> Vector3f {
        let mut o: Vector3f = p - self.p_min;
        if self.p_max.x > self.p_min.x {
            o.x /= self.p_max.x - self.p_min.x;
        }
        if self.p_max.y > self.p_min.y {
            o.y /= self.p_max.y - self.p_min.y;
        }
        if self.p_max.z > self.p_min.z {
            o.z /= self.p_max.z - self.p_min.z;
        }
        o
    }
    pub fn maximum_extent(&self) -> u8 {
        let d: Vector3f = self.diagonal();
        if d.x > d.y && d.x > d.z {
            0_u8
        } else if d.y > d.z {
            1_u8
        } else {
            2_u8
        }
    }
    /// Slab test against a ray segment, using the precomputed inverse
    /// direction and direction signs of the BVH traversal.
    pub fn intersect_p(&self, ray: &Ray, inv_dir: &Vector3f, dir_is_neg: [u8; 3]) -> bool {
        // check for ray intersection against x and y slabs
        let mut t_min: Float = (self[dir_is_neg[0]].x - ray.o.x) * inv_dir.x;
        let mut t_max: Float = (self[1 - dir_is_neg[0]].x - ray.o.x) * inv_dir.x;
        let ty_min: Float = (self[dir_is_neg[1]].y - ray.o.y) * inv_dir.y;
        let ty_max: Float = (self[1 - dir_is_neg[1]].y - ray.o.y) * inv_dir.y;
        if t_min > ty_max || ty_min > t_max {
            return false;
        }
        if ty_min > t_min {
            t_min = ty_min;
        }
        if ty_max < t_max {
            t_max = ty_max;
        }
        // check for ray intersection against z slab
        let tz_min: Float = (self[dir_is_neg[2]].z - ray.o.z) * inv_dir.z;
        let tz_max: Float = (self[1 - dir_is_neg[2]].z - ray.o.z) * inv_dir.z;
        if t_min > tz_max || tz_min > t_max {
            return false;
        }
        if tz_min > t_min {
            t_min = tz_min;
        }
        if tz_max < t_max {
            t_max = tz_max;
        }
        t_min < ray.t_far && t_max > 0.0
    }
}

impl ops::Index<u8> for Bounds3f {
    type Output = Point3f;
    fn index(&self, index: u8) -> &Point3f {
        match index {
            0 => &self.p_min,
            _ => &self.p_max,
        }
    }
}

/// Construct a new box that bounds the space encompassed by two other
/// bounding boxes.
pub fn bnd3_union_bnd3(b1: &Bounds3f, b2: &Bounds3f) -> Bounds3f {
    Bounds3f {
        p_min: Point3f {
            x: b1.p_min.x.min(b2.p_min.x),
            y: b1.p_min.y.min(b2.p_min.y),
            z: b1.p_min.z.min(b2.p_min.z),
        },
        p_max: Point3f {
            x: b1.p_max.x.max(b2.p_max.x),
            y: b1.p_max.y.max(b2.p_max.y),
            z: b1.p_max.z.max(b2.p_max.z),
        },
    }
}

pub fn bnd3_union_pnt3(b: &Bounds3f, p: &Point3f) -> Bounds3f {
    Bounds3f {
        p_min: Point3f {
            x: b.p_min.x.min(p.x),
            y: b.p_min.y.min(p.y),
            z: b.p_min.z.min(p.z),
        },
        p_max: Point3f {
            x: b.p_max.x.max(p.x),
            y: b.p_max.y.max(p.y),
            z: b.p_max.z.max(p.z),
        },
    }
}

/// One entry of a ray's bounce history: which surface was interacted
/// with, and the ray's origin and direction at that moment.
#[derive(Debug, Copy, Clone)]
pub struct Bounce {
    pub id: u32,
    pub o: Point3f,
    pub d: Vector3f,
}

/// A photon in flight. Mutated throughout traversal; owned exclusively
/// by the call that created it.
#[derive(Debug, Default, Clone)]
pub struct Ray {
    /// origin
    pub o: Point3f,
    /// direction (unit length after construction)
    pub d: Vector3f,
    /// photon energy in eV; carried through to the result sink
    pub energy: Float,
    /// valid parameter interval for the next intersection query
    pub t_near: Float,
    pub t_far: Float,
    /// surface id of the most recent hit, if any
    pub hit_id: Option<u32>,
    /// geometric normal at the most recent hit
    pub n: Normal3f,
    /// append-only record of every surface interaction
    pub history: Vec<Bounce>,
}

impl Ray {
    pub fn new(o: Point3f, d: Vector3f, energy: Float) -> Self {
        let d = if d != Vector3f::default() {
            d.normalize()
        } else {
            d
        };
        Ray {
            o,
            d,
            energy,
            t_near: RAY_EPSILON,
            t_far: Float::INFINITY,
            hit_id: None,
            n: Normal3f::default(),
            history: Vec::new(),
        }
    }
    pub fn position(&self, t: Float) -> Point3f {
        self.o + self.d * t
    }
    /// Re-arm the ray for its next nearest-hit query.
    pub fn reset_interval(&mut self, t_near: Float) {
        self.t_near = t_near;
        self.t_far = Float::INFINITY;
        self.hit_id = None;
    }
    /// Append the current origin/direction to the bounce history.
    pub fn push_history(&mut self, id: u32) {
        self.history.push(Bounce {
            id,
            o: self.o,
            d: self.d,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slab_hit(ray: &Ray, b: &Bounds3f) -> bool {
        let inv_dir = Vector3f::new(1.0 / ray.d.x, 1.0 / ray.d.y, 1.0 / ray.d.z);
        let dir_is_neg: [u8; 3] = [
            (inv_dir.x < 0.0) as u8,
            (inv_dir.y < 0.0) as u8,
            (inv_dir.z < 0.0) as u8,
        ];
        b.intersect_p(ray, &inv_dir, dir_is_neg)
    }

    #[test]
    fn ray_direction_is_normalized() {
        let r = Ray::new(
            Point3f::new(0.0, 0.0, 10.0),
            Vector3f::new(1.0, -8.75, 2.25),
            1000.0,
        );
        assert!((r.d.length() - 1.0).abs() < 1.0e-12);
        assert!(r.t_near > 0.0);
    }

    #[test]
    fn zero_direction_is_left_alone() {
        let r = Ray::new(Point3f::default(), Vector3f::default(), 1000.0);
        assert_eq!(r.d, Vector3f::default());
    }

    #[test]
    fn reflect_law() {
        let n = Vector3f::new(0.0, 0.0, 1.0);
        let d = Vector3f::new(1.0, 0.0, -1.0).normalize();
        let r = vec3_reflect(&d, &n);
        assert!((r.length() - 1.0).abs() < 1.0e-12);
        assert!((r.x - d.x).abs() < 1.0e-12);
        assert!((r.z + d.z).abs() < 1.0e-12);
        // angle(n, d') == angle(n, -d)
        let a1 = vec3_angle_vec3(&n, &r);
        let a2 = vec3_angle_vec3(&n, &-d);
        assert!((a1 - a2).abs() < 1.0e-12);
    }

    #[test]
    fn bounds_slab_test() {
        let b = Bounds3f::new(Point3f::new(-1.0, -1.0, -1.0), Point3f::new(1.0, 1.0, 1.0));
        let hit = Ray::new(
            Point3f::new(0.0, 0.0, 5.0),
            Vector3f::new(0.0, 0.0, -1.0),
            1.0,
        );
        assert!(slab_hit(&hit, &b));
        let miss = Ray::new(
            Point3f::new(5.0, 0.0, 5.0),
            Vector3f::new(0.0, 0.0, -1.0),
            1.0,
        );
        assert!(!slab_hit(&miss, &b));
    }
}
