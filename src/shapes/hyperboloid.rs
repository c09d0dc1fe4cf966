//! Hyperboloid mirror segment
//! `x^2 / b^2 + y^2 / b^2 - (z - c)^2 / a^2 = -1`
//! in its local shell frame, the second reflection of a Wolter type I
//! pair. `c` is the half distance between the two hyperbola foci.

// xrt
use crate::core::frame::Frame;
use crate::core::geometry::{
    bnd3_union_pnt3, Bounds3f, Normal3f, Point3f, Ray, Vector3f,
};
use crate::core::xrt::{quadratic, Float, BOUNDS_PAD};

const QUADRIC_EPSILON: Float = 1.0e-18;

#[derive(Debug, Copy, Clone)]
pub struct Hyperboloid {
    pub a: Float,
    pub b: Float,
    pub c: Float,
    /// on-axis grazing angle the segment was designed for
    pub theta: Float,
    /// axial extent in local coordinates
    pub z_min: Float,
    pub z_max: Float,
    /// radii at `z_min` and `z_max`
    pub r_min: Float,
    pub r_max: Float,
    pub frame: Frame,
}

impl Hyperboloid {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        a: Float,
        b: Float,
        c: Float,
        theta: Float,
        z_min: Float,
        z_max: Float,
        r_min: Float,
        r_max: Float,
        frame: Frame,
    ) -> Self {
        Hyperboloid {
            a,
            b,
            c,
            theta,
            z_min,
            z_max,
            r_min,
            r_max,
            frame,
        }
    }
    pub fn world_bound(&self) -> Bounds3f {
        let r: Float = self.r_min.max(self.r_max) + BOUNDS_PAD;
        let z_lo: Float = self.z_min - BOUNDS_PAD;
        let z_hi: Float = self.z_max + BOUNDS_PAD;
        let mut bounds = Bounds3f::default();
        for &z in &[z_lo, z_hi] {
            for &x in &[-r, r] {
                for &y in &[-r, r] {
                    bounds = bnd3_union_pnt3(&bounds, &self.frame.point_to_world(&Point3f::new(x, y, z)));
                }
            }
        }
        bounds
    }
    pub fn intersect(&self, ray: &mut Ray) -> bool {
        let pl: Point3f = self.frame.point_to_local(&ray.o);
        let vl: Vector3f = self.frame.vector_to_local(&ray.d);

        let a2: Float = self.a * self.a;
        let b2: Float = self.b * self.b;
        let qa: Float = (vl.x * vl.x + vl.y * vl.y) / b2 - (vl.z * vl.z) / a2;
        let qb: Float =
            2.0 * ((pl.x * vl.x + pl.y * vl.y) / b2 - ((pl.z - self.c) * vl.z) / a2);
        let qc: Float = (pl.x * pl.x + pl.y * pl.y) / b2
            - ((pl.z - self.c) * (pl.z - self.c)) / a2
            + 1.0;

        let accept = |t: Float, ray: &Ray| -> bool {
            if !(t > ray.t_near && t < ray.t_far) {
                return false;
            }
            let z_hit: Float = pl.z + vl.z * t;
            z_hit >= self.z_min && z_hit <= self.z_max
        };

        let t_hit: Float;
        if qa.abs() < QUADRIC_EPSILON {
            if qb.abs() < QUADRIC_EPSILON {
                return false;
            }
            let t: Float = -qc / qb;
            if !accept(t, ray) {
                return false;
            }
            t_hit = t;
        } else {
            let mut t0: Float = 0.0;
            let mut t1: Float = 0.0;
            if !quadratic(qa, qb, qc, &mut t0, &mut t1) {
                return false;
            }
            if accept(t0, ray) {
                t_hit = t0;
            } else if accept(t1, ray) {
                t_hit = t1;
            } else {
                return false;
            }
        }
        ray.t_far = t_hit;

        let hx: Float = pl.x + vl.x * t_hit;
        let hy: Float = pl.y + vl.y * t_hit;
        let hz: Float = pl.z + vl.z * t_hit;
        // gradient of the implicit surface, inward after the flip
        let nl = Normal3f::new(hx / b2, hy / b2, -(hz - self.c) / a2).normalize();
        ray.n = -self.frame.normal_to_world(&nl);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_chord_hits_upper_sheet() {
        // a = b = 1, c = 0: x^2 + y^2 - z^2 = -1, sheets at |z| >= 1
        let hyp = Hyperboloid::new(
            1.0,
            1.0,
            0.0,
            0.0,
            0.0,
            10.0,
            0.0,
            10.0,
            Frame::from_tilt(0.0, 0.0, Vector3f::default()),
        );
        let mut ray = Ray::new(
            Point3f::new(1.0, 0.0, 5.0),
            Vector3f::new(0.0, 0.0, -1.0),
            1000.0,
        );
        assert!(hyp.intersect(&mut ray));
        // x = 1 crosses the upper sheet at z = sqrt(2)
        assert!((ray.t_far - (5.0 - 2.0_f64.sqrt())).abs() < 1.0e-9);
    }

    #[test]
    fn axial_window_rejects_lower_sheet() {
        let hyp = Hyperboloid::new(
            1.0,
            1.0,
            0.0,
            0.0,
            0.0,
            10.0,
            0.0,
            10.0,
            Frame::from_tilt(0.0, 0.0, Vector3f::default()),
        );
        let mut ray = Ray::new(
            Point3f::new(1.0, 0.0, -5.0),
            Vector3f::new(0.0, 0.0, -1.0),
            1000.0,
        );
        // both crossings lie below z_min
        assert!(!hyp.intersect(&mut ray));
    }

    #[test]
    fn grazing_normal_faces_the_ray() {
        let hyp = Hyperboloid::new(
            1.0,
            1.0,
            0.0,
            0.0,
            0.0,
            10.0,
            0.0,
            10.0,
            Frame::from_tilt(0.0, 0.0, Vector3f::default()),
        );
        let mut ray = Ray::new(
            Point3f::new(1.0, 0.0, 5.0),
            Vector3f::new(0.0, 0.0, -1.0),
            1000.0,
        );
        assert!(hyp.intersect(&mut ray));
        let from_axis = crate::core::geometry::nrm_angle_vec3(&ray.n, &-ray.d);
        assert!(from_axis < std::f64::consts::FRAC_PI_2);
    }
}
