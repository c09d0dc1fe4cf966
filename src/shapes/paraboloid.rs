//! Paraboloid mirror segment `x^2 + y^2 = p^2 + 2 p z` in its local
//! shell frame, the entrance optic of a Wolter type I pair.

// xrt
use crate::core::frame::Frame;
use crate::core::geometry::{
    bnd3_union_pnt3, Bounds3f, Normal3f, Point3f, Ray, Vector3f,
};
use crate::core::xrt::{quadratic, Float, BOUNDS_PAD};

const QUADRIC_EPSILON: Float = 1.0e-12;

#[derive(Debug, Copy, Clone)]
pub struct Paraboloid {
    /// semi-latus rectum of the surface of revolution
    pub p: Float,
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

impl Paraboloid {
    pub fn new(
        p: Float,
        theta: Float,
        z_min: Float,
        z_max: Float,
        r_min: Float,
        r_max: Float,
        frame: Frame,
    ) -> Self {
        Paraboloid {
            p,
            theta,
            z_min,
            z_max,
            r_min,
            r_max,
            frame,
        }
    }
    pub fn world_bound(&self) -> Bounds3f {
        let r: Float = self.r_max + BOUNDS_PAD;
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

        let a: Float = vl.x * vl.x + vl.y * vl.y;
        let b: Float = 2.0 * (pl.x * vl.x + pl.y * vl.y - self.p * vl.z);
        let c: Float =
            pl.x * pl.x + pl.y * pl.y - self.p * self.p - 2.0 * self.p * pl.z;

        let mut t: Float = Float::INFINITY;
        if a.abs() < QUADRIC_EPSILON {
            // ray runs along the local axis; the quadratic degenerates
            if vl.z.abs() >= QUADRIC_EPSILON {
                t = (-self.p * (self.p + 2.0 * pl.z) + pl.x * pl.x + pl.y * pl.y)
                    / (2.0 * self.p * vl.z);
            }
        } else {
            let mut t0: Float = 0.0;
            let mut t1: Float = 0.0;
            if quadratic(a, b, c, &mut t0, &mut t1) {
                // smallest root, unless the surface is behind the origin
                t = if t0 >= 0.0 { t0 } else { t1 };
            }
        }
        if !t.is_finite() {
            return false;
        }
        let z_hit: Float = pl.z + t * vl.z;
        if z_hit < self.z_min || z_hit > self.z_max {
            return false;
        }
        if t < ray.t_near || t > ray.t_far {
            return false;
        }
        ray.t_far = t;

        let hx: Float = pl.x + t * vl.x;
        let hy: Float = pl.y + t * vl.y;
        // gradient of the implicit surface, inward after the flip
        let nl = Normal3f::new(hx / self.p, hy / self.p, -1.0).normalize();
        ray.n = -self.frame.normal_to_world(&nl);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::nrm_angle_vec3;

    fn unit_paraboloid() -> Paraboloid {
        // p = 1: radius 1 at z = 0
        Paraboloid::new(1.0, 0.0, -10.0, 10.0, 0.0, 5.0, Frame::from_tilt(0.0, 0.0, Vector3f::default()))
    }

    #[test]
    fn axial_ray_takes_degenerate_branch() {
        let par = unit_paraboloid();
        let mut ray = Ray::new(
            Point3f::new(1.0, 0.0, 5.0),
            Vector3f::new(0.0, 0.0, -1.0),
            1000.0,
        );
        assert!(par.intersect(&mut ray));
        // x^2 = p^2 + 2 p z with x = 1 gives z = 0, five units below
        assert!((ray.t_far - 5.0).abs() < 1.0e-9);
        let hit = ray.position(ray.t_far);
        assert!((hit.z).abs() < 1.0e-9);
        // the flipped gradient faces the incoming ray
        assert!(nrm_angle_vec3(&ray.n, &-ray.d) < std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn oblique_ray_picks_smallest_valid_root() {
        let par = unit_paraboloid();
        let mut ray = Ray::new(
            Point3f::new(-5.0, 0.0, 0.0),
            Vector3f::new(1.0, 0.0, 0.0),
            1000.0,
        );
        assert!(par.intersect(&mut ray));
        // symmetric chord at z = 0: | x | = 1, nearest crossing first
        assert!((ray.t_far - 4.0).abs() < 1.0e-9);
    }

    #[test]
    fn axial_range_rejects() {
        let par = Paraboloid::new(1.0, 0.0, 2.0, 10.0, 0.0, 5.0, Frame::from_tilt(0.0, 0.0, Vector3f::default()));
        let mut ray = Ray::new(
            Point3f::new(1.0, 0.0, 5.0),
            Vector3f::new(0.0, 0.0, -1.0),
            1000.0,
        );
        // the only crossing sits at z = 0, below z_min
        assert!(!par.intersect(&mut ray));
    }

    #[test]
    fn translated_shell_bounds_follow_the_origin() {
        let frame = Frame::from_tilt(0.0, 0.0, Vector3f::new(0.0, 0.0, -100.0));
        let par = Paraboloid::new(1.0, 0.0, 0.0, 10.0, 1.0, 4.6, frame);
        let b = par.world_bound();
        assert!(b.p_max.z <= 10.0 - 100.0 + 1.0);
        assert!(b.p_min.z >= -100.0 - 1.0);
    }
}
