//! Square channel sub-tracer for micro-pore (lobster-eye) plates.
//!
//! When a ray hits the optical plate the traversal hands it over to a
//! representative channel: the ray is rotated into a local frame whose
//! +z axis is the radial plate normal at the hit point, re-enters the
//! channel at a random lateral offset, bounces between the four side
//! walls, and leaves through the floor back into world space on the far
//! side of the plate. Channel walls are perfectly smooth.

// xrt
use crate::core::frame::Matrix3x3;
use crate::core::geometry::{
    nrm_angle_vec3, vec3_dot_vec3, vec3_reflect, Normal3f, Point3f, Ray, Vector3f,
};
use crate::core::rng::Rng;
use crate::core::xrt::Float;
use crate::core::xrt::RAY_EPSILON;

/// History ids of channel-internal bounces are offset past the scene
/// geometry ids so a trace record distinguishes the two.
pub const CHANNEL_ID_OFFSET: u32 = 10;
/// Wall numbers 1..=4 are the side walls, 5 is the floor.
const FLOOR: u32 = 5;
/// Interval start handed back to the outer traversal on exit; keeps
/// the ray from immediately re-hitting the plate it just left.
const EXIT_T_NEAR: Float = 20.0;
const CHANNEL_DEPTH: u32 = 10;
const PLANE_EPSILON: Float = 1.0e-12;

#[derive(Debug, Copy, Clone)]
pub struct Pore {
    pub width: Float,
    pub length: Float,
}

impl Pore {
    pub fn new(width: Float, length: Float) -> Self {
        Pore { width, length }
    }
    /// Nearest wall or floor hit in channel-local coordinates. Writes
    /// the hit parameter into `ray.t_far` and the inward wall normal
    /// into `ray.n`.
    fn find_intersection(&self, ray: &mut Ray) -> Option<u32> {
        // plane n.p + d = 0 with its inward-facing normal
        let walls: [(Vector3f, Float, Normal3f); 5] = [
            (
                Vector3f::new(0.0, 1.0, 0.0),
                0.0,
                Normal3f::new(0.0, 1.0, 0.0),
            ),
            (
                Vector3f::new(1.0, 0.0, 0.0),
                -self.width,
                Normal3f::new(-1.0, 0.0, 0.0),
            ),
            (
                Vector3f::new(0.0, 1.0, 0.0),
                -self.width,
                Normal3f::new(0.0, -1.0, 0.0),
            ),
            (
                Vector3f::new(1.0, 0.0, 0.0),
                0.0,
                Normal3f::new(1.0, 0.0, 0.0),
            ),
            (
                Vector3f::new(0.0, 0.0, 1.0),
                0.0,
                Normal3f::new(0.0, 0.0, 1.0),
            ),
        ];
        let o = Vector3f::new(ray.o.x, ray.o.y, ray.o.z);
        let mut t_best: Float = Float::INFINITY;
        let mut wall_number: Option<u32> = None;
        for (i, (pn, offset, n)) in walls.iter().enumerate() {
            let number = i as u32 + 1;
            let denom: Float = vec3_dot_vec3(pn, &ray.d);
            if denom.abs() < PLANE_EPSILON {
                continue;
            }
            let t: Float = -(vec3_dot_vec3(pn, &o) + offset) / denom;
            if t < ray.t_near || t > t_best {
                continue;
            }
            let hit = ray.position(t);
            let inside = if number == FLOOR {
                hit.x >= 0.0 && hit.x <= self.width && hit.y >= 0.0 && hit.y <= self.width
            } else if pn.x != 0.0 {
                hit.y >= 0.0 && hit.y <= self.width && hit.z >= 0.0 && hit.z <= self.length
            } else {
                hit.x >= 0.0 && hit.x <= self.width && hit.z >= 0.0 && hit.z <= self.length
            };
            if inside {
                t_best = t;
                wall_number = Some(number);
                ray.n = *n;
            }
        }
        if wall_number.is_some() {
            ray.t_far = t_best;
        }
        wall_number
    }
    /// Trace `ray` through one channel. On success the ray sits on the
    /// far side of the plate, pointing in the rotated exit direction,
    /// ready for the next scene intersection. On failure the ray is
    /// spent (absorbed in the channel or left through the aperture).
    ///
    /// Expects `ray.o` to already be the world-space hit point on the
    /// plate, which also determines the radial channel orientation.
    pub fn trace(&self, ray: &mut Ray, rng: &mut Rng) -> bool {
        let entry = ray.o;
        let radial = Vector3f::new(entry.x, entry.y, entry.z).normalize();
        let alpha: Float = (-radial.y).atan2((radial.x * radial.x + radial.z * radial.z).sqrt());
        let beta: Float = radial.x.atan2(radial.z);
        // r maps channel-local +z onto the radial plate normal
        let r = Matrix3x3::mul(&Matrix3x3::rotate_y(beta), &Matrix3x3::rotate_x(alpha));
        ray.d = r.transpose().mul_vec(&ray.d).normalize();
        ray.o = Point3f::new(
            rng.uniform_in_range(self.width, 0.0),
            rng.uniform_in_range(self.width, 0.0),
            self.length,
        );
        ray.reset_interval(RAY_EPSILON);

        let mut depth = CHANNEL_DEPTH;
        while depth > 0 {
            let wall_number = match self.find_intersection(ray) {
                Some(number) => number,
                None => return false,
            };
            ray.push_history(wall_number + CHANNEL_ID_OFFSET);

            if wall_number == FLOOR {
                ray.o = entry - radial * self.length;
                ray.d = r.mul_vec(&ray.d).normalize();
                ray.reset_interval(EXIT_T_NEAR);
                ray.hit_id = None;
                return true;
            }
            // perpendicular incidence cannot graze off a wall
            if nrm_angle_vec3(&ray.n, &-ray.d) < 1.0e-8 {
                return false;
            }
            ray.o = ray.position(ray.t_far);
            ray.d = vec3_reflect(&ray.d, &Vector3f::from(ray.n)).normalize();
            ray.reset_interval(RAY_EPSILON);
            depth -= 1;
        }
        false
    }
}
