//! Rigid-frame math for tilted/offset shells and the pore channel:
//! 3x3 rotation matrices, an orthonormal local frame derived from two
//! tilt angles plus a translation, and the Rodrigues axis/angle
//! rotation used by the microfacet models.

// xrt
use crate::core::geometry::{vec3_cross_vec3, vec3_dot_vec3, Normal3f, Point3f, Vector3f};
use crate::core::xrt::Float;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Matrix3x3 {
    pub m: [[Float; 3]; 3],
}

impl Default for Matrix3x3 {
    fn default() -> Self {
        Matrix3x3 {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }
}

impl Matrix3x3 {
    /// Rotation about the x axis (right-handed, angle in radians).
    pub fn rotate_x(theta: Float) -> Matrix3x3 {
        let sin_theta: Float = theta.sin();
        let cos_theta: Float = theta.cos();
        Matrix3x3 {
            m: [
                [1.0, 0.0, 0.0],
                [0.0, cos_theta, -sin_theta],
                [0.0, sin_theta, cos_theta],
            ],
        }
    }
    /// Rotation about the y axis (right-handed, angle in radians).
    pub fn rotate_y(theta: Float) -> Matrix3x3 {
        let sin_theta: Float = theta.sin();
        let cos_theta: Float = theta.cos();
        Matrix3x3 {
            m: [
                [cos_theta, 0.0, sin_theta],
                [0.0, 1.0, 0.0],
                [-sin_theta, 0.0, cos_theta],
            ],
        }
    }
    pub fn mul(m1: &Matrix3x3, m2: &Matrix3x3) -> Matrix3x3 {
        let mut r: Matrix3x3 = Matrix3x3::default();
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = m1.m[i][0] * m2.m[0][j]
                    + m1.m[i][1] * m2.m[1][j]
                    + m1.m[i][2] * m2.m[2][j];
            }
        }
        r
    }
    pub fn transpose(&self) -> Matrix3x3 {
        Matrix3x3 {
            m: [
                [self.m[0][0], self.m[1][0], self.m[2][0]],
                [self.m[0][1], self.m[1][1], self.m[2][1]],
                [self.m[0][2], self.m[1][2], self.m[2][2]],
            ],
        }
    }
    pub fn mul_vec(&self, v: &Vector3f) -> Vector3f {
        Vector3f {
            x: self.m[0][0] * v.x + self.m[0][1] * v.y + self.m[0][2] * v.z,
            y: self.m[1][0] * v.x + self.m[1][1] * v.y + self.m[1][2] * v.z,
            z: self.m[2][0] * v.x + self.m[2][1] * v.y + self.m[2][2] * v.z,
        }
    }
}

/// Orthonormal right-handed local frame of a shell: the local z axis
/// is the shell axis after applying the two tilt angles, x and y span
/// the cross-section, and `origin` is the world-space translation of
/// the local origin.
#[derive(Debug, Default, Copy, Clone)]
pub struct Frame {
    pub x: Vector3f,
    pub y: Vector3f,
    pub z: Vector3f,
    pub origin: Vector3f,
}

impl Frame {
    pub fn from_tilt(angle_x: Float, angle_y: Float, origin: Vector3f) -> Frame {
        let r: Matrix3x3 = Matrix3x3::mul(
            &Matrix3x3::rotate_x(angle_x),
            &Matrix3x3::rotate_y(angle_y),
        );
        let z: Vector3f = r.mul_vec(&Vector3f::new(0.0, 0.0, 1.0));
        let x: Vector3f = vec3_cross_vec3(&z, &Vector3f::new(0.0, 1.0, 0.0)).normalize();
        let y: Vector3f = vec3_cross_vec3(&z, &x);
        Frame { x, y, z, origin }
    }
    /// Translate by the frame origin, then project onto the local basis.
    pub fn point_to_local(&self, p: &Point3f) -> Point3f {
        let pw: Vector3f = Vector3f::new(p.x, p.y, p.z) - self.origin;
        Point3f {
            x: vec3_dot_vec3(&pw, &self.x),
            y: vec3_dot_vec3(&pw, &self.y),
            z: vec3_dot_vec3(&pw, &self.z),
        }
    }
    /// Inverse of `point_to_local`.
    pub fn point_to_world(&self, p: &Point3f) -> Point3f {
        let w: Vector3f = self.x * p.x + self.y * p.y + self.z * p.z + self.origin;
        Point3f {
            x: w.x,
            y: w.y,
            z: w.z,
        }
    }
    pub fn vector_to_local(&self, v: &Vector3f) -> Vector3f {
        Vector3f {
            x: vec3_dot_vec3(v, &self.x),
            y: vec3_dot_vec3(v, &self.y),
            z: vec3_dot_vec3(v, &self.z),
        }
    }
    pub fn vector_to_world(&self, v: &Vector3f) -> Vector3f {
        self.x * v.x + self.y * v.y + self.z * v.z
    }
    /// The basis is a pure rotation, so a normal transforms like a
    /// direction.
    pub fn normal_to_world(&self, n: &Normal3f) -> Normal3f {
        Normal3f::from(self.x * n.x + self.y * n.y + self.z * n.z)
    }
}

/// Rotate *v* about the unit axis *k* by *theta* (Rodrigues formula).
pub fn rodrigues_rotation(k: &Vector3f, v: &Vector3f, theta: Float) -> Vector3f {
    let cos_theta: Float = theta.cos();
    let sin_theta: Float = theta.sin();
    v * cos_theta
        + vec3_cross_vec3(k, v) * sin_theta
        + *k * (vec3_dot_vec3(k, v) * (1.0 - cos_theta))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: Float = 1.0e-12;

    #[test]
    fn untilted_frame_is_identity() {
        let f = Frame::from_tilt(0.0, 0.0, Vector3f::default());
        assert!((f.z - Vector3f::new(0.0, 0.0, 1.0)).length() < TOL);
        // right-handed and orthonormal
        assert!(vec3_dot_vec3(&f.x, &f.y).abs() < TOL);
        assert!(vec3_dot_vec3(&f.y, &f.z).abs() < TOL);
        assert!(vec3_dot_vec3(&f.z, &f.x).abs() < TOL);
        assert!((f.x.length() - 1.0).abs() < TOL);
        assert!((f.y.length() - 1.0).abs() < TOL);
    }

    #[test]
    fn local_world_round_trip() {
        let f = Frame::from_tilt(0.01, -0.02, Vector3f::new(1.0, 2.0, 3.0));
        let v = Vector3f::new(0.3, -0.4, 0.5);
        let back = f.vector_to_world(&f.vector_to_local(&v));
        assert!((back - v).length() < 1.0e-12);
        let p = Point3f::new(-4.0, 0.5, 9.0);
        let pl = f.point_to_local(&p);
        let pw = Point3f::new(0.0, 0.0, 0.0) + f.vector_to_world(&Vector3f::new(pl.x, pl.y, pl.z))
            + f.origin;
        assert!((pw - p).length() < 1.0e-12);
    }

    #[test]
    fn rodrigues_quarter_turn() {
        // z rotated about y by pi/2 lands on x
        let k = Vector3f::new(0.0, 1.0, 0.0);
        let v = Vector3f::new(0.0, 0.0, 1.0);
        let r = rodrigues_rotation(&k, &v, std::f64::consts::FRAC_PI_2);
        assert!((r - Vector3f::new(1.0, 0.0, 0.0)).length() < 1.0e-12);
        // rotating back is the inverse
        let back = rodrigues_rotation(&k, &r, -std::f64::consts::FRAC_PI_2);
        assert!((back - v).length() < 1.0e-12);
    }
}
