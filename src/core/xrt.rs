//! Type definition of Float, otherwise constants and small numeric
//! helpers which can be used almost everywhere else in the code.

// std
use std::mem;

pub type Float = f64;

/// Smallest positive ray parameter accepted after a reflect; keeps a
/// freshly reflected ray from re-hitting the surface it left.
pub const RAY_EPSILON: Float = 1.0e-4;
/// Safety margin (mm) added on every side of a primitive's bounding box.
pub const BOUNDS_PAD: Float = 0.5;

/// Clamp the given value *val* to lie between the values *low* and *high*.
pub fn clamp_t<T>(val: T, low: T, high: T) -> T
where
    T: PartialOrd,
{
    if val < low {
        low
    } else if val > high {
        high
    } else {
        val
    }
}

/// Convert from angles expressed in degrees to radians.
pub fn radians(deg: Float) -> Float {
    (std::f64::consts::PI / 180.0) * deg
}

/// Solve a quadratic equation and return the two real roots in
/// ascending order, if there are any.
pub fn quadratic(a: Float, b: Float, c: Float, t0: &mut Float, t1: &mut Float) -> bool {
    let discrim: f64 = b * b - 4.0 * a * c;
    if discrim < 0.0 {
        false
    } else {
        let root_discrim: f64 = discrim.sqrt();
        let q = if b < 0.0 {
            -0.5 * (b - root_discrim)
        } else {
            -0.5 * (b + root_discrim)
        };
        *t0 = q / a;
        *t1 = c / q;
        if *t0 > *t1 {
            mem::swap(&mut (*t0), &mut (*t1))
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_two_roots() {
        // (t - 2)(t - 5) = t^2 - 7t + 10
        let mut t0: Float = 0.0;
        let mut t1: Float = 0.0;
        assert!(quadratic(1.0, -7.0, 10.0, &mut t0, &mut t1));
        assert!((t0 - 2.0).abs() < 1.0e-12);
        assert!((t1 - 5.0).abs() < 1.0e-12);
    }

    #[test]
    fn quadratic_no_root() {
        let mut t0: Float = 0.0;
        let mut t1: Float = 0.0;
        assert!(!quadratic(1.0, 0.0, 1.0, &mut t0, &mut t1));
    }
}
