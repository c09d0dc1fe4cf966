//! Random number generator (PCG32). One generator instance is owned
//! per worker/photon and passed explicitly into every scattering-model
//! and pore-sampling call, so independent ray traces never share
//! mutable random state.

use hexf::*;

// xrt
use crate::core::xrt::Float;

pub const FLOAT_ONE_MINUS_EPSILON: Float = hexf64!("0x1.fffffffffffffp-1");
pub const PCG32_DEFAULT_STATE: u64 = 0x853c_49e6_748f_ea9b;
pub const PCG32_DEFAULT_STREAM: u64 = 0xda3e_39cb_94b9_5bdb;
pub const PCG32_MULT: u64 = 0x5851_f42d_4c95_7f2d;

/// Random number generator
#[derive(Debug, Copy, Clone)]
pub struct Rng {
    state: u64,
    inc: u64,
}

impl Default for Rng {
    fn default() -> Self {
        Rng {
            state: PCG32_DEFAULT_STATE,
            inc: PCG32_DEFAULT_STREAM,
        }
    }
}

impl Rng {
    pub fn new() -> Self {
        Rng::default()
    }
    /// Select one of 2^63 independent streams; photon *i* of a seeded
    /// run uses sequence `seed + i`.
    pub fn set_sequence(&mut self, initseq: u64) {
        self.state = 0_u64;
        self.inc = initseq.wrapping_shl(1) | 1;
        self.uniform_uint32();
        self.state = self.state.wrapping_add(PCG32_DEFAULT_STATE);
        self.uniform_uint32();
    }
    pub fn uniform_uint32(&mut self) -> u32 {
        let oldstate: u64 = self.state;
        self.state = oldstate.wrapping_mul(PCG32_MULT).wrapping_add(self.inc);
        let xorshifted: u32 = (oldstate.wrapping_shr(18) ^ oldstate).wrapping_shr(27) as u32;
        let rot: u32 = oldstate.wrapping_shr(59) as u32;
        xorshifted.wrapping_shr(rot)
            | xorshifted.wrapping_shl(rot.wrapping_neg().wrapping_add(1_u32) & 31)
    }
    /// Uniform draw from [0, 1).
    pub fn uniform_float(&mut self) -> Float {
        (self.uniform_uint32() as Float * hexf64!("0x1.0p-32")).min(FLOAT_ONE_MINUS_EPSILON)
    }
    /// Uniform draw from [m, n).
    pub fn uniform_in_range(&mut self, m: Float, n: Float) -> Float {
        m + (n - m) * self.uniform_float()
    }
}
