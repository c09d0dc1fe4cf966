//! The building blocks shared by every telescope variant.

pub mod error;
pub mod frame;
pub mod geometry;
pub mod paramset;
pub mod pore;
pub mod rng;
pub mod scene;
pub mod sensor;
pub mod surface;
pub mod xrt;
