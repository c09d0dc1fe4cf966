//! # rs_xrt
//!
//! [Rust][rust] crate for ray tracing grazing-incidence X-ray optics:
//! nested Wolter type I mirror shells and lobster-eye micro-pore
//! plates, each in front of a planar or meshed detector.
//!
//! A scene file names the telescope variant and its parameters; the
//! `rs_xrt` binary parses it, builds the assembly, and traces photon
//! batches from a distant source onto the detector. The per-photon
//! entry point is [`Telescope::trace`].
//!
//! [rust]: https://www.rust-lang.org
//! [`Telescope::trace`]: telescopes/enum.Telescope.html#method.trace

#[macro_use] extern crate impl_ops;

pub mod accelerators;
pub mod core;
pub mod shapes;
pub mod telescopes;
