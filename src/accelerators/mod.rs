//! Ray-acceleration backends.

pub mod bvh;
