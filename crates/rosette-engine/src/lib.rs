//! Rosette engine crate.
//!
//! Host side of the rosette shader pairs: the vertex/uniform ABI, a CPU
//! reference of the quad math, one wgpu renderer per pipeline, and the
//! platform + GPU runtime that drives them.

pub mod core;
pub mod device;
pub mod window;

pub mod coords;
pub mod logging;
pub mod quad;
pub mod render;
pub mod vertex;
