//! Interactive viewer for textured OBJ meshes.
//!
//! The pieces are split the way the binary uses them: [`shader`] compiles, links and reflects a
//! WGSL program on the CPU, [`model`] holds the camera and mesh data, [`controller`] turns input
//! into camera motion once per frame, and [`view`] owns everything that touches the GPU.

pub mod config;
pub mod logging;
pub mod ui;

pub mod shader;

// MVC
pub mod model;
pub mod view;
pub mod controller;

pub use config::{ConfigError, ViewerConfig};
