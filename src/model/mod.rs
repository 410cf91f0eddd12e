// MODEL: camera and mesh data
pub mod camera;
pub mod mesh;

pub use camera::{Camera, CameraMovement, CameraSettings};
pub use mesh::{Mesh, MeshBuffer, MeshError, Vertex};
