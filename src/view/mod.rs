// VIEW: GPU setup and drawing
pub mod gpu_init;
pub mod pipeline;
pub mod render;
pub mod texture;

pub use gpu_init::{GpuContext, GpuInitError};
pub use pipeline::GpuProgram;
pub use render::{Renderer, DEPTH_FORMAT, DIFFUSE_TEXTURE};
pub use texture::{DiffuseImage, GpuTexture, TextureError};
