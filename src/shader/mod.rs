// SHADER: program compilation, linking and uniform staging
pub mod source;
pub mod error;
pub mod compile;
pub mod link;
pub mod uniform;
pub mod program;

pub use source::{strip_bom, ShaderSources, ShaderStage};
pub use error::{LinkError, ShaderError};
pub use compile::CompiledStage;
pub use link::{ResourceKind, ResourceSlot};
pub use uniform::{StageMask, UniformBlock, UniformKind, UniformLocation};
pub use program::{ActiveProgram, LinkedProgram, ProgramId, ProgramStatus, ShaderProgram};

/// Lit, textured mesh shaders shipped with the viewer
pub const BUNDLED_VERTEX: &str = include_str!("../../assets/shaders/mesh.vert.wgsl");
pub const BUNDLED_FRAGMENT: &str = include_str!("../../assets/shaders/mesh.frag.wgsl");
