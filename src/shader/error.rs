use std::path::PathBuf;

use thiserror::Error;

use super::ShaderStage;

/// Why a shader program ended up disabled
#[derive(Error, Debug)]
pub enum ShaderError {
    #[error("failed to read {stage} shader {}: {source}", .path.display())]
    Read {
        stage: ShaderStage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} shader compile error:\n{message}")]
    Compile { stage: ShaderStage, message: String },

    #[error("{stage} shader has no @{stage} entry point")]
    MissingEntryPoint { stage: ShaderStage },

    #[error("shader link failed: {0}")]
    Link(#[from] LinkError),
}

/// Stage interface and resource mismatches found while linking
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("fragment input at location {location} is not written by the vertex stage")]
    MissingVarying { location: u32 },

    #[error("varying at location {location} is {vertex} in the vertex stage but {fragment} in the fragment stage")]
    VaryingTypeMismatch {
        location: u32,
        vertex: String,
        fragment: String,
    },

    #[error("uniform '{name}' at group {group} binding {binding} is declared differently by the two stages")]
    ConflictingUniform { name: String, group: u32, binding: u32 },

    #[error("resource '{name}' at group {group} binding {binding} has an unsupported type")]
    UnsupportedResource { name: String, group: u32, binding: u32 },

    #[error("resource '{name}' uses group {group}, only groups below {max} can be bound")]
    GroupOutOfRange { name: String, group: u32, max: u32 },

    #[error("vertex input at location {location} is not provided by the mesh vertex layout")]
    UnknownVertexInput { location: u32 },

    #[error("vertex input at location {location} is {found}, the mesh provides 32-bit floats")]
    VertexInputType { location: u32, found: String },

    #[error("fragment stage writes location {location}, only location 0 has a colour target")]
    ExtraFragmentOutput { location: u32 },

    #[error("fragment stage does not write the colour target at location 0")]
    MissingFragmentOutput,

    #[error("fragment output is {found}, the colour target needs 32-bit floats")]
    FragmentOutputType { found: String },
}
