use naga::valid::{Capabilities, ValidationFlags, Validator};

use super::source::strip_bom;
use super::{ShaderError, ShaderStage};

/// One validated stage, ready to be linked
#[derive(Debug, Clone)]
pub struct CompiledStage {
    pub stage: ShaderStage,
    /// Source with any BOM removed, handed to the GPU as-is
    pub source: String,
    pub module: naga::Module,
    entry_index: usize,
}

impl CompiledStage {
    pub fn entry_point(&self) -> &naga::EntryPoint {
        &self.module.entry_points[self.entry_index]
    }

    pub fn entry_point_name(&self) -> &str {
        &self.entry_point().name
    }
}

/// Parse and validate `source` as a WGSL module for `stage`.
///
/// The first entry point of the matching stage is the one the program uses.
pub fn compile_stage(stage: ShaderStage, source: &str) -> Result<CompiledStage, ShaderError> {
    let source = strip_bom(source);

    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Compile {
        stage,
        message: e.emit_to_string(source),
    })?;

    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|e| ShaderError::Compile {
            stage,
            message: error_chain(e.as_inner()),
        })?;

    let entry_index = module
        .entry_points
        .iter()
        .position(|ep| stage.matches(ep.stage))
        .ok_or(ShaderError::MissingEntryPoint { stage })?;

    tracing::debug!(%stage, entry_point = %module.entry_points[entry_index].name, "shader stage compiled");

    Ok(CompiledStage {
        stage,
        source: source.to_owned(),
        module,
        entry_index,
    })
}

fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str("\n  caused by: ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
