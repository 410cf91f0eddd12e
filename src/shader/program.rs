use std::num::NonZeroU64;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat4, Vec3};
use tracing::{debug, error, info};

use super::compile::{compile_stage, CompiledStage};
use super::link::{link, ResourceSlot};
use super::source::ShaderSources;
use super::uniform::{UniformBlock, UniformLocation, UniformTable};
use super::{ShaderError, ShaderStage};

static NEXT_PROGRAM_ID: AtomicU64 = AtomicU64::new(1);

/// Handle of a successfully linked program. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(NonZeroU64);

impl ProgramId {
    fn next() -> Self {
        let previous = NEXT_PROGRAM_ID
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |raw| Some(successor(raw)))
            .unwrap_or_else(|raw| raw);
        Self(NonZeroU64::new(previous).unwrap_or(NonZeroU64::MIN))
    }

    pub fn get(self) -> u64 { self.0.get() }
}

/// Next counter value, never the `0` sentinel
fn successor(raw: u64) -> u64 {
    raw.checked_add(1).unwrap_or(1)
}

/// Both compiled stages plus their merged reflection
#[derive(Debug)]
pub struct LinkedProgram {
    pub id: ProgramId,
    pub vertex: CompiledStage,
    pub fragment: CompiledStage,
    uniforms: UniformTable,
    resources: Vec<ResourceSlot>,
}

impl LinkedProgram {
    pub fn uniform_blocks(&self) -> &[UniformBlock] { self.uniforms.blocks() }

    pub fn uniform_blocks_mut(&mut self) -> &mut [UniformBlock] { self.uniforms.blocks_mut() }

    pub fn resources(&self) -> &[ResourceSlot] { &self.resources }
}

#[derive(Debug)]
enum ProgramState {
    Linked(LinkedProgram),
    Failed(ShaderError),
}

/// Outcome of program construction, as seen by callers
#[derive(Debug, Clone, Copy)]
pub enum ProgramStatus<'a> {
    Ready(ProgramId),
    Failed(&'a ShaderError),
}

/// The program the next draw will use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveProgram {
    current: Option<ProgramId>,
}

impl ActiveProgram {
    pub fn current(&self) -> Option<ProgramId> { self.current }

    pub fn is_current(&self, program: &ShaderProgram) -> bool {
        self.current.is_some() && self.current == program.program_id()
    }
}

/// One vertex + fragment program.
///
/// Compilation and linking happen exactly once, in the constructor. A failure leaves the
/// program disabled for good: `id()` is `0`, `use_program` keeps whatever was bound before and
/// the uniform setters do nothing. The failure itself stays available through [`status`].
///
/// [`status`]: ShaderProgram::status
#[derive(Debug)]
pub struct ShaderProgram {
    state: ProgramState,
}

impl ShaderProgram {
    pub fn new(vertex_source: &str, fragment_source: &str) -> Self {
        match Self::compile_and_link(vertex_source, fragment_source) {
            Ok(linked) => {
                info!(
                    id = linked.id.get(),
                    vertex_entry = linked.vertex.entry_point_name(),
                    fragment_entry = linked.fragment.entry_point_name(),
                    uniforms = linked.uniforms.blocks().len(),
                    "shader program linked"
                );
                Self { state: ProgramState::Linked(linked) }
            }
            Err(e) => Self::disabled(e),
        }
    }

    pub fn from_sources(sources: &ShaderSources) -> Self {
        Self::new(&sources.vertex, &sources.fragment)
    }

    /// Read both stages from disk and build the program. Unreadable files disable it.
    pub fn load(vertex_path: &Path, fragment_path: &Path) -> Self {
        match ShaderSources::read(vertex_path, fragment_path) {
            Ok(sources) => Self::from_sources(&sources),
            Err(e) => Self::disabled(e),
        }
    }

    fn disabled(error: ShaderError) -> Self {
        error!("shader program disabled: {error}");
        Self { state: ProgramState::Failed(error) }
    }

    fn compile_and_link(vertex_source: &str, fragment_source: &str) -> Result<LinkedProgram, ShaderError> {
        debug!("compiling shader program");
        let vertex = compile_stage(ShaderStage::Vertex, vertex_source)?;
        let fragment = compile_stage(ShaderStage::Fragment, fragment_source)?;
        let layout = link(&vertex, &fragment)?;

        Ok(LinkedProgram {
            id: ProgramId::next(),
            vertex,
            fragment,
            uniforms: layout.uniforms,
            resources: layout.resources,
        })
    }

    /// Raw handle, `0` when the program failed to build
    pub fn id(&self) -> u64 {
        self.program_id().map_or(0, ProgramId::get)
    }

    pub fn program_id(&self) -> Option<ProgramId> {
        self.linked().map(|linked| linked.id)
    }

    pub fn status(&self) -> ProgramStatus<'_> {
        match &self.state {
            ProgramState::Linked(linked) => ProgramStatus::Ready(linked.id),
            ProgramState::Failed(e) => ProgramStatus::Failed(e),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ProgramState::Linked(_))
    }

    pub fn error(&self) -> Option<&ShaderError> {
        match &self.state {
            ProgramState::Failed(e) => Some(e),
            ProgramState::Linked(_) => None,
        }
    }

    pub fn linked(&self) -> Option<&LinkedProgram> {
        match &self.state {
            ProgramState::Linked(linked) => Some(linked),
            ProgramState::Failed(_) => None,
        }
    }

    pub fn linked_mut(&mut self) -> Option<&mut LinkedProgram> {
        match &mut self.state {
            ProgramState::Linked(linked) => Some(linked),
            ProgramState::Failed(_) => None,
        }
    }

    /// Make this program current. A disabled program leaves `active` untouched.
    pub fn use_program(&self, active: &mut ActiveProgram) {
        if let Some(id) = self.program_id() {
            active.current = Some(id);
        }
    }

    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.linked()?.uniforms.location(name)
    }

    /// Texture or sampler binding by shader variable name
    pub fn resource_binding(&self, name: &str) -> Option<&ResourceSlot> {
        self.linked()?.resources.iter().find(|slot| slot.name == name)
    }

    pub fn entry_point(&self, stage: ShaderStage) -> Option<&str> {
        let linked = self.linked()?;
        Some(match stage {
            ShaderStage::Vertex => linked.vertex.entry_point_name(),
            ShaderStage::Fragment => linked.fragment.entry_point_name(),
        })
    }

    pub fn set_matrix4(&mut self, name: &str, value: &Mat4) {
        if let Some(linked) = self.linked_mut() {
            linked.uniforms.set_matrix4(name, value);
        }
    }

    pub fn set_vector3(&mut self, name: &str, value: Vec3) {
        if let Some(linked) = self.linked_mut() {
            linked.uniforms.set_vector3(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::link::ResourceKind;
    use crate::shader::uniform::UniformKind;
    use crate::shader::{LinkError, BUNDLED_FRAGMENT, BUNDLED_VERTEX};

    fn snapshot(program: &ShaderProgram) -> Vec<Vec<u8>> {
        program
            .linked()
            .map(|linked| linked.uniform_blocks().iter().map(|b| b.bytes().to_vec()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn valid_sources_produce_a_ready_program() {
        let program = ShaderProgram::new(BUNDLED_VERTEX, BUNDLED_FRAGMENT);
        assert_ne!(program.id(), 0);
        assert!(program.is_ready());
        assert!(program.error().is_none());
        assert!(matches!(program.status(), ProgramStatus::Ready(id) if id.get() == program.id()));
    }

    #[test]
    fn bundled_shaders_expose_the_viewer_uniforms() {
        let program = ShaderProgram::new(BUNDLED_VERTEX, BUNDLED_FRAGMENT);
        for name in ["model", "view", "projection"] {
            assert_eq!(program.uniform_location(name).map(|l| l.kind), Some(UniformKind::Mat4), "{name}");
        }
        for name in ["lightPos", "viewPos"] {
            assert_eq!(program.uniform_location(name).map(|l| l.kind), Some(UniformKind::Vec3), "{name}");
        }
        assert_eq!(program.resource_binding("materialDiffuse").map(|r| r.kind), Some(ResourceKind::Texture2d));
        assert_eq!(program.entry_point(ShaderStage::Vertex), Some("vs_main"));
        assert_eq!(program.entry_point(ShaderStage::Fragment), Some("fs_main"));
    }

    #[test]
    fn invalid_vertex_source_disables_the_program() {
        let mut program = ShaderProgram::new("@vertex fn broken(", BUNDLED_FRAGMENT);
        assert_eq!(program.id(), 0);
        assert!(matches!(
            program.error(),
            Some(ShaderError::Compile { stage: ShaderStage::Vertex, .. })
        ));

        let mut active = ActiveProgram::default();
        program.use_program(&mut active);
        assert_eq!(active.current(), None);

        program.set_matrix4("model", &Mat4::IDENTITY);
        program.set_vector3("lightPos", Vec3::ONE);
        assert!(program.uniform_location("model").is_none());
        assert!(snapshot(&program).is_empty());
    }

    #[test]
    fn failed_use_keeps_previous_program_bound() {
        let good = ShaderProgram::new(BUNDLED_VERTEX, BUNDLED_FRAGMENT);
        let bad = ShaderProgram::new(BUNDLED_VERTEX, "not wgsl at all");

        let mut active = ActiveProgram::default();
        good.use_program(&mut active);
        bad.use_program(&mut active);
        assert!(active.is_current(&good));
        assert!(!active.is_current(&bad));
    }

    #[test]
    fn unknown_uniform_write_changes_nothing() {
        let mut program = ShaderProgram::new(BUNDLED_VERTEX, BUNDLED_FRAGMENT);
        let before = snapshot(&program);
        program.set_matrix4("nonexistent", &Mat4::IDENTITY);
        program.set_vector3("nonexistent", Vec3::ONE);
        assert_eq!(snapshot(&program), before);
    }

    #[test]
    fn uniform_writes_reach_the_staging_blocks() {
        let mut program = ShaderProgram::new(BUNDLED_VERTEX, BUNDLED_FRAGMENT);
        let location = program.uniform_location("viewPos").unwrap();
        program.set_vector3("viewPos", Vec3::new(0.0, 0.0, 5.0));

        let linked = program.linked().unwrap();
        let block = &linked.uniform_blocks()[location.block];
        let start = location.offset as usize;
        let z = f32::from_le_bytes(block.bytes()[start + 8..start + 12].try_into().unwrap());
        assert_eq!(z, 5.0);
        assert!(block.is_dirty());
    }

    #[test]
    fn programs_get_distinct_ids() {
        let a = ShaderProgram::new(BUNDLED_VERTEX, BUNDLED_FRAGMENT);
        let b = ShaderProgram::new(BUNDLED_VERTEX, BUNDLED_FRAGMENT);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn link_failure_is_reported_as_such() {
        let fragment = r#"
@fragment
fn fs_main(@location(7) v: vec4<f32>) -> @location(0) vec4<f32> {
    return v;
}
"#;
        let program = ShaderProgram::new(BUNDLED_VERTEX, fragment);
        assert_eq!(program.id(), 0);
        assert!(matches!(program.status(), ProgramStatus::Failed(ShaderError::Link(_))));
    }

    #[test]
    fn id_counter_skips_the_sentinel() {
        assert_eq!(successor(1), 2);
        assert_eq!(successor(u64::MAX), 1);
        assert_ne!(successor(u64::MAX), 0);
    }

    #[test]
    fn vertex_input_the_mesh_cannot_feed_disables_the_program() {
        let vertex = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(5) tangent: vec4<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(position, 1.0);
    out.world_position = position;
    out.normal = tangent.xyz;
    out.uv = position.xy;
    return out;
}
"#;
        let mut program = ShaderProgram::new(vertex, BUNDLED_FRAGMENT);
        assert_eq!(program.id(), 0);
        assert!(matches!(
            program.error(),
            Some(ShaderError::Link(LinkError::UnknownVertexInput { location: 5 }))
        ));

        let mut active = ActiveProgram::default();
        program.use_program(&mut active);
        program.set_matrix4("model", &Mat4::IDENTITY);
        assert_eq!(active.current(), None);
    }

    #[test]
    fn missing_files_disable_the_program() {
        let dir = tempfile::tempdir().unwrap();
        let program = ShaderProgram::load(&dir.path().join("a.wgsl"), &dir.path().join("b.wgsl"));
        assert!(matches!(program.error(), Some(ShaderError::Read { stage: ShaderStage::Vertex, .. })));
    }
}
