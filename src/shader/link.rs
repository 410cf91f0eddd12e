use std::collections::BTreeMap;

use naga::{
    AddressSpace, Binding, ImageClass, ImageDimension, Scalar, ScalarKind, TypeInner, VectorSize,
};

use super::compile::CompiledStage;
use super::uniform::{StageMask, UniformBlock, UniformKind, UniformMember, UniformTable};
use super::LinkError;

/// Vertex buffer locations a mesh provides: position, normal and texture coordinate
pub const MESH_VERTEX_LOCATIONS: [u32; 3] = [0, 1, 2];

/// Bind groups available under the default device limits
pub const MAX_BIND_GROUPS: u32 = 4;

/// Texture-like resources a program can bind by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Texture2d,
    Sampler,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSlot {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub kind: ResourceKind,
    pub stages: StageMask,
}

/// Everything reflection produced for a linked program
#[derive(Debug, Clone)]
pub struct ProgramLayout {
    pub uniforms: UniformTable,
    pub resources: Vec<ResourceSlot>,
}

#[derive(Debug, Clone, PartialEq)]
enum SlotLayout {
    Uniform { size: u32, members: Vec<UniformMember> },
    Resource(ResourceKind),
}

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    stages: StageMask,
    layout: SlotLayout,
}

/// Check the stage interfaces against each other and against what the renderer feeds them,
/// then merge both stages' bindings
pub fn link(vertex: &CompiledStage, fragment: &CompiledStage) -> Result<ProgramLayout, LinkError> {
    check_vertex_inputs(vertex)?;
    check_varyings(vertex, fragment)?;
    check_fragment_outputs(fragment)?;

    let mut slots: BTreeMap<(u32, u32), Slot> = BTreeMap::new();
    for (stage, mask) in [(vertex, StageMask::VERTEX), (fragment, StageMask::FRAGMENT)] {
        for ((group, binding), slot) in stage_slots(stage, mask)? {
            match slots.get_mut(&(group, binding)) {
                Some(existing) if existing.layout == slot.layout => {
                    existing.stages = existing.stages.union(slot.stages);
                }
                Some(existing) => {
                    return Err(LinkError::ConflictingUniform {
                        name: existing.name.clone(),
                        group,
                        binding,
                    });
                }
                None => {
                    slots.insert((group, binding), slot);
                }
            }
        }
    }

    let mut blocks = Vec::new();
    let mut resources = Vec::new();
    for ((group, binding), slot) in slots {
        match slot.layout {
            SlotLayout::Uniform { size, members } => {
                blocks.push(UniformBlock::new(slot.name, group, binding, slot.stages, size, members));
            }
            SlotLayout::Resource(kind) => resources.push(ResourceSlot {
                name: slot.name,
                group,
                binding,
                kind,
                stages: slot.stages,
            }),
        }
    }

    Ok(ProgramLayout {
        uniforms: UniformTable::new(blocks),
        resources,
    })
}

fn check_vertex_inputs(vertex: &CompiledStage) -> Result<(), LinkError> {
    for (location, input) in stage_inputs(vertex) {
        if !MESH_VERTEX_LOCATIONS.contains(&location) {
            return Err(LinkError::UnknownVertexInput { location });
        }
        if !is_f32_value(&input) {
            return Err(LinkError::VertexInputType { location, found: describe(&input) });
        }
    }
    Ok(())
}

/// One colour target at location 0
fn check_fragment_outputs(fragment: &CompiledStage) -> Result<(), LinkError> {
    let outputs = stage_outputs(fragment);
    if let Some(&location) = outputs.keys().find(|&&location| location != 0) {
        return Err(LinkError::ExtraFragmentOutput { location });
    }
    match outputs.get(&0) {
        None => Err(LinkError::MissingFragmentOutput),
        Some(output) if !is_f32_value(output) => Err(LinkError::FragmentOutputType { found: describe(output) }),
        Some(_) => Ok(()),
    }
}

fn check_varyings(vertex: &CompiledStage, fragment: &CompiledStage) -> Result<(), LinkError> {
    let outputs = stage_outputs(vertex);
    for (location, input) in stage_inputs(fragment) {
        let Some(output) = outputs.get(&location) else {
            return Err(LinkError::MissingVarying { location });
        };
        if *output != input {
            return Err(LinkError::VaryingTypeMismatch {
                location,
                vertex: describe(output),
                fragment: describe(&input),
            });
        }
    }
    Ok(())
}

fn stage_outputs(stage: &CompiledStage) -> BTreeMap<u32, TypeInner> {
    let mut outputs = BTreeMap::new();
    if let Some(result) = &stage.entry_point().function.result {
        collect_locations(&stage.module, result.ty, result.binding.as_ref(), &mut outputs);
    }
    outputs
}

fn stage_inputs(stage: &CompiledStage) -> BTreeMap<u32, TypeInner> {
    let mut inputs = BTreeMap::new();
    for argument in &stage.entry_point().function.arguments {
        collect_locations(&stage.module, argument.ty, argument.binding.as_ref(), &mut inputs);
    }
    inputs
}

/// Location-bound values of an entry point argument or result, flattening IO structs
fn collect_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&Binding>,
    out: &mut BTreeMap<u32, TypeInner>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => {
            out.insert(*location, module.types[ty].inner.clone());
        }
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

fn stage_slots(stage: &CompiledStage, mask: StageMask) -> Result<Vec<((u32, u32), Slot)>, LinkError> {
    let module = &stage.module;
    let mut slots = Vec::new();

    for (_, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else { continue };
        let name = var.name.clone().unwrap_or_default();
        if binding.group >= MAX_BIND_GROUPS {
            return Err(LinkError::GroupOutOfRange {
                name,
                group: binding.group,
                max: MAX_BIND_GROUPS,
            });
        }
        let key = (binding.group, binding.binding);
        let unsupported = || LinkError::UnsupportedResource {
            name: name.clone(),
            group: binding.group,
            binding: binding.binding,
        };

        let layout = match var.space {
            AddressSpace::Uniform => uniform_layout(module, &name, var.ty),
            AddressSpace::Handle => SlotLayout::Resource(resource_kind(&module.types[var.ty].inner).ok_or_else(unsupported)?),
            _ => return Err(unsupported()),
        };

        slots.push((key, Slot { name, stages: mask, layout }));
    }

    Ok(slots)
}

fn uniform_layout(module: &naga::Module, name: &str, ty: naga::Handle<naga::Type>) -> SlotLayout {
    let inner = &module.types[ty].inner;
    match inner {
        TypeInner::Struct { members, span } => SlotLayout::Uniform {
            size: *span,
            members: members
                .iter()
                .filter_map(|member| {
                    Some(UniformMember {
                        name: member.name.clone()?,
                        offset: member.offset,
                        kind: uniform_kind(&module.types[member.ty].inner),
                    })
                })
                .collect(),
        },
        _ => SlotLayout::Uniform {
            size: inner.size(module.to_ctx()),
            members: vec![UniformMember {
                name: name.to_owned(),
                offset: 0,
                kind: uniform_kind(inner),
            }],
        },
    }
}

fn uniform_kind(inner: &TypeInner) -> UniformKind {
    match *inner {
        TypeInner::Scalar(scalar) if scalar == Scalar::F32 => UniformKind::Float,
        TypeInner::Vector { size, scalar } if scalar == Scalar::F32 => match size {
            VectorSize::Bi => UniformKind::Vec2,
            VectorSize::Tri => UniformKind::Vec3,
            VectorSize::Quad => UniformKind::Vec4,
        },
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar,
        } if scalar == Scalar::F32 => UniformKind::Mat4,
        _ => UniformKind::Other,
    }
}

fn resource_kind(inner: &TypeInner) -> Option<ResourceKind> {
    match *inner {
        TypeInner::Image {
            dim: ImageDimension::D2,
            arrayed: false,
            class: ImageClass::Sampled { kind: ScalarKind::Float, multi: false },
        } => Some(ResourceKind::Texture2d),
        TypeInner::Sampler { comparison: false } => Some(ResourceKind::Sampler),
        _ => None,
    }
}

fn is_f32_value(inner: &TypeInner) -> bool {
    match *inner {
        TypeInner::Scalar(scalar) | TypeInner::Vector { scalar, .. } => scalar == Scalar::F32,
        _ => false,
    }
}

fn describe(inner: &TypeInner) -> String {
    let scalar_name = |scalar: Scalar| match scalar.kind {
        ScalarKind::Float => format!("f{}", scalar.width * 8),
        ScalarKind::Sint => format!("i{}", scalar.width * 8),
        ScalarKind::Uint => format!("u{}", scalar.width * 8),
        _ => format!("{:?}", scalar.kind).to_lowercase(),
    };
    match *inner {
        TypeInner::Scalar(scalar) => scalar_name(scalar),
        TypeInner::Vector { size, scalar } => format!("vec{}<{}>", size as u8, scalar_name(scalar)),
        ref other => format!("{other:?}"),
    }
}
