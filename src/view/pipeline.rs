use std::collections::BTreeMap;
use std::num::NonZeroU64;

use tracing::{debug, warn};

use crate::model::Vertex;
use crate::shader::{LinkedProgram, ResourceKind, ResourceSlot, ShaderProgram, StageMask};

/// Where one binding of a bind group takes its resource from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRef {
    /// Index into the program's uniform blocks
    Uniform(usize),
    /// Index into the program's texture/sampler resources
    Resource(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingPlan {
    pub binding: u32,
    pub slot: SlotRef,
    pub stages: StageMask,
}

/// Bindings of every group index from 0 to the highest one used. Unused groups stay empty.
pub fn binding_plan(linked: &LinkedProgram) -> Vec<Vec<BindingPlan>> {
    let mut groups: BTreeMap<u32, Vec<BindingPlan>> = BTreeMap::new();
    for (index, block) in linked.uniform_blocks().iter().enumerate() {
        groups.entry(block.group).or_default().push(BindingPlan {
            binding: block.binding,
            slot: SlotRef::Uniform(index),
            stages: block.stages,
        });
    }
    for (index, resource) in linked.resources().iter().enumerate() {
        groups.entry(resource.group).or_default().push(BindingPlan {
            binding: resource.binding,
            slot: SlotRef::Resource(index),
            stages: resource.stages,
        });
    }

    let count = groups.keys().next_back().map_or(0, |&max| max as usize + 1);
    let mut plan = vec![Vec::new(); count];
    for (group, mut bindings) in groups {
        bindings.sort_by_key(|b| b.binding);
        plan[group as usize] = bindings;
    }
    plan
}

/// Uniform buffer size; WGSL structs in the uniform space are 16-byte aligned
pub fn padded_size(size: u64) -> u64 {
    size.max(16).div_ceil(16) * 16
}

fn visibility(stages: StageMask) -> wgpu::ShaderStages {
    let mut visibility = wgpu::ShaderStages::NONE;
    if stages.vertex {
        visibility |= wgpu::ShaderStages::VERTEX;
    }
    if stages.fragment {
        visibility |= wgpu::ShaderStages::FRAGMENT;
    }
    visibility
}

/// GPU side of a linked [`ShaderProgram`]: render pipeline, bind group layouts and one
/// uniform buffer per reflected uniform block.
pub struct GpuProgram {
    pub pipeline: wgpu::RenderPipeline,
    layouts: Vec<wgpu::BindGroupLayout>,
    plan: Vec<Vec<BindingPlan>>,
    uniform_buffers: Vec<wgpu::Buffer>,
    resources: Vec<ResourceSlot>,
}

impl GpuProgram {
    /// `None` when the program is disabled; nothing can be drawn with it
    pub fn new(
        device: &wgpu::Device,
        program: &ShaderProgram,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Option<Self> {
        let Some(linked) = program.linked() else {
            debug!("skipping pipeline creation for a disabled program");
            return None;
        };
        let plan = binding_plan(linked);

        let layouts: Vec<wgpu::BindGroupLayout> = plan
            .iter()
            .enumerate()
            .map(|(group, bindings)| {
                let entries: Vec<wgpu::BindGroupLayoutEntry> = bindings
                    .iter()
                    .map(|b| wgpu::BindGroupLayoutEntry {
                        binding: b.binding,
                        visibility: visibility(b.stages),
                        ty: match b.slot {
                            SlotRef::Uniform(index) => wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: NonZeroU64::new(linked.uniform_blocks()[index].size()),
                            },
                            SlotRef::Resource(index) => match linked.resources()[index].kind {
                                ResourceKind::Texture2d => wgpu::BindingType::Texture {
                                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                    view_dimension: wgpu::TextureViewDimension::D2,
                                    multisampled: false,
                                },
                                ResourceKind::Sampler => {
                                    wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
                                }
                            },
                        },
                        count: None,
                    })
                    .collect();
                let label = format!("program_{}_group_{group}", linked.id.get());
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(label.as_str()),
                    entries: &entries,
                })
            })
            .collect();

        let uniform_buffers = linked
            .uniform_blocks()
            .iter()
            .map(|block| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(block.name.as_str()),
                    size: padded_size(block.size()),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("vertex_shader"),
            source: wgpu::ShaderSource::Wgsl(linked.vertex.source.as_str().into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fragment_shader"),
            source: wgpu::ShaderSource::Wgsl(linked.fragment.source.as_str().into()),
        });

        let layout_refs: Vec<&wgpu::BindGroupLayout> = layouts.iter().collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mesh_pipeline_layout"),
            bind_group_layouts: &layout_refs,
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("mesh_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some(linked.vertex.entry_point_name()),
                buffers: &[Vertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some(linked.fragment.entry_point_name()),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
            multiview: None,
            cache: None,
        });

        Some(Self {
            pipeline,
            layouts,
            plan,
            uniform_buffers,
            resources: linked.resources().to_vec(),
        })
    }

    /// Copy dirty uniform blocks to their buffers
    pub fn upload(&self, queue: &wgpu::Queue, program: &mut ShaderProgram) {
        let Some(linked) = program.linked_mut() else {
            return;
        };
        for (block, buffer) in linked.uniform_blocks_mut().iter_mut().zip(&self.uniform_buffers) {
            if block.is_dirty() {
                queue.write_buffer(buffer, 0, block.bytes());
                block.mark_clean();
            }
        }
    }

    /// One bind group per layout. `lookup` supplies the texture or sampler for each named
    /// resource slot; a slot it cannot fill makes the whole set unusable.
    pub fn bind_groups<'a>(
        &self,
        device: &wgpu::Device,
        lookup: impl Fn(&ResourceSlot) -> Option<wgpu::BindingResource<'a>>,
    ) -> Option<Vec<wgpu::BindGroup>> {
        let mut groups = Vec::with_capacity(self.layouts.len());
        for (layout, bindings) in self.layouts.iter().zip(&self.plan) {
            let mut entries = Vec::with_capacity(bindings.len());
            for b in bindings {
                let resource = match b.slot {
                    SlotRef::Uniform(index) => self.uniform_buffers[index].as_entire_binding(),
                    SlotRef::Resource(index) => {
                        let slot = &self.resources[index];
                        match lookup(slot) {
                            Some(resource) => resource,
                            None => {
                                warn!(name = %slot.name, group = slot.group, binding = slot.binding, "no resource for shader binding");
                                return None;
                            }
                        }
                    }
                };
                entries.push(wgpu::BindGroupEntry { binding: b.binding, resource });
            }
            groups.push(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("mesh_bind_group"),
                layout,
                entries: &entries,
            }));
        }
        Some(groups)
    }
}
