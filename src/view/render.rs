use tracing::{info, warn};

use crate::model::{Mesh, MeshBuffer, MeshError};
use crate::shader::{ActiveProgram, ResourceKind, ShaderProgram};
use crate::view::pipeline::GpuProgram;
use crate::view::texture::{DiffuseImage, GpuTexture, TextureError};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Texture variable the mesh shaders sample the diffuse map from
pub const DIFFUSE_TEXTURE: &str = "materialDiffuse";

pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

/// Draws the loaded mesh with one shader program into a colour target.
///
/// A disabled program still gets its clear pass, so the window keeps presenting frames.
pub struct Renderer {
    color_format: wgpu::TextureFormat,
    depth_view: wgpu::TextureView,
    gpu_program: Option<GpuProgram>,
    bind_groups: Option<Vec<wgpu::BindGroup>>,
    diffuse: GpuTexture,
    mesh: Option<MeshBuffer>,
    active: ActiveProgram,
    pub clear_color: wgpu::Color,
}

impl Renderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        program: &ShaderProgram,
        clear_color: [f64; 3],
    ) -> Self {
        let (_, depth_view) = create_depth_texture(device, width, height);
        let diffuse = GpuTexture::upload(device, queue, &DiffuseImage::white(), DIFFUSE_TEXTURE);

        let mut renderer = Self {
            color_format,
            depth_view,
            gpu_program: None,
            bind_groups: None,
            diffuse,
            mesh: None,
            active: ActiveProgram::default(),
            clear_color: wgpu::Color { r: clear_color[0], g: clear_color[1], b: clear_color[2], a: 1.0 },
        };
        renderer.set_program(device, program);
        renderer
    }

    /// Rebuild the pipeline for `program`; a disabled program leaves nothing to draw with
    pub fn set_program(&mut self, device: &wgpu::Device, program: &ShaderProgram) {
        self.gpu_program = GpuProgram::new(device, program, self.color_format, DEPTH_FORMAT);
        self.rebuild_bind_groups(device);
    }

    /// Replace the drawn mesh. A mesh the device cannot hold leaves nothing to draw.
    pub fn set_mesh(&mut self, device: &wgpu::Device, mesh: Option<&Mesh>) -> Result<(), MeshError> {
        self.mesh = None;
        if let Some(mesh) = mesh {
            self.mesh = Some(mesh.upload(device)?);
        }
        Ok(())
    }

    /// Upload `image` as the diffuse map, or white when it exceeds the device limits
    pub fn set_diffuse(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &DiffuseImage,
    ) -> Result<(), TextureError> {
        let checked = image.check_size(device.limits().max_texture_dimension_2d);
        let white = DiffuseImage::white();
        let image = if checked.is_ok() { image } else { &white };
        self.diffuse = GpuTexture::upload(device, queue, image, DIFFUSE_TEXTURE);
        self.rebuild_bind_groups(device);
        checked
    }

    fn rebuild_bind_groups(&mut self, device: &wgpu::Device) {
        let diffuse = &self.diffuse;
        self.bind_groups = self.gpu_program.as_ref().and_then(|gpu| {
            gpu.bind_groups(device, |slot| match slot.kind {
                ResourceKind::Texture2d if slot.name == DIFFUSE_TEXTURE => {
                    Some(wgpu::BindingResource::TextureView(&diffuse.view))
                }
                ResourceKind::Texture2d => None,
                ResourceKind::Sampler => Some(wgpu::BindingResource::Sampler(&diffuse.sampler)),
            })
        });
        if self.gpu_program.is_some() && self.bind_groups.is_none() {
            warn!("shader resources could not be bound, mesh will not be drawn");
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        // the view keeps its texture alive
        self.depth_view = create_depth_texture(device, width, height).1;
        info!(width, height, "depth buffer resized");
    }

    /// Clear `target` and draw the mesh with `program` if it is usable
    pub fn render(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        program: &mut ShaderProgram,
    ) {
        program.use_program(&mut self.active);
        if let Some(gpu) = &self.gpu_program {
            gpu.upload(queue, program);
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("mesh_render_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if !self.active.is_current(program) {
            return;
        }
        let (Some(gpu), Some(bind_groups), Some(mesh)) = (&self.gpu_program, &self.bind_groups, &self.mesh) else {
            return;
        };
        if mesh.index_count == 0 {
            return;
        }

        render_pass.set_pipeline(&gpu.pipeline);
        for (index, group) in bind_groups.iter().enumerate() {
            render_pass.set_bind_group(index as u32, group, &[]);
        }
        render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
    }
}
