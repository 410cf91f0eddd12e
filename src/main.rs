use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};
use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::PhysicalKey,
    window::{CursorGrabMode, Window},
};

use meshview::{
    config::ViewerConfig,
    controller::{CursorMode, InputEvent, ViewerContext},
    logging,
    model::Mesh,
    shader::{ShaderError, ShaderProgram, BUNDLED_FRAGMENT, BUNDLED_VERTEX},
    ui::{LoadedFile, UiAction, ViewerUi},
    view::{DiffuseImage, GpuContext, GpuInitError, Renderer},
};

/// Lines per wheel notch for touchpads reporting pixels
const PIXELS_PER_LINE: f32 = 20.0;

#[derive(Error, Debug)]
enum AppError {
    #[error("event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),

    #[error(transparent)]
    Gpu(#[from] GpuInitError),
}

struct App {
    window: Arc<Window>,
    gpu: GpuContext,
    renderer: Renderer,
    program: ShaderProgram,

    // egui
    egui_renderer: egui_wgpu::Renderer,
    egui_state: egui_winit::State,
    egui_ctx: egui::Context,
    ui: ViewerUi,

    viewer: ViewerContext,
    config: ViewerConfig,
    loaded: LoadedFile,
}

impl App {
    async fn new(window: Arc<Window>, config: ViewerConfig, mesh: Option<PathBuf>) -> Result<Self, GpuInitError> {
        let size = window.inner_size();
        let gpu = GpuContext::new(window.clone(), size.width, size.height).await?;

        let program = load_program(&config);
        let renderer = Renderer::new(
            &gpu.device,
            &gpu.queue,
            gpu.format,
            gpu.config.width,
            gpu.config.height,
            &program,
            config.scene.clear_color,
        );

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &*window,
            None,
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(
            &gpu.device,
            gpu.format,
            egui_wgpu::RendererOptions::default(),
        );

        let viewer = ViewerContext::new(config.camera.clone(), config.keybindings.clone());
        let ui = ViewerUi::new(mesh.as_deref());

        let mut app = Self {
            window,
            gpu,
            renderer,
            program,
            egui_renderer,
            egui_state,
            egui_ctx,
            ui,
            viewer,
            config,
            loaded: LoadedFile::default(),
        };
        app.apply_cursor(app.viewer.input.cursor);
        if let Some(path) = mesh {
            app.open_mesh(&path);
        }
        Ok(app)
    }

    fn apply_cursor(&self, mode: CursorMode) {
        match mode {
            CursorMode::Captured => {
                let grabbed = self
                    .window
                    .set_cursor_grab(CursorGrabMode::Locked)
                    .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined));
                if let Err(e) = grabbed {
                    warn!("cursor grab unavailable: {e}");
                }
                self.window.set_cursor_visible(false);
            }
            CursorMode::Released => {
                let _ = self.window.set_cursor_grab(CursorGrabMode::None);
                self.window.set_cursor_visible(true);
            }
        }
    }

    /// Load a mesh and the diffuse texture beside it, then re-centre the camera
    fn open_mesh(&mut self, path: &Path) {
        let uploaded = Mesh::load_obj(path).and_then(|mesh| {
            self.renderer.set_mesh(&self.gpu.device, Some(&mesh))?;
            Ok(mesh)
        });
        let mesh = match uploaded {
            Ok(mesh) => mesh,
            Err(e) => {
                error!("{e}");
                let _ = self.renderer.set_mesh(&self.gpu.device, None);
                self.loaded = LoadedFile::default();
                return;
            }
        };

        let texture_path = path
            .parent()
            .unwrap_or(Path::new("."))
            .join(&self.config.scene.diffuse_texture);
        let (image, mut textured) = DiffuseImage::load_or_white(&texture_path);
        if let Err(e) = self.renderer.set_diffuse(&self.gpu.device, &self.gpu.queue, &image) {
            warn!("{e}; using a white texture");
            textured = false;
        }

        self.loaded = LoadedFile {
            path: Some(path.to_path_buf()),
            vertices: mesh.vertices.len(),
            triangles: mesh.triangle_count(),
            textured,
        };
        self.viewer.reset_camera();
    }

    fn input(&mut self, event: &WindowEvent) -> bool {
        // First let egui process the event
        let egui_captured = self.egui_state.on_window_event(self.window.as_ref(), event).consumed;

        let input = match event {
            WindowEvent::KeyboardInput { event: KeyEvent { state, physical_key: PhysicalKey::Code(code), .. }, .. } => {
                let key = format!("{code:?}");
                match state {
                    ElementState::Pressed => InputEvent::KeyDown(key),
                    ElementState::Released => InputEvent::KeyUp(key),
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_LINE,
                };
                InputEvent::MouseWheel { delta_y }
            }
            WindowEvent::Focused(false) => InputEvent::FocusLost,
            _ => return egui_captured,
        };

        if let Some(mode) = self.viewer.handle_input_behind_ui(&input, egui_captured) {
            self.apply_cursor(mode);
        }
        true
    }

    fn handle_mouse_motion(&mut self, dx: f64, dy: f64) {
        self.viewer.handle_input(&InputEvent::MouseMove { dx: dx as f32, dy: dy as f32 });
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if self.gpu.resize(new_size.width, new_size.height) {
            self.renderer.resize(&self.gpu.device, new_size.width, new_size.height);
        }
    }

    fn update(&mut self) {
        let dt = self.viewer.timing.tick();
        self.viewer.update(dt);

        self.viewer
            .frame_uniforms(self.gpu.aspect(), &self.config.scene)
            .apply(&mut self.program);
    }

    fn render_ui(&mut self) -> (egui::FullOutput, Option<UiAction>) {
        let raw_input = self.egui_state.take_egui_input(&self.window);
        let mut action = None;
        let output = self.egui_ctx.run(raw_input, |ctx| {
            action = self.ui.show(ctx, &self.viewer, &self.program, &self.loaded);
        });
        (output, action)
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.gpu.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let (full_output, action) = self.render_ui();
        self.egui_state.handle_platform_output(&self.window, full_output.platform_output);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gpu.config.width, self.gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };
        let primitives = self.egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
        let textures_delta = full_output.textures_delta;

        let mut encoder = self.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer.update_texture(&self.gpu.device, &self.gpu.queue, *id, image_delta);
        }
        self.egui_renderer.update_buffers(&self.gpu.device, &self.gpu.queue, &mut encoder, &primitives, &screen_descriptor);

        self.renderer.render(&self.gpu.queue, &mut encoder, &view, &mut self.program);

        // egui on top of the mesh
        {
            let egui_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.egui_renderer.render(&mut egui_pass.forget_lifetime(), &primitives, &screen_descriptor);
        }

        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        if let Some(UiAction::OpenMesh(path)) = action {
            self.open_mesh(&path);
        }
        Ok(())
    }
}

/// Shaders from the configured files. Only unreadable files fall back to the bundled copies;
/// a compile or link failure stays visible as a disabled program.
fn load_program(config: &ViewerConfig) -> ShaderProgram {
    let program = ShaderProgram::load(&config.shaders.vertex, &config.shaders.fragment);
    match program.error() {
        Some(ShaderError::Read { .. }) => {
            warn!("falling back to the bundled mesh shaders");
            ShaderProgram::new(BUNDLED_VERTEX, BUNDLED_FRAGMENT)
        }
        _ => program,
    }
}

fn run() -> Result<(), AppError> {
    let config = ViewerConfig::load_or_default(&ViewerConfig::default_path());
    let mesh = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.scene.mesh.clone());

    let event_loop = EventLoop::new()?;
    let window_attributes = Window::default_attributes()
        .with_title(config.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(config.window.width, config.window.height));
    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut app = pollster::block_on(App::new(window, config, mesh))?;
    info!("viewer ready");

    event_loop.run(move |event, elwt| {
        match event {
            Event::WindowEvent {
                ref event,
                window_id,
            } if window_id == app.window.id() => {
                if !app.input(event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::Resized(physical_size) => {
                            app.resize(*physical_size);
                        }
                        WindowEvent::RedrawRequested => {
                            app.update();

                            match app.render() {
                                Ok(_) => {}
                                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                    app.resize(app.window.inner_size())
                                }
                                Err(wgpu::SurfaceError::OutOfMemory) => {
                                    error!("GPU out of memory");
                                    elwt.exit()
                                }
                                Err(e) => warn!("{e:?}"),
                            }
                        }
                        _ => {}
                    }
                }
            }
            Event::DeviceEvent { event: DeviceEvent::MouseMotion { delta }, .. } => {
                app.handle_mouse_motion(delta.0, delta.1);
            }
            Event::AboutToWait => {
                app.window.request_redraw();
            }
            _ => {}
        }
    })?;
    Ok(())
}

fn main() {
    logging::init();

    if let Err(e) = run() {
        error!("{e}");
        std::process::exit(1);
    }
}
