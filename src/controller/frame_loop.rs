use std::time::Instant;

use glam::{Mat4, Vec3};

use crate::config::{CameraConfig, SceneConfig};
use crate::controller::{CameraController, CursorMode, InputEvent, InputProcessor, InputState, KeyBindings};
use crate::model::Camera;
use crate::shader::ShaderProgram;

/// Longest step fed to the camera, so a stalled frame does not teleport it
const MAX_FRAME_DT: f32 = 0.1;

/// Frame delta and a once-per-second FPS estimate
#[derive(Debug, Clone)]
pub struct FrameTiming {
    last_frame: Instant,
    pub dt: f32,
    pub fps: f32,
    frame_count: u32,
    fps_timer: f32,
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTiming {
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            dt: 0.0,
            fps: 0.0,
            frame_count: 0,
            fps_timer: 0.0,
        }
    }

    /// Measure the time since the previous call
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.advance(elapsed)
    }

    pub fn advance(&mut self, elapsed: f32) -> f32 {
        self.dt = elapsed.clamp(0.0, MAX_FRAME_DT);

        self.frame_count += 1;
        self.fps_timer += elapsed;
        if self.fps_timer >= 1.0 {
            self.fps = self.frame_count as f32 / self.fps_timer;
            self.frame_count = 0;
            self.fps_timer = 0.0;
        }
        self.dt
    }
}

/// Per-frame values pushed into the shader program
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub light_pos: Vec3,
    pub view_pos: Vec3,
}

impl FrameUniforms {
    /// Write every value by the names the bundled shaders declare
    pub fn apply(&self, program: &mut ShaderProgram) {
        program.set_matrix4("model", &self.model);
        program.set_matrix4("view", &self.view);
        program.set_matrix4("projection", &self.projection);
        program.set_vector3("lightPos", self.light_pos);
        program.set_vector3("viewPos", self.view_pos);
    }
}

/// Everything the frame loop mutates, owned in one place and passed by `&mut`
pub struct ViewerContext {
    pub camera: Camera,
    pub input: InputState,
    pub processor: InputProcessor,
    pub controller: CameraController,
    pub timing: FrameTiming,
    home: CameraConfig,
}

impl ViewerContext {
    pub fn new(camera_config: CameraConfig, bindings: KeyBindings) -> Self {
        let camera = Camera::with_settings(
            Vec3::from(camera_config.position),
            camera_config.yaw,
            camera_config.pitch,
            camera_config.settings(),
        );
        Self {
            camera,
            input: InputState::new(),
            processor: InputProcessor::new(bindings),
            controller: CameraController::new(),
            timing: FrameTiming::new(),
            home: camera_config,
        }
    }

    /// Record an input event. Returns the cursor mode the window should switch to, if any.
    pub fn handle_input(&mut self, event: &InputEvent) -> Option<CursorMode> {
        let request = match event {
            InputEvent::KeyDown(key) => self.processor.cursor_request(key),
            _ => None,
        };
        if let Some(mode) = request {
            self.input.set_cursor(mode);
        }
        self.input.process_event(event);
        request
    }

    /// Like [`handle_input`](Self::handle_input) for events the UI may have consumed. Consumed
    /// events are dropped, except releases, so a key held while the UI took focus cannot stick.
    pub fn handle_input_behind_ui(&mut self, event: &InputEvent, ui_consumed: bool) -> Option<CursorMode> {
        if ui_consumed && !event.is_release() {
            return None;
        }
        self.handle_input(event)
    }

    /// Advance the camera by one frame of accumulated input
    pub fn update(&mut self, dt: f32) {
        self.controller.update(&mut self.camera, &mut self.input, &self.processor, dt);
    }

    /// Back to the configured pose, keeping speed, sensitivity and zoom
    pub fn reset_camera(&mut self) {
        self.camera.reset_pose(Vec3::from(self.home.position), self.home.yaw, self.home.pitch);
    }

    pub fn frame_uniforms(&self, aspect: f32, scene: &SceneConfig) -> FrameUniforms {
        let model = Mat4::from_translation(Vec3::from(scene.model_translation))
            * Mat4::from_scale(Vec3::splat(scene.model_scale));
        FrameUniforms {
            model,
            view: self.camera.view_matrix(),
            projection: self.camera.projection_matrix(aspect, self.home.z_near, self.home.z_far),
            light_pos: Vec3::from(scene.light_position),
            view_pos: self.camera.position,
        }
    }
}
