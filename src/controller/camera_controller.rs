use crate::controller::{InputProcessor, InputState};
use crate::model::{Camera, CameraMovement};

/// Feeds accumulated input into the camera once per frame
pub struct CameraController {
    pub constrain_pitch: bool,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraController {
    pub fn new() -> Self {
        Self { constrain_pitch: true }
    }

    /// Apply mouse look delta to camera
    pub fn apply_look(&self, camera: &mut Camera, dx: f32, dy: f32) {
        if dx != 0.0 || dy != 0.0 {
            camera.process_mouse_movement(dx, dy, self.constrain_pitch);
        }
    }

    pub fn apply_scroll(&self, camera: &mut Camera, dy: f32) {
        if dy != 0.0 {
            camera.process_scroll(dy);
        }
    }

    /// Update camera position based on pressed keys
    pub fn update_movement(
        &self,
        camera: &mut Camera,
        input: &InputState,
        processor: &InputProcessor,
        dt: f32,
    ) {
        let held = [
            (processor.is_moving_forward(input), CameraMovement::Forward),
            (processor.is_moving_backward(input), CameraMovement::Backward),
            (processor.is_moving_left(input), CameraMovement::Left),
            (processor.is_moving_right(input), CameraMovement::Right),
        ];
        for (pressed, direction) in held {
            if pressed {
                camera.process_movement(direction, dt);
            }
        }
    }

    /// Drain this frame's input into the camera
    pub fn update(&self, camera: &mut Camera, input: &mut InputState, processor: &InputProcessor, dt: f32) {
        let (dx, dy) = input.consume_look();
        self.apply_look(camera, dx, dy);
        self.apply_scroll(camera, input.consume_scroll());
        self.update_movement(camera, input, processor, dt);
    }
}
