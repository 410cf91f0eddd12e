// CONTROLLER: input, camera control and the per-frame context
pub mod input;
pub mod camera_controller;
pub mod frame_loop;

pub use input::{CursorMode, InputEvent, InputProcessor, InputState, KeyBindings};
pub use camera_controller::CameraController;
pub use frame_loop::{FrameTiming, FrameUniforms, ViewerContext};
