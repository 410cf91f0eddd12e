/// Platform-agnostic input handling
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Platform-independent input events. Keys use winit `KeyCode` names ("KeyW", "Escape", ...).
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown(String),
    KeyUp(String),

    /// Raw pointer motion, y grows downwards
    MouseMove { dx: f32, dy: f32 },
    /// Wheel movement in lines, positive away from the user
    MouseWheel { delta_y: f32 },

    FocusLost,
}

impl InputEvent {
    /// Events that only ever clear held state
    pub fn is_release(&self) -> bool {
        matches!(self, InputEvent::KeyUp(_) | InputEvent::FocusLost)
    }
}

/// Whether mouse motion drives the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    /// Cursor hidden and grabbed, motion turns the camera
    Captured,
    /// Cursor free for the UI, motion ignored
    Released,
}

/// Input accumulated between two frames
pub struct InputState {
    pub pressed_keys: HashSet<String>,
    pub look_delta: (f32, f32),
    pub scroll_delta: f32,
    pub cursor: CursorMode,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self {
            pressed_keys: HashSet::new(),
            look_delta: (0.0, 0.0),
            scroll_delta: 0.0,
            cursor: CursorMode::Captured,
        }
    }

    /// Process an input event and update state
    pub fn process_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(key) => {
                self.pressed_keys.insert(key.clone());
            }
            InputEvent::KeyUp(key) => {
                self.pressed_keys.remove(key.as_str());
            }
            InputEvent::MouseMove { dx, dy } => {
                if self.is_captured() {
                    // screen y points down, pitch goes up
                    self.look_delta.0 += dx;
                    self.look_delta.1 -= dy;
                }
            }
            InputEvent::MouseWheel { delta_y } => {
                self.scroll_delta += delta_y;
            }
            InputEvent::FocusLost => {
                self.clear_keys();
            }
        }
    }

    pub fn is_key_pressed(&self, key: &str) -> bool {
        self.pressed_keys.contains(key)
    }

    pub fn is_captured(&self) -> bool {
        self.cursor == CursorMode::Captured
    }

    pub fn set_cursor(&mut self, mode: CursorMode) {
        if mode == CursorMode::Released {
            self.look_delta = (0.0, 0.0);
        }
        self.cursor = mode;
    }

    pub fn clear_keys(&mut self) {
        self.pressed_keys.clear();
    }

    pub fn consume_look(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.look_delta)
    }

    pub fn consume_scroll(&mut self) -> f32 {
        std::mem::take(&mut self.scroll_delta)
    }
}

/// Key mapping configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
    pub release_cursor: String,
    pub capture_cursor: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: "KeyW".to_string(),
            backward: "KeyS".to_string(),
            left: "KeyA".to_string(),
            right: "KeyD".to_string(),
            release_cursor: "Escape".to_string(),
            capture_cursor: "Enter".to_string(),
        }
    }
}

/// High-level input processor
#[derive(Debug, Clone, Default)]
pub struct InputProcessor {
    bindings: KeyBindings,
}

impl InputProcessor {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn is_moving_forward(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.forward)
    }

    pub fn is_moving_backward(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.backward)
    }

    pub fn is_moving_left(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.left)
    }

    pub fn is_moving_right(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.right)
    }

    /// Cursor mode change requested by a key press, if any
    pub fn cursor_request(&self, key: &str) -> Option<CursorMode> {
        if key == self.bindings.release_cursor {
            Some(CursorMode::Released)
        } else if key == self.bindings.capture_cursor {
            Some(CursorMode::Captured)
        } else {
            None
        }
    }
}
