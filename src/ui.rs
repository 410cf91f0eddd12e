use std::path::{Path, PathBuf};

use egui::Context;

use crate::controller::ViewerContext;
use crate::shader::{ProgramStatus, ShaderProgram};

/// Requests the UI hands back to the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    OpenMesh(PathBuf),
}

/// Summary of what is currently on screen
#[derive(Debug, Clone, Default)]
pub struct LoadedFile {
    pub path: Option<PathBuf>,
    pub vertices: usize,
    pub triangles: usize,
    pub textured: bool,
}

/// UI state that persists between frames
#[derive(Debug, Default)]
pub struct ViewerUi {
    pub path_input: String,
}

impl ViewerUi {
    pub fn new(initial: Option<&Path>) -> Self {
        Self {
            path_input: initial.map(|p| p.display().to_string()).unwrap_or_default(),
        }
    }

    /// Path typed into the open field, if any
    pub fn open_request(&self) -> Option<UiAction> {
        let path = self.path_input.trim();
        (!path.is_empty()).then(|| UiAction::OpenMesh(PathBuf::from(path)))
    }

    /// Draw the overlay for this frame
    pub fn show(
        &mut self,
        ctx: &Context,
        viewer: &ViewerContext,
        program: &ShaderProgram,
        loaded: &LoadedFile,
    ) -> Option<UiAction> {
        let mut action = None;

        egui::Window::new("File Info")
            .default_pos([8.0, 8.0])
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let field = ui.text_edit_singleline(&mut self.path_input);
                    let submitted = field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    if ui.button("Open").clicked() || submitted {
                        action = self.open_request();
                    }
                });

                ui.label(format!("Loaded file: {}", loaded_label(loaded)));
                if loaded.path.is_some() {
                    ui.label(
                        egui::RichText::new(format!(
                            "{} vertices, {} triangles{}",
                            loaded.vertices,
                            loaded.triangles,
                            if loaded.textured { "" } else { ", untextured" }
                        ))
                        .small(),
                    );
                }

                ui.separator();
                let (status, healthy) = shader_status(program);
                let color = if healthy { egui::Color32::LIGHT_GREEN } else { egui::Color32::LIGHT_RED };
                ui.colored_label(color, status);

                ui.separator();
                draw_camera_info(ui, viewer);
            });

        action
    }
}

fn loaded_label(loaded: &LoadedFile) -> String {
    loaded
        .path
        .as_ref()
        .map_or_else(|| "none".to_string(), |p| p.display().to_string())
}

/// One-line program status and whether it is usable
pub fn shader_status(program: &ShaderProgram) -> (String, bool) {
    match program.status() {
        ProgramStatus::Ready(id) => (format!("Shader program {} ready", id.get()), true),
        ProgramStatus::Failed(e) => (format!("Shader disabled: {e}"), false),
    }
}

fn draw_camera_info(ui: &mut egui::Ui, viewer: &ViewerContext) {
    let camera = &viewer.camera;
    let p = camera.position;
    ui.label(egui::RichText::new(format!("FPS: {:.0}", viewer.timing.fps)).small());
    ui.label(egui::RichText::new(format!("Pos: {:.2}, {:.2}, {:.2}", p.x, p.y, p.z)).small());
    ui.label(
        egui::RichText::new(format!(
            "Yaw: {:.1} Pitch: {:.1} FOV: {:.0}",
            camera.yaw(),
            camera.pitch(),
            camera.zoom()
        ))
        .small(),
    );
    let bindings = viewer.processor.bindings();
    let hint = if viewer.input.is_captured() {
        format!("{} - release mouse", bindings.release_cursor)
    } else {
        format!("{} - capture mouse", bindings.capture_cursor)
    };
    ui.label(egui::RichText::new(hint).small());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use crate::controller::KeyBindings;
    use crate::shader::{BUNDLED_FRAGMENT, BUNDLED_VERTEX};

    #[test]
    fn open_request_needs_a_path() {
        let mut ui = ViewerUi::default();
        assert_eq!(ui.open_request(), None);
        ui.path_input = "   ".into();
        assert_eq!(ui.open_request(), None);
        ui.path_input = "  models/teapot.obj ".into();
        assert_eq!(ui.open_request(), Some(UiAction::OpenMesh(PathBuf::from("models/teapot.obj"))));
    }

    #[test]
    fn status_reports_failures() {
        let good = ShaderProgram::new(BUNDLED_VERTEX, BUNDLED_FRAGMENT);
        let bad = ShaderProgram::new("nope", BUNDLED_FRAGMENT);
        assert!(shader_status(&good).1);
        let (text, healthy) = shader_status(&bad);
        assert!(!healthy);
        assert!(text.starts_with("Shader disabled"));
    }

    #[test]
    fn overlay_runs_headless() {
        let ctx = Context::default();
        let viewer = ViewerContext::new(CameraConfig::default(), KeyBindings::default());
        let program = ShaderProgram::new(BUNDLED_VERTEX, BUNDLED_FRAGMENT);
        let mut ui = ViewerUi::new(Some(Path::new("teapot.obj")));
        let loaded = LoadedFile::default();

        let mut action = Some(UiAction::OpenMesh(PathBuf::new()));
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            action = ui.show(ctx, &viewer, &program, &loaded);
        });
        assert_eq!(action, None);
        assert_eq!(ui.path_input, "teapot.obj");
    }
}
