//! Viewer configuration loaded from TOML.
//!
//! Every section uses `#[serde(default)]`, so a file only needs the keys it overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controller::KeyBindings;
use crate::model::CameraSettings;

pub const CONFIG_ENV: &str = "MESHVIEW_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "meshview.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub shaders: ShaderConfig,
    pub camera: CameraConfig,
    pub scene: SceneConfig,
    pub keybindings: KeyBindings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "Mesh Viewer".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            vertex: PathBuf::from("assets/shaders/mesh.vert.wgsl"),
            fragment: PathBuf::from("assets/shaders/mesh.frag.wgsl"),
        }
    }
}

/// Initial pose and tuning; the pose is also where the camera returns on every mesh load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    pub zoom: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 5.0],
            yaw: -90.0,
            pitch: 0.0,
            movement_speed: 3.0,
            mouse_sensitivity: 0.5,
            zoom: 45.0,
            z_near: 0.1,
            z_far: 100.0,
        }
    }
}

impl CameraConfig {
    pub fn settings(&self) -> CameraSettings {
        CameraSettings {
            movement_speed: self.movement_speed,
            mouse_sensitivity: self.mouse_sensitivity,
            zoom: self.zoom,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Mesh to open at startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh: Option<PathBuf>,
    /// Diffuse texture file name, looked up next to the mesh
    pub diffuse_texture: String,
    pub model_translation: [f32; 3],
    pub model_scale: f32,
    pub light_position: [f32; 3],
    pub clear_color: [f64; 3],
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            mesh: None,
            diffuse_texture: "diffuse.jpg".to_string(),
            model_translation: [-0.5, -0.5, -0.5],
            model_scale: 0.01,
            light_position: [1.2, 1.0, 2.0],
            clear_color: [0.1, 0.1, 0.1],
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Path from `MESHVIEW_CONFIG`, falling back to `meshview.toml`
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load `path`, or use defaults when it is missing or malformed
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "config loaded");
                config
            }
            Err(e) => {
                tracing::error!("{e}; using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(ViewerConfig::from_toml("").unwrap(), ViewerConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = ViewerConfig::from_toml(
            r#"
[camera]
movement_speed = 6.0

[scene]
mesh = "models/teapot.obj"

[keybindings]
forward = "ArrowUp"
"#,
        )
        .unwrap();

        assert_eq!(config.camera.movement_speed, 6.0);
        assert_eq!(config.camera.yaw, -90.0);
        assert_eq!(config.scene.mesh, Some(PathBuf::from("models/teapot.obj")));
        assert_eq!(config.scene.diffuse_texture, "diffuse.jpg");
        assert_eq!(config.keybindings.forward, "ArrowUp");
        assert_eq!(config.keybindings.backward, "KeyS");
        assert_eq!(config.window, WindowConfig::default());
    }

    #[test]
    fn clip_planes_use_z_prefixed_keys() {
        let config = ViewerConfig::from_toml("[camera]\nz_near = 0.5\nz_far = 250.0\n").unwrap();
        assert_eq!((config.camera.z_near, config.camera.z_far), (0.5, 250.0));
    }

    #[test]
    fn sample_config_lists_the_defaults() {
        let config = ViewerConfig::from_toml(include_str!("../meshview.toml")).unwrap();
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            ViewerConfig::from_toml("[camera\nyaw = 1"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ViewerConfig::from_toml("[camera]\nyaw = \"left\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(matches!(ViewerConfig::load(&path), Err(ConfigError::Io { .. })));
        assert_eq!(ViewerConfig::load_or_default(&path), ViewerConfig::default());
    }

    #[test]
    fn round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meshview.toml");
        let mut config = ViewerConfig::default();
        config.window.title = "Teapot".into();
        config.scene.model_scale = 1.0;
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        assert_eq!(ViewerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn camera_settings_follow_config() {
        let config = CameraConfig { zoom: 30.0, ..CameraConfig::default() };
        let settings = config.settings();
        assert_eq!(settings.zoom, 30.0);
        assert_eq!(settings.mouse_sensitivity, 0.5);
    }
}
