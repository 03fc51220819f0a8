//! Engine-wide settings shared between the UI layer and the engine.
//!
//! The engine never reads the shared record directly while rendering: it
//! takes one [`SettingsHandle::snapshot`] at the top of each tick and frame.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Which analytic scene is drawn when no scene file is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FullscreenScene {
    /// Fall through to the geometry path with the procedural terrain.
    None,
    /// Raymarched forest landscape.
    #[default]
    Forest,
    /// Raymarched ocean.
    Water,
    /// Hardcoded planet demo drawn through the geometry pipeline.
    Planet,
}

impl FullscreenScene {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "none" => Self::None,
            "forest" => Self::Forest,
            "water" => Self::Water,
            "planet" => Self::Planet,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthOfField {
    pub enabled: bool,
    pub focus_distance: f32,
    pub focus_range: f32,
    pub max_blur_radius: f32,
}

impl Default for DepthOfField {
    fn default() -> Self {
        Self {
            enabled: false,
            focus_distance: 3.0,
            focus_range: 0.75,
            max_blur_radius: 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Empty means no scene is loaded.
    pub scene_path: Option<PathBuf>,
    pub shape_parameter_1: u32,
    pub shape_parameter_2: u32,
    pub near_plane: f32,
    pub far_plane: f32,
    pub depth_of_field: DepthOfField,
    pub population_lod: bool,
    pub distance_lod: bool,
    pub motion_blur: bool,
    pub fog: bool,
    pub fullscreen_scene: FullscreenScene,
    /// Equirectangular sky image composited behind the planet scene.
    pub sky_texture: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scene_path: None,
            shape_parameter_1: 1,
            shape_parameter_2: 1,
            near_plane: 0.1,
            far_plane: 100.0,
            depth_of_field: DepthOfField::default(),
            population_lod: false,
            distance_lod: false,
            motion_blur: false,
            fog: false,
            fullscreen_scene: FullscreenScene::default(),
            sky_texture: None,
        }
    }
}

impl Settings {
    pub fn has_scene(&self) -> bool {
        self.scene_path
            .as_ref()
            .is_some_and(|path| !path.as_os_str().is_empty())
    }

    /// True when the tessellation inputs differ, which requires rebuilding
    /// geometry but not reloading the scene file.
    pub fn geometry_differs(&self, other: &Settings) -> bool {
        self.shape_parameter_1 != other.shape_parameter_1
            || self.shape_parameter_2 != other.shape_parameter_2
            || self.population_lod != other.population_lod
            || self.distance_lod != other.distance_lod
    }
}

/// Shared, lock-protected settings record.
#[derive(Debug, Clone, Default)]
pub struct SettingsHandle {
    inner: Arc<RwLock<Settings>>,
}

impl SettingsHandle {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Copy of the current settings, read under a single lock.
    pub fn snapshot(&self) -> Settings {
        self.inner.read().clone()
    }

    pub fn update(&self, apply: impl FnOnce(&mut Settings)) {
        apply(&mut self.inner.write());
    }

    pub fn replace(&self, settings: Settings) {
        *self.inner.write() = settings;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_detached_from_later_writes() {
        let handle = SettingsHandle::new(Settings::default());
        let before = handle.snapshot();
        handle.update(|s| s.far_plane = 40.0);
        assert_eq!(before.far_plane, 100.0);
        assert_eq!(handle.snapshot().far_plane, 40.0);
    }

    #[test]
    fn empty_path_means_no_scene() {
        let mut settings = Settings::default();
        assert!(!settings.has_scene());
        settings.scene_path = Some(PathBuf::new());
        assert!(!settings.has_scene());
        settings.scene_path = Some(PathBuf::from("scene.xml"));
        assert!(settings.has_scene());
    }

    #[test]
    fn fullscreen_names_parse_case_insensitively() {
        assert_eq!(FullscreenScene::from_name("Planet"), Some(FullscreenScene::Planet));
        assert_eq!(FullscreenScene::from_name("none"), Some(FullscreenScene::None));
        assert_eq!(FullscreenScene::from_name("desert"), None);
    }
}
