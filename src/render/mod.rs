//! Multi-pass wgpu pipeline plus the per-frame decisions that drive it.
//!
//! The decision functions here are pure so they can be exercised without a
//! GPU; [`Renderer`] turns an [`crate::engine::Frame`] into command buffers.

mod capture;
mod gpu;
mod pipelines;
mod renderer;
mod shaders;
mod targets;
mod texture;
mod uniforms;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::render_data::LightData;
use crate::scene::LightKind;
use crate::settings::{FullscreenScene, Settings};

pub use capture::{CapturedImage, PADDED_ROW_ALIGNMENT};
pub use gpu::{GpuContext, WindowSurface};
pub use renderer::Renderer;
pub use uniforms::{FrameUniforms, LightUniform, ObjectUniforms, MAX_LIGHTS};

/// Transmittance the fog reaches exactly at the far plane.
pub const FOG_TARGET_TRANSMITTANCE: f32 = 0.02;
pub const FOG_COLOR: Vec3 = Vec3::new(0.85, 0.9, 1.0);

pub const SHADOW_MAP_SIZE: u32 = 2048;
pub const SHADOW_HALF_EXTENT: f32 = 25.0;
pub const SHADOW_NEAR: f32 = 1.0;
pub const SHADOW_FAR: f32 = 80.0;
pub const SHADOW_DISTANCE: f32 = 30.0;

pub const MOTION_BLUR_MAX_PIXELS: f32 = 16.0;
pub const MOTION_BLUR_SAMPLES: u32 = 12;

/// Raymarched scenes that need no geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalyticScene {
    Forest,
    Water,
}

impl AnalyticScene {
    /// The scene visible through the portal while this one is active.
    pub fn partner(self) -> Self {
        match self {
            Self::Forest => Self::Water,
            Self::Water => Self::Forest,
        }
    }

    pub fn as_setting(self) -> FullscreenScene {
        match self {
            Self::Forest => FullscreenScene::Forest,
            Self::Water => FullscreenScene::Water,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderMode {
    /// No scene loaded; a shader draws the whole frame.
    FullscreenProcedural(AnalyticScene),
    /// Built-in planet scene through the geometry, shadow and toon passes.
    PlanetGeometryScene,
    /// A loaded scene, or the bare terrain when nothing is loaded and the
    /// fullscreen selector is `None`.
    GeometryScene,
}

/// Mode for the current settings. Recomputed every frame, never stored.
pub fn render_mode(settings: &Settings) -> RenderMode {
    if settings.has_scene() {
        return RenderMode::GeometryScene;
    }
    match settings.fullscreen_scene {
        FullscreenScene::Forest => RenderMode::FullscreenProcedural(AnalyticScene::Forest),
        FullscreenScene::Water => RenderMode::FullscreenProcedural(AnalyticScene::Water),
        FullscreenScene::Planet => RenderMode::PlanetGeometryScene,
        FullscreenScene::None => RenderMode::GeometryScene,
    }
}

/// Final full-screen stage of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostEffect {
    /// Analytic scene written straight to the output.
    None,
    DepthDebug,
    MotionBlur,
    DepthOfField,
    Toon,
    /// Screen-space speed blur over the forest.
    DirectionalBlur,
}

/// Picks the post stage. For loaded scenes depth debug wins over motion
/// blur, which wins over depth of field.
pub fn select_post_effect(
    mode: RenderMode,
    depth_debug: bool,
    motion_blur: bool,
    directional_blur: f32,
) -> PostEffect {
    match mode {
        RenderMode::PlanetGeometryScene => PostEffect::Toon,
        RenderMode::GeometryScene if depth_debug => PostEffect::DepthDebug,
        RenderMode::GeometryScene if motion_blur => PostEffect::MotionBlur,
        RenderMode::GeometryScene => PostEffect::DepthOfField,
        RenderMode::FullscreenProcedural(AnalyticScene::Forest) if directional_blur > 0.0 => {
            PostEffect::DirectionalBlur
        }
        RenderMode::FullscreenProcedural(_) => PostEffect::None,
    }
}

/// Exponential-squared fog density that leaves
/// [`FOG_TARGET_TRANSMITTANCE`] at the far plane.
pub fn fog_density(near: f32, far: f32) -> f32 {
    if far <= near || far <= 0.0 {
        return 0.0;
    }
    (-FOG_TARGET_TRANSMITTANCE.ln()).max(0.0).sqrt() / far
}

/// Index of the first directional light, or of the first light of any
/// kind.
pub fn shadow_caster(lights: &[LightData]) -> Option<usize> {
    lights
        .iter()
        .position(|light| light.kind == LightKind::Directional)
        .or_else(|| (!lights.is_empty()).then_some(0))
}

/// Orthographic view-projection of the shadow map, looking at the origin
/// along the caster's direction.
pub fn light_space_matrix(light: &LightData) -> Mat4 {
    let direction = match light.kind {
        LightKind::Point => (Vec3::ZERO - light.position).try_normalize(),
        LightKind::Directional | LightKind::Spot => light.direction.try_normalize(),
    }
    .unwrap_or(Vec3::NEG_Y);

    let target = Vec3::ZERO;
    let eye = target - direction * SHADOW_DISTANCE;
    let up = if direction.cross(Vec3::Y).length_squared() < 1e-6 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let view = Mat4::look_at_rh(eye, target, up);
    let projection = Mat4::orthographic_rh(
        -SHADOW_HALF_EXTENT,
        SHADOW_HALF_EXTENT,
        -SHADOW_HALF_EXTENT,
        SHADOW_HALF_EXTENT,
        SHADOW_NEAR,
        SHADOW_FAR,
    );
    projection * view
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn light(kind: LightKind, direction: Vec3) -> LightData {
        LightData {
            kind,
            color: Vec3::ONE,
            position: Vec3::new(0.0, 10.0, 0.0),
            direction,
            attenuation: Vec3::X,
            angle: 0.0,
            penumbra: 0.0,
        }
    }

    #[test]
    fn mode_follows_scene_path_and_selector() {
        let mut settings = Settings::default();
        assert_eq!(
            render_mode(&settings),
            RenderMode::FullscreenProcedural(AnalyticScene::Forest)
        );
        settings.fullscreen_scene = FullscreenScene::Planet;
        assert_eq!(render_mode(&settings), RenderMode::PlanetGeometryScene);
        settings.fullscreen_scene = FullscreenScene::None;
        assert_eq!(render_mode(&settings), RenderMode::GeometryScene);
        settings.fullscreen_scene = FullscreenScene::Water;
        settings.scene_path = Some(PathBuf::from("scene.xml"));
        assert_eq!(render_mode(&settings), RenderMode::GeometryScene);
    }

    #[test]
    fn post_effect_priority() {
        let mode = RenderMode::GeometryScene;
        assert_eq!(select_post_effect(mode, true, true, 0.0), PostEffect::DepthDebug);
        assert_eq!(select_post_effect(mode, false, true, 0.0), PostEffect::MotionBlur);
        assert_eq!(select_post_effect(mode, false, false, 1.0), PostEffect::DepthOfField);
    }

    #[test]
    fn planet_only_uses_toon() {
        let mode = RenderMode::PlanetGeometryScene;
        assert_eq!(select_post_effect(mode, true, true, 1.0), PostEffect::Toon);
    }

    #[test]
    fn directional_blur_only_over_the_forest() {
        let forest = RenderMode::FullscreenProcedural(AnalyticScene::Forest);
        let water = RenderMode::FullscreenProcedural(AnalyticScene::Water);
        assert_eq!(select_post_effect(forest, false, false, 0.0), PostEffect::None);
        assert_eq!(
            select_post_effect(forest, false, false, 0.3),
            PostEffect::DirectionalBlur
        );
        assert_eq!(select_post_effect(water, false, false, 0.3), PostEffect::None);
    }

    #[test]
    fn fog_density_hits_target_at_far_plane() {
        let density = fog_density(0.1, 100.0);
        assert!((density - 0.019_779).abs() < 1e-5);
        let transmittance = (-(density * 100.0).powi(2)).exp();
        assert!((transmittance - FOG_TARGET_TRANSMITTANCE).abs() < 1e-5);
        assert_eq!(fog_density(10.0, 5.0), 0.0);
    }

    #[test]
    fn shadow_caster_prefers_directional() {
        let lights = [
            light(LightKind::Point, Vec3::ZERO),
            light(LightKind::Directional, Vec3::NEG_Y),
        ];
        assert_eq!(shadow_caster(&lights), Some(1));
        assert_eq!(shadow_caster(&lights[..1]), Some(0));
        assert_eq!(shadow_caster(&[]), None);
    }

    #[test]
    fn light_space_maps_origin_into_depth_range() {
        let sun = light(LightKind::Directional, Vec3::new(-0.4, -1.0, -0.3));
        let clip = light_space_matrix(&sun).project_point3(Vec3::ZERO);
        assert!(clip.x.abs() < 1e-5 && clip.y.abs() < 1e-5);
        let expected = (SHADOW_DISTANCE - SHADOW_NEAR) / (SHADOW_FAR - SHADOW_NEAR);
        assert!((clip.z - expected).abs() < 1e-4);

        let straight_down = light(LightKind::Directional, Vec3::NEG_Y);
        assert!(light_space_matrix(&straight_down).is_finite());
    }
}
