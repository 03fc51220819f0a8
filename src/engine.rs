//! The owning context that ties settings, loaded content, cameras and the
//! per-tick simulation together.
//!
//! A UI layer drives the engine through a handful of explicit entry points
//! (`on_settings_changed`, `on_scene_load_requested`, `on_viewport_resized`,
//! key and mouse events, `tick`) and hands [`Engine::frame`] to the
//! renderer once per redraw.

use std::fmt;
use std::path::{Path, PathBuf};

use glam::{Mat4, UVec2, Vec2, Vec3, Vec4};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::geometry::{BuildParams, GeometryBatch, GeometryBuilder, LodConfig, LodTracker};
use crate::input::{InputState, KeyCode, MouseButton};
use crate::portal::{Portal, PortalConfig, PortalPlacement};
use crate::procedural::{self, ProceduralScene};
use crate::render::{
    fog_density, render_mode, select_post_effect, AnalyticScene, PostEffect, RenderMode,
    MAX_LIGHTS,
};
use crate::render_data::{LightData, RenderData};
use crate::scene::{GlobalData, SceneDescription};
use crate::settings::{FullscreenScene, Settings, SettingsHandle};
use crate::simulation::{CameraController, MovementConfig};
use crate::terrain::{TerrainConfig, TerrainGenerator};

/// Tunables of every engine subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub movement: MovementConfig,
    pub portal: PortalConfig,
    pub lod: LodConfig,
    pub terrain: TerrainConfig,
}

/// Which geometry the batch currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Content {
    Empty,
    Terrain,
    Planet,
    Scene,
}

fn content_for(mode: RenderMode, settings: &Settings) -> Content {
    match mode {
        RenderMode::FullscreenProcedural(_) => Content::Empty,
        RenderMode::PlanetGeometryScene => Content::Planet,
        RenderMode::GeometryScene if settings.has_scene() => Content::Scene,
        RenderMode::GeometryScene => Content::Terrain,
    }
}

/// What a tick did, for callers that schedule redraws.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickOutcome {
    pub moved: bool,
    pub portal_transition: bool,
    pub geometry_rebuilt: bool,
}

/// Second scene drawn into the portal target.
#[derive(Debug, Clone, Copy)]
pub struct PortalView<'a> {
    pub scene: AnalyticScene,
    pub camera: &'a Camera,
    pub model: Mat4,
    /// World-space quad as two triangles with UVs.
    pub quad: [(Vec3, Vec2); 6],
}

/// Everything one redraw needs, borrowed from the engine.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub mode: RenderMode,
    pub post: PostEffect,
    pub settings: &'a Settings,
    pub camera: &'a Camera,
    pub view: Mat4,
    pub projection: Mat4,
    pub prev_view: Mat4,
    pub prev_projection: Mat4,
    pub time: f32,
    pub prev_time: f32,
    pub frame_index: u64,
    pub globals: GlobalData,
    pub lights: &'a [LightData],
    pub batch: &'a GeometryBatch,
    pub cull_back_faces: bool,
    pub fog_density: f32,
    pub sky_texture: Option<&'a Path>,
    pub portal: Option<PortalView<'a>>,
    pub directional_blur: f32,
    /// Cursor and click position in pixels with the origin bottom-left.
    pub mouse: Vec4,
    pub viewport: UVec2,
}

/// Counts reported by the headless summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub mode: RenderMode,
    pub draw_items: usize,
    pub vertices: u32,
    pub lights: usize,
    pub uploaded_lights: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            RenderMode::FullscreenProcedural(AnalyticScene::Forest) => "fullscreen (forest)",
            RenderMode::FullscreenProcedural(AnalyticScene::Water) => "fullscreen (water)",
            RenderMode::PlanetGeometryScene => "planet",
            RenderMode::GeometryScene => "geometry",
        };
        writeln!(f, "Mode: {mode}")?;
        writeln!(
            f,
            "Built {} draw items ({} vertices)",
            self.draw_items, self.vertices
        )?;
        write!(
            f,
            "Lights: {} ({} uploaded)",
            self.lights, self.uploaded_lights
        )
    }
}

pub struct Engine {
    settings: SettingsHandle,
    current: Settings,
    scene: RenderData,
    builder: GeometryBuilder,
    terrain: TerrainGenerator,
    content: Option<Content>,
    batch: GeometryBatch,
    globals: GlobalData,
    lights: Vec<LightData>,
    primary: Camera,
    secondary: Camera,
    controller: CameraController,
    input: InputState,
    portal: Portal,
    lod_tracker: LodTracker,
    viewport: UVec2,
    time: f32,
    prev_time: f32,
    frame_index: u64,
    prev_view: Mat4,
    prev_projection: Mat4,
    depth_debug: bool,
}

impl Engine {
    pub fn new(settings: SettingsHandle) -> Self {
        Self::with_config(settings, EngineConfig::default())
    }

    pub fn with_config(settings: SettingsHandle, config: EngineConfig) -> Self {
        let current = settings.snapshot();
        let primary = Camera::new();
        let mut engine = Self {
            settings,
            current,
            scene: RenderData::default(),
            builder: GeometryBuilder::new(config.lod),
            terrain: TerrainGenerator::new(config.terrain),
            content: None,
            batch: GeometryBatch::new(),
            globals: GlobalData::default(),
            lights: Vec::new(),
            prev_view: primary.view_matrix(),
            prev_projection: primary.projection_matrix(),
            secondary: primary.clone(),
            primary,
            controller: CameraController::new(config.movement),
            input: InputState::new(),
            portal: Portal::new(config.portal),
            lod_tracker: LodTracker::new(config.lod.rebuild_distance),
            viewport: UVec2::ONE,
            time: 0.0,
            prev_time: 0.0,
            frame_index: 0,
            depth_debug: false,
        };
        engine.apply_clip_planes();
        if let Some(path) = engine.scene_path() {
            engine.load_scene(&path);
        }
        engine.sync_content();
        engine
    }

    pub fn settings(&self) -> &Settings {
        &self.current
    }

    pub fn settings_handle(&self) -> &SettingsHandle {
        &self.settings
    }

    pub fn mode(&self) -> RenderMode {
        render_mode(&self.current)
    }

    pub fn batch(&self) -> &GeometryBatch {
        &self.batch
    }

    pub fn lights(&self) -> &[LightData] {
        &self.lights
    }

    pub fn globals(&self) -> GlobalData {
        self.globals
    }

    pub fn portal(&self) -> &Portal {
        &self.portal
    }

    pub fn controller(&self) -> &CameraController {
        &self.controller
    }

    pub fn depth_debug(&self) -> bool {
        self.depth_debug
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn viewport(&self) -> UVec2 {
        self.viewport
    }

    /// Camera driven by input: the second camera belongs to the water scene.
    pub fn active_camera(&self) -> &Camera {
        match self.mode() {
            RenderMode::FullscreenProcedural(AnalyticScene::Water) => &self.secondary,
            _ => &self.primary,
        }
    }

    fn camera_for(&self, scene: AnalyticScene) -> &Camera {
        match scene {
            AnalyticScene::Forest => &self.primary,
            AnalyticScene::Water => &self.secondary,
        }
    }

    fn scene_path(&self) -> Option<PathBuf> {
        if self.current.has_scene() {
            self.current.scene_path.clone()
        } else {
            None
        }
    }

    /// Re-reads the shared settings and applies whatever changed.
    pub fn on_settings_changed(&mut self) {
        let next = self.settings.snapshot();
        if next == self.current {
            return;
        }
        let previous = std::mem::replace(&mut self.current, next);
        self.apply_clip_planes();

        if previous.scene_path != self.current.scene_path {
            match self.scene_path() {
                Some(path) => self.load_scene(&path),
                None => self.unload_scene(),
            }
            self.content = None;
        } else if self.current.geometry_differs(&previous) && self.content == Some(Content::Scene)
        {
            self.content = None;
        }
        self.sync_content();
    }

    /// Loads (or reloads) a scene file and makes it the current scene.
    pub fn on_scene_load_requested(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.settings
            .update(|settings| settings.scene_path = Some(path.clone()));
        self.current.scene_path = Some(path.clone());
        self.load_scene(&path);
        self.content = None;
        self.sync_content();
    }

    pub fn on_viewport_resized(&mut self, width: u32, height: u32) {
        self.viewport = UVec2::new(width.max(1), height.max(1));
        let aspect = self.viewport.x as f32 / self.viewport.y as f32;
        self.primary.set_aspect(aspect);
        self.secondary.set_aspect(aspect);
    }

    pub fn on_key_pressed(&mut self, key: KeyCode) {
        match key {
            KeyCode::DEPTH_DEBUG => {
                self.depth_debug = !self.depth_debug;
                info!("depth debug {}", on_off(self.depth_debug));
            }
            KeyCode::TOGGLE_PORTAL => self.toggle_portal(),
            KeyCode::SWAP_SCENE => self.swap_fullscreen_scene(),
            _ => self.input.set_key_down(key),
        }
    }

    pub fn on_key_released(&mut self, key: KeyCode) {
        self.input.set_key_up(key);
    }

    pub fn on_mouse_pressed(&mut self, button: MouseButton) {
        self.input.set_mouse_button_down(button);
    }

    pub fn on_mouse_released(&mut self, button: MouseButton) {
        self.input.set_mouse_button_up(button);
    }

    pub fn on_mouse_moved(&mut self, position: Vec2) {
        self.input.set_mouse_position(position);
    }

    /// Drops held keys, e.g. when the window loses focus.
    pub fn on_focus_lost(&mut self) {
        self.input.release_all();
    }

    /// Advances time, moves the active camera, runs portal traversal and
    /// rebuilds distance LOD when the camera has moved far enough.
    pub fn tick(&mut self, dt: f32) -> TickOutcome {
        self.on_settings_changed();
        let dt = dt.max(0.0);
        self.time += dt;

        let mode = self.mode();
        let camera = match mode {
            RenderMode::FullscreenProcedural(AnalyticScene::Water) => &mut self.secondary,
            _ => &mut self.primary,
        };
        let motion = self.controller.tick(dt, &mut self.input, camera);
        let mut outcome = TickOutcome {
            moved: motion.displacement != Vec3::ZERO || motion.rotated,
            ..TickOutcome::default()
        };

        if let RenderMode::FullscreenProcedural(scene) = mode {
            let camera = match scene {
                AnalyticScene::Forest => &self.primary,
                AnalyticScene::Water => &self.secondary,
            };
            self.portal.follow(camera);
            let on_portal = self.portal.pick(camera).is_some();
            let pushing = self.input.is_key_down(KeyCode::TRAVERSE);
            if self.portal.update(dt, pushing, on_portal, motion.speed) {
                self.traverse_portal(scene);
                outcome.portal_transition = true;
            }
        }

        if self.current.distance_lod
            && self.content == Some(Content::Scene)
            && !self.scene.shapes.is_empty()
            && self.lod_tracker.should_rebuild(self.primary.position())
        {
            self.rebuild_scene_geometry();
            outcome.geometry_rebuilt = true;
        }
        outcome
    }

    /// Snapshot of the state the renderer needs for one redraw.
    pub fn frame(&self) -> Frame<'_> {
        let mode = self.mode();
        let camera = self.active_camera();
        let directional_blur = match mode {
            RenderMode::FullscreenProcedural(AnalyticScene::Forest) => self
                .controller
                .sprint()
                .blur_strength(self.controller.config()),
            _ => 0.0,
        };
        let motion_blur = self.current.motion_blur || self.controller.sprint().blur_unlocked();
        let post = select_post_effect(mode, self.depth_debug, motion_blur, directional_blur);

        let portal = match mode {
            RenderMode::FullscreenProcedural(scene) if self.portal.is_enabled() => {
                let partner = scene.partner();
                Some(PortalView {
                    scene: partner,
                    camera: self.camera_for(partner),
                    model: self.portal.model(),
                    quad: self.portal.quad_vertices(),
                })
            }
            _ => None,
        };

        let sky_texture = match mode {
            RenderMode::PlanetGeometryScene => self.current.sky_texture.as_deref(),
            _ => None,
        };

        Frame {
            mode,
            post,
            settings: &self.current,
            camera,
            view: camera.view_matrix(),
            projection: camera.projection_matrix(),
            prev_view: self.prev_view,
            prev_projection: self.prev_projection,
            time: self.time,
            prev_time: self.prev_time,
            frame_index: self.frame_index,
            globals: self.globals,
            lights: &self.lights,
            batch: &self.batch,
            cull_back_faces: self.current.has_scene(),
            fog_density: fog_density(self.current.near_plane, self.current.far_plane),
            sky_texture,
            portal,
            directional_blur,
            mouse: self.shader_mouse(),
            viewport: self.viewport,
        }
    }

    /// Rolls current matrices into the previous-frame slots after a redraw.
    pub fn end_frame(&mut self) {
        let camera = self.active_camera();
        let (view, projection) = (camera.view_matrix(), camera.projection_matrix());
        self.prev_view = view;
        self.prev_projection = projection;
        self.batch.end_frame();
        self.prev_time = self.time;
        self.frame_index += 1;
    }

    pub fn summary(&self) -> Summary {
        Summary {
            mode: self.mode(),
            draw_items: self.batch.draws.len(),
            vertices: self.batch.vertex_count(),
            lights: self.lights.len(),
            uploaded_lights: self.lights.len().min(MAX_LIGHTS),
        }
    }

    fn shader_mouse(&self) -> Vec4 {
        let position = self.input.mouse_position();
        let flipped = Vec2::new(position.x, self.viewport.y as f32 - position.y);
        let click = if self.input.is_mouse_button_down(MouseButton::LEFT) {
            flipped
        } else {
            Vec2::ZERO
        };
        Vec4::new(flipped.x, flipped.y, click.x, click.y)
    }

    fn apply_clip_planes(&mut self) {
        let (near, far) = (self.current.near_plane, self.current.far_plane);
        self.primary.set_clip_planes(near, far);
        self.secondary.set_clip_planes(near, far);
    }

    fn load_scene(&mut self, path: &Path) {
        self.builder.clear_cache();
        self.lod_tracker.reset();
        match SceneDescription::load(path) {
            Ok(description) => {
                self.scene = RenderData::from_scene(&description);
                self.primary.set_from_scene(&self.scene.camera);
                info!(
                    "loaded scene {} ({} shapes, {} lights)",
                    path.display(),
                    self.scene.shapes.len(),
                    self.scene.lights.len()
                );
            }
            Err(err) => {
                warn!("failed to load scene {}: {err}", path.display());
                self.unload_scene();
            }
        }
    }

    fn unload_scene(&mut self) {
        self.scene = RenderData::default();
        self.batch = GeometryBatch::new();
        self.lights.clear();
    }

    /// Rebuilds the batch if the mode now calls for different content.
    fn sync_content(&mut self) {
        let wanted = content_for(self.mode(), &self.current);
        if self.content == Some(wanted) {
            return;
        }
        match wanted {
            Content::Empty => {
                self.batch = GeometryBatch::new();
                self.lights.clear();
                self.globals = GlobalData::default();
            }
            Content::Terrain => self.install(procedural::terrain_scene(&self.terrain)),
            Content::Planet => self.install(procedural::planet_scene(&self.terrain)),
            Content::Scene => self.rebuild_scene_geometry(),
        }
        self.content = Some(wanted);
    }

    fn install(&mut self, scene: ProceduralScene) {
        if let Some(camera) = scene.camera {
            self.primary.set_from_scene(&camera);
        }
        self.globals = scene.globals;
        self.lights = scene.lights;
        self.batch = scene.batch;
    }

    fn rebuild_scene_geometry(&mut self) {
        let params = BuildParams {
            param1: self.current.shape_parameter_1,
            param2: self.current.shape_parameter_2,
            population_lod: self.current.population_lod,
            distance_lod: self.current.distance_lod,
            camera_position: self.primary.position(),
        };
        self.batch = self.builder.build(&self.scene.shapes, &params);
        self.lod_tracker.anchor_at(params.camera_position);
        self.globals = self.scene.globals;
        self.lights = self.scene.lights.clone();
        debug!(
            "scene geometry: {} draw items, {} vertices",
            self.batch.draws.len(),
            self.batch.vertex_count()
        );
    }

    fn set_fullscreen_scene(&mut self, scene: FullscreenScene) {
        self.settings
            .update(|settings| settings.fullscreen_scene = scene);
        self.current.fullscreen_scene = scene;
        self.sync_content();
    }

    fn swap_fullscreen_scene(&mut self) {
        let next = match self.current.fullscreen_scene {
            FullscreenScene::Forest => FullscreenScene::Water,
            _ => FullscreenScene::Forest,
        };
        self.set_fullscreen_scene(next);
    }

    fn toggle_portal(&mut self) {
        let enabled = !self.portal.is_enabled();
        self.portal.set_enabled(enabled);
        if enabled {
            let camera = self.active_camera().clone();
            self.portal.place(&camera, PortalPlacement::InFrontOfCamera);
        }
        info!("portal {}", on_off(enabled));
    }

    fn traverse_portal(&mut self, from: AnalyticScene) {
        let to = from.partner();
        self.set_fullscreen_scene(to.as_setting());
        let camera = self.camera_for(to).clone();
        self.portal.place(&camera, PortalPlacement::RecenterOnSwitch);
        info!("stepped through the portal into {to:?}");
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
