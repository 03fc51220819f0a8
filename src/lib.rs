//! Interactive real-time renderer.
//!
//! Scene descriptions are flattened into [`render_data::RenderData`],
//! tessellated into a single [`geometry::GeometryBatch`] and handed to a
//! multi-pass wgpu [`Renderer`] together with the camera and portal state
//! the [`Engine`] advances each tick. Everything above the `render` and `app`
//! modules is plain CPU code and can run without a GPU or a display.

pub mod app;
pub mod camera;
pub mod engine;
pub mod geometry;
pub mod input;
pub mod obj;
pub mod portal;
pub mod procedural;
pub mod render;
pub mod render_data;
pub mod scene;
pub mod settings;
pub mod shapes;
pub mod simulation;
pub mod terrain;

pub use app::{run_window, WindowInitError, WindowOptions};
pub use camera::{Camera, CameraData};
pub use engine::{Engine, EngineConfig, Frame, Summary, TickOutcome};
pub use geometry::{DrawItem, GeometryBatch, GeometryBuilder};
pub use input::{InputState, KeyCode, MouseButton, NamedKey};
pub use obj::{load_obj, load_obj_from_str};
pub use render::{
    CapturedImage, GpuContext, PostEffect, RenderMode, Renderer, WindowSurface, MAX_LIGHTS,
};
pub use render_data::{LightData, RenderData, ShapeData};
pub use scene::{SceneDescription, SceneError};
pub use settings::{FullscreenScene, Settings, SettingsHandle};
pub use shapes::{PrimitiveKind, Vertex};
