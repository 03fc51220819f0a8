//! Interactive window driving an [`Engine`] at roughly 60 Hz.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use glam::{UVec2, Vec2};
use log::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{
    ElementState, KeyEvent, MouseButton as WinitMouseButton, StartCause, WindowEvent,
};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode as WinitKey, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::engine::Engine;
use crate::input::{KeyCode, MouseButton, NamedKey};
use crate::render::{GpuContext, Renderer, WindowSurface};

const TICK: Duration = Duration::from_millis(16);

/// Raised when no window or presentable device could be created, so the
/// caller can fall back to headless output.
#[derive(Debug)]
pub struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

#[derive(Debug, Clone)]
pub struct WindowOptions {
    pub title: String,
    pub size: UVec2,
    /// Directory F12 captures are written to.
    pub capture_dir: PathBuf,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "Lumen".into(),
            size: UVec2::new(1280, 720),
            capture_dir: PathBuf::from("."),
        }
    }
}

struct Presenter {
    surface: WindowSurface,
    gpu: GpuContext,
    renderer: Renderer,
}

struct App<'a> {
    engine: &'a mut Engine,
    options: WindowOptions,
    presenter: Option<Presenter>,
    last_tick: Instant,
    error: Option<anyhow::Error>,
}

/// Opens a window and runs until it is closed or Escape is pressed.
pub fn run_window(engine: &mut Engine, options: WindowOptions) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + TICK));

    let mut app = App {
        engine,
        options,
        presenter: None,
        last_tick: Instant::now(),
        error: None,
    };
    event_loop
        .run_app(&mut app)
        .map_err(|err| anyhow!("event loop failed: {err}"))?;

    match app.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

impl App<'_> {
    fn create_presenter(&self, event_loop: &ActiveEventLoop) -> Result<Presenter> {
        let attributes = Window::default_attributes()
            .with_title(self.options.title.clone())
            .with_inner_size(LogicalSize::new(
                self.options.size.x as f64,
                self.options.size.y as f64,
            ));
        let window = event_loop
            .create_window(attributes)
            .map_err(|err| WindowInitError::from_error("window", err))?;
        let (surface, gpu) = WindowSurface::new(Arc::new(window))
            .map_err(|err| WindowInitError::from_error("renderer", format!("{err:#}")))?;
        let renderer = Renderer::new(&gpu, surface.format());
        Ok(Presenter {
            surface,
            gpu,
            renderer,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.error = Some(err);
        event_loop.exit();
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let Some(key) = map_keycode(code) else {
            return;
        };
        match event.state {
            ElementState::Pressed if event.repeat => {}
            ElementState::Pressed => match key {
                KeyCode::Named(NamedKey::Escape) => event_loop.exit(),
                KeyCode::CAPTURE => self.capture(),
                key => self.engine.on_key_pressed(key),
            },
            ElementState::Released => self.engine.on_key_released(key),
        }
    }

    fn capture(&mut self) {
        let Some(presenter) = self.presenter.as_mut() else {
            return;
        };
        let path = self
            .options
            .capture_dir
            .join(format!("lumen-{:05}.png", self.engine.frame_index()));
        let size = self.engine.viewport();
        let result = presenter
            .renderer
            .capture(&presenter.gpu, &self.engine.frame(), size)
            .and_then(|image| image.save_png(&path));
        if let Err(err) = result {
            error!("capture failed: {err:?}");
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;
        self.engine.tick(dt);

        let Some(presenter) = self.presenter.as_mut() else {
            return;
        };
        let output = match presenter.surface.acquire() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                presenter.surface.reconfigure(&presenter.gpu.device);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.fail(event_loop, anyhow!("GPU is out of memory"));
                return;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                info!("surface timeout; retrying next frame");
                return;
            }
            Err(err) => {
                warn!("skipping frame: {err}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        presenter
            .renderer
            .render(&presenter.gpu, &self.engine.frame(), &view);
        presenter.surface.window().pre_present_notify();
        output.present();
        self.engine.end_frame();
    }
}

impl ApplicationHandler for App<'_> {
    fn new_events(&mut self, event_loop: &ActiveEventLoop, cause: StartCause) {
        if let StartCause::ResumeTimeReached { .. } = cause {
            if let Some(presenter) = &self.presenter {
                presenter.surface.window().request_redraw();
            }
            event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + TICK));
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.presenter.is_some() {
            return;
        }
        match self.create_presenter(event_loop) {
            Ok(presenter) => {
                let size = presenter.surface.size();
                self.engine.on_viewport_resized(size.width, size.height);
                self.last_tick = Instant::now();
                presenter.surface.window().request_redraw();
                self.presenter = Some(presenter);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(presenter) = self.presenter.as_mut() {
                    presenter.surface.resize(&presenter.gpu.device, size);
                }
                self.engine.on_viewport_resized(size.width, size.height);
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            WindowEvent::MouseInput { state, button, .. } => {
                let button = MouseButton::new(match button {
                    WinitMouseButton::Left => 0,
                    WinitMouseButton::Right => 1,
                    WinitMouseButton::Middle => 2,
                    WinitMouseButton::Back => 3,
                    WinitMouseButton::Forward => 4,
                    WinitMouseButton::Other(value) => value.min(u8::MAX as u16) as u8,
                });
                match state {
                    ElementState::Pressed => self.engine.on_mouse_pressed(button),
                    ElementState::Released => self.engine.on_mouse_released(button),
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.engine
                    .on_mouse_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::Focused(false) => self.engine.on_focus_lost(),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

pub fn map_keycode(code: WinitKey) -> Option<KeyCode> {
    Some(match code {
        WinitKey::Space => KeyCode::Named(NamedKey::Space),
        WinitKey::Escape => KeyCode::Named(NamedKey::Escape),
        WinitKey::ShiftLeft => KeyCode::Named(NamedKey::LeftShift),
        WinitKey::ShiftRight => KeyCode::Named(NamedKey::RightShift),
        WinitKey::AltLeft => KeyCode::Named(NamedKey::LeftAlt),
        WinitKey::AltRight => KeyCode::Named(NamedKey::RightAlt),
        WinitKey::KeyA => KeyCode::Character('A'),
        WinitKey::KeyD => KeyCode::Character('D'),
        WinitKey::KeyO => KeyCode::Character('O'),
        WinitKey::KeyP => KeyCode::Character('P'),
        WinitKey::KeyS => KeyCode::Character('S'),
        WinitKey::KeyW => KeyCode::Character('W'),
        WinitKey::F1 => KeyCode::Function(1),
        WinitKey::F2 => KeyCode::Function(2),
        WinitKey::F3 => KeyCode::Function(3),
        WinitKey::F4 => KeyCode::Function(4),
        WinitKey::F5 => KeyCode::Function(5),
        WinitKey::F6 => KeyCode::Function(6),
        WinitKey::F7 => KeyCode::Function(7),
        WinitKey::F8 => KeyCode::Function(8),
        WinitKey::F9 => KeyCode::Function(9),
        WinitKey::F10 => KeyCode::Function(10),
        WinitKey::F11 => KeyCode::Function(11),
        WinitKey::F12 => KeyCode::Function(12),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_map_to_engine_keys() {
        assert_eq!(map_keycode(WinitKey::KeyW), Some(KeyCode::FORWARD));
        assert_eq!(map_keycode(WinitKey::KeyO), Some(KeyCode::TOGGLE_PORTAL));
        assert_eq!(map_keycode(WinitKey::KeyP), Some(KeyCode::SWAP_SCENE));
        assert_eq!(map_keycode(WinitKey::F3), Some(KeyCode::DEPTH_DEBUG));
        assert_eq!(map_keycode(WinitKey::F12), Some(KeyCode::CAPTURE));
        assert_eq!(map_keycode(WinitKey::Space), Some(KeyCode::UP));
        assert_eq!(map_keycode(WinitKey::KeyZ), None);
    }

    #[test]
    fn window_errors_carry_the_stage() {
        let err = WindowInitError::from_error("window", "no display");
        assert_eq!(err.to_string(), "failed to initialize window: no display");
        let panic = WindowInitError::from_panic("event loop", Box::new("boom"));
        assert_eq!(panic.to_string(), "failed to initialize event loop: boom");
    }
}
