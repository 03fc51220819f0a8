//! Per-tick camera integration: WASD movement, sprint smoothing, the
//! sprint-blur unlock timer and mouse look.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::input::{InputState, KeyCode};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    /// World units per second without sprint.
    pub base_speed: f32,
    /// Maximum sprint bonus; speed is `base * (1 + accumulator)`.
    pub sprint_cap: f32,
    /// Accumulator gain per second while sprint is held.
    pub sprint_acceleration: f32,
    /// Accumulator loss per second after release.
    pub sprint_decay: f32,
    /// Radians of rotation per pixel of mouse drag.
    pub mouse_sensitivity: f32,
    /// Sprint hold time before the blur starts to ramp in.
    pub blur_delay: f32,
    /// Time the blur takes to ramp from zero to full.
    pub blur_ramp: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            base_speed: 5.0,
            sprint_cap: 2.0,
            sprint_acceleration: 1.5,
            sprint_decay: 2.0,
            mouse_sensitivity: 0.005,
            blur_delay: 2.0,
            blur_ramp: 2.0,
        }
    }
}

/// Sprint accumulator plus the hold timer that unlocks speed blur.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SprintState {
    accumulator: f32,
    hold_time: f32,
    ramp: f32,
    blur_unlocked: bool,
}

impl SprintState {
    pub fn update(&mut self, held: bool, dt: f32, config: &MovementConfig) {
        let dt = dt.max(0.0);
        if held {
            self.accumulator += config.sprint_acceleration * dt;
            self.hold_time += dt;
            if self.hold_time >= config.blur_delay {
                self.blur_unlocked = true;
                let ramp = if config.blur_ramp > 0.0 {
                    (self.hold_time - config.blur_delay) / config.blur_ramp
                } else {
                    1.0
                };
                self.ramp = self.ramp.max(ramp.clamp(0.0, 1.0));
            }
        } else {
            self.accumulator -= config.sprint_decay * dt;
            self.hold_time = 0.0;
        }
        self.accumulator = self.accumulator.clamp(0.0, config.sprint_cap);

        if self.accumulator <= 0.0 && !held {
            self.ramp = 0.0;
            self.blur_unlocked = false;
        }
    }

    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    pub fn speed(&self, config: &MovementConfig) -> f32 {
        config.base_speed * (1.0 + self.accumulator)
    }

    /// How far between base and top speed the camera currently is, in `[0, 1]`.
    pub fn speed_fraction(&self, config: &MovementConfig) -> f32 {
        if config.sprint_cap <= 0.0 {
            return 0.0;
        }
        (self.accumulator / config.sprint_cap).clamp(0.0, 1.0)
    }

    pub fn ramp(&self) -> f32 {
        self.ramp
    }

    /// Strength of the directional speed blur in `[0, 1]`.
    pub fn blur_strength(&self, config: &MovementConfig) -> f32 {
        self.speed_fraction(config) * self.ramp
    }

    pub fn blur_unlocked(&self) -> bool {
        self.blur_unlocked
    }
}

/// What one tick did to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickMotion {
    pub displacement: Vec3,
    pub rotated: bool,
    pub speed: f32,
}

/// Drives one camera from sampled input.
#[derive(Debug, Clone, Default)]
pub struct CameraController {
    config: MovementConfig,
    sprint: SprintState,
}

impl CameraController {
    pub fn new(config: MovementConfig) -> Self {
        Self {
            config,
            sprint: SprintState::default(),
        }
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    pub fn sprint(&self) -> &SprintState {
        &self.sprint
    }

    pub fn speed(&self) -> f32 {
        self.sprint.speed(&self.config)
    }

    pub fn tick(&mut self, dt: f32, input: &mut InputState, camera: &mut Camera) -> TickMotion {
        self.sprint.update(input.is_sprinting(), dt, &self.config);
        let speed = self.sprint.speed(&self.config);

        let direction = movement_direction(input, camera);
        let displacement = direction * speed * dt.max(0.0);
        if displacement != Vec3::ZERO {
            camera.set_position(camera.position() + displacement);
        }

        let drag = input.take_drag_delta();
        let rotated = drag != glam::Vec2::ZERO;
        if rotated {
            let sensitivity = self.config.mouse_sensitivity;
            camera.rotate(-drag.x * sensitivity, -drag.y * sensitivity);
        }

        TickMotion {
            displacement,
            rotated,
            speed,
        }
    }
}

/// Unit direction requested by the held movement keys: horizontal axes
/// follow the camera basis, vertical movement follows world up.
pub fn movement_direction(input: &InputState, camera: &Camera) -> Vec3 {
    let look = camera.look();
    let right = camera.right();
    let mut direction = Vec3::ZERO;
    if input.is_key_down(KeyCode::FORWARD) {
        direction += look;
    }
    if input.is_key_down(KeyCode::BACK) {
        direction -= look;
    }
    if input.is_key_down(KeyCode::LEFT) {
        direction -= right;
    }
    if input.is_key_down(KeyCode::RIGHT) {
        direction += right;
    }
    if input.is_key_down(KeyCode::UP) {
        direction += Vec3::Y;
    }
    if input.is_descending() {
        direction -= Vec3::Y;
    }
    direction.normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{MouseButton, NamedKey};
    use glam::Vec2;

    const SHIFT: KeyCode = KeyCode::Named(NamedKey::LeftShift);

    #[test]
    fn accumulator_stays_within_bounds() {
        let config = MovementConfig::default();
        let mut sprint = SprintState::default();
        for _ in 0..1000 {
            sprint.update(true, 0.1, &config);
            assert!(sprint.accumulator() <= config.sprint_cap);
        }
        assert_eq!(sprint.accumulator(), 2.0);
        assert_eq!(sprint.speed(&config), 15.0);
        for _ in 0..1000 {
            sprint.update(false, 0.1, &config);
            assert!(sprint.accumulator() >= 0.0);
        }
        assert_eq!(sprint.accumulator(), 0.0);
    }

    #[test]
    fn blur_ramps_after_delay_and_holds_until_base_speed() {
        let config = MovementConfig::default();
        let mut sprint = SprintState::default();
        sprint.update(true, 1.5, &config);
        assert_eq!(sprint.ramp(), 0.0);
        assert!(!sprint.blur_unlocked());

        sprint.update(true, 1.5, &config);
        assert!(sprint.blur_unlocked());
        assert!((sprint.ramp() - 0.5).abs() < 1e-6);

        sprint.update(true, 2.0, &config);
        assert_eq!(sprint.ramp(), 1.0);

        sprint.update(false, 0.5, &config);
        assert_eq!(sprint.ramp(), 1.0);
        assert!(sprint.blur_unlocked());
        assert!(sprint.blur_strength(&config) < 1.0);

        sprint.update(false, 5.0, &config);
        assert_eq!(sprint.ramp(), 0.0);
        assert!(!sprint.blur_unlocked());
    }

    #[test]
    fn tapping_sprint_never_unlocks_blur() {
        let config = MovementConfig::default();
        let mut sprint = SprintState::default();
        for _ in 0..20 {
            sprint.update(true, 0.5, &config);
            sprint.update(false, 0.1, &config);
        }
        assert!(!sprint.blur_unlocked());
        assert_eq!(sprint.ramp(), 0.0);
    }

    #[test]
    fn diagonal_movement_is_not_faster() {
        let mut controller = CameraController::default();
        let mut camera = Camera::new();
        let mut input = InputState::new();
        input.set_key_down(KeyCode::FORWARD);
        input.set_key_down(KeyCode::RIGHT);
        let motion = controller.tick(0.5, &mut input, &mut camera);
        assert!((motion.displacement.length() - 2.5).abs() < 1e-5);
    }

    #[test]
    fn vertical_keys_use_world_up() {
        let mut controller = CameraController::default();
        let mut camera = Camera::new();
        camera.set_look(Vec3::new(0.0, -1.0, -1.0));
        let mut input = InputState::new();
        input.set_key_down(KeyCode::UP);
        let start = camera.position();
        controller.tick(1.0, &mut input, &mut camera);
        assert!((camera.position() - start).abs_diff_eq(Vec3::new(0.0, 5.0, 0.0), 1e-5));
    }

    #[test]
    fn sprint_speeds_up_movement() {
        let mut controller = CameraController::default();
        let mut camera = Camera::new();
        let mut input = InputState::new();
        input.set_key_down(KeyCode::FORWARD);
        input.set_key_down(SHIFT);
        controller.tick(1.0, &mut input, &mut camera);
        assert!((controller.speed() - 12.5).abs() < 1e-5);
    }

    #[test]
    fn mouse_drag_yaws_the_camera() {
        let mut controller = CameraController::default();
        let mut camera = Camera::new();
        let mut input = InputState::new();
        input.set_mouse_button_down(MouseButton::LEFT);
        input.set_mouse_position(Vec2::ZERO);
        input.set_mouse_position(Vec2::new(-100.0, 0.0));
        let motion = controller.tick(0.016, &mut input, &mut camera);
        assert!(motion.rotated);
        assert!(camera.look().x < 0.0);
        assert!((camera.look().length() - 1.0).abs() < 1e-5);
    }
}
