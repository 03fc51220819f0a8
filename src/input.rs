use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
    Function(u8),
}

impl KeyCode {
    pub const FORWARD: Self = Self::Character('W');
    pub const BACK: Self = Self::Character('S');
    pub const LEFT: Self = Self::Character('A');
    pub const RIGHT: Self = Self::Character('D');
    pub const UP: Self = Self::Named(NamedKey::Space);
    pub const TOGGLE_PORTAL: Self = Self::Character('O');
    pub const SWAP_SCENE: Self = Self::Character('P');
    pub const DEPTH_DEBUG: Self = Self::Function(3);
    pub const CAPTURE: Self = Self::Function(12);
    /// Walking forward through the portal pushes into it.
    pub const TRAVERSE: Self = Self::FORWARD;
}

/// Non-printing keys the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Space,
    Escape,
    LeftShift,
    RightShift,
    LeftAlt,
    RightAlt,
}

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);

    pub fn new(index: u8) -> Self {
        Self(index)
    }
}

/// Held keys and mouse-drag state sampled by the simulation each tick.
#[derive(Debug, Default)]
pub struct InputState {
    keys: HashSet<KeyCode>,
    mouse_buttons: HashSet<MouseButton>,
    mouse_position: Vec2,
    drag_delta: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&mut self, key: KeyCode) {
        self.keys.insert(key);
    }

    pub fn set_key_up(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    pub fn set_mouse_button_down(&mut self, button: MouseButton) {
        self.mouse_buttons.insert(button);
    }

    pub fn set_mouse_button_up(&mut self, button: MouseButton) {
        self.mouse_buttons.remove(&button);
    }

    /// Records the cursor position; movement while the left button is held
    /// accumulates as drag distance.
    pub fn set_mouse_position(&mut self, position: Vec2) {
        if self.is_mouse_button_down(MouseButton::LEFT) {
            self.drag_delta += position - self.mouse_position;
        }
        self.mouse_position = position;
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    pub fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons.contains(&button)
    }

    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    pub fn is_sprinting(&self) -> bool {
        self.is_key_down(KeyCode::Named(NamedKey::LeftShift))
            || self.is_key_down(KeyCode::Named(NamedKey::RightShift))
    }

    pub fn is_descending(&self) -> bool {
        self.is_key_down(KeyCode::Named(NamedKey::LeftAlt))
            || self.is_key_down(KeyCode::Named(NamedKey::RightAlt))
    }

    /// Drag distance in pixels since the last call.
    pub fn take_drag_delta(&mut self) -> Vec2 {
        std::mem::take(&mut self.drag_delta)
    }

    pub fn release_all(&mut self) {
        self.keys.clear();
        self.mouse_buttons.clear();
        self.drag_delta = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_state_tracks_keys() {
        let mut state = InputState::new();
        state.set_key_down(KeyCode::Named(NamedKey::Space));
        assert!(state.is_key_down(KeyCode::UP));
        state.set_key_up(KeyCode::Named(NamedKey::Space));
        assert!(!state.is_key_down(KeyCode::UP));
    }

    #[test]
    fn drag_only_accumulates_while_left_button_held() {
        let mut state = InputState::new();
        state.set_mouse_position(Vec2::new(10.0, 10.0));
        state.set_mouse_position(Vec2::new(30.0, 10.0));
        assert_eq!(state.take_drag_delta(), Vec2::ZERO);

        state.set_mouse_button_down(MouseButton::LEFT);
        state.set_mouse_position(Vec2::new(35.0, 4.0));
        state.set_mouse_position(Vec2::new(40.0, 2.0));
        assert_eq!(state.take_drag_delta(), Vec2::new(10.0, -8.0));
        assert_eq!(state.take_drag_delta(), Vec2::ZERO);
    }

    #[test]
    fn either_shift_key_sprints() {
        let mut state = InputState::new();
        state.set_key_down(KeyCode::Named(NamedKey::RightShift));
        assert!(state.is_sprinting());
        state.release_all();
        assert!(!state.is_sprinting());
    }
}
