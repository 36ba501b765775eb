use bevy::prelude::*;

use crate::engine::MascotEngine;
use crate::physics_core::TickInput;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogicalKey {
    Left,
    Right,
    Jump,
}

impl LogicalKey {
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "jump" | "up" => Some(Self::Jump),
            _ => None,
        }
    }
}

/// Held keys plus jump edges accumulated since the last tick.
///
/// Raw press/release events arrive at any time; the stepper drains one
/// [`TickInput`] per tick.
#[derive(Clone, Debug, Default)]
pub struct InputTracker {
    left: bool,
    right: bool,
    jump: bool,
    jump_pressed: bool,
    jump_released: bool,
}

impl InputTracker {
    pub fn press(&mut self, key: LogicalKey) {
        match key {
            LogicalKey::Left => self.left = true,
            LogicalKey::Right => self.right = true,
            LogicalKey::Jump => {
                // Key repeat while held is not a new press.
                if !self.jump {
                    self.jump_pressed = true;
                }
                self.jump = true;
            }
        }
    }

    pub fn release(&mut self, key: LogicalKey) {
        match key {
            LogicalKey::Left => self.left = false,
            LogicalKey::Right => self.right = false,
            LogicalKey::Jump => {
                if self.jump {
                    self.jump_released = true;
                }
                self.jump = false;
            }
        }
    }

    pub fn is_held(&self, key: LogicalKey) -> bool {
        match key {
            LogicalKey::Left => self.left,
            LogicalKey::Right => self.right,
            LogicalKey::Jump => self.jump,
        }
    }

    /// Current state for one tick; clears the edges.
    pub fn take_tick(&mut self) -> TickInput {
        let input = TickInput {
            left: self.left,
            right: self.right,
            jump_held: self.jump,
            jump_pressed: self.jump_pressed,
            jump_released: self.jump_released,
        };
        self.jump_pressed = false;
        self.jump_released = false;
        input
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            PreUpdate,
            keyboard_to_mascot.run_if(
                resource_exists::<ButtonInput<KeyCode>>.and(resource_exists::<MascotEngine>),
            ),
        );
    }
}

const KEY_BINDINGS: &[(KeyCode, LogicalKey)] = &[
    (KeyCode::KeyA, LogicalKey::Left),
    (KeyCode::ArrowLeft, LogicalKey::Left),
    (KeyCode::KeyD, LogicalKey::Right),
    (KeyCode::ArrowRight, LogicalKey::Right),
    (KeyCode::Space, LogicalKey::Jump),
    (KeyCode::KeyW, LogicalKey::Jump),
    (KeyCode::ArrowUp, LogicalKey::Jump),
];

/// Forward keyboard edges to the engine's tracker
fn keyboard_to_mascot(keyboard: Res<ButtonInput<KeyCode>>, mut engine: ResMut<MascotEngine>) {
    for &(code, key) in KEY_BINDINGS {
        if keyboard.just_pressed(code) {
            engine.key_down(key);
        }
    }
    for &(code, key) in KEY_BINDINGS {
        if keyboard.just_released(code) {
            let still_held = KEY_BINDINGS
                .iter()
                .any(|&(other, k)| k == key && other != code && keyboard.pressed(other));
            if !still_held {
                engine.key_up(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jump_edges_are_consumed_once() {
        let mut t = InputTracker::default();
        t.press(LogicalKey::Jump);
        let first = t.take_tick();
        assert!(first.jump_pressed && first.jump_held);
        let second = t.take_tick();
        assert!(!second.jump_pressed && second.jump_held);
        t.release(LogicalKey::Jump);
        let third = t.take_tick();
        assert!(third.jump_released && !third.jump_held);
        assert!(!t.take_tick().jump_released);
    }

    #[test]
    fn key_repeat_is_not_a_new_press() {
        let mut t = InputTracker::default();
        t.press(LogicalKey::Jump);
        t.take_tick();
        t.press(LogicalKey::Jump);
        assert!(!t.take_tick().jump_pressed);
    }

    #[test]
    fn tap_between_ticks_keeps_both_edges() {
        let mut t = InputTracker::default();
        t.press(LogicalKey::Jump);
        t.release(LogicalKey::Jump);
        let input = t.take_tick();
        assert!(input.jump_pressed && input.jump_released && !input.jump_held);
    }

    #[test]
    fn movement_keys_are_levels() {
        let mut t = InputTracker::default();
        t.press(LogicalKey::Left);
        t.press(LogicalKey::Right);
        let input = t.take_tick();
        assert!(input.left && input.right);
        t.release(LogicalKey::Left);
        assert!(!t.take_tick().left);
        assert!(t.is_held(LogicalKey::Right));
    }

    #[test]
    fn actions_map_to_keys() {
        assert_eq!(LogicalKey::from_action("up"), Some(LogicalKey::Jump));
        assert_eq!(LogicalKey::from_action("left"), Some(LogicalKey::Left));
        assert_eq!(LogicalKey::from_action("dash"), None);
    }
}
