use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::config::MascotConfig;
use crate::cosmetics::{Randomness, CELEBRATION_EMOJIS};
use crate::engine::MascotEngine;
use crate::events::MascotEvent;
use crate::physics_core::{MascotState, Viewport};
use crate::scheduler::{Scheduler, TimerKind};

pub struct InteractionPlugin;

impl Plugin for InteractionPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            PreUpdate,
            pointer_to_mascot.run_if(
                resource_exists::<ButtonInput<MouseButton>>.and(resource_exists::<MascotEngine>),
            ),
        );
    }
}

#[derive(Clone, Copy, Debug)]
struct PendingPress {
    origin: Vec2,
    offset: Vec2,
}

/// Tells a click from a drag and applies both to the mascot state.
///
/// A press on the mascot arms a drag; moving past the drag threshold while the
/// button is down starts it. Releasing without having dragged is a click.
#[derive(Clone, Debug, Default)]
pub struct PointerController {
    press: Option<PendingPress>,
}

fn clamp_to_playfield(point: Vec2, viewport: Viewport, config: &MascotConfig) -> Vec2 {
    let viewport = viewport.sanitized(config.size);
    Vec2::new(
        point.x.clamp(0.0, viewport.max_x(config.size)),
        point.y.clamp(0.0, viewport.ground_y(config.size, config.ground_margin)),
    )
}

impl PointerController {
    pub fn is_pressed(&self) -> bool {
        self.press.is_some()
    }

    /// Returns true when the press landed on the mascot and was captured.
    pub fn pointer_down(&mut self, state: &MascotState, point: Vec2, config: &MascotConfig) -> bool {
        if state.is_picked_up || !point.is_finite() {
            return false;
        }
        if !state.bounds(config.size).contains(point.x, point.y) {
            return false;
        }
        self.press = Some(PendingPress {
            origin: point,
            offset: point - state.position,
        });
        true
    }

    pub fn pointer_move(
        &mut self,
        state: &mut MascotState,
        point: Vec2,
        viewport: Viewport,
        config: &MascotConfig,
    ) -> Vec<MascotEvent> {
        let mut events = Vec::new();
        let Some(press) = self.press else {
            return events;
        };
        if !point.is_finite() {
            return events;
        }
        if !state.is_dragging {
            if point.distance(press.origin) < config.drag_threshold {
                return events;
            }
            state.reset_motion();
            state.is_dragging = true;
            state.drag_offset = press.offset;
            events.push(MascotEvent::DragStarted);
        }
        state.position = clamp_to_playfield(point - state.drag_offset, viewport, config);
        events
    }

    pub fn pointer_up(
        &mut self,
        state: &mut MascotState,
        now_ms: u64,
        scheduler: &mut Scheduler,
        config: &MascotConfig,
        rng: &mut dyn Randomness,
    ) -> Vec<MascotEvent> {
        if self.press.take().is_none() {
            return Vec::new();
        }
        if state.is_dragging {
            state.is_dragging = false;
            state.drag_offset = Vec2::ZERO;
            state.reset_motion();
            return vec![MascotEvent::Dropped {
                x: state.position.x,
                y: state.position.y,
            }];
        }
        pick_up(state, now_ms, scheduler, config, rng)
    }

    /// Forgets an armed press, e.g. when the pointer leaves the window.
    pub fn cancel(&mut self, state: &mut MascotState) {
        if self.press.take().is_some() && state.is_dragging {
            state.is_dragging = false;
            state.drag_offset = Vec2::ZERO;
            state.reset_motion();
        }
    }
}

/// Lifts the mascot and arms the auto-release timer.
pub fn pick_up(
    state: &mut MascotState,
    now_ms: u64,
    scheduler: &mut Scheduler,
    config: &MascotConfig,
    rng: &mut dyn Randomness,
) -> Vec<MascotEvent> {
    if state.is_picked_up {
        return Vec::new();
    }
    state.reset_motion();
    state.is_picked_up = true;
    state.bounce_count = state.bounce_count.saturating_add(1);
    scheduler.cancel_kind(TimerKind::PickupRelease);
    scheduler.schedule(now_ms, config.pickup_release_ms, TimerKind::PickupRelease);
    vec![MascotEvent::PickedUp {
        bounce_count: state.bounce_count,
        celebration: rng.pick(CELEBRATION_EMOJIS),
    }]
}

/// Puts a picked-up mascot back on the ground at a random column.
pub fn auto_release(
    state: &mut MascotState,
    viewport: Viewport,
    config: &MascotConfig,
    rng: &mut dyn Randomness,
) -> Vec<MascotEvent> {
    if !state.is_picked_up {
        return Vec::new();
    }
    let viewport = viewport.sanitized(config.size);
    state.is_picked_up = false;
    state.reset_motion();
    state.position = Vec2::new(
        rng.unit() * viewport.max_x(config.size),
        viewport.ground_y(config.size, config.ground_margin),
    );
    state.grounded = true;
    vec![MascotEvent::Released {
        x: state.position.x,
        y: state.position.y,
    }]
}

fn pointer_to_mascot(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut engine: ResMut<MascotEngine>,
) {
    let Ok(window) = windows.get_single() else {
        return;
    };
    let cursor = window.cursor_position();
    let now_ms = engine.now_ms();
    if buttons.just_pressed(MouseButton::Left) {
        if let Some(point) = cursor {
            engine.pointer_down(point);
        }
    }
    if buttons.pressed(MouseButton::Left) {
        match cursor {
            Some(point) => engine.pointer_move(point),
            None => engine.pointer_cancel(),
        }
    }
    if buttons.just_released(MouseButton::Left) {
        engine.pointer_up(now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::AnchorSet;
    use crate::cosmetics::FixedRandom;
    use crate::physics_core::{step, StepEnv, TickInput};

    const VIEWPORT: Viewport = Viewport::new(800.0, 600.0);

    fn grounded() -> MascotState {
        MascotState::grounded_at(100.0, 520.0)
    }

    #[test]
    fn press_outside_mascot_is_ignored() {
        let cfg = MascotConfig::default();
        let mut pointer = PointerController::default();
        assert!(!pointer.pointer_down(&grounded(), Vec2::new(10.0, 10.0), &cfg));
        assert!(!pointer.is_pressed());
    }

    #[test]
    fn click_picks_up_and_schedules_release() {
        let cfg = MascotConfig::default();
        let mut state = grounded();
        let mut pointer = PointerController::default();
        let mut scheduler = Scheduler::default();
        assert!(pointer.pointer_down(&state, Vec2::new(120.0, 540.0), &cfg));
        let events = pointer.pointer_up(&mut state, 500, &mut scheduler, &cfg, &mut FixedRandom(0.0));
        assert!(state.is_picked_up);
        assert_eq!(state.bounce_count, 1);
        assert!(matches!(events[0], MascotEvent::PickedUp { bounce_count: 1, .. }));
        assert!(scheduler.fire_due(2_499).is_empty());
        assert_eq!(scheduler.fire_due(2_500), vec![TimerKind::PickupRelease]);
    }

    #[test]
    fn press_while_picked_up_is_ignored() {
        let cfg = MascotConfig::default();
        let mut state = grounded();
        state.is_picked_up = true;
        let mut pointer = PointerController::default();
        assert!(!pointer.pointer_down(&state, Vec2::new(120.0, 540.0), &cfg));
    }

    #[test]
    fn small_jitter_is_still_a_click() {
        let cfg = MascotConfig::default();
        let mut state = grounded();
        let mut pointer = PointerController::default();
        pointer.pointer_down(&state, Vec2::new(120.0, 540.0), &cfg);
        let events = pointer.pointer_move(&mut state, Vec2::new(121.0, 541.0), VIEWPORT, &cfg);
        assert!(events.is_empty());
        assert!(!state.is_dragging);
        assert_eq!(state.position, Vec2::new(100.0, 520.0));
    }

    #[test]
    fn drag_moves_mascot_with_offset_and_drop_resets_motion() {
        let cfg = MascotConfig::default();
        let mut state = grounded();
        state.jumps_used = 2;
        state.velocity = Vec2::new(5.0, -3.0);
        let mut pointer = PointerController::default();
        let mut scheduler = Scheduler::default();
        pointer.pointer_down(&state, Vec2::new(120.0, 540.0), &cfg);
        let events = pointer.pointer_move(&mut state, Vec2::new(320.0, 240.0), VIEWPORT, &cfg);
        assert_eq!(events, vec![MascotEvent::DragStarted]);
        assert!(state.is_dragging);
        assert_eq!(state.drag_offset, Vec2::new(20.0, 20.0));
        assert_eq!(state.position, Vec2::new(300.0, 220.0));

        pointer.pointer_move(&mut state, Vec2::new(2000.0, 240.0), VIEWPORT, &cfg);
        assert_eq!(state.position.x, 720.0);

        let events = pointer.pointer_up(&mut state, 0, &mut scheduler, &cfg, &mut FixedRandom(0.0));
        assert_eq!(events, vec![MascotEvent::Dropped { x: 720.0, y: 220.0 }]);
        assert!(!state.is_dragging && !state.is_picked_up);
        assert_eq!(state.velocity, Vec2::ZERO);
        assert_eq!(state.jumps_used, 0);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn dropped_mid_air_has_no_air_jump_until_landing() {
        let cfg = MascotConfig::default();
        let mut state = grounded();
        let mut pointer = PointerController::default();
        let mut scheduler = Scheduler::default();
        pointer.pointer_down(&state, Vec2::new(120.0, 540.0), &cfg);
        pointer.pointer_move(&mut state, Vec2::new(320.0, 240.0), VIEWPORT, &cfg);
        pointer.pointer_up(&mut state, 0, &mut scheduler, &cfg, &mut FixedRandom(0.0));
        assert_eq!(state.jumps_used, 0);

        let env = StepEnv {
            config: &cfg,
            viewport: VIEWPORT,
        };
        let none = AnchorSet::empty();
        let falling = step(&state, TickInput::default(), &none, &env, &mut FixedRandom(0.0)).state;
        assert!(falling.velocity.y > 0.0);
        let press = TickInput {
            jump_held: true,
            jump_pressed: true,
            ..Default::default()
        };
        let out = step(&falling, press, &none, &env, &mut FixedRandom(0.0));
        assert_eq!(out.state.jumps_used, 0);
        assert!(out.state.velocity.y > falling.velocity.y);
        assert!(out.events.is_empty());
    }

    #[test]
    fn auto_release_relocates_to_ground() {
        let cfg = MascotConfig::default();
        let mut state = grounded();
        let mut scheduler = Scheduler::default();
        pick_up(&mut state, 0, &mut scheduler, &cfg, &mut FixedRandom(0.0));
        state.jumps_used = 3;
        let events = auto_release(&mut state, VIEWPORT, &cfg, &mut FixedRandom(0.5));
        assert!(!state.is_picked_up);
        assert_eq!(state.position, Vec2::new(360.0, 520.0));
        assert_eq!(state.velocity, Vec2::ZERO);
        assert_eq!(state.jumps_used, 0);
        assert!(state.grounded);
        assert_eq!(events, vec![MascotEvent::Released { x: 360.0, y: 520.0 }]);
        assert!(auto_release(&mut state, VIEWPORT, &cfg, &mut FixedRandom(0.5)).is_empty());
    }
}
