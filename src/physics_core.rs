use bevy::log::warn;
use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::anchors::{Anchor, AnchorSet, Bounds};
use crate::config::MascotConfig;
use crate::cosmetics::{Randomness, SIT_EMOJIS};
use crate::events::MascotEvent;

/// Horizontal position of a freshly mounted mascot.
pub const SPAWN_X: f32 = 20.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WallSide {
    #[default]
    None,
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Replaces non-finite or too-small dimensions so the playfield is at least one mascot wide.
    pub fn sanitized(self, size: f32) -> Self {
        let fix = |v: f32| if v.is_finite() && v >= size { v } else { size };
        Self {
            width: fix(self.width),
            height: fix(self.height),
        }
    }

    pub fn max_x(&self, size: f32) -> f32 {
        (self.width - size).max(0.0)
    }

    pub fn ground_y(&self, size: f32, margin: f32) -> f32 {
        (self.height - size - margin).max(0.0)
    }
}

/// Logical key state for one tick. Edges are consumed once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickInput {
    pub left: bool,
    pub right: bool,
    pub jump_held: bool,
    pub jump_pressed: bool,
    pub jump_released: bool,
}

/// What is holding the mascot up this tick. Exactly one applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Support {
    Grounded,
    OnWall,
    OnAnchor,
    Airborne,
    Held,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pose {
    Idle,
    Walking,
    Rising,
    Falling,
    WallStick,
    Charging,
    Sitting,
    Held,
    Dragged,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MascotState {
    /// Top-left corner of the mascot box.
    pub position: Vec2,
    pub velocity: Vec2,
    pub jumps_used: u8,
    pub is_on_wall: bool,
    pub wall_side: WallSide,
    pub charge: f32,
    pub charging: bool,
    pub is_picked_up: bool,
    pub is_dragging: bool,
    pub drag_offset: Vec2,
    pub is_on_ui_element: bool,
    pub current_anchor: Option<String>,
    pub grounded: bool,
    pub bounce_count: u32,
    pub sit_emoji: Option<&'static str>,
}

impl MascotState {
    /// Resting on the ground line at the spawn column.
    pub fn spawn(config: &MascotConfig, viewport: Viewport) -> Self {
        let viewport = viewport.sanitized(config.size);
        Self::grounded_at(
            SPAWN_X.min(viewport.max_x(config.size)),
            viewport.ground_y(config.size, config.ground_margin),
        )
    }

    pub fn grounded_at(x: f32, ground_y: f32) -> Self {
        Self {
            position: Vec2::new(x, ground_y),
            velocity: Vec2::ZERO,
            jumps_used: 0,
            is_on_wall: false,
            wall_side: WallSide::None,
            charge: 0.0,
            charging: false,
            is_picked_up: false,
            is_dragging: false,
            drag_offset: Vec2::ZERO,
            is_on_ui_element: false,
            current_anchor: None,
            grounded: true,
            bounce_count: 0,
            sit_emoji: None,
        }
    }

    pub fn is_held(&self) -> bool {
        self.is_picked_up || self.is_dragging
    }

    pub fn support(&self) -> Support {
        if self.is_held() {
            Support::Held
        } else if self.is_on_ui_element {
            Support::OnAnchor
        } else if self.is_on_wall {
            Support::OnWall
        } else if self.grounded {
            Support::Grounded
        } else {
            Support::Airborne
        }
    }

    pub fn pose(&self) -> Pose {
        match self.support() {
            Support::Held if self.is_dragging => Pose::Dragged,
            Support::Held => Pose::Held,
            Support::OnWall => Pose::WallStick,
            _ if self.charging => Pose::Charging,
            Support::OnAnchor if self.velocity.x == 0.0 => Pose::Sitting,
            Support::OnAnchor | Support::Grounded if self.velocity.x != 0.0 => Pose::Walking,
            Support::Grounded => Pose::Idle,
            _ if self.velocity.y < 0.0 => Pose::Rising,
            _ => Pose::Falling,
        }
    }

    /// Fill level for a charge bar, in `[0, 1]`.
    pub fn charge_fraction(&self, charge_max: f32) -> f32 {
        if charge_max <= 0.0 {
            return 0.0;
        }
        (self.charge / charge_max).clamp(0.0, 1.0)
    }

    pub fn bounds(&self, size: f32) -> Bounds {
        Bounds::new(self.position.x, self.position.y, size, size)
    }

    /// Drops all motion, jump, wall, charge and anchor state. Used after pickup and drag.
    pub fn reset_motion(&mut self) {
        self.velocity = Vec2::ZERO;
        self.jumps_used = 0;
        self.is_on_wall = false;
        self.wall_side = WallSide::None;
        self.charge = 0.0;
        self.charging = false;
        self.is_on_ui_element = false;
        self.current_anchor = None;
        self.sit_emoji = None;
        self.grounded = false;
    }

    /// Replaces non-finite numbers before they can spread through a tick.
    pub fn sanitized(&self, max_x: f32, ground_y: f32) -> Self {
        let mut out = self.clone();
        let mut repaired = false;
        if !out.position.x.is_finite() {
            out.position.x = 0.0;
            repaired = true;
        }
        if !out.position.y.is_finite() {
            out.position.y = ground_y;
            repaired = true;
        }
        if !out.velocity.is_finite() {
            out.velocity = Vec2::ZERO;
            repaired = true;
        }
        if !out.charge.is_finite() {
            out.charge = 0.0;
            out.charging = false;
            repaired = true;
        }
        if repaired {
            warn!("[Virgil mascot] Repaired non-finite mascot state before stepping");
        }
        out.position.x = out.position.x.clamp(0.0, max_x);
        out.position.y = out.position.y.min(ground_y);
        out
    }
}

/// Per-tick environment the stepper reads but never writes.
#[derive(Clone, Copy)]
pub struct StepEnv<'a> {
    pub config: &'a MascotConfig,
    pub viewport: Viewport,
}

#[derive(Clone, Debug)]
pub struct StepOutcome {
    pub state: MascotState,
    pub events: Vec<MascotEvent>,
}

enum AnchorContact<'a> {
    Landing(&'a Anchor),
    SideBounce(&'a Anchor),
}

pub fn horizontal_velocity(left: bool, right: bool, speed: f32) -> f32 {
    let mut dir = 0.0;
    if left {
        dir -= 1.0;
    }
    if right {
        dir += 1.0;
    }
    dir * speed
}

pub fn apply_gravity(vy: &mut f32, wall_sliding: bool, config: &MascotConfig) {
    let scale = if wall_sliding {
        config.wall_gravity_scale
    } else {
        1.0
    };
    *vy += config.gravity * scale;
}

/// Multiplier for the mid-air jump that follows `jumps_used` earlier jumps.
pub fn air_jump_factor(jumps_used: u8, config: &MascotConfig) -> Option<f32> {
    if jumps_used >= config.max_jumps {
        return None;
    }
    match jumps_used {
        1 => Some(config.double_jump_factor),
        2 => Some(config.triple_jump_factor),
        _ => None,
    }
}

fn resolve_walls(state: &mut MascotState, jump_held: bool, max_x: f32, config: &MascotConfig) {
    let side = if state.position.x <= 0.0 {
        state.position.x = 0.0;
        WallSide::Left
    } else if state.position.x >= max_x {
        state.position.x = max_x;
        WallSide::Right
    } else {
        WallSide::None
    };
    if side != WallSide::None && state.velocity.y > 0.0 && jump_held {
        state.is_on_wall = true;
        state.wall_side = side;
        state.velocity.y = state.velocity.y.min(config.wall_stick_force);
    } else {
        state.is_on_wall = false;
        state.wall_side = WallSide::None;
    }
}

fn find_anchor_contact<'a>(
    anchors: &'a AnchorSet,
    state: &MascotState,
    prev_x: f32,
    prev_y: f32,
    ground_y: f32,
    config: &MascotConfig,
) -> Option<AnchorContact<'a>> {
    let size = config.size;
    let body = state.bounds(size);
    // Covers the whole vertical path of this tick so fast falls can't skip thin labels.
    let swept = Bounds::new(
        body.x,
        prev_y.min(body.y),
        size,
        size + (body.y - prev_y).abs(),
    );
    for anchor in anchors.iter() {
        let target = &anchor.bounds;
        let landing = state.velocity.y > 0.0
            && prev_y < target.y - config.landing_threshold
            && target.y - size <= ground_y
            && swept.overlaps(target);
        if landing {
            return Some(AnchorContact::Landing(anchor));
        }
        // Only the leading edge crossing the near side this tick counts as a side hit.
        let crossed_side = if state.velocity.x > 0.0 {
            prev_x + size <= target.x && target.x < body.right()
        } else if state.velocity.x < 0.0 {
            body.x < target.right() && target.right() <= prev_x
        } else {
            false
        };
        if crossed_side && body.overlaps(target) {
            return Some(AnchorContact::SideBounce(anchor));
        }
    }
    None
}

fn leave_anchor(state: &mut MascotState, events: &mut Vec<MascotEvent>) {
    if let Some(anchor) = state.current_anchor.take() {
        events.push(MascotEvent::AnchorLeft { anchor });
    }
    state.is_on_ui_element = false;
    state.sit_emoji = None;
}

/// Advances the mascot by exactly one frame.
///
/// Held or dragged mascots are returned unchanged: pointer input owns them.
pub fn step(
    prev: &MascotState,
    input: TickInput,
    anchors: &AnchorSet,
    env: &StepEnv<'_>,
    rng: &mut dyn Randomness,
) -> StepOutcome {
    let mut events = Vec::new();
    if prev.is_held() {
        return StepOutcome {
            state: prev.clone(),
            events,
        };
    }

    let config = env.config;
    let size = config.size;
    let viewport = env.viewport.sanitized(size);
    let max_x = viewport.max_x(size);
    let ground_y = viewport.ground_y(size, config.ground_margin);

    let mut state = prev.sanitized(max_x, ground_y);
    let prev_x = state.position.x;
    let prev_y = state.position.y;
    let was_grounded = state.grounded;

    // Horizontal motion
    state.velocity.x = horizontal_velocity(input.left, input.right, config.move_speed);
    state.position.x += state.velocity.x;

    // Side boundaries and wall-stick
    let was_on_wall = state.is_on_wall;
    resolve_walls(&mut state, input.jump_held, max_x, config);
    if state.is_on_wall && !was_on_wall {
        events.push(MascotEvent::WallStick {
            side: state.wall_side,
        });
    }

    // Gravity
    apply_gravity(
        &mut state.velocity.y,
        state.is_on_wall && input.jump_held,
        config,
    );
    state.position.y += state.velocity.y;

    // Anchors
    state.grounded = false;
    let mut landed = false;
    match find_anchor_contact(anchors, &state, prev_x, prev_y, ground_y, config) {
        Some(AnchorContact::Landing(anchor)) => {
            landed = true;
            state.position.y = anchor.bounds.y - size;
            state.velocity.y = 0.0;
            state.jumps_used = 0;
            state.is_on_wall = false;
            state.wall_side = WallSide::None;
            let is_new = state.current_anchor.as_deref() != Some(anchor.id.as_str());
            if is_new {
                leave_anchor(&mut state, &mut events);
                let emoji = rng.pick(SIT_EMOJIS);
                state.sit_emoji = emoji;
                events.push(MascotEvent::AnchorLanded {
                    anchor: anchor.id.clone(),
                    emoji,
                });
            }
            state.is_on_ui_element = true;
            state.current_anchor = Some(anchor.id.clone());
        }
        Some(AnchorContact::SideBounce(anchor)) => {
            state.position.x = if state.velocity.x > 0.0 {
                anchor.bounds.x - size
            } else {
                anchor.bounds.right()
            };
            state.velocity.x = 0.0;
            leave_anchor(&mut state, &mut events);
            events.push(MascotEvent::SideBounce {
                anchor: anchor.id.clone(),
            });
        }
        None => leave_anchor(&mut state, &mut events),
    }

    // Ground
    if !landed && state.position.y >= ground_y {
        state.position.y = ground_y;
        state.velocity.y = 0.0;
        state.jumps_used = 0;
        state.is_on_wall = false;
        state.wall_side = WallSide::None;
        state.grounded = true;
        if !was_grounded {
            events.push(MascotEvent::Grounded);
        }
    }

    // Charge accumulation
    let supported = state.grounded || state.is_on_ui_element;
    let mut tap_jump = false;
    if supported {
        if input.jump_pressed && !state.charging {
            state.charging = true;
            state.charge = 0.0;
        } else if state.charging && input.jump_held && !input.jump_released {
            state.charge = (state.charge + config.charge_rate).min(config.charge_max);
        }
        // A missed release edge still ends the charge once the key reads as up.
        if state.charging && (input.jump_released || !input.jump_held) {
            state.charging = false;
            tap_jump = state.charge <= 0.0;
        }
    } else {
        state.charging = false;
        state.charge = 0.0;
    }

    // Jump resolution
    if supported && !state.charging {
        let mut jumped = None;
        if state.charge > 0.0 {
            state.velocity.y = -config.jump_force * (1.0 + state.charge);
            state.charge = 0.0;
            state.jumps_used = 1;
            jumped = Some(true);
        } else if tap_jump && state.jumps_used < config.max_jumps {
            state.velocity.y = -config.jump_force;
            state.jumps_used = 1;
            jumped = Some(false);
        }
        if let Some(charged) = jumped {
            state.grounded = false;
            leave_anchor(&mut state, &mut events);
            events.push(MascotEvent::Jumped {
                jumps_used: state.jumps_used,
                velocity_y: state.velocity.y,
                charged,
            });
        }
    } else if !supported && input.jump_pressed && state.velocity.y > 0.0 {
        if let Some(factor) = air_jump_factor(state.jumps_used, config) {
            state.velocity.y = -config.jump_force * factor;
            state.jumps_used += 1;
            events.push(MascotEvent::Jumped {
                jumps_used: state.jumps_used,
                velocity_y: state.velocity.y,
                charged: false,
            });
        }
    }

    // Bounds
    state.position.x = state.position.x.clamp(0.0, max_x);
    state.position.y = state.position.y.min(ground_y);

    StepOutcome { state, events }
}
