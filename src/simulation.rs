use serde::{Deserialize, Serialize};

use crate::anchors::{Anchor, AnchorCandidate, StaticAnchorProvider};
use crate::config::{MascotConfig, PhysicsOverrides};
use crate::cosmetics::SeededRandom;
use crate::engine::MascotEngine;
use crate::events::RecordedEvent;
use crate::input::LogicalKey;
use crate::physics_core::{Pose, Support, Viewport};

const FRAME_MS: f64 = 1000.0 / 60.0;

#[derive(Deserialize, Clone)]
pub struct SimulationRequest {
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,
    #[serde(default)]
    pub anchors: Vec<AnchorCandidate>,
    #[serde(default)]
    pub inputs: Vec<SimInput>,
    #[serde(default)]
    pub pointer: Vec<SimPointer>,
    pub max_frames: u32,
    #[serde(default = "default_record_interval")]
    pub record_interval: u32,
    pub physics: Option<PhysicsOverrides>,
    #[serde(default)]
    pub seed: u64,
}

fn default_viewport() -> Viewport {
    Viewport::new(1280.0, 720.0)
}

fn default_record_interval() -> u32 {
    1
}

#[derive(Deserialize, Clone)]
pub struct SimInput {
    pub frame: u32,
    pub action: String,
    #[serde(default)]
    pub duration: u32,
}

#[derive(Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum PointerAction {
    Down,
    Move,
    Up,
}

#[derive(Deserialize, Clone)]
pub struct SimPointer {
    pub frame: u32,
    pub action: PointerAction,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

#[derive(Serialize, Clone)]
pub struct SimulationResult {
    pub frames_elapsed: u32,
    pub anchors: Vec<Anchor>,
    pub trace: Vec<TraceFrame>,
    pub events: Vec<RecordedEvent>,
}

#[derive(Serialize, Clone)]
pub struct TraceFrame {
    pub frame: u32,
    pub time_ms: u64,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub jumps_used: u8,
    pub charge: f32,
    pub pose: Pose,
    pub support: Support,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
}

fn frame_time_ms(frame: u32) -> u64 {
    (frame as f64 * FRAME_MS).round() as u64
}

/// Runs a scripted session against a fixed anchor layout on a synthetic 60 Hz clock.
pub fn run_simulation(request: &SimulationRequest) -> Result<SimulationResult, String> {
    let mut config = MascotConfig::default();
    if let Some(physics) = &request.physics {
        config.apply_overrides(physics);
    }

    let fallback_category = config
        .categories
        .iter()
        .find(|c| !c.text)
        .map(|c| c.name.clone())
        .unwrap_or_default();
    let provider = StaticAnchorProvider {
        candidates: request
            .anchors
            .iter()
            .cloned()
            .map(|mut c| {
                if c.category.is_empty() {
                    c.category = fallback_category.clone();
                }
                c
            })
            .collect(),
    };

    let mut engine = MascotEngine::mount(
        config,
        request.viewport,
        &provider,
        Box::new(SeededRandom::new(request.seed)),
        0,
    )?;

    // Pre-process inputs into per-frame held actions
    let frames = request.max_frames as usize;
    let mut held: Vec<Vec<LogicalKey>> = vec![Vec::new(); frames + 1];
    for input in &request.inputs {
        let Some(key) = LogicalKey::from_action(&input.action) else {
            return Err(format!("unknown action '{}'", input.action));
        };
        let duration = input.duration.max(1);
        for f in input.frame..input.frame.saturating_add(duration).min(request.max_frames) {
            held[f as usize].push(key);
        }
    }

    let record_interval = request.record_interval.max(1);
    let mut trace = Vec::new();
    let mut events = Vec::new();
    let mut prev: Vec<LogicalKey> = Vec::new();

    for frame in 0..request.max_frames {
        let now_ms = frame_time_ms(frame);
        let current = &held[frame as usize];
        for key in [LogicalKey::Left, LogicalKey::Right, LogicalKey::Jump] {
            let was = prev.contains(&key);
            let is = current.contains(&key);
            if is && !was {
                engine.key_down(key);
            } else if was && !is {
                engine.key_up(key);
            }
        }
        prev.clone_from(current);

        for pointer in request.pointer.iter().filter(|p| p.frame == frame) {
            let point = bevy::math::Vec2::new(pointer.x, pointer.y);
            match pointer.action {
                PointerAction::Down => {
                    engine.pointer_down(point);
                }
                PointerAction::Move => engine.pointer_move(point),
                PointerAction::Up => engine.pointer_up(now_ms),
            }
        }

        let Some(report) = engine.tick(now_ms) else {
            break;
        };
        if report.scan_due {
            engine.rescan(&provider);
        }
        events.extend(report.events.into_iter().map(|event| RecordedEvent {
            frame: frame as u64,
            event,
        }));
        if frame % record_interval == 0 {
            let s = &report.state;
            trace.push(TraceFrame {
                frame,
                time_ms: now_ms,
                x: s.position.x,
                y: s.position.y,
                vx: s.velocity.x,
                vy: s.velocity.y,
                jumps_used: s.jumps_used,
                charge: s.charge,
                pose: report.pose,
                support: report.support,
                anchor: s.current_anchor.clone(),
            });
        }
    }

    let anchors = engine.anchors().as_slice().to_vec();
    engine.teardown();
    Ok(SimulationResult {
        frames_elapsed: request.max_frames,
        anchors,
        trace,
        events,
    })
}
