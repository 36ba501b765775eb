//! Mounted mascot instance.
//!
//! Owns the mascot state, the current anchor snapshot, key/pointer state and the
//! timers. Hosts drive it with [`MascotEngine::tick`] once per frame, call
//! [`MascotEngine::rescan`] when a scan is requested or the viewport changes, and
//! forward raw input. After [`MascotEngine::teardown`] every entry point is inert.

use bevy::log::{debug, info};
use bevy::math::Vec2;
use bevy::prelude::Resource;
use serde::Serialize;

use crate::anchors::{scan, AnchorProvider, AnchorSet};
use crate::config::MascotConfig;
use crate::cosmetics::Randomness;
use crate::events::MascotEvent;
use crate::input::{InputTracker, LogicalKey};
use crate::interaction::{self, PointerController};
use crate::physics_core::{self, MascotState, Pose, StepEnv, Support, Viewport};
use crate::scheduler::{Scheduler, TimerKind};

pub type SharedRandomness = Box<dyn Randomness + Send + Sync>;

/// Everything a renderer needs after one tick.
#[derive(Clone, Debug, Serialize)]
pub struct TickReport {
    pub frame: u64,
    pub now_ms: u64,
    pub state: MascotState,
    pub pose: Pose,
    pub support: Support,
    pub charge_fraction: f32,
    pub events: Vec<MascotEvent>,
    /// The scan interval elapsed; the host should call `rescan`.
    pub scan_due: bool,
}

#[derive(Resource)]
pub struct MascotEngine {
    config: MascotConfig,
    viewport: Viewport,
    state: MascotState,
    anchors: AnchorSet,
    input: InputTracker,
    pointer: PointerController,
    scheduler: Scheduler,
    rng: SharedRandomness,
    pending: Vec<MascotEvent>,
    now_ms: u64,
    frame: u64,
    scan_requested: bool,
    torn_down: bool,
}

impl MascotEngine {
    /// Creates the mascot grounded at its spawn column and runs the first scan.
    pub fn mount(
        config: MascotConfig,
        viewport: Viewport,
        provider: &dyn AnchorProvider,
        rng: SharedRandomness,
        now_ms: u64,
    ) -> Result<Self, String> {
        config.validate()?;
        let state = MascotState::spawn(&config, viewport);
        let mut engine = Self {
            config,
            viewport,
            state,
            anchors: AnchorSet::empty(),
            input: InputTracker::default(),
            pointer: PointerController::default(),
            scheduler: Scheduler::default(),
            rng,
            pending: Vec::new(),
            now_ms,
            frame: 0,
            scan_requested: false,
            torn_down: false,
        };
        engine.rescan(provider);
        info!(
            "[Virgil mascot] Mounted in {}x{} viewport with {} anchor(s)",
            viewport.width,
            viewport.height,
            engine.anchors.len()
        );
        Ok(engine)
    }

    pub fn is_active(&self) -> bool {
        !self.torn_down
    }

    pub fn state(&self) -> &MascotState {
        &self.state
    }

    pub fn anchors(&self) -> &AnchorSet {
        &self.anchors
    }

    pub fn config(&self) -> &MascotConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn scan_requested(&self) -> bool {
        !self.torn_down && self.scan_requested
    }

    pub fn request_scan(&mut self) {
        if !self.torn_down {
            self.scan_requested = true;
        }
    }

    pub fn key_down(&mut self, key: LogicalKey) {
        if !self.torn_down {
            self.input.press(key);
        }
    }

    pub fn key_up(&mut self, key: LogicalKey) {
        if !self.torn_down {
            self.input.release(key);
        }
    }

    pub fn pointer_down(&mut self, point: Vec2) -> bool {
        if self.torn_down {
            return false;
        }
        self.pointer.pointer_down(&self.state, point, &self.config)
    }

    /// Drag moves write the position directly; the tick leaves dragged mascots alone.
    pub fn pointer_move(&mut self, point: Vec2) {
        if self.torn_down {
            return;
        }
        let events = self
            .pointer
            .pointer_move(&mut self.state, point, self.viewport, &self.config);
        self.pending.extend(events);
    }

    pub fn pointer_up(&mut self, now_ms: u64) {
        if self.torn_down {
            return;
        }
        let events = self.pointer.pointer_up(
            &mut self.state,
            now_ms.max(self.now_ms),
            &mut self.scheduler,
            &self.config,
            self.rng.as_mut(),
        );
        self.pending.extend(events);
    }

    pub fn pointer_cancel(&mut self) {
        if !self.torn_down {
            self.pointer.cancel(&mut self.state);
        }
    }

    /// Click-to-pick-up without going through pointer hit testing.
    pub fn pick_up(&mut self, now_ms: u64) {
        if self.torn_down {
            return;
        }
        let events = interaction::pick_up(
            &mut self.state,
            now_ms.max(self.now_ms),
            &mut self.scheduler,
            &self.config,
            self.rng.as_mut(),
        );
        self.pending.extend(events);
    }

    /// Replaces the anchor snapshot from the provider's current layout.
    pub fn rescan(&mut self, provider: &dyn AnchorProvider) -> usize {
        if self.torn_down {
            return 0;
        }
        self.anchors = scan(provider, &self.config.categories, self.config.max_anchors);
        self.scan_requested = false;
        self.scheduler.cancel_kind(TimerKind::AnchorScan);
        self.scheduler
            .schedule(self.now_ms, self.config.scan_interval_ms, TimerKind::AnchorScan);
        let count = self.anchors.len();
        self.pending.push(MascotEvent::AnchorsRescanned { count });
        debug!("[Virgil mascot] Rescanned anchors: {count}");
        count
    }

    /// New viewport size: re-clamp the mascot and rescan immediately.
    pub fn resize(&mut self, viewport: Viewport, provider: &dyn AnchorProvider) {
        if self.torn_down {
            return;
        }
        self.viewport = viewport;
        let safe = viewport.sanitized(self.config.size);
        self.state = self.state.sanitized(
            safe.max_x(self.config.size),
            safe.ground_y(self.config.size, self.config.ground_margin),
        );
        self.rescan(provider);
    }

    /// Advances one frame. Returns `None` once torn down.
    pub fn tick(&mut self, now_ms: u64) -> Option<TickReport> {
        if self.torn_down {
            return None;
        }
        self.now_ms = self.now_ms.max(now_ms);
        self.frame = self.frame.saturating_add(1);
        let mut events = std::mem::take(&mut self.pending);

        for timer in self.scheduler.fire_due(self.now_ms) {
            match timer {
                TimerKind::PickupRelease => events.extend(interaction::auto_release(
                    &mut self.state,
                    self.viewport,
                    &self.config,
                    self.rng.as_mut(),
                )),
                TimerKind::AnchorScan => self.scan_requested = true,
            }
        }

        let input = self.input.take_tick();
        if !self.state.is_held() {
            let env = StepEnv {
                config: &self.config,
                viewport: self.viewport,
            };
            let outcome =
                physics_core::step(&self.state, input, &self.anchors, &env, self.rng.as_mut());
            self.state = outcome.state;
            events.extend(outcome.events);
        }

        Some(TickReport {
            frame: self.frame,
            now_ms: self.now_ms,
            pose: self.state.pose(),
            support: self.state.support(),
            charge_fraction: self.state.charge_fraction(self.config.charge_max),
            state: self.state.clone(),
            events,
            scan_due: self.scan_requested,
        })
    }

    /// Cancels timers, drops input and anchors; later calls do nothing.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.scheduler.cancel_all();
        self.pointer.cancel(&mut self.state);
        self.input.clear();
        self.pending.clear();
        self.anchors = AnchorSet::empty();
        self.scan_requested = false;
        debug!("[Virgil mascot] Torn down after {} frame(s)", self.frame);
    }
}

impl Drop for MascotEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::{AnchorCandidate, Bounds, Insets, StaticAnchorProvider};
    use crate::cosmetics::FixedRandom;

    const VIEWPORT: Viewport = Viewport::new(800.0, 600.0);

    fn provider() -> StaticAnchorProvider {
        StaticAnchorProvider {
            candidates: vec![AnchorCandidate {
                id: "signout".into(),
                category: "signout-control".into(),
                layout: Bounds::new(500.0, 300.0, 120.0, 32.0),
                padding: Insets::default(),
                visible: true,
                text: None,
            }],
        }
    }

    fn mount() -> MascotEngine {
        MascotEngine::mount(
            MascotConfig::default(),
            VIEWPORT,
            &provider(),
            Box::new(FixedRandom(0.25)),
            0,
        )
        .unwrap()
    }

    #[test]
    fn mount_scans_immediately() {
        let engine = mount();
        assert_eq!(engine.anchors().len(), 1);
        assert_eq!(engine.state().position, Vec2::new(20.0, 520.0));
    }

    #[test]
    fn mount_rejects_invalid_config() {
        let config = MascotConfig {
            gravity: f32::NAN,
            ..Default::default()
        };
        let result = MascotEngine::mount(
            config,
            VIEWPORT,
            &provider(),
            Box::new(FixedRandom(0.0)),
            0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn pickup_releases_after_exactly_two_seconds() {
        let mut engine = mount();
        engine.tick(16);
        engine.pick_up(1_000);
        let report = engine.tick(1_016).unwrap();
        assert!(report.state.is_picked_up);
        assert_eq!(report.pose, Pose::Held);
        assert!(engine.tick(2_999).unwrap().state.is_picked_up);

        let report = engine.tick(3_000).unwrap();
        let state = &report.state;
        assert!(!state.is_picked_up);
        assert_eq!(state.position, Vec2::new(0.25 * 720.0, 520.0));
        assert_eq!(state.velocity, Vec2::ZERO);
        assert_eq!(state.jumps_used, 0);
        assert!(!state.is_on_wall);
        assert_eq!(state.bounce_count, 1);
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, MascotEvent::Released { .. })));
    }

    #[test]
    fn held_mascot_ignores_keys() {
        let mut engine = mount();
        engine.pick_up(0);
        let before = engine.state().position;
        engine.key_down(LogicalKey::Right);
        for t in 1..10 {
            engine.tick(t * 16);
        }
        assert_eq!(engine.state().position, before);
    }

    #[test]
    fn drag_and_drop_resumes_physics() {
        let mut engine = mount();
        assert!(engine.pointer_down(Vec2::new(60.0, 560.0)));
        engine.pointer_move(Vec2::new(440.0, 140.0));
        let report = engine.tick(16).unwrap();
        assert!(report.state.is_dragging);
        assert_eq!(report.state.position, Vec2::new(400.0, 100.0));
        assert!(report.events.contains(&MascotEvent::DragStarted));

        engine.pointer_up(32);
        let report = engine.tick(32).unwrap();
        assert!(!report.state.is_dragging);
        assert!(report.state.position.y > 100.0);
        assert_eq!(report.state.jumps_used, 0);
    }

    #[test]
    fn scan_interval_requests_rescan() {
        let mut engine = mount();
        assert!(!engine.tick(500).unwrap().scan_due);
        assert!(engine.tick(1_000).unwrap().scan_due);
        assert_eq!(engine.rescan(&StaticAnchorProvider::default()), 0);
        assert!(!engine.scan_requested());
        assert!(engine.anchors().is_empty());
    }

    #[test]
    fn resize_clamps_and_rescans() {
        let mut engine = mount();
        engine.key_down(LogicalKey::Right);
        for t in 1..200 {
            engine.tick(t * 16);
        }
        engine.resize(Viewport::new(400.0, 300.0), &StaticAnchorProvider::default());
        assert!(engine.state().position.x <= 320.0);
        assert!(engine.state().position.y <= 220.0);
        assert!(engine.anchors().is_empty());
    }

    #[test]
    fn teardown_makes_engine_inert() {
        let mut engine = mount();
        engine.pick_up(0);
        engine.teardown();
        assert!(!engine.is_active());
        assert!(engine.tick(5_000).is_none());
        assert_eq!(engine.rescan(&provider()), 0);
        engine.key_down(LogicalKey::Jump);
        assert!(!engine.pointer_down(Vec2::new(60.0, 560.0)));
        assert!(engine.anchors().is_empty());
        // The pending auto-release was cancelled with the engine.
        assert!(engine.state().is_picked_up);
    }
}
