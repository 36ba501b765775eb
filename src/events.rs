use std::collections::VecDeque;

use bevy::prelude::*;
use serde::Serialize;

use crate::physics_core::WallSide;

const MAX_EVENTS: usize = 256;

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MascotEvent {
    Jumped {
        jumps_used: u8,
        velocity_y: f32,
        charged: bool,
    },
    Grounded,
    AnchorLanded {
        anchor: String,
        emoji: Option<&'static str>,
    },
    /// The mascot no longer rests on `anchor`; hosts clear its highlight.
    AnchorLeft {
        anchor: String,
    },
    SideBounce {
        anchor: String,
    },
    WallStick {
        side: WallSide,
    },
    PickedUp {
        bounce_count: u32,
        celebration: Option<&'static str>,
    },
    Released {
        x: f32,
        y: f32,
    },
    DragStarted,
    Dropped {
        x: f32,
        y: f32,
    },
    AnchorsRescanned {
        count: usize,
    },
}

#[derive(Serialize, Clone, Debug)]
pub struct RecordedEvent {
    pub frame: u64,
    #[serde(flatten)]
    pub event: MascotEvent,
}

#[derive(Resource, Default)]
pub struct MascotEventBus {
    pub recent: VecDeque<RecordedEvent>,
    pub frame: u64,
    pub dropped_events: u64,
    last_overflow_log_frame: u64,
}

impl MascotEventBus {
    pub fn emit(&mut self, event: MascotEvent) {
        self.recent.push_back(RecordedEvent {
            frame: self.frame,
            event,
        });
        if self.recent.len() > MAX_EVENTS {
            let excess = self.recent.len() - MAX_EVENTS;
            for _ in 0..excess {
                self.recent.pop_front();
            }
            self.dropped_events = self.dropped_events.saturating_add(excess as u64);
            if self.frame.saturating_sub(self.last_overflow_log_frame) >= 60 {
                self.last_overflow_log_frame = self.frame;
                warn!(
                    "[Virgil mascot] Dropped {} buffered events (total dropped: {})",
                    excess, self.dropped_events
                );
            }
        }
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = MascotEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    pub fn advance_frame(&mut self) {
        self.frame = self.frame.saturating_add(1);
    }

    /// Events emitted during the current frame.
    pub fn current(&self) -> impl Iterator<Item = &MascotEvent> {
        let frame = self.frame;
        self.recent
            .iter()
            .filter(move |e| e.frame == frame)
            .map(|e| &e.event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_bus_tracks_dropped_events() {
        let mut bus = MascotEventBus::default();
        for _ in 0..(MAX_EVENTS + 25) {
            bus.emit(MascotEvent::Grounded);
        }
        assert_eq!(bus.recent.len(), MAX_EVENTS);
        assert!(bus.dropped_events >= 25);
    }

    #[test]
    fn current_only_yields_this_frame() {
        let mut bus = MascotEventBus::default();
        bus.emit(MascotEvent::DragStarted);
        bus.advance_frame();
        bus.emit(MascotEvent::Grounded);
        let now: Vec<_> = bus.current().collect();
        assert_eq!(now, vec![&MascotEvent::Grounded]);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(RecordedEvent {
            frame: 3,
            event: MascotEvent::AnchorLeft {
                anchor: "user".into(),
            },
        })
        .unwrap();
        assert_eq!(json["type"], "anchor_left");
        assert_eq!(json["anchor"], "user");
        assert_eq!(json["frame"], 3);
    }
}
