//! A small desktop mascot that walks, jumps and sits on tagged UI elements.
//!
//! The physics and interaction core is host independent and driven through
//! [`engine::MascotEngine`]; the Bevy plugins wire it to a window and its UI.

pub mod anchors;
pub mod components;
pub mod config;
pub mod cosmetics;
pub mod engine;
pub mod events;
pub mod input;
pub mod interaction;
pub mod physics;
pub mod physics_core;
pub mod scheduler;
pub mod simulation;
pub mod ui_anchors;
