use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Edge length of the mascot's square bounding box.
pub const MASCOT_SIZE: f32 = 80.0;

/// A logical category the scanner queries the host UI for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorCategory {
    pub name: String,
    /// Text-bearing categories get a glyph-accurate collision box.
    #[serde(default)]
    pub text: bool,
}

impl AnchorCategory {
    pub fn new(name: impl Into<String>, text: bool) -> Self {
        Self {
            name: name.into(),
            text,
        }
    }
}

pub fn default_categories() -> Vec<AnchorCategory> {
    vec![
        AnchorCategory::new("username-label", true),
        AnchorCategory::new("email-label", true),
        AnchorCategory::new("signout-control", false),
        AnchorCategory::new("page-heading", true),
        AnchorCategory::new("form-field", false),
        AnchorCategory::new("action-button", false),
    ]
}

/// Every tunable of the mascot simulation. Units are pixels and ticks unless noted.
#[derive(Resource, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MascotConfig {
    pub size: f32,
    pub move_speed: f32,
    pub gravity: f32,
    pub jump_force: f32,
    pub double_jump_factor: f32,
    pub triple_jump_factor: f32,
    pub max_jumps: u8,
    pub wall_stick_force: f32,
    pub wall_gravity_scale: f32,
    pub charge_rate: f32,
    pub charge_max: f32,
    /// Previous `y` must be above `anchor.y - landing_threshold` for a hit to count as a landing.
    pub landing_threshold: f32,
    pub pickup_release_ms: u64,
    pub scan_interval_ms: u64,
    pub drag_threshold: f32,
    /// Distance between the ground line and the bottom of the viewport.
    pub ground_margin: f32,
    pub max_anchors: usize,
    pub categories: Vec<AnchorCategory>,
}

impl Default for MascotConfig {
    fn default() -> Self {
        Self {
            size: MASCOT_SIZE,
            move_speed: 5.0,
            gravity: 0.6,
            jump_force: 12.0,
            double_jump_factor: 0.8,
            triple_jump_factor: 0.6,
            max_jumps: 3,
            wall_stick_force: 2.0,
            wall_gravity_scale: 0.3,
            charge_rate: 0.02,
            charge_max: 1.0,
            landing_threshold: 20.0,
            pickup_release_ms: 2000,
            scan_interval_ms: 1000,
            drag_threshold: 4.0,
            ground_margin: 0.0,
            max_anchors: 12,
            categories: default_categories(),
        }
    }
}

impl MascotConfig {
    pub fn validate(&self) -> Result<(), String> {
        let positive = [
            ("size", self.size),
            ("move_speed", self.move_speed),
            ("gravity", self.gravity),
            ("jump_force", self.jump_force),
            ("charge_rate", self.charge_rate),
            ("charge_max", self.charge_max),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("'{name}' must be a positive number, got {value}"));
            }
        }
        let non_negative = [
            ("wall_stick_force", self.wall_stick_force),
            ("wall_gravity_scale", self.wall_gravity_scale),
            ("double_jump_factor", self.double_jump_factor),
            ("triple_jump_factor", self.triple_jump_factor),
            ("landing_threshold", self.landing_threshold),
            ("drag_threshold", self.drag_threshold),
            ("ground_margin", self.ground_margin),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("'{name}' must be zero or positive, got {value}"));
            }
        }
        if self.max_jumps == 0 || self.max_jumps > 3 {
            return Err(format!("'max_jumps' must be 1..=3, got {}", self.max_jumps));
        }
        if self.pickup_release_ms == 0 {
            return Err("'pickup_release_ms' must be non-zero".to_string());
        }
        if self.scan_interval_ms == 0 {
            return Err("'scan_interval_ms' must be non-zero".to_string());
        }
        if let Some(empty) = self.categories.iter().find(|c| c.name.trim().is_empty()) {
            return Err(format!("anchor category with empty name: {empty:?}"));
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &PhysicsOverrides) {
        if let Some(v) = overrides.gravity {
            self.gravity = v;
        }
        if let Some(v) = overrides.move_speed {
            self.move_speed = v;
        }
        if let Some(v) = overrides.jump_force {
            self.jump_force = v;
        }
        if let Some(v) = overrides.wall_stick_force {
            self.wall_stick_force = v;
        }
        if let Some(v) = overrides.charge_rate {
            self.charge_rate = v;
        }
        if let Some(v) = overrides.charge_max {
            self.charge_max = v;
        }
        if let Some(v) = overrides.landing_threshold {
            self.landing_threshold = v;
        }
        if let Some(v) = overrides.pickup_release_ms {
            self.pickup_release_ms = v;
        }
        if let Some(v) = overrides.ground_margin {
            self.ground_margin = v;
        }
    }
}

/// Partial physics tuning read from startup config or a simulation request.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct PhysicsOverrides {
    pub gravity: Option<f32>,
    pub move_speed: Option<f32>,
    pub jump_force: Option<f32>,
    pub wall_stick_force: Option<f32>,
    pub charge_rate: Option<f32>,
    pub charge_max: Option<f32>,
    pub landing_threshold: Option<f32>,
    pub pickup_release_ms: Option<u64>,
    pub ground_margin: Option<f32>,
}

#[derive(Deserialize, Default, Debug)]
pub struct StartupConfig {
    pub window_title: Option<String>,
    pub window_width: Option<f32>,
    pub window_height: Option<f32>,
    pub background_color: Option<[f32; 3]>,
    pub physics: Option<PhysicsOverrides>,
    pub categories: Option<Vec<AnchorCategory>>,
}

impl StartupConfig {
    pub fn parse(contents: &str) -> Result<Self, String> {
        serde_json::from_str(contents).map_err(|e| format!("invalid startup config: {e}"))
    }

    /// Builds the mascot config, rejecting overrides that fail validation.
    pub fn mascot_config(&self) -> Result<MascotConfig, String> {
        let mut config = MascotConfig::default();
        if let Some(physics) = &self.physics {
            config.apply_overrides(physics);
        }
        if let Some(categories) = &self.categories {
            config.categories = categories.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

pub fn startup_config_path() -> String {
    std::env::var("VIRGIL_MASCOT_CONFIG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "mascot.json".to_string())
}

pub fn load_startup_config() -> StartupConfig {
    let path = startup_config_path();
    match std::fs::read_to_string(&path) {
        Ok(contents) => match StartupConfig::parse(&contents) {
            Ok(cfg) => {
                println!("[Virgil mascot] Loaded startup config from {}", path);
                cfg
            }
            Err(e) => {
                eprintln!("[Virgil mascot] Failed to parse {}: {}", path, e);
                StartupConfig::default()
            }
        },
        Err(_) => StartupConfig::default(),
    }
}
