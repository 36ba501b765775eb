use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::anchors::StaticAnchorProvider;
use crate::components::MascotSprite;
use crate::config::MascotConfig;
use crate::cosmetics::SeededRandom;
use crate::engine::MascotEngine;
use crate::events::MascotEventBus;
use crate::physics_core::{Pose, Viewport, WallSide};

pub struct MascotPhysicsPlugin;

impl Plugin for MascotPhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MascotConfig>()
            .insert_resource(MascotEventBus::default())
            .add_systems(Startup, mount_mascot)
            .add_systems(
                FixedUpdate,
                tick_mascot.run_if(resource_exists::<MascotEngine>),
            )
            .add_systems(
                Update,
                sync_mascot_sprite.run_if(resource_exists::<MascotEngine>),
            )
            .add_systems(Last, teardown_on_exit);
    }
}

fn mount_mascot(
    mut commands: Commands,
    config: Res<MascotConfig>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let viewport = windows
        .get_single()
        .map(|w| Viewport::new(w.width(), w.height()))
        .unwrap_or(Viewport::new(1280.0, 720.0));
    // Layout is not computed yet at startup; the first real scan runs after it.
    let mut engine = match MascotEngine::mount(
        config.clone(),
        viewport,
        &StaticAnchorProvider::default(),
        Box::new(SeededRandom::from_entropy()),
        0,
    ) {
        Ok(engine) => engine,
        Err(err) => {
            error!("[Virgil mascot] Not mounting mascot: {err}");
            return;
        }
    };
    engine.request_scan();
    commands.insert_resource(engine);
    commands.spawn((
        MascotSprite,
        Sprite::from_color(pose_color(Pose::Idle), Vec2::splat(config.size)),
        Transform::from_xyz(0.0, 0.0, 10.0),
    ));
}

fn tick_mascot(
    time: Res<Time<Fixed>>,
    mut engine: ResMut<MascotEngine>,
    mut bus: ResMut<MascotEventBus>,
) {
    let now_ms = time.elapsed().as_millis() as u64;
    let Some(report) = engine.tick(now_ms) else {
        return;
    };
    bus.advance_frame();
    bus.extend(report.events);
}

fn pose_color(pose: Pose) -> Color {
    match pose {
        Pose::Idle | Pose::Sitting => Color::srgb(0.55, 0.55, 0.6),
        Pose::Walking => Color::srgb(0.6, 0.6, 0.68),
        Pose::Rising | Pose::Falling => Color::srgb(0.5, 0.62, 0.78),
        Pose::WallStick => Color::srgb(0.85, 0.6, 0.3),
        Pose::Charging => Color::srgb(0.95, 0.8, 0.3),
        Pose::Held | Pose::Dragged => Color::srgb(0.9, 0.45, 0.6),
    }
}

/// Screen space is top-left/y-down; the 2D camera is centered/y-up.
fn screen_to_world(point: Vec2, window_width: f32, window_height: f32) -> Vec2 {
    Vec2::new(point.x - window_width * 0.5, window_height * 0.5 - point.y)
}

fn sync_mascot_sprite(
    engine: Res<MascotEngine>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut sprites: Query<(&mut Transform, &mut Sprite), With<MascotSprite>>,
) {
    let Ok(window) = windows.get_single() else {
        return;
    };
    let state = engine.state();
    let size = engine.config().size;
    let center = screen_to_world(
        state.position + Vec2::splat(size * 0.5),
        window.width(),
        window.height(),
    );
    let charge = state.charge_fraction(engine.config().charge_max);
    for (mut transform, mut sprite) in sprites.iter_mut() {
        transform.translation.x = center.x;
        transform.translation.y = center.y;
        transform.rotation = match state.wall_side {
            WallSide::Left => Quat::from_rotation_z(-0.2),
            WallSide::Right => Quat::from_rotation_z(0.2),
            WallSide::None => Quat::IDENTITY,
        };
        transform.scale = Vec3::new(1.0 + charge * 0.15, 1.0 - charge * 0.25, 1.0);
        sprite.color = pose_color(state.pose());
    }
}

fn teardown_on_exit(
    mut exits: EventReader<AppExit>,
    engine: Option<ResMut<MascotEngine>>,
    mut commands: Commands,
) {
    if exits.read().next().is_none() {
        return;
    }
    if let Some(mut engine) = engine {
        engine.teardown();
        commands.remove_resource::<MascotEngine>();
    }
}
