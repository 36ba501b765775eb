use std::io::Read;

use bevy::prelude::*;
use virgil_mascot::components::{AnchorHighlight, AnchorTarget};
use virgil_mascot::config::{load_startup_config, MascotConfig};
use virgil_mascot::simulation::{run_simulation, SimulationRequest};
use virgil_mascot::{input, interaction, physics, ui_anchors};

fn read_request(source: Option<&str>) -> Result<SimulationRequest, String> {
    let contents = match source {
        Some(path) if path != "-" => {
            std::fs::read_to_string(path).map_err(|e| format!("failed to read {path}: {e}"))?
        }
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            buf
        }
    };
    serde_json::from_str(&contents).map_err(|e| format!("invalid simulation request: {e}"))
}

/// `--headless [path|-]`: run a scripted simulation and print the trace as JSON.
fn run_headless(source: Option<&str>) -> i32 {
    let request = match read_request(source) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("[Virgil mascot] {e}");
            return 2;
        }
    };
    match run_simulation(&request).and_then(|result| {
        serde_json::to_string_pretty(&result).map_err(|e| format!("failed to encode result: {e}"))
    }) {
        Ok(json) => {
            println!("{json}");
            0
        }
        Err(e) => {
            eprintln!("[Virgil mascot] Simulation failed: {e}");
            1
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args.iter().position(|a| a == "--headless") {
        std::process::exit(run_headless(args.get(pos + 1).map(String::as_str)));
    }

    let startup_config = load_startup_config();
    let mascot_config = startup_config.mascot_config().unwrap_or_else(|e| {
        eprintln!("[Virgil mascot] Invalid mascot config, using defaults: {e}");
        MascotConfig::default()
    });

    let window_title = startup_config
        .window_title
        .clone()
        .unwrap_or_else(|| "Virgil".to_string());
    let window_width = startup_config.window_width.unwrap_or(1280.0);
    let window_height = startup_config.window_height.unwrap_or(720.0);
    let bg = startup_config.background_color.unwrap_or([0.95, 0.95, 0.97]);

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: window_title,
                resolution: (window_width, window_height).into(),
                present_mode: bevy::window::PresentMode::AutoVsync,
                ..default()
            }),
            ..default()
        }))
        .insert_resource(ClearColor(Color::srgb(bg[0], bg[1], bg[2])))
        .insert_resource(mascot_config)
        .insert_resource(Time::<Fixed>::from_hz(60.0))
        .add_plugins(input::InputPlugin)
        .add_plugins(interaction::InteractionPlugin)
        .add_plugins(physics::MascotPhysicsPlugin)
        .add_plugins(ui_anchors::UiAnchorPlugin)
        .add_systems(Startup, spawn_dashboard)
        .run();
}

const PANEL: Color = Color::srgb(0.88, 0.9, 0.94);
const PANEL_LIT: Color = Color::srgb(0.75, 0.85, 0.98);
const INK: Color = Color::srgb(0.15, 0.17, 0.22);

fn label(category: &str, text: &str, font_size: f32) -> impl Bundle {
    (
        AnchorTarget::new(category),
        AnchorHighlight {
            base: Color::NONE,
            lit: PANEL_LIT,
        },
        Text::new(text),
        TextFont {
            font_size,
            ..default()
        },
        TextColor(INK),
        BackgroundColor(Color::NONE),
    )
}

/// A minimal signed-in page for the mascot to explore.
fn spawn_dashboard(mut commands: Commands) {
    commands.spawn(Camera2d);
    commands
        .spawn(Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            flex_direction: FlexDirection::Column,
            padding: UiRect::all(Val::Px(32.0)),
            row_gap: Val::Px(24.0),
            ..default()
        })
        .with_children(|page| {
            page.spawn(Node {
                justify_content: JustifyContent::SpaceBetween,
                align_items: AlignItems::Center,
                ..default()
            })
            .with_children(|header| {
                header
                    .spawn(Node {
                        flex_direction: FlexDirection::Column,
                        row_gap: Val::Px(4.0),
                        ..default()
                    })
                    .with_children(|who| {
                        who.spawn(label("username-label", "virgil", 20.0));
                        who.spawn(label("email-label", "virgil@example.com", 14.0));
                    });
                header
                    .spawn((
                        Button,
                        AnchorTarget::new("signout-control"),
                        AnchorHighlight {
                            base: PANEL,
                            lit: PANEL_LIT,
                        },
                        Node {
                            padding: UiRect::axes(Val::Px(16.0), Val::Px(8.0)),
                            ..default()
                        },
                        BackgroundColor(PANEL),
                    ))
                    .with_children(|button| {
                        button.spawn((
                            Text::new("Sign out"),
                            TextFont {
                                font_size: 16.0,
                                ..default()
                            },
                            TextColor(INK),
                        ));
                    });
            });
            page.spawn((
                label("page-heading", "Dashboard", 40.0),
                TextLayout::new_with_justify(JustifyText::Left),
            ));
            page.spawn((
                AnchorTarget::new("form-field"),
                AnchorHighlight {
                    base: PANEL,
                    lit: PANEL_LIT,
                },
                Node {
                    width: Val::Px(360.0),
                    height: Val::Px(40.0),
                    ..default()
                },
                BackgroundColor(PANEL),
            ));
        });
}
