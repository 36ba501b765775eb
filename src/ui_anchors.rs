//! Bevy UI as an anchor source.
//!
//! Nodes tagged with [`AnchorTarget`] are read after layout. Text nodes report the
//! width from their computed text layout instead of the estimate.

use std::collections::HashMap;

use bevy::prelude::*;
use bevy::render::view::VisibilitySystems;
use bevy::text::TextLayoutInfo;
use bevy::ui::UiSystem;
use bevy::window::{PrimaryWindow, WindowResized};

use crate::anchors::{
    estimate_text_width, AnchorCandidate, AnchorProvider, Bounds, FontSpec, Insets, TextAlign,
    TextRun,
};
use crate::components::{anchor_id, AnchorHighlight, AnchorTarget};
use crate::engine::MascotEngine;
use crate::events::{MascotEvent, MascotEventBus};
use crate::physics_core::Viewport;

pub struct UiAnchorPlugin;

impl Plugin for UiAnchorPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            PostUpdate,
            scan_ui_anchors
                .after(UiSystem::PostLayout)
                .after(VisibilitySystems::VisibilityPropagate)
                .run_if(resource_exists::<MascotEngine>),
        )
        .add_systems(
            Update,
            highlight_anchors.run_if(resource_exists::<MascotEventBus>),
        );
    }
}

type AnchorNodeItem<'a> = (
    Entity,
    &'a AnchorTarget,
    &'a ComputedNode,
    &'a GlobalTransform,
    &'a InheritedVisibility,
    Option<&'a Text>,
    Option<&'a TextFont>,
    Option<&'a TextLayout>,
    Option<&'a TextLayoutInfo>,
);

/// Snapshot of tagged UI nodes in logical pixels.
///
/// Visibility comes from the node hierarchy. `ViewVisibility` is reset every frame
/// during `PostUpdate` and would read as hidden mid-frame.
#[derive(Default)]
pub struct UiAnchorProvider {
    candidates: Vec<AnchorCandidate>,
    measured: HashMap<String, f32>,
}

impl AnchorProvider for UiAnchorProvider {
    fn candidates(&self, category: &str) -> Vec<AnchorCandidate> {
        self.candidates
            .iter()
            .filter(|c| c.category == category)
            .cloned()
            .collect()
    }

    fn measure_text(&self, candidate: &AnchorCandidate, run: &TextRun) -> Option<f32> {
        self.measured
            .get(&candidate.id)
            .copied()
            .or_else(|| Some(estimate_text_width(&run.content, &run.font)))
    }
}

fn text_align(justify: JustifyText) -> TextAlign {
    match justify {
        JustifyText::Center => TextAlign::Center,
        JustifyText::Right => TextAlign::Right,
        _ => TextAlign::Left,
    }
}

fn collect_ui_anchors(nodes: &Query<AnchorNodeItem>) -> UiAnchorProvider {
    let mut provider = UiAnchorProvider::default();
    for (entity, target, node, transform, visibility, text, font, layout, info) in nodes.iter() {
        let scale = node.inverse_scale_factor();
        let size = node.size() * scale;
        let center = transform.translation().truncate() * scale;
        let pad = node.padding();
        let id = anchor_id(&target.category, entity);
        let run = text.map(|t| TextRun {
            content: t.0.clone(),
            font: FontSpec::new("default", font.map(|f| f.font_size).unwrap_or(16.0), 400),
            align: layout.map(|l| text_align(l.justify)).unwrap_or_default(),
        });
        if let (Some(_), Some(info)) = (&run, info) {
            provider.measured.insert(id.clone(), info.size.x * scale);
        }
        provider.candidates.push(AnchorCandidate {
            id,
            category: target.category.clone(),
            layout: Bounds::new(
                center.x - size.x * 0.5,
                center.y - size.y * 0.5,
                size.x,
                size.y,
            ),
            padding: Insets {
                left: pad.left * scale,
                right: pad.right * scale,
                top: pad.top * scale,
                bottom: pad.bottom * scale,
            },
            visible: visibility.get(),
            text: run,
        });
    }
    provider
}

fn scan_ui_anchors(
    mut engine: ResMut<MascotEngine>,
    mut resized: EventReader<WindowResized>,
    windows: Query<&Window, With<PrimaryWindow>>,
    nodes: Query<AnchorNodeItem>,
) {
    let resize = resized.read().last().is_some();
    if !resize && !engine.scan_requested() {
        return;
    }
    let provider = collect_ui_anchors(&nodes);
    match windows.get_single() {
        Ok(window) if resize => {
            engine.resize(Viewport::new(window.width(), window.height()), &provider);
        }
        _ => {
            engine.rescan(&provider);
        }
    }
}

fn highlight_anchors(
    bus: Res<MascotEventBus>,
    mut last_seen: Local<u64>,
    mut nodes: Query<(Entity, &AnchorTarget, &AnchorHighlight, &mut BackgroundColor)>,
) {
    for recorded in bus.recent.iter().filter(|e| e.frame > *last_seen) {
        let (anchor, lit) = match &recorded.event {
            MascotEvent::AnchorLanded { anchor, .. } => (anchor, true),
            MascotEvent::AnchorLeft { anchor } => (anchor, false),
            _ => continue,
        };
        for (entity, target, highlight, mut background) in nodes.iter_mut() {
            if anchor_id(&target.category, entity) == *anchor {
                background.0 = if lit { highlight.lit } else { highlight.base };
            }
        }
    }
    *last_seen = bus.frame;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;

    fn collect(nodes: Query<AnchorNodeItem>) -> UiAnchorProvider {
        collect_ui_anchors(&nodes)
    }

    #[test]
    fn hidden_view_visibility_does_not_hide_anchor() {
        let mut world = World::new();
        world.spawn((
            AnchorTarget::new("form-field"),
            ComputedNode::default(),
            GlobalTransform::default(),
            InheritedVisibility::VISIBLE,
            ViewVisibility::HIDDEN,
        ));
        world.spawn((
            AnchorTarget::new("form-field"),
            ComputedNode::default(),
            GlobalTransform::default(),
            InheritedVisibility::HIDDEN,
        ));
        let provider = world.run_system_once(collect).unwrap();
        let found = provider.candidates("form-field");
        assert_eq!(found.len(), 2);
        assert_eq!(found.iter().filter(|c| c.visible).count(), 1);
    }

    #[test]
    fn justify_maps_to_alignment() {
        assert_eq!(text_align(JustifyText::Center), TextAlign::Center);
        assert_eq!(text_align(JustifyText::Right), TextAlign::Right);
        assert_eq!(text_align(JustifyText::Justified), TextAlign::Left);
    }

    #[test]
    fn layout_width_wins_over_estimate() {
        let mut provider = UiAnchorProvider::default();
        provider.measured.insert("page-heading-1".into(), 123.0);
        let run = TextRun {
            content: "Dashboard".into(),
            font: FontSpec::new("default", 24.0, 400),
            align: TextAlign::Left,
        };
        let candidate = AnchorCandidate {
            id: "page-heading-1".into(),
            category: "page-heading".into(),
            layout: Bounds::new(0.0, 0.0, 300.0, 40.0),
            padding: Insets::default(),
            visible: true,
            text: Some(run.clone()),
        };
        assert_eq!(provider.measure_text(&candidate, &run), Some(123.0));
        let other = AnchorCandidate {
            id: "page-heading-2".into(),
            ..candidate
        };
        assert_eq!(
            provider.measure_text(&other, &run),
            Some(estimate_text_width("Dashboard", &run.font))
        );
    }
}
