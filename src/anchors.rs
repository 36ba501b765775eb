//! Target anchor discovery.
//!
//! Anchors are labeled UI regions the mascot can land on or bump into. The host
//! exposes them through [`AnchorProvider`]; [`scan`] turns the raw candidates into an
//! immutable [`AnchorSet`], replacing container rectangles of text-bearing anchors with
//! the measured glyph extent so the mascot sits on the letters rather than the padding.

use std::sync::Arc;

use bevy::log::debug;
use serde::{Deserialize, Serialize};

use crate::config::AnchorCategory;

/// Axis-aligned rectangle in viewport pixels, origin top-left, y down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width * 0.5
    }

    /// Positive finite extent on both axes and a finite origin.
    pub fn is_collidable(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }

    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }
}

/// Padding between a container's layout box and its content box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Insets {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    #[serde(default)]
    pub family: String,
    pub size: f32,
    #[serde(default = "default_weight")]
    pub weight: u16,
}

fn default_weight() -> u16 {
    400
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size: f32, weight: u16) -> Self {
        Self {
            family: family.into(),
            size,
            weight,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub content: String,
    pub font: FontSpec,
    #[serde(default)]
    pub align: TextAlign,
}

/// One element as the host sees it, before measurement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnchorCandidate {
    pub id: String,
    #[serde(default)]
    pub category: String,
    pub layout: Bounds,
    #[serde(default)]
    pub padding: Insets,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub text: Option<TextRun>,
}

fn default_visible() -> bool {
    true
}

/// Host capability that answers "which elements of this category exist, and where".
pub trait AnchorProvider {
    fn candidates(&self, category: &str) -> Vec<AnchorCandidate>;

    /// Rendered width of `run` in pixels. Hosts with a text layout engine override this.
    fn measure_text(&self, _candidate: &AnchorCandidate, run: &TextRun) -> Option<f32> {
        Some(estimate_text_width(&run.content, &run.font))
    }
}

/// Width estimate from average glyph advances, used when the host has no text metrics.
pub fn estimate_text_width(content: &str, font: &FontSpec) -> f32 {
    let weight_scale = if font.weight >= 600 { 1.08 } else { 1.0 };
    let advance: f32 = content
        .chars()
        .map(|c| match c {
            ' ' => 0.28,
            'i' | 'j' | 'l' | '.' | ',' | '\'' | '|' | '!' => 0.28,
            'f' | 't' | 'r' => 0.36,
            'm' | 'w' | 'M' | 'W' | '@' => 0.85,
            c if c.is_ascii_uppercase() => 0.66,
            c if c.is_ascii_digit() => 0.55,
            _ => 0.52,
        })
        .sum();
    advance * font.size * weight_scale
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextBounds {
    pub bounds: Bounds,
    pub baseline_y: f32,
}

/// Tight glyph box for a text run laid out inside `layout`.
///
/// Horizontal start follows the run's alignment within the content box. Vertically the
/// glyphs are assumed centered in the container with the baseline at 80% of the font
/// size below the visual top.
pub fn text_bounds(
    layout: Bounds,
    padding: Insets,
    run: &TextRun,
    glyph_width: f32,
) -> Option<TextBounds> {
    let font_size = run.font.size;
    if !glyph_width.is_finite() || glyph_width <= 0.0 || !font_size.is_finite() || font_size <= 0.0
    {
        return None;
    }
    let content_left = layout.x + padding.left;
    let content_right = layout.right() - padding.right;
    let content_width = content_right - content_left;
    if content_width <= 0.0 {
        return None;
    }
    let width = glyph_width.min(content_width);
    let x = match run.align {
        TextAlign::Left => content_left,
        TextAlign::Center => content_left + (content_width - width) * 0.5,
        TextAlign::Right => content_right - width,
    };
    let visual_top = layout.y + (layout.height - font_size) * 0.5;
    let bounds = Bounds::new(x, visual_top, width, font_size);
    Some(TextBounds {
        bounds,
        baseline_y: visual_top + font_size * 0.8,
    })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub id: String,
    pub category: String,
    pub bounds: Bounds,
    pub is_text: bool,
    pub text_baseline_y: Option<f32>,
}

impl Anchor {
    /// A plain rectangular anchor, mostly for hosts and tests that skip scanning.
    pub fn rect(id: impl Into<String>, category: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            bounds,
            is_text: false,
            text_baseline_y: None,
        }
    }
}

/// Immutable snapshot of anchors; cloning shares the same allocation.
#[derive(Clone, Debug, Default)]
pub struct AnchorSet(Arc<[Anchor]>);

impl AnchorSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Anchor> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Anchor> {
        self.0.iter().find(|a| a.id == id)
    }

    pub fn as_slice(&self) -> &[Anchor] {
        &self.0
    }
}

impl From<Vec<Anchor>> for AnchorSet {
    fn from(anchors: Vec<Anchor>) -> Self {
        Self(anchors.into())
    }
}

impl PartialEq for AnchorSet {
    fn eq(&self, other: &Self) -> bool {
        self.0[..] == other.0[..]
    }
}

fn measure(
    provider: &dyn AnchorProvider,
    category: &AnchorCategory,
    candidate: AnchorCandidate,
) -> Option<Anchor> {
    if !candidate.visible || !candidate.layout.is_collidable() {
        return None;
    }
    let text = if category.text {
        candidate.text.as_ref()
    } else {
        None
    };
    let Some(run) = text else {
        return Some(Anchor {
            id: candidate.id,
            category: category.name.clone(),
            bounds: candidate.layout,
            is_text: false,
            text_baseline_y: None,
        });
    };
    if run.content.trim().is_empty() {
        return None;
    }
    let width = provider.measure_text(&candidate, run)?;
    let measured = text_bounds(candidate.layout, candidate.padding, run, width)?;
    if !measured.bounds.is_collidable() {
        return None;
    }
    Some(Anchor {
        id: candidate.id,
        category: category.name.clone(),
        bounds: measured.bounds,
        is_text: true,
        text_baseline_y: Some(measured.baseline_y),
    })
}

/// Builds the anchor set from the provider's current layout.
///
/// Order is category order, then provider order within a category. Invisible and
/// degenerate candidates are dropped; at most `max_anchors` are kept.
pub fn scan(
    provider: &dyn AnchorProvider,
    categories: &[AnchorCategory],
    max_anchors: usize,
) -> AnchorSet {
    let mut anchors = Vec::new();
    let mut skipped = 0usize;
    for category in categories {
        for candidate in provider.candidates(&category.name) {
            match measure(provider, category, candidate) {
                Some(anchor) => anchors.push(anchor),
                None => skipped += 1,
            }
        }
    }
    if anchors.len() > max_anchors {
        debug!(
            "[Virgil mascot] Anchor scan found {} anchors, keeping first {}",
            anchors.len(),
            max_anchors
        );
        anchors.truncate(max_anchors);
    }
    if skipped > 0 {
        debug!("[Virgil mascot] Skipped {skipped} invisible or empty anchor candidate(s)");
    }
    AnchorSet::from(anchors)
}

/// Provider over a fixed list of candidates; used by the headless simulation and tests.
#[derive(Clone, Debug, Default)]
pub struct StaticAnchorProvider {
    pub candidates: Vec<AnchorCandidate>,
}

impl AnchorProvider for StaticAnchorProvider {
    fn candidates(&self, category: &str) -> Vec<AnchorCandidate> {
        self.candidates
            .iter()
            .filter(|c| c.category == category)
            .cloned()
            .collect()
    }
}
