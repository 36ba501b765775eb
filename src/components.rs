use bevy::prelude::*;

/// Marks the sprite that renders the mascot
#[derive(Component)]
pub struct MascotSprite;

/// A UI node the mascot may land on. `category` must match a configured anchor category.
#[derive(Component, Clone, Debug)]
pub struct AnchorTarget {
    pub category: String,
}

impl AnchorTarget {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
        }
    }
}

/// Background color to restore when the mascot leaves a highlighted anchor.
#[derive(Component, Clone, Copy)]
pub struct AnchorHighlight {
    pub base: Color,
    pub lit: Color,
}

/// Stable anchor id for a UI entity, shared by the scanner and the highlighter.
pub fn anchor_id(category: &str, entity: Entity) -> String {
    format!("{category}-{}", entity.index())
}
