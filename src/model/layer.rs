use serde::{Deserialize, Serialize};

/// Layer identifier. Layer ids are small integers assigned in creation order.
pub type LayerId = u32;

/// The layer clips fall back to when their own layer goes away.
pub const DEFAULT_LAYER_ID: LayerId = 1;

/// A named, independently mutable/lockable track grouping clips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    /// Unique identifier
    pub id: LayerId,
    /// Display name (e.g., "Main", "Overlays")
    pub name: String,
    /// Header color as a CSS hex string
    pub color: String,
    /// Muted layers are skipped by the external player
    #[serde(default)]
    pub muted: bool,
    /// Locked layers reject every clip edit
    #[serde(default)]
    pub locked: bool,
    /// Vertical position of the layer in the timeline
    pub order_index: u32,
}

impl Layer {
    /// Create a new, unmuted and unlocked layer
    pub fn new(id: LayerId, name: impl Into<String>, color: impl Into<String>, order_index: u32) -> Self {
        Self {
            id,
            name: name.into(),
            color: color.into(),
            muted: false,
            locked: false,
            order_index,
        }
    }

    /// Create the default layer every composition starts with
    pub fn default_layer() -> Self {
        Self::new(DEFAULT_LAYER_ID, "Main", "#6366f1", 0)
    }

    /// Whether this is the protected fallback layer
    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_LAYER_ID
    }
}

/// Direction for reordering a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerMove {
    Up,
    Down,
}
