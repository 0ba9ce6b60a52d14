//! Clips: scenes and placements
//!
//! A [`Scene`] is a slot on the video lane, possibly still without media.
//! A [`Placement`] is an asset or wardrobe item on any lane, attached to a
//! scene or to an absolute time. Both implement [`TimeSpan`] and are held
//! in a composition as the [`Clip`] enum.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::lane::{AudioRole, LaneKind, VisualRole};
use super::layer::LayerId;

/// Anything occupying a half-open span of timeline time.
pub trait TimeSpan {
    /// Start time in seconds
    fn start_time(&self) -> f64;

    /// Duration in seconds
    fn duration(&self) -> f64;

    /// End time in seconds
    fn end_time(&self) -> f64 {
        self.start_time() + self.duration()
    }

    /// Whether this span overlaps `[start, end)`
    fn overlaps(&self, start: f64, end: f64) -> bool {
        self.start_time() < end && self.end_time() > start
    }
}

impl<T: TimeSpan + ?Sized> TimeSpan for &T {
    fn start_time(&self) -> f64 {
        (**self).start_time()
    }

    fn duration(&self) -> f64 {
        (**self).duration()
    }
}

impl TimeSpan for (f64, f64) {
    fn start_time(&self) -> f64 {
        self.0
    }

    fn duration(&self) -> f64 {
        self.1
    }
}

/// Primary video/image content on a layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Unique identifier
    pub id: Uuid,
    /// The layer this scene is on
    pub layer_id: LayerId,
    /// Start time in seconds
    pub start_time: f64,
    /// Duration in seconds
    pub duration: f64,
    /// Media backing this scene; `None` marks an empty slot
    #[serde(default)]
    pub media_ref: Option<String>,
    /// Seconds trimmed from the head of the source media
    #[serde(default)]
    pub trim_start: f64,
    /// Seconds trimmed from the tail of the source media
    #[serde(default)]
    pub trim_end: f64,
    /// Scene order within the episode
    #[serde(default)]
    pub order: u32,
}

impl Scene {
    /// Create a new scene with a generated id
    pub fn new(layer_id: LayerId, start_time: f64, duration: f64, media_ref: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            layer_id,
            start_time,
            duration,
            media_ref,
            trim_start: 0.0,
            trim_end: 0.0,
            order: 0,
        }
    }

    /// Empty slots occupy time but cannot be dragged
    pub fn is_empty_slot(&self) -> bool {
        self.media_ref.is_none()
    }
}

impl TimeSpan for Scene {
    fn start_time(&self) -> f64 {
        self.start_time
    }

    fn duration(&self) -> f64 {
        self.duration
    }
}

/// What a placement references in the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementKind {
    Asset,
    Wardrobe,
}

/// Where a placement hangs relative to the scene it was dropped on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttachmentPoint {
    #[default]
    SceneStart,
    SceneEnd,
    SceneMiddle,
    Custom,
}

/// Overlay, wardrobe item or audio cue placed on the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    /// Unique identifier
    pub id: Uuid,
    /// The layer this placement is on
    pub layer_id: LayerId,
    /// Start time in seconds
    pub start_time: f64,
    /// Duration in seconds
    pub duration: f64,
    /// Library item type
    pub kind: PlacementKind,
    #[serde(default)]
    pub visual_role: Option<VisualRole>,
    #[serde(default)]
    pub audio_role: Option<AudioRole>,
    #[serde(default)]
    pub attachment_point: AttachmentPoint,
    /// Offset from the attachment point in seconds
    #[serde(default)]
    pub offset_seconds: f64,
    /// Library asset or wardrobe item id
    pub asset_ref: String,
    /// Optional user-facing label
    #[serde(default)]
    pub label: Option<String>,
}

impl Placement {
    /// The lane this placement renders on, if its roles place it anywhere
    pub fn lane(&self) -> Option<LaneKind> {
        self.visual_role
            .map(|role| role.lane())
            .or_else(|| self.audio_role.map(|role| role.lane()))
    }
}

impl TimeSpan for Placement {
    fn start_time(&self) -> f64 {
        self.start_time
    }

    fn duration(&self) -> f64 {
        self.duration
    }
}

/// A time-bounded item on the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Clip {
    Scene(Scene),
    Placement(Placement),
}

impl Clip {
    pub fn id(&self) -> Uuid {
        match self {
            Clip::Scene(scene) => scene.id,
            Clip::Placement(placement) => placement.id,
        }
    }

    pub fn layer_id(&self) -> LayerId {
        match self {
            Clip::Scene(scene) => scene.layer_id,
            Clip::Placement(placement) => placement.layer_id,
        }
    }

    pub fn set_layer_id(&mut self, layer_id: LayerId) {
        match self {
            Clip::Scene(scene) => scene.layer_id = layer_id,
            Clip::Placement(placement) => placement.layer_id = layer_id,
        }
    }

    pub fn set_start_time(&mut self, start_time: f64) {
        match self {
            Clip::Scene(scene) => scene.start_time = start_time,
            Clip::Placement(placement) => placement.start_time = start_time,
        }
    }

    pub fn set_duration(&mut self, duration: f64) {
        match self {
            Clip::Scene(scene) => scene.duration = duration,
            Clip::Placement(placement) => placement.duration = duration,
        }
    }

    /// Lane the clip renders on. Scenes are always on the video lane.
    pub fn lane(&self) -> Option<LaneKind> {
        match self {
            Clip::Scene(_) => Some(LaneKind::Video),
            Clip::Placement(placement) => placement.lane(),
        }
    }

    /// Empty scene slots cannot be dragged or resized
    pub fn is_draggable(&self) -> bool {
        match self {
            Clip::Scene(scene) => !scene.is_empty_slot(),
            Clip::Placement(_) => true,
        }
    }

    pub fn is_scene(&self) -> bool {
        matches!(self, Clip::Scene(_))
    }

    pub fn as_placement(&self) -> Option<&Placement> {
        match self {
            Clip::Placement(placement) => Some(placement),
            Clip::Scene(_) => None,
        }
    }

    /// Short name of the variant for messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Clip::Scene(_) => "scene",
            Clip::Placement(_) => "placement",
        }
    }
}

impl TimeSpan for Clip {
    fn start_time(&self) -> f64 {
        match self {
            Clip::Scene(scene) => scene.start_time,
            Clip::Placement(placement) => placement.start_time,
        }
    }

    fn duration(&self) -> f64 {
        match self {
            Clip::Scene(scene) => scene.duration,
            Clip::Placement(placement) => placement.duration,
        }
    }
}

impl From<Scene> for Clip {
    fn from(scene: Scene) -> Self {
        Clip::Scene(scene)
    }
}

impl From<Placement> for Clip {
    fn from(placement: Placement) -> Self {
        Clip::Placement(placement)
    }
}
