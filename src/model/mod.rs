//! Composition data model
//!
//! Layers, lanes, clips (scenes and placements) and the
//! `CompositionState` aggregate that owns them.

pub mod clip;
pub mod composition;
pub mod lane;
pub mod layer;

pub use clip::{AttachmentPoint, Clip, Placement, PlacementKind, Scene, TimeSpan};
pub use composition::CompositionState;
pub use lane::{AudioRole, LaneKind, VisualRole};
pub use layer::{Layer, LayerId, LayerMove, DEFAULT_LAYER_ID};
