//! Edit Engine Module
//!
//! Everything that changes a composition over time:
//! - Edit transaction controller
//! - Drag and drop rules
//! - Gesture state tracking
//! - Playback clock and transport
//! - Export projection

pub mod controller;
pub mod drop_rules;
pub mod export;
pub mod gesture;
pub mod playback;

pub use controller::{EditController, GestureOutcome, Viewport};
pub use drop_rules::{is_valid_drop, AssetType, DragSource, DropTarget};
pub use export::CompositionExport;
pub use gesture::{GestureKind, GesturePhase, GestureTracker};
pub use playback::{PlaybackClock, PlaybackState, Transport};
