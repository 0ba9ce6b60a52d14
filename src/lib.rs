//! Montage - Timeline Composition Engine
//!
//! Montage models a layered multi-track timeline and applies edits to it.
//!
//! # Architecture
//!
//! - `model`: layers, lanes, scenes and placements
//! - `timeline`: pure time math (pixel mapping, duration, stacking, snapping)
//! - `state`: the composition store, undo history and composition files
//! - `persistence`: the service every accepted edit is written through
//! - `engine`: the edit controller, gestures, drop rules and playback
//!
//! Every edit is applied optimistically, persisted, and only then recorded
//! in history. A failed write restores the previous state.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod persistence;
pub mod state;
pub mod timeline;

pub use config::EngineConfig;
pub use engine::{
    CompositionExport, DragSource, DropTarget, EditController, GestureKind, GestureOutcome,
    GesturePhase, PlaybackState,
};
pub use error::{CompositionError, ErrorCategory, Result};
pub use model::{
    Clip, CompositionState, LaneKind, Layer, LayerId, Placement, Scene, TimeSpan,
    DEFAULT_LAYER_ID,
};
pub use persistence::{InMemoryPersistence, PersistenceError, PersistenceService};
pub use state::{ChangeEvent, ChangeKind, IntegrityWarning};
