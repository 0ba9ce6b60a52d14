//! State Management Module
//!
//! Provides the composition store, undo/redo history and composition
//! files on disk.

pub mod history;
pub mod storage;
pub mod store;

pub use history::{HistoryEntry, HistoryManager};
pub use storage::{load_state, save_state, CompositionFile, CURRENT_SCHEMA_VERSION};
pub use store::{repair_integrity, ChangeEvent, ChangeKind, CompositionStore, IntegrityWarning};
