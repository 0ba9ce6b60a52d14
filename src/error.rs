//! Error handling for Montage
//!
//! Every failure the engine reports is one specific [`CompositionError`]
//! value. Validation errors are raised before any persistence call,
//! persistence errors are raised after the optimistic mutation has been
//! rolled back.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::model::LayerId;
use crate::persistence::PersistenceError;

/// Result type alias for Montage operations
pub type Result<T> = std::result::Result<T, CompositionError>;

/// Broad class of an error, used by callers to pick the kind of user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rejected synchronously; nothing was mutated.
    Validation,
    /// The backing store refused or failed; the local mutation was rolled back.
    Persistence,
    /// Undo/redo pointer at a boundary.
    History,
    /// Local files and configuration.
    Io,
}

/// Main error type for Montage operations
#[derive(Error, Debug)]
pub enum CompositionError {
    // Lookup Errors
    #[error("Clip not found: {id}")]
    ClipNotFound { id: Uuid },

    #[error("Layer not found: {id}")]
    LayerNotFound { id: LayerId },

    #[error("Clip {id} is not a placement")]
    NotAPlacement { id: Uuid },

    // Validation Errors
    #[error("Invalid drop: {source_kind} cannot be dropped on {target}")]
    InvalidDrop { source_kind: String, target: String },

    #[error("Layer {id} is locked")]
    LayerLocked { id: LayerId },

    #[error("The default layer cannot be deleted")]
    DefaultLayerProtected,

    #[error("Clip {id} has no media and cannot be dragged")]
    NotDraggable { id: Uuid },

    #[error("Duration {duration:.3}s is below the minimum of {minimum:.3}s")]
    DurationTooShort { duration: f64, minimum: f64 },

    #[error("Time must be a finite value of at least 0s, got {time}")]
    NegativeTime { time: f64 },

    #[error("Split point {at:.3}s must leave both halves of [{start:.3}s, {end:.3}s) at least {minimum:.3}s long")]
    SplitOutOfRange {
        at: f64,
        start: f64,
        end: f64,
        minimum: f64,
    },

    #[error("Invalid viewport: width {width_px}px at zoom {zoom}")]
    InvalidViewport { width_px: f64, zoom: f64 },

    #[error("No gesture in progress for clip {id}")]
    NoGestureInProgress { id: Uuid },

    #[error("Clip {id} is being dragged")]
    GestureInProgress { id: Uuid },

    #[error("Selection contains no placements")]
    EmptySelection,

    #[error("Clipboard is empty")]
    EmptyClipboard,

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // Persistence Errors
    #[error("Failed to {operation}: {source}")]
    PersistenceFailed {
        operation: String,
        #[source]
        source: PersistenceError,
    },

    #[error("Batch interrupted after {completed} of {total} items: {source}")]
    BatchInterrupted {
        completed: usize,
        total: usize,
        #[source]
        source: PersistenceError,
    },

    // History Errors
    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    // File Errors
    #[error("Failed to read file: {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CompositionError {
    /// Wrap a service failure with the operation that was being persisted.
    pub fn persistence(operation: impl Into<String>, source: PersistenceError) -> Self {
        CompositionError::PersistenceFailed {
            operation: operation.into(),
            source,
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            CompositionError::ClipNotFound { .. } => "CLIP_NOT_FOUND",
            CompositionError::LayerNotFound { .. } => "LAYER_NOT_FOUND",
            CompositionError::NotAPlacement { .. } => "NOT_A_PLACEMENT",
            CompositionError::InvalidDrop { .. } => "INVALID_DROP",
            CompositionError::LayerLocked { .. } => "LAYER_LOCKED",
            CompositionError::DefaultLayerProtected => "DEFAULT_LAYER_PROTECTED",
            CompositionError::NotDraggable { .. } => "NOT_DRAGGABLE",
            CompositionError::DurationTooShort { .. } => "DURATION_TOO_SHORT",
            CompositionError::NegativeTime { .. } => "NEGATIVE_TIME",
            CompositionError::SplitOutOfRange { .. } => "SPLIT_OUT_OF_RANGE",
            CompositionError::InvalidViewport { .. } => "INVALID_VIEWPORT",
            CompositionError::NoGestureInProgress { .. } => "NO_GESTURE_IN_PROGRESS",
            CompositionError::GestureInProgress { .. } => "GESTURE_IN_PROGRESS",
            CompositionError::EmptySelection => "EMPTY_SELECTION",
            CompositionError::EmptyClipboard => "EMPTY_CLIPBOARD",
            CompositionError::InvalidConfig { .. } => "INVALID_CONFIG",
            CompositionError::PersistenceFailed { .. } => "PERSISTENCE_FAILED",
            CompositionError::BatchInterrupted { .. } => "BATCH_INTERRUPTED",
            CompositionError::NothingToUndo => "NOTHING_TO_UNDO",
            CompositionError::NothingToRedo => "NOTHING_TO_REDO",
            CompositionError::FileReadError { .. } => "FILE_READ_ERROR",
            CompositionError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            CompositionError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Classify the error for user feedback.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CompositionError::PersistenceFailed { .. } | CompositionError::BatchInterrupted { .. } => {
                ErrorCategory::Persistence
            }
            CompositionError::NothingToUndo | CompositionError::NothingToRedo => {
                ErrorCategory::History
            }
            CompositionError::FileReadError { .. }
            | CompositionError::FileWriteError { .. }
            | CompositionError::Serialization(_)
            | CompositionError::InvalidConfig { .. } => ErrorCategory::Io,
            _ => ErrorCategory::Validation,
        }
    }

    /// Returns true if repeating the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CompositionError::PersistenceFailed { source, .. }
            | CompositionError::BatchInterrupted { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Returns a user-friendly recovery suggestion.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            CompositionError::InvalidDrop { .. } => {
                Some("Visual media belongs on video or overlay lanes, audio on voice, music or sfx lanes.")
            }
            CompositionError::LayerLocked { .. } => Some("Unlock the layer before editing its clips."),
            CompositionError::NotDraggable { .. } => {
                Some("Assign media to the empty scene slot before moving it.")
            }
            CompositionError::DurationTooShort { .. } => Some("Use a longer duration."),
            CompositionError::GestureInProgress { .. } => {
                Some("Finish or cancel the drag before editing the clip.")
            }
            CompositionError::SplitOutOfRange { .. } => {
                Some("Move the playhead further inside the clip before splitting.")
            }
            CompositionError::PersistenceFailed { .. } => {
                Some("The change was reverted. Check the connection and try again.")
            }
            CompositionError::BatchInterrupted { .. } => {
                Some("Completed items were kept. Retry to finish the remaining items.")
            }
            CompositionError::NothingToUndo => Some("There are no actions to undo."),
            CompositionError::NothingToRedo => Some("There are no undone actions to redo."),
            CompositionError::EmptyClipboard => Some("Copy some placements first."),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = CompositionError::LayerLocked { id: 3 };
        assert_eq!(err.error_code(), "LAYER_LOCKED");
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_gesture_in_progress_is_validation() {
        let err = CompositionError::GestureInProgress { id: Uuid::nil() };
        assert_eq!(err.error_code(), "GESTURE_IN_PROGRESS");
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_persistence_errors_are_retryable() {
        let err = CompositionError::persistence(
            "update placement",
            PersistenceError::Unavailable {
                reason: "connection reset".to_string(),
            },
        );
        assert_eq!(err.category(), ErrorCategory::Persistence);
        assert!(err.is_retryable());
        assert!(err.recovery_suggestion().is_some());
        assert!(err.to_string().contains("update placement"));
    }

    #[test]
    fn test_rejected_writes_are_not_retryable() {
        let err = CompositionError::persistence(
            "create placement",
            PersistenceError::Rejected {
                status: 400,
                message: "bad asset".to_string(),
            },
        );
        assert!(!err.is_retryable());
    }
}
