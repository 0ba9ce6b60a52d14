//! Undo/Redo History
//!
//! Linear list of labelled composition snapshots with a pointer to the
//! current entry. The first entry is the baseline and can never be undone
//! past. Committing after an undo drops everything after the pointer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::DEFAULT_MAX_HISTORY;
use crate::error::{CompositionError, Result};
use crate::model::CompositionState;

/// A single immutable point in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Unique identifier for this entry.
    pub id: Uuid,

    /// Human-readable description of the edit, e.g. "Move clip".
    pub label: String,

    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,

    /// Complete composition state after the edit.
    pub snapshot: CompositionState,
}

impl HistoryEntry {
    pub fn new(label: impl Into<String>, snapshot: CompositionState) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            timestamp: Utc::now(),
            snapshot,
        }
    }
}

/// Manages undo/redo for a composition.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    /// Entries oldest first.
    entries: Vec<HistoryEntry>,

    /// Index of the entry matching the live state.
    pointer: usize,

    /// Maximum number of entries to keep.
    max_entries: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl HistoryManager {
    /// Create an empty history keeping at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            pointer: 0,
            max_entries: max_entries.max(1),
        }
    }

    /// Drop all history and start over from `snapshot`.
    pub fn reset(&mut self, label: impl Into<String>, snapshot: CompositionState) {
        self.entries.clear();
        self.entries.push(HistoryEntry::new(label, snapshot));
        self.pointer = 0;
    }

    /// Record a new entry after the current one.
    ///
    /// Entries after the pointer are discarded and the oldest entries are
    /// trimmed once the limit is exceeded.
    pub fn commit(&mut self, label: impl Into<String>, snapshot: CompositionState) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.pointer + 1);
        }

        let entry = HistoryEntry::new(label, snapshot);
        debug!(label = %entry.label, depth = self.entries.len() + 1, "history commit");
        self.entries.push(entry);
        self.pointer = self.entries.len() - 1;

        self.trim_history();
    }

    /// Step back one entry, returning the entry to restore.
    pub fn undo(&mut self) -> Result<&HistoryEntry> {
        if !self.can_undo() {
            return Err(CompositionError::NothingToUndo);
        }
        self.pointer -= 1;
        Ok(&self.entries[self.pointer])
    }

    /// Step forward one entry, returning the entry to restore.
    pub fn redo(&mut self) -> Result<&HistoryEntry> {
        if !self.can_redo() {
            return Err(CompositionError::NothingToRedo);
        }
        self.pointer += 1;
        Ok(&self.entries[self.pointer])
    }

    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty() && self.pointer > 0
    }

    pub fn can_redo(&self) -> bool {
        self.pointer + 1 < self.entries.len()
    }

    /// Label of the entry an undo would revert.
    pub fn undo_label(&self) -> Option<&str> {
        self.can_undo()
            .then(|| self.entries[self.pointer].label.as_str())
    }

    /// Label of the entry a redo would re-apply.
    pub fn redo_label(&self) -> Option<&str> {
        self.entries
            .get(self.pointer + 1)
            .map(|entry| entry.label.as_str())
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.pointer)
    }

    pub fn current_label(&self) -> Option<&str> {
        self.current().map(|entry| entry.label.as_str())
    }

    /// Index of the current entry.
    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Change the limit, trimming immediately if needed.
    pub fn set_max_entries(&mut self, max_entries: usize) {
        self.max_entries = max_entries.max(1);
        self.trim_history();
    }

    /// Remove the oldest entries beyond the limit, keeping the pointer on
    /// the same entry.
    fn trim_history(&mut self) {
        if self.entries.len() <= self.max_entries {
            return;
        }
        let excess = self.entries.len() - self.max_entries;
        let removed = excess.min(self.pointer);
        self.entries = self.entries.split_off(removed);
        self.pointer -= removed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Scene;

    fn state_with(n: usize) -> CompositionState {
        let mut state = CompositionState::new();
        for i in 0..n {
            state
                .clips
                .push(Scene::new(1, i as f64 * 5.0, 5.0, Some(format!("s{}", i))).into());
        }
        state
    }

    fn history_with(labels: &[&str]) -> HistoryManager {
        let mut history = HistoryManager::default();
        history.reset("Load composition", state_with(0));
        for (i, label) in labels.iter().enumerate() {
            history.commit(*label, state_with(i + 1));
        }
        history
    }

    #[test]
    fn test_new_history_is_empty() {
        let history = HistoryManager::new(10);
        assert!(history.is_empty());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.current_label(), None);
    }

    #[test]
    fn test_baseline_cannot_be_undone() {
        let mut history = history_with(&[]);
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
        assert!(matches!(history.undo(), Err(CompositionError::NothingToUndo)));
    }

    #[test]
    fn test_undo_redo_walks_the_pointer() {
        let mut history = history_with(&["Move clip", "Resize clip"]);
        assert_eq!(history.pointer(), 2);
        assert_eq!(history.undo_label(), Some("Resize clip"));

        let entry = history.undo().unwrap();
        assert_eq!(entry.label, "Move clip");
        assert_eq!(entry.snapshot.clips.len(), 1);
        assert_eq!(history.redo_label(), Some("Resize clip"));

        let entry = history.undo().unwrap();
        assert_eq!(entry.label, "Load composition");
        assert!(!history.can_undo());

        let entry = history.redo().unwrap();
        assert_eq!(entry.label, "Move clip");
        let entry = history.redo().unwrap();
        assert_eq!(entry.label, "Resize clip");
        assert!(matches!(history.redo(), Err(CompositionError::NothingToRedo)));
    }

    #[test]
    fn test_commit_after_undo_discards_redo() {
        let mut history = history_with(&["Move clip", "Resize clip"]);
        history.undo().unwrap();
        let dropped = history.entries()[2].id;

        history.commit("Add placement", state_with(5));
        assert!(!history.can_redo());
        assert_eq!(history.len(), 3);
        assert_eq!(history.current_label(), Some("Add placement"));
        assert!(history.entries().iter().all(|entry| entry.id != dropped));
    }

    #[test]
    fn test_trim_keeps_pointer_on_current_entry() {
        let mut history = HistoryManager::new(3);
        history.reset("Load composition", state_with(0));
        for i in 0..5 {
            history.commit(format!("Edit {}", i), state_with(i + 1));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.current_label(), Some("Edit 4"));
        assert_eq!(history.entries()[0].label, "Edit 2");

        history.undo().unwrap();
        history.undo().unwrap();
        assert!(!history.can_undo());
    }

    #[test]
    fn test_undo_commit_cycles_stay_within_limit() {
        let mut history = HistoryManager::new(4);
        history.reset("Load composition", state_with(0));
        for i in 0..200 {
            history.commit(format!("Edit {}", i), state_with(i + 1));
            history.commit(format!("Edit {}b", i), state_with(i + 2));
            history.undo().unwrap();
        }
        assert!(history.len() <= 4);
        assert_eq!(history.current_label(), Some("Edit 199"));
        assert_eq!(history.redo_label(), Some("Edit 199b"));
    }

    #[test]
    fn test_shrinking_limit_trims() {
        let mut history = history_with(&["a", "b", "c", "d"]);
        history.set_max_entries(2);
        assert_eq!(history.len(), 2);
        assert_eq!(history.current_label(), Some("d"));
        assert_eq!(history.max_entries(), 2);
    }
}
