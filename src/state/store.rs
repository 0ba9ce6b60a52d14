//! Composition Store
//!
//! Owns the single [`CompositionState`] and broadcasts a [`ChangeEvent`]
//! whenever an edit, undo, redo, load or selection change lands. Mutators
//! are crate-private: the edit controller is the only writer.

use std::fmt;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{CompositionError, Result};
use crate::model::{Clip, CompositionState, Layer, LayerId, DEFAULT_LAYER_ID};
use crate::timeline::duration::compute_total_duration_with;

/// Capacity of the change notification channel.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// What kind of change produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Edit,
    Undo,
    Redo,
    Load,
    Selection,
    Rollback,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Edit => write!(f, "edit"),
            ChangeKind::Undo => write!(f, "undo"),
            ChangeKind::Redo => write!(f, "redo"),
            ChangeKind::Load => write!(f, "load"),
            ChangeKind::Selection => write!(f, "selection"),
            ChangeKind::Rollback => write!(f, "rollback"),
        }
    }
}

/// Notification sent to subscribers after the state changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    /// History label or a short description of the change
    pub label: String,
    pub kind: ChangeKind,
}

/// A problem found and repaired while loading a composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntegrityWarning {
    /// The default layer was missing and has been recreated.
    MissingDefaultLayer,
    /// A clip referenced a layer that does not exist; it now sits on layer 1.
    OrphanedClip { clip_id: Uuid, missing_layer_id: LayerId },
    /// A selected id did not match any clip and was dropped.
    StaleSelection { clip_id: Uuid },
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityWarning::MissingDefaultLayer => write!(f, "default layer was missing and was recreated"),
            IntegrityWarning::OrphanedClip {
                clip_id,
                missing_layer_id,
            } => write!(
                f,
                "clip {} referenced missing layer {} and was moved to layer {}",
                clip_id, missing_layer_id, DEFAULT_LAYER_ID
            ),
            IntegrityWarning::StaleSelection { clip_id } => {
                write!(f, "selection referenced unknown clip {}", clip_id)
            }
        }
    }
}

/// Repair `state` in place, returning what was fixed.
pub fn repair_integrity(state: &mut CompositionState) -> Vec<IntegrityWarning> {
    let mut warnings = Vec::new();

    if !state.has_layer(DEFAULT_LAYER_ID) {
        let mut layer = Layer::default_layer();
        layer.order_index = 0;
        for other in &mut state.layers {
            other.order_index += 1;
        }
        state.layers.insert(0, layer);
        warnings.push(IntegrityWarning::MissingDefaultLayer);
    }

    let known: Vec<LayerId> = state.layers.iter().map(|layer| layer.id).collect();
    for clip in &mut state.clips {
        let layer_id = clip.layer_id();
        if !known.contains(&layer_id) {
            clip.set_layer_id(DEFAULT_LAYER_ID);
            warnings.push(IntegrityWarning::OrphanedClip {
                clip_id: clip.id(),
                missing_layer_id: layer_id,
            });
        }
    }

    let stale: Vec<Uuid> = state
        .selection
        .iter()
        .copied()
        .filter(|id| state.clip(*id).is_none())
        .collect();
    for clip_id in stale {
        state.selection.remove(&clip_id);
        warnings.push(IntegrityWarning::StaleSelection { clip_id });
    }

    for warning in &warnings {
        warn!(%warning, "composition integrity repaired");
    }
    warnings
}

/// Single owner of the composition state.
#[derive(Debug)]
pub struct CompositionStore {
    state: CompositionState,
    duration_floor: f64,
    tail_pad: f64,
    events: broadcast::Sender<ChangeEvent>,
}

impl CompositionStore {
    /// Empty composition with only the default layer.
    pub fn new(config: &EngineConfig) -> Self {
        let (events, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let mut store = Self {
            state: CompositionState::new(),
            duration_floor: config.duration_floor_seconds,
            tail_pad: config.duration_tail_pad_seconds,
            events,
        };
        store.recompute_duration();
        store
    }

    /// Store seeded with `state`, repaired and with its duration recomputed.
    pub fn with_state(state: CompositionState, config: &EngineConfig) -> (Self, Vec<IntegrityWarning>) {
        let mut store = Self::new(config);
        let warnings = store.replace(state);
        (store, warnings)
    }

    pub fn state(&self) -> &CompositionState {
        &self.state
    }

    /// Deep copy of the state.
    pub fn snapshot(&self) -> CompositionState {
        self.state.clone()
    }

    /// Deep copy of the state with each of `originals` standing in for the
    /// live clip of the same id. The total duration follows the swap.
    pub(crate) fn snapshot_with<'a>(
        &self,
        originals: impl IntoIterator<Item = &'a Clip>,
    ) -> CompositionState {
        let mut snapshot = self.state.clone();
        let mut swapped = false;
        for origin in originals {
            if let Some(slot) = snapshot.clips.iter_mut().find(|clip| clip.id() == origin.id()) {
                *slot = origin.clone();
                swapped = true;
            }
        }
        if swapped {
            snapshot.total_duration =
                compute_total_duration_with(&snapshot.clips, self.duration_floor, self.tail_pad);
        }
        snapshot
    }

    /// Receive a [`ChangeEvent`] after every change.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    /// Tell subscribers something changed. Having no subscribers is fine.
    pub fn notify(&self, label: impl Into<String>, kind: ChangeKind) {
        let event = ChangeEvent {
            label: label.into(),
            kind,
        };
        debug!(label = %event.label, kind = %event.kind, "composition changed");
        let _ = self.events.send(event);
    }

    /// Recompute `total_duration` from the clips.
    pub(crate) fn recompute_duration(&mut self) -> f64 {
        self.state.total_duration =
            compute_total_duration_with(&self.state.clips, self.duration_floor, self.tail_pad);
        self.state.total_duration
    }

    /// Swap in a whole new state (load), repairing it first.
    pub(crate) fn replace(&mut self, mut state: CompositionState) -> Vec<IntegrityWarning> {
        let warnings = repair_integrity(&mut state);
        self.state = state;
        self.recompute_duration();
        warnings
    }

    /// Restore a history snapshot verbatim.
    pub(crate) fn restore(&mut self, snapshot: CompositionState) {
        self.state = snapshot;
        self.recompute_duration();
    }

    pub(crate) fn set_current_time(&mut self, time: f64) {
        self.state.current_time = time;
    }

    pub(crate) fn clip_index(&self, id: Uuid) -> Result<usize> {
        self.state
            .clips
            .iter()
            .position(|clip| clip.id() == id)
            .ok_or(CompositionError::ClipNotFound { id })
    }

    pub(crate) fn clip(&self, id: Uuid) -> Result<&Clip> {
        self.state.clip(id).ok_or(CompositionError::ClipNotFound { id })
    }

    pub(crate) fn clip_mut(&mut self, id: Uuid) -> Result<&mut Clip> {
        self.state
            .clips
            .iter_mut()
            .find(|clip| clip.id() == id)
            .ok_or(CompositionError::ClipNotFound { id })
    }

    /// Replace the clip with the same id, returning the old version.
    pub(crate) fn replace_clip(&mut self, clip: Clip) -> Result<Clip> {
        let slot = self.clip_mut(clip.id())?;
        let old = std::mem::replace(slot, clip);
        self.recompute_duration();
        Ok(old)
    }

    pub(crate) fn insert_clip(&mut self, clip: Clip) {
        self.state.clips.push(clip);
        self.recompute_duration();
    }

    /// Put a removed clip back where it was.
    pub(crate) fn insert_clip_at(&mut self, index: usize, clip: Clip) {
        let index = index.min(self.state.clips.len());
        self.state.clips.insert(index, clip);
        self.recompute_duration();
    }

    /// Remove a clip, returning its index and value.
    pub(crate) fn remove_clip(&mut self, id: Uuid) -> Result<(usize, Clip)> {
        let index = self.clip_index(id)?;
        let clip = self.state.clips.remove(index);
        self.state.selection.remove(&id);
        self.recompute_duration();
        Ok((index, clip))
    }

    pub(crate) fn layer(&self, id: LayerId) -> Result<&Layer> {
        self.state.layer(id).ok_or(CompositionError::LayerNotFound { id })
    }

    pub(crate) fn layer_mut(&mut self, id: LayerId) -> Result<&mut Layer> {
        self.state
            .layers
            .iter_mut()
            .find(|layer| layer.id == id)
            .ok_or(CompositionError::LayerNotFound { id })
    }

    pub(crate) fn layers_mut(&mut self) -> &mut Vec<Layer> {
        &mut self.state.layers
    }

    pub(crate) fn selection_mut(&mut self) -> &mut std::collections::BTreeSet<Uuid> {
        &mut self.state.selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Scene, TimeSpan};
    use pretty_assertions::assert_eq;

    fn store() -> CompositionStore {
        CompositionStore::new(&EngineConfig::default())
    }

    #[test]
    fn test_duration_follows_clips() {
        let mut store = store();
        assert_eq!(store.state().total_duration, 10.0);

        let scene = Scene::new(1, 18.0, 5.0, Some("a.mp4".into()));
        let id = scene.id;
        store.insert_clip(scene.into());
        assert_eq!(store.state().total_duration, 25.0);

        store.remove_clip(id).unwrap();
        assert_eq!(store.state().total_duration, 10.0);
    }

    #[test]
    fn test_snapshot_with_swaps_in_originals() {
        let mut store = store();
        let scene = Scene::new(1, 2.0, 4.0, Some("a.mp4".into()));
        store.insert_clip(scene.clone().into());
        store.clip_mut(scene.id).unwrap().set_start_time(30.0);
        store.recompute_duration();
        assert_eq!(store.state().total_duration, 36.0);

        let origin: Clip = scene.clone().into();
        let snapshot = store.snapshot_with([&origin]);
        assert_eq!(snapshot.clip(scene.id).unwrap().start_time(), 2.0);
        assert_eq!(snapshot.total_duration, 10.0);
        // The live state is untouched
        assert_eq!(store.state().clip(scene.id).unwrap().start_time(), 30.0);
    }

    #[test]
    fn test_remove_and_reinsert_keeps_order() {
        let mut store = store();
        let a = Scene::new(1, 0.0, 1.0, Some("a".into()));
        let b = Scene::new(1, 1.0, 1.0, Some("b".into()));
        let c = Scene::new(1, 2.0, 1.0, Some("c".into()));
        for scene in [a.clone(), b.clone(), c.clone()] {
            store.insert_clip(scene.into());
        }
        let before = store.snapshot();

        let (index, clip) = store.remove_clip(b.id).unwrap();
        assert_eq!(index, 1);
        store.insert_clip_at(index, clip);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_repair_reparents_orphans() {
        let mut state = CompositionState::new();
        let orphan = Scene::new(7, 0.0, 3.0, Some("a".into()));
        let ghost = Uuid::new_v4();
        state.clips.push(orphan.clone().into());
        state.selection.insert(ghost);

        let (store, warnings) = CompositionStore::with_state(state, &EngineConfig::default());
        assert_eq!(
            warnings,
            vec![
                IntegrityWarning::OrphanedClip {
                    clip_id: orphan.id,
                    missing_layer_id: 7
                },
                IntegrityWarning::StaleSelection { clip_id: ghost },
            ]
        );
        assert_eq!(store.state().clip(orphan.id).unwrap().layer_id(), DEFAULT_LAYER_ID);
        assert!(store.state().selection.is_empty());
    }

    #[test]
    fn test_repair_recreates_default_layer() {
        let mut state = CompositionState::new();
        state.layers = vec![Layer::new(2, "B-roll", "#22c55e", 0)];
        let warnings = repair_integrity(&mut state);
        assert_eq!(warnings, vec![IntegrityWarning::MissingDefaultLayer]);
        assert_eq!(state.ordered_layers()[0].id, DEFAULT_LAYER_ID);
        assert_eq!(state.layer(2).unwrap().order_index, 1);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let store = store();
        let mut rx = store.subscribe();
        store.notify("Move clip", ChangeKind::Edit);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.label, "Move clip");
        assert_eq!(event.kind, ChangeKind::Edit);
    }
}
