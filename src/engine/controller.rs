//! Edit Transaction Controller
//!
//! The single writer of the composition. Every edit follows the same path:
//!
//! 1. validate (no state touched, no persistence call on failure)
//! 2. apply the change to the store optimistically
//! 3. persist through the [`PersistenceService`]
//! 4. on success adopt the stored record and commit history
//! 5. on failure restore the previous value and return a persistence error
//!
//! History is committed strictly after the service accepted the change, so
//! undo never reaches a state the backing store has not seen.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::engine::drop_rules::{is_valid_drop, DragSource, DropTarget};
use crate::engine::export::CompositionExport;
use crate::engine::gesture::{
    moved_start, resized_duration, trimmed_span, GestureKind, GesturePhase, GestureTracker,
};
use crate::engine::playback::{PlaybackState, Transport};
use crate::error::{CompositionError, Result};
use crate::model::{
    AttachmentPoint, Clip, CompositionState, LaneKind, Layer, LayerId, LayerMove, Placement,
    PlacementKind, TimeSpan, DEFAULT_LAYER_ID,
};
use crate::persistence::{
    persist_clip_change, NewPlacement, NewScene, PersistenceError, PersistenceService,
};
use crate::state::history::{HistoryEntry, HistoryManager};
use crate::state::store::{ChangeEvent, ChangeKind, CompositionStore, IntegrityWarning};
use crate::timeline::snapping::{snap, snap_targets};
use crate::timeline::time_model::pixel_delta_to_time_delta;
use tokio::sync::broadcast;

/// Colors handed out to new layers in turn
const LAYER_PALETTE: [&str; 6] = [
    "#6366f1", "#22c55e", "#f59e0b", "#ec4899", "#06b6d4", "#a855f7",
];

/// Visible timeline width and zoom. UI state; never part of history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width_px: f64,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(width_px: f64, zoom: f64) -> Result<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(width_px) || !valid(zoom) {
            return Err(CompositionError::InvalidViewport { width_px, zoom });
        }
        Ok(Self { width_px, zoom })
    }
}

/// How a gesture ended
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// A gesture was already in flight for the clip; nothing happened
    Ignored,
    /// The clip ended where it started; nothing was persisted
    Unchanged,
    /// The change was persisted and committed to history
    Committed(Clip),
}

impl GestureOutcome {
    pub fn committed(&self) -> Option<&Clip> {
        match self {
            GestureOutcome::Committed(clip) => Some(clip),
            _ => None,
        }
    }
}

/// Owns the store, history, transport and persistence service and applies
/// every edit to them.
pub struct EditController<P: PersistenceService> {
    config: EngineConfig,
    store: CompositionStore,
    history: HistoryManager,
    transport: Transport,
    persistence: P,
    gestures: GestureTracker,
    viewport: Viewport,
    clipboard: Vec<Placement>,
    snap_enabled: bool,
}

impl<P: PersistenceService> EditController<P> {
    /// Controller over an empty composition.
    pub fn new(persistence: P, config: EngineConfig) -> Self {
        let (controller, _) = Self::with_state(persistence, config, CompositionState::new());
        controller
    }

    /// Controller over an existing composition, repaired if needed.
    pub fn with_state(
        persistence: P,
        config: EngineConfig,
        state: CompositionState,
    ) -> (Self, Vec<IntegrityWarning>) {
        let current_time = state.current_time;
        let (store, warnings) = CompositionStore::with_state(state, &config);
        let mut transport = Transport::from_config(&config, store.state().total_duration);
        transport.seek(current_time);

        let mut history = HistoryManager::new(config.max_history);
        history.reset("Load composition", store.snapshot());

        let viewport = Viewport {
            width_px: config.default_viewport_width,
            zoom: 1.0,
        };
        let snap_enabled = config.snap_enabled;

        let controller = Self {
            config,
            store,
            history,
            transport,
            persistence,
            gestures: GestureTracker::new(),
            viewport,
            clipboard: Vec::new(),
            snap_enabled,
        };
        (controller, warnings)
    }

    /// Replace the composition with the scenes and placements held by the
    /// persistence service. Layers are kept; history restarts.
    pub async fn load_from_persistence(&mut self) -> Result<Vec<IntegrityWarning>> {
        let scenes = self
            .persistence
            .list_scenes()
            .await
            .map_err(|e| CompositionError::persistence("list scenes", e))?;
        let placements = self
            .persistence
            .list_placements()
            .await
            .map_err(|e| CompositionError::persistence("list placements", e))?;

        let mut state = CompositionState {
            layers: self.store.state().layers.clone(),
            ..CompositionState::new()
        };
        state.clips.extend(scenes.into_iter().map(Clip::Scene));
        state.clips.extend(placements.into_iter().map(Clip::Placement));

        self.gestures.cancel_all();
        let warnings = self.store.replace(state);
        self.sync_transport();
        self.transport.seek(0.0);
        self.store.set_current_time(0.0);
        self.history.reset("Load composition", self.store.snapshot());

        info!(
            clips = self.store.state().clips.len(),
            repaired = warnings.len(),
            "composition loaded"
        );
        self.store.notify("Load composition", ChangeKind::Load);
        Ok(warnings)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The live state. `current_time` is only refreshed on commits; use
    /// [`Self::current_time`] or [`Self::snapshot`] during playback.
    pub fn state(&self) -> &CompositionState {
        self.store.state()
    }

    /// Deep copy of the state with the live playhead.
    pub fn snapshot(&self) -> CompositionState {
        let mut snapshot = self.store.snapshot();
        snapshot.current_time = self.transport.position();
        snapshot
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.store.subscribe()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn history_entries(&self) -> &[HistoryEntry] {
        self.history.entries()
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, width_px: f64, zoom: f64) -> Result<()> {
        self.viewport = Viewport::new(width_px, zoom)?;
        Ok(())
    }

    pub fn snap_enabled(&self) -> bool {
        self.snap_enabled
    }

    pub fn set_snap_enabled(&mut self, enabled: bool) {
        self.snap_enabled = enabled;
    }

    pub fn clipboard(&self) -> &[Placement] {
        &self.clipboard
    }

    pub fn gesture_phase(&self, clip_id: Uuid) -> GesturePhase {
        self.gestures.phase(clip_id)
    }

    pub fn export_composition(&self, episode_id: &str) -> CompositionExport {
        CompositionExport::from_state(&self.snapshot(), episode_id)
    }

    // ========================================================================
    // Playback
    // ========================================================================

    pub fn play(&mut self) {
        self.transport.play();
    }

    pub fn pause(&mut self) {
        self.transport.pause();
        self.store.set_current_time(self.transport.position());
    }

    pub fn toggle_playback(&mut self) {
        self.transport.toggle();
    }

    pub fn seek(&mut self, time: f64) {
        self.transport.seek(time);
        self.store.set_current_time(self.transport.position());
    }

    pub fn step_frame(&mut self, frames: i32) {
        self.transport.step_frame(frames);
        self.store.set_current_time(self.transport.position());
    }

    pub fn current_time(&self) -> f64 {
        self.transport.position()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.transport.state()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    // ========================================================================
    // Gestures
    // ========================================================================

    /// Start dragging or resizing a clip.
    ///
    /// Returns `Ok(false)` if the clip already has a gesture in flight.
    pub fn begin_gesture(&mut self, clip_id: Uuid, kind: GestureKind) -> Result<bool> {
        let clip = self.store.clip(clip_id)?.clone();
        if self.gestures.phase(clip_id) != GesturePhase::Idle {
            warn!(%clip_id, %kind, phase = %self.gestures.phase(clip_id), "gesture ignored, one is in flight");
            return Ok(false);
        }
        self.ensure_editable(&clip)?;
        let total = self.store.state().total_duration;
        self.gestures.begin(kind, clip, total);
        debug!(%clip_id, %kind, "gesture started");
        Ok(true)
    }

    /// Drag the clip `pixel_delta` pixels from where the gesture began.
    /// Returns the new start time.
    pub fn update_move(&mut self, clip_id: Uuid, pixel_delta: f64) -> Result<f64> {
        let (origin, origin_total) = self.dragging(clip_id)?;
        let time_delta = pixel_delta_to_time_delta(
            pixel_delta,
            self.viewport.width_px,
            self.viewport.zoom,
            origin_total,
        );

        let targets = if self.snap_enabled {
            snap_targets(self.store.state(), &origin, self.transport.position())
        } else {
            Vec::new()
        };
        let snap_to = self
            .snap_enabled
            .then_some((targets.as_slice(), self.config.snap_threshold_seconds));
        let start = moved_start(origin.start_time(), time_delta, snap_to);

        self.store.clip_mut(clip_id)?.set_start_time(start);
        self.sync_transport();
        Ok(start)
    }

    /// Resize from the right handle to `width_percent` of the timeline.
    /// Returns the new duration.
    pub fn update_resize_right(&mut self, clip_id: Uuid, width_percent: f64) -> Result<f64> {
        let (_, origin_total) = self.dragging(clip_id)?;
        let duration = resized_duration(width_percent, origin_total, self.config.min_clip_duration);

        self.store.clip_mut(clip_id)?.set_duration(duration);
        self.sync_transport();
        Ok(duration)
    }

    /// Resize from the left handle. Returns the new start and duration.
    pub fn update_resize_left(
        &mut self,
        clip_id: Uuid,
        left_percent: f64,
        width_percent: f64,
    ) -> Result<(f64, f64)> {
        let (_, origin_total) = self.dragging(clip_id)?;
        let (start, duration) = trimmed_span(
            left_percent,
            width_percent,
            origin_total,
            self.config.min_clip_duration,
        );

        let clip = self.store.clip_mut(clip_id)?;
        clip.set_start_time(start);
        clip.set_duration(duration);
        self.sync_transport();
        Ok((start, duration))
    }

    /// Finish a gesture: persist the changed fields and commit history, or
    /// roll back to the pre-gesture clip if the service fails.
    pub async fn end_gesture(&mut self, clip_id: Uuid) -> Result<GestureOutcome> {
        let gesture = self
            .gestures
            .advance(clip_id, GesturePhase::Committing)
            .ok_or(CompositionError::NoGestureInProgress { id: clip_id })?;
        let label = gesture.kind.history_label();
        let current = match self.store.clip(clip_id) {
            Ok(clip) => clip.clone(),
            Err(e) => {
                self.gestures.cancel(clip_id);
                return Err(e);
            }
        };

        match persist_clip_change(&self.persistence, &gesture.origin, &current).await {
            Ok(None) => {
                self.gestures.advance(clip_id, GesturePhase::Idle);
                debug!(%clip_id, "gesture ended without changes");
                Ok(GestureOutcome::Unchanged)
            }
            Ok(Some(stored)) => {
                self.store.replace_clip(stored.clone())?;
                self.gestures.advance(clip_id, GesturePhase::Idle);
                self.sync_transport();
                self.commit(label);
                Ok(GestureOutcome::Committed(stored))
            }
            Err(source) => {
                self.gestures.advance(clip_id, GesturePhase::RollingBack);
                self.store.replace_clip(gesture.origin)?;
                self.gestures.advance(clip_id, GesturePhase::Idle);
                self.sync_transport();
                warn!(%clip_id, error = %source, "gesture rolled back");
                self.store.notify(label, ChangeKind::Rollback);
                Err(CompositionError::persistence(label.to_lowercase(), source))
            }
        }
    }

    /// Abandon a gesture and put the clip back where it started.
    pub fn cancel_gesture(&mut self, clip_id: Uuid) -> Result<()> {
        let gesture = self
            .gestures
            .cancel(clip_id)
            .ok_or(CompositionError::NoGestureInProgress { id: clip_id })?;
        self.store.replace_clip(gesture.origin)?;
        self.sync_transport();
        debug!(%clip_id, "gesture cancelled");
        Ok(())
    }

    /// Drag a clip by `pixel_delta` in one step.
    pub async fn move_clip(&mut self, clip_id: Uuid, pixel_delta: f64) -> Result<GestureOutcome> {
        if !self.begin_gesture(clip_id, GestureKind::Move)? {
            return Ok(GestureOutcome::Ignored);
        }
        if let Err(e) = self.update_move(clip_id, pixel_delta) {
            self.cancel_gesture(clip_id)?;
            return Err(e);
        }
        self.end_gesture(clip_id).await
    }

    /// Resize a clip from the right handle in one step.
    pub async fn resize_right(&mut self, clip_id: Uuid, width_percent: f64) -> Result<GestureOutcome> {
        if !self.begin_gesture(clip_id, GestureKind::ResizeRight)? {
            return Ok(GestureOutcome::Ignored);
        }
        if let Err(e) = self.update_resize_right(clip_id, width_percent) {
            self.cancel_gesture(clip_id)?;
            return Err(e);
        }
        self.end_gesture(clip_id).await
    }

    /// Resize a clip from the left handle in one step.
    pub async fn resize_left(
        &mut self,
        clip_id: Uuid,
        left_percent: f64,
        width_percent: f64,
    ) -> Result<GestureOutcome> {
        if !self.begin_gesture(clip_id, GestureKind::ResizeLeft)? {
            return Ok(GestureOutcome::Ignored);
        }
        if let Err(e) = self.update_resize_left(clip_id, left_percent, width_percent) {
            self.cancel_gesture(clip_id)?;
            return Err(e);
        }
        self.end_gesture(clip_id).await
    }

    // ========================================================================
    // Clip edits
    // ========================================================================

    /// Move an existing clip onto another lane and/or layer.
    pub async fn drop_clip(&mut self, clip_id: Uuid, target: DropTarget) -> Result<Clip> {
        let clip = self.store.clip(clip_id)?.clone();
        let source = DragSource::from_clip(&clip);
        let lane = match target {
            DropTarget::Lane { lane, .. } if is_valid_drop(&source, &target) => lane,
            _ => {
                return Err(CompositionError::InvalidDrop {
                    source_kind: source.to_string(),
                    target: target.to_string(),
                })
            }
        };
        self.ensure_editable(&clip)?;

        let target_layer = match target {
            DropTarget::Lane {
                layer_id: Some(layer_id),
                ..
            } => layer_id,
            _ => clip.layer_id(),
        };
        self.ensure_layer_writable(target_layer)?;

        let mut updated = clip.clone();
        updated.set_layer_id(target_layer);
        if let Clip::Placement(placement) = &mut updated {
            if let Some(role) = lane.visual_role() {
                placement.visual_role = Some(role);
            }
            if let Some(role) = lane.audio_role() {
                placement.audio_role = Some(role);
            }
        }
        if updated == clip {
            return Ok(clip);
        }

        self.apply_clip_update(clip, updated, "Move to layer").await
    }

    /// Move a clip to another layer, keeping its lane.
    pub async fn reassign_layer(&mut self, clip_id: Uuid, layer_id: LayerId) -> Result<Clip> {
        let clip = self.store.clip(clip_id)?;
        let lane = clip.lane().ok_or_else(|| CompositionError::InvalidDrop {
            source_kind: DragSource::from_clip(clip).to_string(),
            target: format!("layer {}", layer_id),
        })?;
        self.drop_clip(
            clip_id,
            DropTarget::Lane {
                lane,
                layer_id: Some(layer_id),
            },
        )
        .await
    }

    /// Create a placement from a library item dropped at `drop_time`.
    ///
    /// Compatibility is checked before anything else; an invalid drop never
    /// reaches the persistence service.
    pub async fn drop_from_library(
        &mut self,
        source: DragSource,
        target: DropTarget,
        drop_time: f64,
    ) -> Result<Placement> {
        let (kind, asset_ref) = match &source {
            DragSource::LibraryAsset { asset_ref, .. } if is_valid_drop(&source, &target) => {
                (PlacementKind::Asset, asset_ref.clone())
            }
            DragSource::WardrobeItem { item_ref } if is_valid_drop(&source, &target) => {
                (PlacementKind::Wardrobe, item_ref.clone())
            }
            _ => {
                return Err(CompositionError::InvalidDrop {
                    source_kind: source.to_string(),
                    target: target.to_string(),
                })
            }
        };
        if drop_time.is_nan() {
            return Err(CompositionError::NegativeTime { time: drop_time });
        }

        let (lane, layer_id, start_time, attachment_point, offset_seconds) = match target {
            DropTarget::Lane { lane, layer_id } => {
                let layer_id = layer_id.unwrap_or(DEFAULT_LAYER_ID);
                let start = self.snap_drop_time(drop_time);
                (lane, layer_id, start, AttachmentPoint::Custom, start)
            }
            DropTarget::Scene { scene_id } => {
                let scene = match self.store.clip(scene_id)? {
                    Clip::Scene(scene) => scene,
                    Clip::Placement(_) => {
                        return Err(CompositionError::InvalidDrop {
                            source_kind: source.to_string(),
                            target: format!("placement {}", scene_id),
                        })
                    }
                };
                let lane = source
                    .scene_attachment_lane()
                    .unwrap_or(LaneKind::Overlays);
                (lane, scene.layer_id, scene.start_time, AttachmentPoint::SceneStart, 0.0)
            }
        };
        self.ensure_layer_writable(layer_id)?;

        let data = NewPlacement {
            layer_id,
            start_time,
            duration: self.config.default_placement_duration,
            kind,
            visual_role: lane.visual_role(),
            audio_role: lane.audio_role(),
            attachment_point,
            offset_seconds,
            asset_ref,
            label: None,
        };

        let placement = self
            .persistence
            .create_placement(data)
            .await
            .map_err(|e| CompositionError::persistence("add placement", e))?;

        self.store.insert_clip(Clip::Placement(placement.clone()));
        self.sync_transport();
        self.commit("Add placement");
        Ok(placement)
    }

    /// Set exact start and duration, e.g. from an inspector.
    ///
    /// Unlike gestures, out-of-range values are rejected, not clamped.
    pub async fn set_clip_timing(&mut self, clip_id: Uuid, start_time: f64, duration: f64) -> Result<Clip> {
        if !start_time.is_finite() || start_time < 0.0 {
            return Err(CompositionError::NegativeTime { time: start_time });
        }
        let minimum = self.config.min_clip_duration;
        if !duration.is_finite() || duration < minimum {
            return Err(CompositionError::DurationTooShort { duration, minimum });
        }

        let clip = self.store.clip(clip_id)?.clone();
        self.ensure_editable(&clip)?;

        let mut updated = clip.clone();
        updated.set_start_time(start_time);
        updated.set_duration(duration);
        if updated == clip {
            return Ok(clip);
        }
        self.apply_clip_update(clip, updated, "Edit timing").await
    }

    /// Split a clip at `at`, returning the left and right halves.
    ///
    /// The left half keeps the clip's id; the right half is a new record.
    pub async fn split_clip(&mut self, clip_id: Uuid, at: f64) -> Result<(Clip, Clip)> {
        let clip = self.store.clip(clip_id)?.clone();
        self.ensure_editable(&clip)?;

        let (start, end) = (clip.start_time(), clip.end_time());
        let minimum = self.config.min_clip_duration;
        if !at.is_finite() || at - start < minimum || end - at < minimum {
            return Err(CompositionError::SplitOutOfRange {
                at,
                start,
                end,
                minimum,
            });
        }
        let offset = at - start;
        let right_duration = end - at;

        let mut left = clip.clone();
        left.set_duration(offset);
        if let Clip::Scene(scene) = &mut left {
            scene.trim_end += right_duration;
        }

        let left = self.persist_optimistic(&clip, left, "split clip").await?;

        let created = match &clip {
            Clip::Scene(scene) => self
                .persistence
                .create_scene(NewScene {
                    layer_id: scene.layer_id,
                    start_time: at,
                    duration: right_duration,
                    media_ref: scene.media_ref.clone(),
                    trim_start: scene.trim_start + offset,
                    trim_end: scene.trim_end,
                    order: scene.order,
                })
                .await
                .map(Clip::Scene),
            Clip::Placement(placement) => {
                let mut data = NewPlacement::from(placement);
                data.start_time = at;
                data.duration = right_duration;
                data.offset_seconds += offset;
                self.persistence
                    .create_placement(data)
                    .await
                    .map(Clip::Placement)
            }
        };

        let right = match created {
            Ok(right) => right,
            Err(source) => {
                warn!(%clip_id, error = %source, "split failed, restoring left half");
                if let Err(e) = persist_clip_change(&self.persistence, &left, &clip).await {
                    warn!(%clip_id, error = %e, "could not restore split clip on the service");
                }
                self.store.replace_clip(clip)?;
                self.sync_transport();
                self.store.notify("Split clip", ChangeKind::Rollback);
                return Err(CompositionError::persistence("split clip", source));
            }
        };

        self.store.insert_clip(right.clone());
        self.sync_transport();
        self.commit("Split clip");
        Ok((left, right))
    }

    /// Delete one placement. Scenes cannot be deleted here.
    pub async fn delete_placement(&mut self, placement_id: Uuid) -> Result<Placement> {
        let clip = self.store.clip(placement_id)?;
        if clip.is_scene() {
            return Err(CompositionError::NotAPlacement { id: placement_id });
        }
        let clip = clip.clone();
        self.ensure_editable(&clip)?;

        let placement = self
            .delete_one(placement_id)
            .await?
            .map_err(|source| CompositionError::persistence("delete placement", source))?;
        self.commit("Delete placement");
        Ok(placement)
    }

    // ========================================================================
    // Clipboard and bulk edits
    // ========================================================================

    /// Copy the selected placements. Returns how many were copied.
    pub fn copy_selection(&mut self) -> Result<usize> {
        let copied: Vec<Placement> = self
            .store
            .state()
            .selected_placements()
            .into_iter()
            .cloned()
            .collect();
        if copied.is_empty() {
            return Err(CompositionError::EmptySelection);
        }
        debug!(count = copied.len(), "copied placements");
        self.clipboard = copied;
        Ok(self.clipboard.len())
    }

    /// Paste the clipboard with its earliest placement at `at_time`.
    ///
    /// Placements are created one by one. If one fails, those already
    /// created stay and are committed as a single entry.
    pub async fn paste_clipboard(&mut self, at_time: f64) -> Result<Vec<Placement>> {
        if self.clipboard.is_empty() {
            return Err(CompositionError::EmptyClipboard);
        }
        if !at_time.is_finite() || at_time < 0.0 {
            return Err(CompositionError::NegativeTime { time: at_time });
        }

        let earliest = self
            .clipboard
            .iter()
            .map(|p| p.start_time)
            .fold(f64::INFINITY, f64::min);
        let mut batch = Vec::with_capacity(self.clipboard.len());
        for placement in &self.clipboard {
            let layer_id = if self.store.state().has_layer(placement.layer_id) {
                placement.layer_id
            } else {
                DEFAULT_LAYER_ID
            };
            self.ensure_layer_writable(layer_id)?;
            let mut data = NewPlacement::from(placement);
            data.layer_id = layer_id;
            data.start_time = at_time + (placement.start_time - earliest);
            batch.push(data);
        }

        let total = batch.len();
        let mut pasted = Vec::with_capacity(total);
        let mut failure = None;
        for data in batch {
            match self.persistence.create_placement(data).await {
                Ok(placement) => {
                    self.store.insert_clip(Clip::Placement(placement.clone()));
                    pasted.push(placement);
                }
                Err(source) => {
                    failure = Some(source);
                    break;
                }
            }
        }

        if !pasted.is_empty() {
            let selection = self.store.selection_mut();
            selection.clear();
            selection.extend(pasted.iter().map(|p| p.id));
            self.sync_transport();
            self.commit("Paste placements");
        }
        match failure {
            Some(source) => {
                warn!(completed = pasted.len(), total, error = %source, "paste interrupted");
                Err(CompositionError::BatchInterrupted {
                    completed: pasted.len(),
                    total,
                    source,
                })
            }
            None => Ok(pasted),
        }
    }

    /// Delete every selected placement. Returns how many were deleted.
    pub async fn delete_selected(&mut self) -> Result<usize> {
        let targets: Vec<Clip> = self
            .store
            .state()
            .selected_placements()
            .into_iter()
            .map(|p| Clip::Placement(p.clone()))
            .collect();
        if targets.is_empty() {
            return Err(CompositionError::EmptySelection);
        }
        for clip in &targets {
            self.ensure_editable(clip)?;
        }

        let total = targets.len();
        let mut completed = 0;
        let mut failure = None;
        for clip in targets {
            match self.delete_one(clip.id()).await? {
                Ok(_) => completed += 1,
                Err(source) => {
                    failure = Some(source);
                    break;
                }
            }
        }

        if completed > 0 {
            self.commit("Delete placements");
        }
        match failure {
            Some(source) => {
                warn!(completed, total, error = %source, "bulk delete interrupted");
                Err(CompositionError::BatchInterrupted {
                    completed,
                    total,
                    source,
                })
            }
            None => Ok(completed),
        }
    }

    // ========================================================================
    // Layers
    // ========================================================================

    /// Append a new layer. Returns its id.
    pub fn add_layer(&mut self, name: Option<&str>) -> LayerId {
        let state = self.store.state();
        let id = state.next_layer_id();
        let order_index = state.next_order_index();
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("Layer {}", id));
        let color = LAYER_PALETTE[(id as usize).saturating_sub(1) % LAYER_PALETTE.len()];

        self.store
            .layers_mut()
            .push(Layer::new(id, name, color, order_index));
        self.commit("Add layer");
        id
    }

    pub fn rename_layer(&mut self, layer_id: LayerId, name: &str) -> Result<()> {
        let layer = self.store.layer_mut(layer_id)?;
        if layer.name == name {
            return Ok(());
        }
        layer.name = name.to_string();
        self.commit("Rename layer");
        Ok(())
    }

    pub fn set_layer_color(&mut self, layer_id: LayerId, color: &str) -> Result<()> {
        let layer = self.store.layer_mut(layer_id)?;
        if layer.color == color {
            return Ok(());
        }
        layer.color = color.to_string();
        self.commit("Change layer color");
        Ok(())
    }

    pub fn set_layer_muted(&mut self, layer_id: LayerId, muted: bool) -> Result<()> {
        let layer = self.store.layer_mut(layer_id)?;
        if layer.muted == muted {
            return Ok(());
        }
        layer.muted = muted;
        self.commit(if muted { "Mute layer" } else { "Unmute layer" });
        Ok(())
    }

    pub fn set_layer_locked(&mut self, layer_id: LayerId, locked: bool) -> Result<()> {
        let layer = self.store.layer_mut(layer_id)?;
        if layer.locked == locked {
            return Ok(());
        }
        layer.locked = locked;
        self.commit(if locked { "Lock layer" } else { "Unlock layer" });
        Ok(())
    }

    /// Swap a layer with its neighbour. Returns `false` at either end.
    pub fn move_layer(&mut self, layer_id: LayerId, direction: LayerMove) -> Result<bool> {
        self.store.layer(layer_id)?;
        let ordered: Vec<(LayerId, u32)> = self
            .store
            .state()
            .ordered_layers()
            .iter()
            .map(|layer| (layer.id, layer.order_index))
            .collect();
        let Some(position) = ordered.iter().position(|(id, _)| *id == layer_id) else {
            return Ok(false);
        };
        let neighbour = match direction {
            LayerMove::Up if position > 0 => ordered[position - 1],
            LayerMove::Down if position + 1 < ordered.len() => ordered[position + 1],
            _ => return Ok(false),
        };
        let own_index = ordered[position].1;

        self.store.layer_mut(layer_id)?.order_index = neighbour.1;
        self.store.layer_mut(neighbour.0)?.order_index = own_index;
        self.commit("Reorder layers");
        Ok(true)
    }

    /// Delete a layer, moving its clips to the default layer.
    ///
    /// Every clip move is persisted. If any fails, the whole deletion is
    /// undone locally and on the service. Returns how many clips moved.
    pub async fn delete_layer(&mut self, layer_id: LayerId) -> Result<usize> {
        if layer_id == DEFAULT_LAYER_ID {
            return Err(CompositionError::DefaultLayerProtected);
        }
        if self.store.layer(layer_id)?.locked {
            return Err(CompositionError::LayerLocked { id: layer_id });
        }

        let before = self.store.snapshot();
        let originals: Vec<Clip> = before.clips_on_layer(layer_id).cloned().collect();
        for clip in &originals {
            self.ensure_no_gesture(clip.id())?;
        }

        for clip in &originals {
            self.store.clip_mut(clip.id())?.set_layer_id(DEFAULT_LAYER_ID);
        }
        self.store.layers_mut().retain(|layer| layer.id != layer_id);

        let mut moved: Vec<(Clip, Clip)> = Vec::with_capacity(originals.len());
        for original in &originals {
            let mut reparented = original.clone();
            reparented.set_layer_id(DEFAULT_LAYER_ID);
            match persist_clip_change(&self.persistence, original, &reparented).await {
                Ok(stored) => {
                    let stored = stored.unwrap_or(reparented);
                    self.store.replace_clip(stored.clone())?;
                    moved.push((original.clone(), stored));
                }
                Err(source) => {
                    warn!(layer_id, moved = moved.len(), error = %source, "layer delete failed, reverting");
                    for (original, stored) in moved.iter().rev() {
                        if let Err(e) = persist_clip_change(&self.persistence, stored, original).await {
                            warn!(clip_id = %original.id(), error = %e, "could not revert clip layer on the service");
                        }
                    }
                    self.store.restore(before);
                    self.sync_transport();
                    self.store.notify("Delete layer", ChangeKind::Rollback);
                    return Err(CompositionError::persistence("delete layer", source));
                }
            }
        }

        info!(layer_id, clips = moved.len(), "layer deleted");
        self.commit("Delete layer");
        Ok(moved.len())
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Select only `clip_id`.
    pub fn select(&mut self, clip_id: Uuid) -> Result<()> {
        self.store.clip(clip_id)?;
        let selection = self.store.selection_mut();
        selection.clear();
        selection.insert(clip_id);
        self.store.notify("Select", ChangeKind::Selection);
        Ok(())
    }

    pub fn add_to_selection(&mut self, clip_id: Uuid) -> Result<()> {
        self.store.clip(clip_id)?;
        if self.store.selection_mut().insert(clip_id) {
            self.store.notify("Select", ChangeKind::Selection);
        }
        Ok(())
    }

    /// Flip one clip's selection. Returns whether it is now selected.
    pub fn toggle_selection(&mut self, clip_id: Uuid) -> Result<bool> {
        self.store.clip(clip_id)?;
        let selection = self.store.selection_mut();
        let selected = if selection.remove(&clip_id) {
            false
        } else {
            selection.insert(clip_id);
            true
        };
        self.store.notify("Select", ChangeKind::Selection);
        Ok(selected)
    }

    pub fn deselect(&mut self, clip_id: Uuid) {
        if self.store.selection_mut().remove(&clip_id) {
            self.store.notify("Deselect", ChangeKind::Selection);
        }
    }

    pub fn clear_selection(&mut self) {
        let selection = self.store.selection_mut();
        if selection.is_empty() {
            return;
        }
        selection.clear();
        self.store.notify("Clear selection", ChangeKind::Selection);
    }

    /// Select every clip on a layer. Returns how many are selected.
    pub fn select_layer(&mut self, layer_id: LayerId) -> Result<usize> {
        self.store.layer(layer_id)?;
        let ids: Vec<Uuid> = self
            .store
            .state()
            .clips_on_layer(layer_id)
            .map(Clip::id)
            .collect();
        let selection = self.store.selection_mut();
        selection.clear();
        selection.extend(ids.iter().copied());
        self.store.notify("Select layer", ChangeKind::Selection);
        Ok(ids.len())
    }

    // ========================================================================
    // Undo / redo
    // ========================================================================

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Restore the state before the last committed edit. Returns its label.
    pub fn undo(&mut self) -> Result<String> {
        let label = self.history.undo_label().unwrap_or_default().to_string();
        let snapshot = self.history.undo()?.snapshot.clone();
        self.restore_snapshot(snapshot);
        info!(label = %label, "undo");
        self.store.notify(format!("Undo {}", label), ChangeKind::Undo);
        Ok(label)
    }

    /// Re-apply the last undone edit. Returns its label.
    pub fn redo(&mut self) -> Result<String> {
        let label = self.history.redo_label().unwrap_or_default().to_string();
        let snapshot = self.history.redo()?.snapshot.clone();
        self.restore_snapshot(snapshot);
        info!(label = %label, "redo");
        self.store.notify(format!("Redo {}", label), ChangeKind::Redo);
        Ok(label)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn restore_snapshot(&mut self, snapshot: CompositionState) {
        for gesture in self.gestures.cancel_all() {
            debug!(clip_id = %gesture.origin.id(), "gesture dropped by history restore");
        }
        let current_time = snapshot.current_time;
        self.store.restore(snapshot);
        self.sync_transport();
        self.transport.seek(current_time);
    }

    /// Record the current state in history and tell subscribers.
    fn commit(&mut self, label: &str) {
        self.store.set_current_time(self.transport.position());
        // Clips mid-gesture are recorded where the service last saw them
        let snapshot = self.store.snapshot_with(self.gestures.origins());
        self.history.commit(label, snapshot);
        info!(
            label,
            total_duration = self.store.state().total_duration,
            "edit committed"
        );
        self.store.notify(label, ChangeKind::Edit);
    }

    /// Keep the transport's length in step with the composition.
    fn sync_transport(&mut self) {
        let total = self.store.recompute_duration();
        self.transport.set_total_duration(total);
    }

    /// The gesture's origin clip and origin total duration, if dragging.
    fn dragging(&self, clip_id: Uuid) -> Result<(Clip, f64)> {
        self.gestures
            .get(clip_id)
            .filter(|g| g.phase == GesturePhase::Dragging)
            .map(|g| (g.origin.clone(), g.origin_total_duration))
            .ok_or(CompositionError::NoGestureInProgress { id: clip_id })
    }

    fn ensure_layer_writable(&self, layer_id: LayerId) -> Result<()> {
        if self.store.layer(layer_id)?.locked {
            return Err(CompositionError::LayerLocked { id: layer_id });
        }
        Ok(())
    }

    /// The clip can be dragged, has no gesture in flight and its layer is
    /// unlocked.
    fn ensure_editable(&self, clip: &Clip) -> Result<()> {
        if !clip.is_draggable() {
            return Err(CompositionError::NotDraggable { id: clip.id() });
        }
        self.ensure_no_gesture(clip.id())?;
        self.ensure_layer_writable(clip.layer_id())
    }

    fn ensure_no_gesture(&self, clip_id: Uuid) -> Result<()> {
        if self.gestures.phase(clip_id) != GesturePhase::Idle {
            return Err(CompositionError::GestureInProgress { id: clip_id });
        }
        Ok(())
    }

    fn snap_drop_time(&self, drop_time: f64) -> f64 {
        let candidate = drop_time.max(0.0);
        if !self.snap_enabled {
            return candidate;
        }
        let state = self.store.state();
        let mut targets = vec![0.0, self.transport.position()];
        for clip in &state.clips {
            targets.push(clip.start_time());
            targets.push(clip.end_time());
        }
        snap(candidate, &targets, self.config.snap_threshold_seconds).max(0.0)
    }

    /// Apply `after` locally, persist it and commit `label`; roll back on failure.
    async fn apply_clip_update(&mut self, before: Clip, after: Clip, label: &str) -> Result<Clip> {
        let stored = self
            .persist_optimistic(&before, after, &label.to_lowercase())
            .await?;
        self.commit(label);
        Ok(stored)
    }

    /// Apply `after` locally and persist it. On failure the store is put
    /// back to `before`. Does not touch history.
    async fn persist_optimistic(&mut self, before: &Clip, after: Clip, operation: &str) -> Result<Clip> {
        let clip_id = before.id();
        self.store.replace_clip(after.clone())?;
        self.sync_transport();

        match persist_clip_change(&self.persistence, before, &after).await {
            Ok(stored) => {
                let stored = stored.unwrap_or(after);
                self.store.replace_clip(stored.clone())?;
                self.sync_transport();
                Ok(stored)
            }
            Err(source) => {
                self.store.replace_clip(before.clone())?;
                self.sync_transport();
                warn!(%clip_id, operation, error = %source, "edit rolled back");
                self.store.notify(operation, ChangeKind::Rollback);
                Err(CompositionError::persistence(operation, source))
            }
        }
    }

    /// Optimistically remove one placement and delete it on the service.
    ///
    /// The outer result is a local failure, the inner one the service's.
    /// On a service failure the placement is put back where it was,
    /// selection included.
    async fn delete_one(
        &mut self,
        placement_id: Uuid,
    ) -> Result<std::result::Result<Placement, PersistenceError>> {
        if self.store.clip(placement_id)?.is_scene() {
            return Err(CompositionError::NotAPlacement { id: placement_id });
        }
        let was_selected = self.store.state().selection.contains(&placement_id);
        let (index, clip) = self.store.remove_clip(placement_id)?;
        self.sync_transport();

        match self.persistence.delete_placement(placement_id).await {
            Ok(()) => match clip {
                Clip::Placement(placement) => Ok(Ok(placement)),
                Clip::Scene(_) => Err(CompositionError::NotAPlacement { id: placement_id }),
            },
            Err(source) => {
                self.store.insert_clip_at(index, clip);
                if was_selected {
                    self.store.selection_mut().insert(placement_id);
                }
                self.sync_transport();
                warn!(%placement_id, error = %source, "delete rolled back");
                Ok(Err(source))
            }
        }
    }
}
