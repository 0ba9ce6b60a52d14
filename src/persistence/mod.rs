//! Persistence boundary
//!
//! The engine never talks to a backing store directly. Every accepted
//! edit goes through a [`PersistenceService`]; the controller applies the
//! change locally first and rolls it back if the service fails.

pub mod memory;
#[cfg(feature = "remote")]
pub mod http;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{
    AttachmentPoint, AudioRole, Clip, LayerId, Placement, PlacementKind, Scene, VisualRole,
};

pub use memory::{InMemoryPersistence, PersistenceCall};
#[cfg(feature = "remote")]
pub use http::HttpPersistence;

/// Result type for service calls.
pub type PersistenceResult<T> = std::result::Result<T, PersistenceError>;

/// Failures reported by a persistence service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    #[error("service unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("record not found: {id}")]
    NotFound { id: Uuid },

    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },
}

impl PersistenceError {
    /// Transient failures worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            PersistenceError::Unavailable { .. } => true,
            PersistenceError::Rejected { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            _ => false,
        }
    }
}

/// Placement fields sent when creating a placement; the service assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlacement {
    pub layer_id: LayerId,
    pub start_time: f64,
    pub duration: f64,
    pub kind: PlacementKind,
    pub visual_role: Option<VisualRole>,
    pub audio_role: Option<AudioRole>,
    pub attachment_point: AttachmentPoint,
    pub offset_seconds: f64,
    pub asset_ref: String,
    pub label: Option<String>,
}

impl NewPlacement {
    /// Give the new placement its service-assigned id.
    pub fn into_placement(self, id: Uuid) -> Placement {
        Placement {
            id,
            layer_id: self.layer_id,
            start_time: self.start_time,
            duration: self.duration,
            kind: self.kind,
            visual_role: self.visual_role,
            audio_role: self.audio_role,
            attachment_point: self.attachment_point,
            offset_seconds: self.offset_seconds,
            asset_ref: self.asset_ref,
            label: self.label,
        }
    }
}

impl From<&Placement> for NewPlacement {
    fn from(placement: &Placement) -> Self {
        Self {
            layer_id: placement.layer_id,
            start_time: placement.start_time,
            duration: placement.duration,
            kind: placement.kind,
            visual_role: placement.visual_role,
            audio_role: placement.audio_role,
            attachment_point: placement.attachment_point,
            offset_seconds: placement.offset_seconds,
            asset_ref: placement.asset_ref.clone(),
            label: placement.label.clone(),
        }
    }
}

/// Scene fields sent when creating a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScene {
    pub layer_id: LayerId,
    pub start_time: f64,
    pub duration: f64,
    pub media_ref: Option<String>,
    pub trim_start: f64,
    pub trim_end: f64,
    pub order: u32,
}

impl NewScene {
    pub fn into_scene(self, id: Uuid) -> Scene {
        Scene {
            id,
            layer_id: self.layer_id,
            start_time: self.start_time,
            duration: self.duration,
            media_ref: self.media_ref,
            trim_start: self.trim_start,
            trim_end: self.trim_end,
            order: self.order,
        }
    }
}

/// Partial placement update. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<LayerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_role: Option<VisualRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_role: Option<AudioRole>,
}

impl PlacementPatch {
    /// Fields that differ between two versions of a placement.
    pub fn between(before: &Placement, after: &Placement) -> Self {
        Self {
            start_time: changed(before.start_time, after.start_time),
            duration: changed(before.duration, after.duration),
            layer_id: (before.layer_id != after.layer_id).then_some(after.layer_id),
            visual_role: (before.visual_role != after.visual_role)
                .then_some(after.visual_role)
                .flatten(),
            audio_role: (before.audio_role != after.audio_role)
                .then_some(after.audio_role)
                .flatten(),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, placement: &mut Placement) {
        if let Some(start_time) = self.start_time {
            placement.start_time = start_time;
        }
        if let Some(duration) = self.duration {
            placement.duration = duration;
        }
        if let Some(layer_id) = self.layer_id {
            placement.layer_id = layer_id;
        }
        if let Some(role) = self.visual_role {
            placement.visual_role = Some(role);
        }
        if let Some(role) = self.audio_role {
            placement.audio_role = Some(role);
        }
    }
}

/// Partial scene update. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<LayerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim_start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim_end: Option<f64>,
}

impl ScenePatch {
    /// Fields that differ between two versions of a scene.
    pub fn between(before: &Scene, after: &Scene) -> Self {
        Self {
            start_time: changed(before.start_time, after.start_time),
            duration: changed(before.duration, after.duration),
            layer_id: (before.layer_id != after.layer_id).then_some(after.layer_id),
            trim_start: changed(before.trim_start, after.trim_start),
            trim_end: changed(before.trim_end, after.trim_end),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, scene: &mut Scene) {
        if let Some(start_time) = self.start_time {
            scene.start_time = start_time;
        }
        if let Some(duration) = self.duration {
            scene.duration = duration;
        }
        if let Some(layer_id) = self.layer_id {
            scene.layer_id = layer_id;
        }
        if let Some(trim_start) = self.trim_start {
            scene.trim_start = trim_start;
        }
        if let Some(trim_end) = self.trim_end {
            scene.trim_end = trim_end;
        }
    }
}

fn changed(before: f64, after: f64) -> Option<f64> {
    (before != after).then_some(after)
}

/// Backing store for scenes and placements.
///
/// All calls may fail. Implementations return the record as stored so the
/// engine can adopt server-side normalisation.
#[allow(async_fn_in_trait)]
pub trait PersistenceService {
    async fn create_placement(&self, data: NewPlacement) -> PersistenceResult<Placement>;

    async fn update_placement(&self, id: Uuid, patch: PlacementPatch) -> PersistenceResult<Placement>;

    async fn delete_placement(&self, id: Uuid) -> PersistenceResult<()>;

    async fn create_scene(&self, data: NewScene) -> PersistenceResult<Scene>;

    async fn update_scene(&self, id: Uuid, patch: ScenePatch) -> PersistenceResult<Scene>;

    async fn list_placements(&self) -> PersistenceResult<Vec<Placement>>;

    async fn list_scenes(&self) -> PersistenceResult<Vec<Scene>>;
}

/// Persist the difference between two versions of the same clip.
///
/// Returns `Ok(None)` when nothing changed and no call was made.
pub async fn persist_clip_change<P: PersistenceService>(
    service: &P,
    before: &Clip,
    after: &Clip,
) -> PersistenceResult<Option<Clip>> {
    match (before, after) {
        (Clip::Scene(old), Clip::Scene(new)) => {
            let patch = ScenePatch::between(old, new);
            if patch.is_empty() {
                return Ok(None);
            }
            service.update_scene(new.id, patch).await.map(|s| Some(Clip::Scene(s)))
        }
        (Clip::Placement(old), Clip::Placement(new)) => {
            let patch = PlacementPatch::between(old, new);
            if patch.is_empty() {
                return Ok(None);
            }
            service
                .update_placement(new.id, patch)
                .await
                .map(|p| Some(Clip::Placement(p)))
        }
        _ => Err(PersistenceError::InvalidResponse {
            reason: format!("clip {} changed variant", after.id()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_patch_only_carries_changes() {
        let before = Scene::new(1, 2.0, 4.0, Some("a.mp4".into()));
        let mut after = before.clone();
        after.start_time = 3.0;

        let patch = ScenePatch::between(&before, &after);
        assert_eq!(patch.start_time, Some(3.0));
        assert_eq!(patch.duration, None);
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "startTime": 3.0 }));

        assert!(ScenePatch::between(&before, &before).is_empty());
    }

    #[test]
    fn test_placement_patch_apply() {
        let placement = NewPlacement {
            layer_id: 2,
            start_time: 0.0,
            duration: 5.0,
            kind: PlacementKind::Asset,
            visual_role: None,
            audio_role: Some(AudioRole::Voice),
            attachment_point: AttachmentPoint::Custom,
            offset_seconds: 0.0,
            asset_ref: "vo-1".into(),
            label: None,
        }
        .into_placement(Uuid::new_v4());

        let mut moved = placement.clone();
        moved.audio_role = Some(AudioRole::Music);
        moved.layer_id = 3;
        let patch = PlacementPatch::between(&placement, &moved);

        let mut applied = placement.clone();
        patch.apply(&mut applied);
        assert_eq!(applied, moved);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(PersistenceError::Unavailable { reason: "timeout".into() }.is_retryable());
        assert!(PersistenceError::Rejected { status: 503, message: String::new() }.is_retryable());
        assert!(!PersistenceError::Rejected { status: 422, message: String::new() }.is_retryable());
        assert!(!PersistenceError::NotFound { id: Uuid::nil() }.is_retryable());
    }
}
