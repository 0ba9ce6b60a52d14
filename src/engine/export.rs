//! Export projection
//!
//! A plain serializable view of a composition for download and
//! interchange. It is not the internal state shape and is never read back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{CompositionState, Layer, Placement, Scene};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionExport {
    pub episode_id: String,
    pub total_duration: f64,
    pub exported_at: DateTime<Utc>,
    pub layers: Vec<Layer>,
    /// Scenes by start time
    pub scenes: Vec<Scene>,
    /// Placements by start time
    pub placements: Vec<Placement>,
}

impl CompositionExport {
    pub fn from_state(state: &CompositionState, episode_id: impl Into<String>) -> Self {
        let mut scenes: Vec<Scene> = state.scenes().cloned().collect();
        scenes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        let mut placements: Vec<Placement> = state.placements().cloned().collect();
        placements.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        Self {
            episode_id: episode_id.into(),
            total_duration: state.total_duration,
            exported_at: Utc::now(),
            layers: state.ordered_layers().into_iter().cloned().collect(),
            scenes,
            placements,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_sorts_and_uses_camel_case() {
        let mut state = CompositionState::new();
        state.clips.push(Scene::new(1, 10.0, 5.0, Some("b".into())).into());
        state.clips.push(Scene::new(1, 0.0, 10.0, Some("a".into())).into());
        state.total_duration = 17.0;

        let export = CompositionExport::from_state(&state, "ep-42");
        assert_eq!(export.scenes[0].media_ref.as_deref(), Some("a"));
        assert_eq!(export.scenes[1].media_ref.as_deref(), Some("b"));
        assert!(export.placements.is_empty());

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["episodeId"], "ep-42");
        assert_eq!(json["totalDuration"], 17.0);
        assert!(json["exportedAt"].is_string());
        assert_eq!(json["scenes"][0]["startTime"], 0.0);
    }
}
