//! The composition aggregate.
//!
//! `CompositionState` is the single owned value holding every layer and
//! clip of a project. Cloning it is the deep copy used for history
//! snapshots and for read-only views handed to renderers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::clip::{Clip, Placement, Scene};
use super::lane::LaneKind;
use super::layer::{Layer, LayerId};
use crate::timeline::duration::MIN_TOTAL_DURATION;

/// Layers, clips, playhead, derived duration and selection of one composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionState {
    /// Layers in insertion order; `order_index` decides display order
    pub layers: Vec<Layer>,
    /// Every scene and placement, in insertion order
    pub clips: Vec<Clip>,
    /// Playhead position in seconds
    #[serde(default)]
    pub current_time: f64,
    /// Derived from the clips, see `timeline::duration`
    pub total_duration: f64,
    /// Selected clip ids
    #[serde(default)]
    pub selection: BTreeSet<Uuid>,
}

impl Default for CompositionState {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositionState {
    /// An empty composition holding only the default layer
    pub fn new() -> Self {
        Self {
            layers: vec![Layer::default_layer()],
            clips: Vec::new(),
            current_time: 0.0,
            total_duration: MIN_TOTAL_DURATION,
            selection: BTreeSet::new(),
        }
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub fn has_layer(&self, id: LayerId) -> bool {
        self.layer(id).is_some()
    }

    /// Layers sorted by `order_index`
    pub fn ordered_layers(&self) -> Vec<&Layer> {
        let mut layers: Vec<&Layer> = self.layers.iter().collect();
        layers.sort_by_key(|layer| layer.order_index);
        layers
    }

    pub fn clip(&self, id: Uuid) -> Option<&Clip> {
        self.clips.iter().find(|clip| clip.id() == id)
    }

    pub fn clips_on_layer(&self, layer_id: LayerId) -> impl Iterator<Item = &Clip> {
        self.clips.iter().filter(move |clip| clip.layer_id() == layer_id)
    }

    pub fn clips_on_lane(&self, layer_id: LayerId, lane: LaneKind) -> impl Iterator<Item = &Clip> {
        self.clips_on_layer(layer_id)
            .filter(move |clip| clip.lane() == Some(lane))
    }

    pub fn scenes(&self) -> impl Iterator<Item = &Scene> {
        self.clips.iter().filter_map(|clip| match clip {
            Clip::Scene(scene) => Some(scene),
            Clip::Placement(_) => None,
        })
    }

    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.clips.iter().filter_map(Clip::as_placement)
    }

    /// Selected clips that are placements, in timeline order
    pub fn selected_placements(&self) -> Vec<&Placement> {
        let mut selected: Vec<&Placement> = self
            .placements()
            .filter(|placement| self.selection.contains(&placement.id))
            .collect();
        selected.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        selected
    }

    /// Next free layer id
    pub fn next_layer_id(&self) -> LayerId {
        self.layers.iter().map(|layer| layer.id).max().unwrap_or(0) + 1
    }

    /// Next free display slot
    pub fn next_order_index(&self) -> u32 {
        self.layers
            .iter()
            .map(|layer| layer.order_index + 1)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_has_default_layer() {
        let state = CompositionState::new();
        assert_eq!(state.layers.len(), 1);
        assert!(state.layers[0].is_default());
        assert_eq!(state.total_duration, 10.0);
        assert_eq!(state.next_layer_id(), 2);
        assert_eq!(state.next_order_index(), 1);
    }

    #[test]
    fn test_ordered_layers_follow_order_index() {
        let mut state = CompositionState::new();
        state.layers.push(Layer::new(2, "Top", "#fff", 5));
        state.layers.push(Layer::new(3, "Middle", "#000", 2));
        let names: Vec<&str> = state.ordered_layers().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Main", "Middle", "Top"]);
    }
}
