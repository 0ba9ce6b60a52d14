//! Vertical stacking of overlapping clips.
//!
//! Items are sorted by start time and greedily placed in the first track
//! whose last item has ended by the time the new one starts. This is the
//! activity-selection colouring of an interval graph: O(n·k) for n items
//! and k tracks.
//!
//! Spans are half-open. A zero-length item at `t` conflicts with any span
//! containing `t`, whichever of the two comes first in the input.

use serde::Serialize;

use crate::model::{Clip, CompositionState, LaneKind, LayerId, TimeSpan};

/// An item with the track it was assigned to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stacked<T> {
    pub track_index: usize,
    #[serde(flatten)]
    pub item: T,
}

/// Result of stacking one set of items.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackLayout<T> {
    /// Items in start-time order (ties in input order)
    pub items: Vec<Stacked<T>>,
    /// Number of tracks needed
    pub track_count: usize,
}

impl<T> StackLayout<T> {
    /// Items placed on one track, in time order
    pub fn track(&self, track_index: usize) -> impl Iterator<Item = &T> {
        self.items
            .iter()
            .filter(move |stacked| stacked.track_index == track_index)
            .map(|stacked| &stacked.item)
    }
}

/// Assign each item the first track it fits on.
pub fn assign_tracks<T: TimeSpan + Clone>(items: &[T]) -> StackLayout<T> {
    // Stable sort keeps insertion order for equal starts.
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by(|a, b| a.start_time().total_cmp(&b.start_time()));

    // (start, end) of the last item on each track.
    let mut track_tails: Vec<(f64, f64)> = Vec::new();
    let mut stacked = Vec::with_capacity(sorted.len());

    for item in sorted {
        let start = item.start_time();
        let has_length = item.duration() > 0.0;
        let fits = |&(last_start, last_end): &(f64, f64)| {
            let instant_at_start = last_start == start && last_end == start;
            last_end <= start && !(has_length && instant_at_start)
        };
        let tail = (start, item.end_time());
        let track_index = match track_tails.iter().position(fits) {
            Some(index) => {
                track_tails[index] = tail;
                index
            }
            None => {
                track_tails.push(tail);
                track_tails.len() - 1
            }
        };
        stacked.push(Stacked {
            track_index,
            item: item.clone(),
        });
    }

    StackLayout {
        items: stacked,
        track_count: track_tails.len(),
    }
}

/// Stack every clip of a layer.
pub fn stack_layer<'a>(state: &'a CompositionState, layer_id: LayerId) -> StackLayout<&'a Clip> {
    let clips: Vec<&Clip> = state.clips_on_layer(layer_id).collect();
    assign_tracks(&clips)
}

/// Stack the clips of a single lane of a layer.
pub fn stack_lane<'a>(
    state: &'a CompositionState,
    layer_id: LayerId,
    lane: LaneKind,
) -> StackLayout<&'a Clip> {
    let clips: Vec<&Clip> = state.clips_on_lane(layer_id, lane).collect();
    assign_tracks(&clips)
}
