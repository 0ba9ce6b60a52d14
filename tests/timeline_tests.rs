//! Timeline Integration Tests
//!
//! Stacking, duration and file round trips over whole compositions.

use montage::model::{AttachmentPoint, PlacementKind, VisualRole};
use montage::state::{load_state, save_state};
use montage::timeline::{stack_lane, stack_layer};
use montage::{Clip, CompositionState, LaneKind, Placement, Scene};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use uuid::Uuid;

fn overlay(start_time: f64, duration: f64) -> Placement {
    Placement {
        id: Uuid::new_v4(),
        layer_id: 1,
        start_time,
        duration,
        kind: PlacementKind::Asset,
        visual_role: Some(VisualRole::Overlay),
        audio_role: None,
        attachment_point: AttachmentPoint::Custom,
        offset_seconds: start_time,
        asset_ref: "lower-third.png".into(),
        label: Some("Lower third".into()),
    }
}

// === Stacking ===

#[test]
fn test_overlapping_placements_stack() {
    let first = overlay(0.0, 10.0);
    let second = overlay(5.0, 10.0);
    let mut state = CompositionState::new();
    state.clips = vec![first.clone().into(), second.clone().into()];

    let layout = stack_layer(&state, 1);
    assert_eq!(layout.track_count, 2);
    assert_eq!(layout.items[0].item.id(), first.id);
    assert_eq!(layout.items[0].track_index, 0);
    assert_eq!(layout.items[1].item.id(), second.id);
    assert_eq!(layout.items[1].track_index, 1);
}

#[test]
fn test_lanes_stack_independently() {
    let mut state = CompositionState::new();
    state.clips = vec![
        Scene::new(1, 0.0, 10.0, Some("a.mp4".into())).into(),
        overlay(2.0, 4.0).into(),
        overlay(8.0, 4.0).into(),
    ];

    assert_eq!(stack_lane(&state, 1, LaneKind::Video).track_count, 1);
    assert_eq!(stack_lane(&state, 1, LaneKind::Overlays).track_count, 1);
    assert_eq!(stack_lane(&state, 1, LaneKind::Music).track_count, 0);
    // Scene and first overlay share time on the layer as a whole
    assert_eq!(stack_layer(&state, 1).track_count, 2);
}

#[test]
fn test_adjacent_clips_share_a_track() {
    let mut state = CompositionState::new();
    state.clips = vec![overlay(0.0, 5.0).into(), overlay(5.0, 5.0).into()];
    assert_eq!(stack_layer(&state, 1).track_count, 1);
}

// === Files ===

#[test]
fn test_composition_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("comp.json");

    let mut state = CompositionState::new();
    let placement = overlay(1.0, 2.0);
    state.selection.insert(placement.id);
    state.clips = vec![
        Scene::new(1, 0.0, 6.0, Some("a.mp4".into())).into(),
        Clip::Placement(placement),
    ];
    state.total_duration = 10.0;

    save_state(&path, &state).unwrap();
    assert_eq!(load_state(&path).unwrap(), state);
}

#[test]
fn test_loading_missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.json");
    let error = load_state(&path).unwrap_err();
    assert_eq!(error.error_code(), "FILE_READ_ERROR");
    assert!(error.to_string().contains("missing.json"));
}
