//! Snapping of dragged times to nearby edges.
//!
//! The threshold is expressed in seconds. Converting a pixel tolerance to
//! seconds is the caller's job (see `time_model::pixel_tolerance_to_seconds`),
//! so nothing here depends on zoom or viewport width.

use uuid::Uuid;

use crate::model::{Clip, CompositionState, TimeSpan};

/// Default snap threshold in seconds.
pub const DEFAULT_SNAP_THRESHOLD: f64 = 0.5;

/// Default snap radius in pixels used by the UI before conversion.
pub const DEFAULT_SNAP_PIXEL_TOLERANCE: f64 = 10.0;

/// A target that attracted the candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapMatch {
    /// Target time in seconds
    pub target: f64,
    /// Absolute distance from the candidate
    pub distance: f64,
}

/// Find the nearest target strictly closer than `threshold`.
///
/// Ties keep the first target in `targets`.
pub fn nearest_target(candidate: f64, targets: &[f64], threshold: f64) -> Option<SnapMatch> {
    let mut best: Option<SnapMatch> = None;
    for &target in targets {
        let distance = (target - candidate).abs();
        if !distance.is_finite() {
            continue;
        }
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(SnapMatch { target, distance });
        }
    }
    best.filter(|b| b.distance < threshold)
}

/// Snap `candidate` to the nearest target within `threshold`, else return it unchanged.
pub fn snap(candidate: f64, targets: &[f64], threshold: f64) -> f64 {
    nearest_target(candidate, targets, threshold).map_or(candidate, |m| m.target)
}

/// Snap targets for dragging `dragged` with the playhead at `playhead`.
///
/// Scene drags snap to other scenes; placement drags snap to scenes and
/// placements. The dragged clip's own edges are never targets. Zero and
/// the playhead always are.
pub fn snap_targets(state: &CompositionState, dragged: &Clip, playhead: f64) -> Vec<f64> {
    let dragged_id: Uuid = dragged.id();
    let scene_drag = dragged.is_scene();

    let mut targets = vec![0.0, playhead];
    for clip in &state.clips {
        if clip.id() == dragged_id {
            continue;
        }
        if scene_drag && !clip.is_scene() {
            continue;
        }
        targets.push(clip.start_time());
        targets.push(clip.end_time());
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttachmentPoint, Placement, PlacementKind, Scene, VisualRole};
    use test_case::test_case;

    #[test_case(12.45, 12.5 ; "pulled to nearby edge")]
    #[test_case(11.0, 11.0 ; "outside threshold is unchanged")]
    #[test_case(12.1, 12.5 ; "just inside threshold")]
    #[test_case(0.2, 0.0 ; "zero is a target")]
    fn test_snap(candidate: f64, expected: f64) {
        let targets = [0.0, 12.5, 20.0];
        assert_eq!(snap(candidate, &targets, 0.5), expected);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert_eq!(snap(12.0, &[12.5], 0.5), 12.0);
        assert_eq!(snap(12.01, &[12.5], 0.5), 12.5);
    }

    #[test]
    fn test_nearest_wins_and_ties_keep_first() {
        assert_eq!(snap(5.0, &[5.3, 4.9], 0.5), 4.9);
        let m = nearest_target(5.0, &[5.5, 4.5], 1.0).unwrap();
        assert_eq!(m.target, 5.5);
        assert_eq!(m.distance, 0.5);
    }

    #[test]
    fn test_non_positive_threshold_never_snaps() {
        assert_eq!(snap(5.0, &[5.0], 0.0), 5.0);
        assert_eq!(snap(5.0, &[5.1], -1.0), 5.0);
    }

    #[test]
    fn test_snap_is_idempotent() {
        let targets = [0.0, 1.0, 1.4, 3.3, 7.25, 7.5, 12.5];
        let mut t = -1.0;
        while t < 14.0 {
            let once = snap(t, &targets, 0.5);
            assert_eq!(snap(once, &targets, 0.5), once, "not idempotent at {}", t);
            t += 0.05;
        }
    }

    #[test]
    fn test_targets_follow_track_type() {
        let mut state = CompositionState::new();
        let scene = Scene::new(1, 0.0, 10.0, Some("a.mp4".into()));
        let other_scene = Scene::new(1, 10.0, 5.0, Some("b.mp4".into()));
        let overlay = Placement {
            id: Uuid::new_v4(),
            layer_id: 1,
            start_time: 3.0,
            duration: 4.0,
            kind: PlacementKind::Asset,
            visual_role: Some(VisualRole::Overlay),
            audio_role: None,
            attachment_point: AttachmentPoint::Custom,
            offset_seconds: 0.0,
            asset_ref: "logo".into(),
            label: None,
        };
        state.clips.push(scene.clone().into());
        state.clips.push(other_scene.into());
        state.clips.push(overlay.clone().into());

        let scene_targets = snap_targets(&state, &Clip::Scene(scene), 6.0);
        assert_eq!(scene_targets, vec![0.0, 6.0, 10.0, 15.0]);

        let placement_targets = snap_targets(&state, &Clip::Placement(overlay), 6.0);
        assert_eq!(placement_targets, vec![0.0, 6.0, 0.0, 10.0, 10.0, 15.0]);
    }
}
