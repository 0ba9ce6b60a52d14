//! Gesture tracking
//!
//! Every clip has an implicit state machine:
//!
//! ```text
//! Idle -> Dragging -> Committing -> Idle
//!                              \-> RollingBack -> Idle
//! ```
//!
//! A clip without an entry in the [`GestureTracker`] is Idle. The tracker
//! also remembers the clip as it was when the gesture began, which is what
//! updates are computed from and what a rollback restores.

use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

use crate::model::Clip;
use crate::timeline::snapping::snap;
use crate::timeline::time_model::percent_to_time;

/// Phase of a clip's gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GesturePhase {
    #[default]
    Idle,
    Dragging,
    Committing,
    RollingBack,
}

impl GesturePhase {
    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(self, next: GesturePhase) -> bool {
        use GesturePhase::*;
        matches!(
            (self, next),
            (Idle, Dragging)
                | (Dragging, Committing)
                | (Dragging, Idle)
                | (Committing, Idle)
                | (Committing, RollingBack)
                | (RollingBack, Idle)
        )
    }
}

impl fmt::Display for GesturePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GesturePhase::Idle => write!(f, "Idle"),
            GesturePhase::Dragging => write!(f, "Dragging"),
            GesturePhase::Committing => write!(f, "Committing"),
            GesturePhase::RollingBack => write!(f, "RollingBack"),
        }
    }
}

/// What the pointer is doing to the clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    /// Body drag, changes start time
    Move,
    /// Right handle, changes duration
    ResizeRight,
    /// Left handle, changes start time and duration
    ResizeLeft,
}

impl GestureKind {
    /// History label committed when the gesture lands
    pub fn history_label(&self) -> &'static str {
        match self {
            GestureKind::Move => "Move clip",
            GestureKind::ResizeRight => "Resize clip",
            GestureKind::ResizeLeft => "Trim clip",
        }
    }
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GestureKind::Move => write!(f, "move"),
            GestureKind::ResizeRight => write!(f, "resize-right"),
            GestureKind::ResizeLeft => write!(f, "resize-left"),
        }
    }
}

/// A gesture in flight
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    pub kind: GestureKind,
    pub phase: GesturePhase,
    /// The clip before the gesture began
    pub origin: Clip,
    /// Total duration when the gesture began; all pixel and percent
    /// conversions for this gesture use it
    pub origin_total_duration: f64,
}

/// Gestures in flight, keyed by clip id
#[derive(Debug, Default)]
pub struct GestureTracker {
    gestures: HashMap<Uuid, Gesture>,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a gesture. Returns `false` and changes nothing if the clip
    /// already has one in flight.
    pub fn begin(&mut self, kind: GestureKind, origin: Clip, origin_total_duration: f64) -> bool {
        let clip_id = origin.id();
        if self.gestures.contains_key(&clip_id) {
            return false;
        }
        self.gestures.insert(
            clip_id,
            Gesture {
                kind,
                phase: GesturePhase::Dragging,
                origin,
                origin_total_duration,
            },
        );
        true
    }

    pub fn get(&self, clip_id: Uuid) -> Option<&Gesture> {
        self.gestures.get(&clip_id)
    }

    pub fn phase(&self, clip_id: Uuid) -> GesturePhase {
        self.gestures
            .get(&clip_id)
            .map_or(GesturePhase::Idle, |gesture| gesture.phase)
    }

    /// Move a gesture to `next`. Reaching Idle removes it and returns it.
    ///
    /// Illegal transitions are refused and leave the gesture untouched.
    pub fn advance(&mut self, clip_id: Uuid, next: GesturePhase) -> Option<Gesture> {
        let current = self.phase(clip_id);
        if !current.can_transition_to(next) {
            return None;
        }
        if next == GesturePhase::Idle {
            return self.gestures.remove(&clip_id);
        }
        let gesture = self.gestures.get_mut(&clip_id)?;
        gesture.phase = next;
        Some(gesture.clone())
    }

    /// Drop a gesture regardless of phase.
    pub fn cancel(&mut self, clip_id: Uuid) -> Option<Gesture> {
        self.gestures.remove(&clip_id)
    }

    /// Drop every gesture, returning them.
    pub fn cancel_all(&mut self) -> Vec<Gesture> {
        self.gestures.drain().map(|(_, gesture)| gesture).collect()
    }

    /// The pre-gesture clip of every gesture in flight
    pub fn origins(&self) -> impl Iterator<Item = &Clip> {
        self.gestures.values().map(|gesture| &gesture.origin)
    }

    /// Number of gestures in flight
    pub fn in_flight(&self) -> usize {
        self.gestures.len()
    }
}

// ============================================================================
// Gesture math
// ============================================================================

/// Start time for a move: origin plus delta, snapped, then clamped to 0.
pub fn moved_start(origin_start: f64, time_delta: f64, snap_to: Option<(&[f64], f64)>) -> f64 {
    let proposed = origin_start + time_delta;
    let snapped = match snap_to {
        Some((targets, threshold)) => snap(proposed, targets, threshold),
        None => proposed,
    };
    snapped.max(0.0)
}

/// Duration for a right-handle resize, floored at `min_duration`.
pub fn resized_duration(width_percent: f64, total_duration: f64, min_duration: f64) -> f64 {
    percent_to_time(width_percent, total_duration).max(min_duration)
}

/// Start and duration for a left-handle trim.
pub fn trimmed_span(
    left_percent: f64,
    width_percent: f64,
    total_duration: f64,
    min_duration: f64,
) -> (f64, f64) {
    let start = percent_to_time(left_percent, total_duration).max(0.0);
    let duration = percent_to_time(width_percent, total_duration).max(min_duration);
    (start, duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Scene;
    use approx::assert_relative_eq;
    use test_case::test_case;

    fn clip() -> Clip {
        Scene::new(1, 4.0, 6.0, Some("a.mp4".into())).into()
    }

    #[test]
    fn test_second_begin_is_ignored() {
        let mut tracker = GestureTracker::new();
        let clip = clip();
        let id = clip.id();

        assert!(tracker.begin(GestureKind::Move, clip.clone(), 20.0));
        assert!(!tracker.begin(GestureKind::ResizeRight, clip, 40.0));
        let gesture = tracker.get(id).unwrap();
        assert_eq!(gesture.kind, GestureKind::Move);
        assert_eq!(gesture.origin_total_duration, 20.0);
    }

    #[test]
    fn test_commit_path() {
        let mut tracker = GestureTracker::new();
        let clip = clip();
        let id = clip.id();
        tracker.begin(GestureKind::Move, clip, 20.0);

        assert!(tracker.advance(id, GesturePhase::Committing).is_some());
        assert_eq!(tracker.phase(id), GesturePhase::Committing);
        assert!(tracker.advance(id, GesturePhase::Idle).is_some());
        assert_eq!(tracker.phase(id), GesturePhase::Idle);
        assert_eq!(tracker.in_flight(), 0);
    }

    #[test]
    fn test_rollback_path_and_illegal_transitions() {
        let mut tracker = GestureTracker::new();
        let clip = clip();
        let id = clip.id();
        tracker.begin(GestureKind::ResizeLeft, clip.clone(), 20.0);

        assert!(tracker.advance(id, GesturePhase::RollingBack).is_none());
        tracker.advance(id, GesturePhase::Committing);
        let gesture = tracker.advance(id, GesturePhase::RollingBack).unwrap();
        assert_eq!(gesture.origin, clip);
        assert!(tracker.advance(id, GesturePhase::Dragging).is_none());
        tracker.advance(id, GesturePhase::Idle);
        assert_eq!(tracker.phase(id), GesturePhase::Idle);
    }

    #[test]
    fn test_history_labels() {
        assert_eq!(GestureKind::Move.history_label(), "Move clip");
        assert_eq!(GestureKind::ResizeRight.history_label(), "Resize clip");
        assert_eq!(GestureKind::ResizeLeft.history_label(), "Trim clip");
    }

    #[test_case(5.0, 2.0, 7.0 ; "plain move")]
    #[test_case(1.0, -3.0, 0.0 ; "clamped at zero")]
    #[test_case(10.0, 2.3, 12.3 ; "no snap without targets")]
    fn test_moved_start_without_snap(origin: f64, delta: f64, expected: f64) {
        assert_relative_eq!(moved_start(origin, delta, None), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_moved_start_snaps_before_clamping() {
        let targets = [0.0, 12.5];
        assert_eq!(moved_start(10.0, 2.3, Some((&targets, 0.5))), 12.5);
        assert_eq!(moved_start(1.0, -1.2, Some((&targets, 0.5))), 0.0);
    }

    #[test]
    fn test_resize_floors_at_minimum() {
        assert_relative_eq!(resized_duration(25.0, 20.0, 0.5), 5.0);
        assert_relative_eq!(resized_duration(1.0, 20.0, 0.5), 0.5);
        assert_relative_eq!(resized_duration(-10.0, 20.0, 0.5), 0.5);
    }

    #[test]
    fn test_trim_clamps_both_edges() {
        let (start, duration) = trimmed_span(10.0, 40.0, 20.0, 0.5);
        assert_relative_eq!(start, 2.0);
        assert_relative_eq!(duration, 8.0);

        let (start, duration) = trimmed_span(-5.0, 0.5, 20.0, 0.5);
        assert_eq!(start, 0.0);
        assert_eq!(duration, 0.5);
    }
}
