//! Timeline Algorithms
//!
//! Pure functions over time spans:
//! - Time/percent/pixel conversions
//! - Total duration
//! - Vertical stacking of overlapping clips
//! - Snapping

pub mod duration;
pub mod snapping;
pub mod stacking;
pub mod time_model;

pub use duration::{compute_total_duration, compute_total_duration_with};
pub use snapping::{nearest_target, snap, snap_targets, SnapMatch};
pub use stacking::{assign_tracks, stack_lane, stack_layer, StackLayout, Stacked};
pub use time_model::{
    format_timecode, percent_to_time, pixel_delta_to_time_delta, pixel_tolerance_to_seconds,
    time_to_percent, time_to_pixels,
};
