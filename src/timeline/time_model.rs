//! Time and space conversions.
//!
//! The single place where seconds, percent-of-duration and pixel/zoom
//! space are converted into one another. Every function is pure and
//! total for finite input.

/// Position of `time` as a percentage of `total_duration`.
pub fn time_to_percent(time: f64, total_duration: f64) -> f64 {
    if total_duration > 0.0 {
        (time / total_duration) * 100.0
    } else {
        0.0
    }
}

/// Time in seconds at `percent` of `total_duration`.
pub fn percent_to_time(percent: f64, total_duration: f64) -> f64 {
    (percent / 100.0) * total_duration
}

/// Convert a horizontal pointer delta into a time delta.
///
/// The visible timeline spans `viewport_width_px * zoom_factor` pixels for
/// `total_duration` seconds. A degenerate viewport converts to no movement.
pub fn pixel_delta_to_time_delta(
    delta_px: f64,
    viewport_width_px: f64,
    zoom_factor: f64,
    total_duration: f64,
) -> f64 {
    let span_px = viewport_width_px * zoom_factor;
    if span_px <= 0.0 {
        return 0.0;
    }
    delta_px * (total_duration / span_px)
}

/// Pixel offset of `time` inside a zoomed viewport.
pub fn time_to_pixels(time: f64, viewport_width_px: f64, zoom_factor: f64, total_duration: f64) -> f64 {
    if total_duration <= 0.0 {
        return 0.0;
    }
    time * (viewport_width_px * zoom_factor) / total_duration
}

/// Convert a pixel tolerance (e.g. the 10px snap radius) into seconds.
pub fn pixel_tolerance_to_seconds(
    tolerance_px: f64,
    viewport_width_px: f64,
    zoom_factor: f64,
    total_duration: f64,
) -> f64 {
    pixel_delta_to_time_delta(tolerance_px.abs(), viewport_width_px, zoom_factor, total_duration)
}

/// Format seconds as `m:ss`.
pub fn format_timecode(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{}:{:02}", mins, secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_percent_conversions() {
        assert_relative_eq!(time_to_percent(5.0, 20.0), 25.0);
        assert_relative_eq!(percent_to_time(25.0, 20.0), 5.0);
        assert_eq!(time_to_percent(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_pixel_delta_respects_zoom() {
        // 1000px for 100s at 1x: 10px per second
        assert_relative_eq!(pixel_delta_to_time_delta(50.0, 1000.0, 1.0, 100.0), 5.0);
        // Zoomed 2x: 20px per second
        assert_relative_eq!(pixel_delta_to_time_delta(50.0, 1000.0, 2.0, 100.0), 2.5);
        assert_relative_eq!(pixel_delta_to_time_delta(-50.0, 1000.0, 1.0, 100.0), -5.0);
    }

    #[test]
    fn test_degenerate_viewport_is_zero() {
        assert_eq!(pixel_delta_to_time_delta(50.0, 0.0, 1.0, 100.0), 0.0);
        assert_eq!(pixel_delta_to_time_delta(50.0, 1000.0, 0.0, 100.0), 0.0);
    }

    #[test]
    fn test_time_to_pixels_inverts_delta() {
        let px = time_to_pixels(7.5, 800.0, 1.5, 30.0);
        assert_relative_eq!(pixel_delta_to_time_delta(px, 800.0, 1.5, 30.0), 7.5);
    }

    #[test]
    fn test_pixel_tolerance() {
        assert_relative_eq!(pixel_tolerance_to_seconds(10.0, 1000.0, 1.0, 50.0), 0.5);
        assert_relative_eq!(pixel_tolerance_to_seconds(-10.0, 1000.0, 1.0, 50.0), 0.5);
    }

    #[test]
    fn test_format_timecode() {
        assert_eq!(format_timecode(0.0), "0:00");
        assert_eq!(format_timecode(65.9), "1:05");
        assert_eq!(format_timecode(-3.0), "0:00");
        assert_eq!(format_timecode(f64::NAN), "0:00");
    }
}
