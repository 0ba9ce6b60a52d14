//! Total composition duration.
//!
//! The timeline is always at least `MIN_TOTAL_DURATION` long and always
//! leaves `TAIL_PAD_SECONDS` of empty space after the last clip so a clip
//! dragged "to the end" has somewhere to land.

use crate::model::TimeSpan;

/// Duration of a timeline with no clips.
pub const MIN_TOTAL_DURATION: f64 = 10.0;

/// Empty space kept after the last clip.
pub const TAIL_PAD_SECONDS: f64 = 2.0;

/// `max(10, latest end + 2)` over `clips`.
pub fn compute_total_duration<T: TimeSpan>(clips: &[T]) -> f64 {
    compute_total_duration_with(clips, MIN_TOTAL_DURATION, TAIL_PAD_SECONDS)
}

/// Same as [`compute_total_duration`] with an explicit floor and pad.
pub fn compute_total_duration_with<T: TimeSpan>(clips: &[T], floor: f64, pad: f64) -> f64 {
    clips
        .iter()
        .map(TimeSpan::end_time)
        .filter(|end| end.is_finite())
        .fold(None, |latest: Option<f64>, end| Some(latest.map_or(end, |l| l.max(end))))
        .map_or(floor, |latest| floor.max(latest + pad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_empty_timeline_uses_floor() {
        let clips: Vec<(f64, f64)> = Vec::new();
        assert_eq!(compute_total_duration(&clips), 10.0);
    }

    #[test_case(&[(0.0, 3.0)], 10.0 ; "short clip stays at floor")]
    #[test_case(&[(0.0, 8.0)], 10.0 ; "pad lands exactly on floor")]
    #[test_case(&[(0.0, 10.0), (10.0, 5.0), (15.0, 8.0)], 25.0 ; "sequential scenes")]
    #[test_case(&[(30.0, 1.0), (2.0, 4.0)], 33.0 ; "latest end wins regardless of order")]
    fn test_total_duration(clips: &[(f64, f64)], expected: f64) {
        assert_eq!(compute_total_duration(clips), expected);
    }

    #[test]
    fn test_custom_policy() {
        assert_eq!(compute_total_duration_with(&[(0.0, 4.0)], 3.0, 1.0), 5.0);
        assert_eq!(compute_total_duration_with::<(f64, f64)>(&[], 3.0, 1.0), 3.0);
    }
}
