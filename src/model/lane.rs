//! Lanes: the typed sub-tracks of a layer.
//!
//! A lane decides which kinds of media a clip may carry. Scenes always
//! live on the video lane; placements live on the lane matching their
//! visual or audio role.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Typed lane within a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneKind {
    /// Primary visual content (scenes and primary-visual placements)
    Video,
    /// Visual overlays and wardrobe items
    Overlays,
    Voice,
    Music,
    Sfx,
}

impl LaneKind {
    /// All lanes in display order
    pub const ALL: [LaneKind; 5] = [
        LaneKind::Video,
        LaneKind::Overlays,
        LaneKind::Voice,
        LaneKind::Music,
        LaneKind::Sfx,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LaneKind::Video => "video",
            LaneKind::Overlays => "overlays",
            LaneKind::Voice => "voice",
            LaneKind::Music => "music",
            LaneKind::Sfx => "sfx",
        }
    }

    /// True for lanes that carry visual media
    pub fn is_visual(&self) -> bool {
        matches!(self, LaneKind::Video | LaneKind::Overlays)
    }

    /// True for lanes that carry audio cues
    pub fn is_audio(&self) -> bool {
        !self.is_visual()
    }

    /// The placement visual role a clip takes on this lane
    pub fn visual_role(&self) -> Option<VisualRole> {
        match self {
            LaneKind::Video => Some(VisualRole::PrimaryVisual),
            LaneKind::Overlays => Some(VisualRole::Overlay),
            _ => None,
        }
    }

    /// The placement audio role a clip takes on this lane
    pub fn audio_role(&self) -> Option<AudioRole> {
        match self {
            LaneKind::Voice => Some(AudioRole::Voice),
            LaneKind::Music => Some(AudioRole::Music),
            LaneKind::Sfx => Some(AudioRole::Sfx),
            _ => None,
        }
    }
}

impl fmt::Display for LaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LaneKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "video" | "primary-visual" | "primary_visual" => Ok(LaneKind::Video),
            "overlays" | "overlay" => Ok(LaneKind::Overlays),
            "voice" => Ok(LaneKind::Voice),
            "music" => Ok(LaneKind::Music),
            "sfx" => Ok(LaneKind::Sfx),
            other => Err(format!("unknown lane '{}'", other)),
        }
    }
}

/// How a visual placement is composited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisualRole {
    PrimaryVisual,
    Overlay,
}

impl VisualRole {
    pub fn lane(&self) -> LaneKind {
        match self {
            VisualRole::PrimaryVisual => LaneKind::Video,
            VisualRole::Overlay => LaneKind::Overlays,
        }
    }
}

/// Which audio bus an audio placement plays on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioRole {
    Voice,
    Music,
    Sfx,
}

impl AudioRole {
    pub fn lane(&self) -> LaneKind {
        match self {
            AudioRole::Voice => LaneKind::Voice,
            AudioRole::Music => LaneKind::Music,
            AudioRole::Sfx => LaneKind::Sfx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_parse_accepts_aliases() {
        assert_eq!("video".parse::<LaneKind>(), Ok(LaneKind::Video));
        assert_eq!("primary-visual".parse::<LaneKind>(), Ok(LaneKind::Video));
        assert_eq!("Overlay".parse::<LaneKind>(), Ok(LaneKind::Overlays));
        assert!("timeline".parse::<LaneKind>().is_err());
    }

    #[test]
    fn test_roles_round_trip_through_lanes() {
        for lane in LaneKind::ALL {
            if let Some(role) = lane.visual_role() {
                assert_eq!(role.lane(), lane);
            }
            if let Some(role) = lane.audio_role() {
                assert_eq!(role.lane(), lane);
            }
        }
    }
}
