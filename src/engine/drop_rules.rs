//! Drag and drop compatibility
//!
//! The UI asks [`is_valid_drop`] while hovering; the controller asks again
//! before touching any state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AudioRole, Clip, LaneKind, LayerId, VisualRole};

const VISUAL_LANES: &[LaneKind] = &[LaneKind::Video, LaneKind::Overlays];
const OVERLAY_LANES: &[LaneKind] = &[LaneKind::Overlays];
const VIDEO_LANES: &[LaneKind] = &[LaneKind::Video];
const AUDIO_LANES: &[LaneKind] = &[LaneKind::Voice, LaneKind::Music, LaneKind::Sfx];

/// Media type of a library asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Video,
    Image,
    Audio,
}

impl AssetType {
    pub fn is_visual(&self) -> bool {
        matches!(self, AssetType::Video | AssetType::Image)
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetType::Video => write!(f, "video"),
            AssetType::Image => write!(f, "image"),
            AssetType::Audio => write!(f, "audio"),
        }
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "video" => Ok(AssetType::Video),
            "image" => Ok(AssetType::Image),
            "audio" => Ok(AssetType::Audio),
            other => Err(format!("unknown asset type '{}'", other)),
        }
    }
}

/// What is being dragged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DragSource {
    /// A library asset dropped for the first time
    LibraryAsset { asset_type: AssetType, asset_ref: String },
    /// A wardrobe item dropped for the first time
    WardrobeItem { item_ref: String },
    /// An existing scene on the timeline
    SceneClip { clip_id: Uuid },
    /// An existing placement on the timeline
    PlacementClip {
        clip_id: Uuid,
        visual_role: Option<VisualRole>,
        audio_role: Option<AudioRole>,
    },
}

impl DragSource {
    /// Describe an existing clip as a drag source.
    pub fn from_clip(clip: &Clip) -> Self {
        match clip {
            Clip::Scene(scene) => DragSource::SceneClip { clip_id: scene.id },
            Clip::Placement(placement) => DragSource::PlacementClip {
                clip_id: placement.id,
                visual_role: placement.visual_role,
                audio_role: placement.audio_role,
            },
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            DragSource::LibraryAsset { .. } => "library-asset",
            DragSource::WardrobeItem { .. } => "wardrobe-item",
            DragSource::SceneClip { .. } => "scene-clip",
            DragSource::PlacementClip { .. } => "placement-clip",
        }
    }

    /// Whether this source creates a new placement rather than moving a clip
    pub fn is_from_library(&self) -> bool {
        matches!(self, DragSource::LibraryAsset { .. } | DragSource::WardrobeItem { .. })
    }

    /// Lanes this source may land on
    pub fn accepted_lanes(&self) -> &'static [LaneKind] {
        match self {
            DragSource::SceneClip { .. } => VIDEO_LANES,
            DragSource::PlacementClip {
                visual_role: Some(VisualRole::Overlay),
                ..
            } => OVERLAY_LANES,
            DragSource::PlacementClip {
                visual_role: Some(VisualRole::PrimaryVisual),
                ..
            } => VISUAL_LANES,
            DragSource::PlacementClip {
                audio_role: Some(_),
                ..
            } => AUDIO_LANES,
            DragSource::PlacementClip { .. } => &[],
            DragSource::LibraryAsset { asset_type, .. } if asset_type.is_visual() => VISUAL_LANES,
            DragSource::LibraryAsset { .. } => AUDIO_LANES,
            DragSource::WardrobeItem { .. } => OVERLAY_LANES,
        }
    }

    /// Lane a library item takes when dropped directly on a scene
    pub fn scene_attachment_lane(&self) -> Option<LaneKind> {
        match self {
            DragSource::LibraryAsset { asset_type, .. } if asset_type.is_visual() => {
                Some(LaneKind::Overlays)
            }
            DragSource::LibraryAsset { .. } => Some(LaneKind::Music),
            DragSource::WardrobeItem { .. } => Some(LaneKind::Overlays),
            _ => None,
        }
    }
}

impl fmt::Display for DragSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DragSource::LibraryAsset { asset_type, .. } => write!(f, "{} asset", asset_type),
            DragSource::WardrobeItem { .. } => write!(f, "wardrobe item"),
            DragSource::SceneClip { .. } => write!(f, "scene"),
            DragSource::PlacementClip { .. } => write!(f, "placement"),
        }
    }
}

/// Where it is being dropped
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DropTarget {
    /// A lane, optionally on a specific layer
    Lane { lane: LaneKind, layer_id: Option<LayerId> },
    /// Directly onto a scene clip
    Scene { scene_id: Uuid },
}

impl fmt::Display for DropTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropTarget::Lane {
                lane,
                layer_id: Some(layer_id),
            } => write!(f, "{} lane of layer {}", lane, layer_id),
            DropTarget::Lane { lane, layer_id: None } => write!(f, "{} lane", lane),
            DropTarget::Scene { scene_id } => write!(f, "scene {}", scene_id),
        }
    }
}

/// Whether `source` may be dropped on `target`.
///
/// Scene targets only take new items from the library; existing clips move
/// between lanes, never onto scenes.
pub fn is_valid_drop(source: &DragSource, target: &DropTarget) -> bool {
    match target {
        DropTarget::Lane { lane, .. } => source.accepted_lanes().contains(lane),
        DropTarget::Scene { .. } => source.is_from_library(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn lane(lane: LaneKind) -> DropTarget {
        DropTarget::Lane { lane, layer_id: None }
    }

    fn asset(asset_type: AssetType) -> DragSource {
        DragSource::LibraryAsset {
            asset_type,
            asset_ref: "asset-1".into(),
        }
    }

    fn placement(visual_role: Option<VisualRole>, audio_role: Option<AudioRole>) -> DragSource {
        DragSource::PlacementClip {
            clip_id: Uuid::new_v4(),
            visual_role,
            audio_role,
        }
    }

    #[test_case(LaneKind::Video, false ; "audio asset on video lane")]
    #[test_case(LaneKind::Overlays, false ; "audio asset on overlays")]
    #[test_case(LaneKind::Voice, true ; "audio asset on voice")]
    #[test_case(LaneKind::Music, true ; "audio asset on music")]
    #[test_case(LaneKind::Sfx, true ; "audio asset on sfx")]
    fn test_audio_asset(target: LaneKind, expected: bool) {
        assert_eq!(is_valid_drop(&asset(AssetType::Audio), &lane(target)), expected);
    }

    #[test_case(AssetType::Video, LaneKind::Video, true)]
    #[test_case(AssetType::Image, LaneKind::Overlays, true)]
    #[test_case(AssetType::Image, LaneKind::Sfx, false)]
    #[test_case(AssetType::Video, LaneKind::Voice, false)]
    fn test_visual_asset(asset_type: AssetType, target: LaneKind, expected: bool) {
        assert_eq!(is_valid_drop(&asset(asset_type), &lane(target)), expected);
    }

    #[test]
    fn test_wardrobe_only_on_overlays() {
        let item = DragSource::WardrobeItem {
            item_ref: "jacket".into(),
        };
        for target in LaneKind::ALL {
            assert_eq!(is_valid_drop(&item, &lane(target)), target == LaneKind::Overlays);
        }
    }

    #[test]
    fn test_existing_clips_keep_their_track_type() {
        let scene = DragSource::SceneClip {
            clip_id: Uuid::new_v4(),
        };
        assert!(is_valid_drop(&scene, &lane(LaneKind::Video)));
        assert!(!is_valid_drop(&scene, &lane(LaneKind::Overlays)));

        let overlay = placement(Some(VisualRole::Overlay), None);
        assert!(is_valid_drop(&overlay, &lane(LaneKind::Overlays)));
        assert!(!is_valid_drop(&overlay, &lane(LaneKind::Video)));

        let primary = placement(Some(VisualRole::PrimaryVisual), None);
        assert!(is_valid_drop(&primary, &lane(LaneKind::Video)));
        assert!(is_valid_drop(&primary, &lane(LaneKind::Overlays)));

        let voice = placement(None, Some(AudioRole::Voice));
        assert!(is_valid_drop(&voice, &lane(LaneKind::Sfx)));
        assert!(!is_valid_drop(&voice, &lane(LaneKind::Video)));

        let roleless = placement(None, None);
        assert!(LaneKind::ALL
            .iter()
            .all(|target| !is_valid_drop(&roleless, &lane(*target))));
    }

    #[test]
    fn test_scene_targets_accept_library_items_only() {
        let target = DropTarget::Scene {
            scene_id: Uuid::new_v4(),
        };
        assert!(is_valid_drop(&asset(AssetType::Audio), &target));
        assert!(is_valid_drop(
            &DragSource::WardrobeItem {
                item_ref: "hat".into()
            },
            &target
        ));
        assert!(!is_valid_drop(&placement(Some(VisualRole::Overlay), None), &target));
        assert!(!is_valid_drop(
            &DragSource::SceneClip {
                clip_id: Uuid::new_v4()
            },
            &target
        ));
    }

    #[test]
    fn test_asset_type_parsing() {
        assert_eq!("Video".parse::<AssetType>(), Ok(AssetType::Video));
        assert!("pdf".parse::<AssetType>().is_err());
    }
}
