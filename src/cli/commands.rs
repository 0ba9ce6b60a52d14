//! CLI Command Implementations
//!
//! File-based commands. Edits run through an [`EditController`] backed by
//! an in-memory service seeded from the file, then the result is saved.

use std::fs;
use std::path::Path;

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::engine::{CompositionExport, EditController};
use crate::error::{CompositionError, Result};
use crate::model::{Clip, CompositionState, LaneKind, LayerId, TimeSpan};
use crate::persistence::InMemoryPersistence;
use crate::state::{load_state, repair_integrity, save_state};
use crate::timeline::snapping::nearest_target;
use crate::timeline::stacking::{stack_lane, stack_layer};
use crate::timeline::time_model::format_timecode;

/// Create an empty composition file.
pub fn init(path: &Path, force: bool) -> Result<()> {
    info!("Creating composition at: {}", path.display());

    if path.exists() && !force {
        return Err(CompositionError::InvalidConfig {
            reason: format!("{} already exists; use --force to overwrite", path.display()),
        });
    }
    save_state(path, &CompositionState::new())?;

    println!("Composition created: {}", path.display());
    Ok(())
}

/// Print layers and clips.
pub fn print_state(path: &Path) -> Result<()> {
    let state = load_state(path)?;

    println!("Composition: {}", path.display());
    println!("{:-<60}", "");
    println!(
        "Duration: {} ({:.2}s) | Playhead: {}",
        format_timecode(state.total_duration),
        state.total_duration,
        format_timecode(state.current_time)
    );

    for layer in state.ordered_layers() {
        let mut flags = Vec::new();
        if layer.muted {
            flags.push("muted");
        }
        if layer.locked {
            flags.push("locked");
        }
        println!(
            "\nLayer {} \"{}\" {} {}",
            layer.id,
            layer.name,
            layer.color,
            flags.join(",")
        );
        for clip in state.clips_on_layer(layer.id) {
            println!("  {}", describe_clip(clip, &state));
        }
    }

    println!("{:-<60}", "");
    println!(
        "{} scenes | {} placements | {} selected",
        state.scenes().count(),
        state.placements().count(),
        state.selection.len()
    );
    Ok(())
}

fn describe_clip(clip: &Clip, state: &CompositionState) -> String {
    let lane = clip.lane().map_or("none", |lane| lane.as_str());
    let marker = if state.selection.contains(&clip.id()) { "*" } else { " " };
    let what = match clip {
        Clip::Scene(scene) => scene.media_ref.as_deref().unwrap_or("(empty slot)").to_string(),
        Clip::Placement(placement) => placement
            .label
            .clone()
            .unwrap_or_else(|| placement.asset_ref.clone()),
    };
    format!(
        "{}{} [{:>8}] {:>7.2}s +{:>6.2}s  {} {}",
        marker,
        clip.kind_name(),
        lane,
        clip.start_time(),
        clip.duration(),
        what,
        clip.id()
    )
}

/// Print the track assignment of a layer or lane.
pub fn stack(path: &Path, layer_id: LayerId, lane: Option<LaneKind>) -> Result<()> {
    let state = load_state(path)?;
    if !state.has_layer(layer_id) {
        return Err(CompositionError::LayerNotFound { id: layer_id });
    }

    let layout = match lane {
        Some(lane) => stack_lane(&state, layer_id, lane),
        None => stack_layer(&state, layer_id),
    };

    println!(
        "Layer {}{}: {} tracks",
        layer_id,
        lane.map(|l| format!(" / {}", l)).unwrap_or_default(),
        layout.track_count
    );
    for track in 0..layout.track_count {
        println!("Track {}:", track);
        for clip in layout.track(track) {
            println!(
                "  {:>7.2}s - {:>7.2}s  {} {}",
                clip.start_time(),
                clip.end_time(),
                clip.kind_name(),
                clip.id()
            );
        }
    }
    Ok(())
}

/// Snap a time against all clip edges, zero and the playhead.
pub fn snap(path: &Path, config: &EngineConfig, time: f64, playhead: f64) -> Result<()> {
    let state = load_state(path)?;

    let mut targets = vec![0.0, playhead];
    for clip in &state.clips {
        targets.push(clip.start_time());
        targets.push(clip.end_time());
    }

    match nearest_target(time, &targets, config.snap_threshold_seconds) {
        Some(hit) => println!(
            "{:.3}s snaps to {:.3}s (distance {:.3}s)",
            time, hit.target, hit.distance
        ),
        None => println!(
            "{:.3}s does not snap (threshold {:.3}s)",
            time, config.snap_threshold_seconds
        ),
    }
    Ok(())
}

/// Report integrity problems; with `fix` save the repaired state.
pub fn check(path: &Path, fix: bool) -> Result<()> {
    let mut state = load_state(path)?;
    let warnings = repair_integrity(&mut state);

    if warnings.is_empty() {
        println!("No problems found.");
        return Ok(());
    }
    for warning in &warnings {
        println!("- {}", warning);
    }
    if fix {
        save_state(path, &state)?;
        println!("Repaired {} problem(s).", warnings.len());
    } else {
        warn!(problems = warnings.len(), "composition needs repair; rerun with --fix");
    }
    Ok(())
}

/// Write the export projection to `output` or stdout.
pub fn export(path: &Path, episode_id: &str, output: Option<&Path>) -> Result<()> {
    let state = load_state(path)?;
    let json = CompositionExport::from_state(&state, episode_id).to_json_pretty()?;

    match output {
        Some(output) => {
            fs::write(output, json).map_err(|e| CompositionError::FileWriteError {
                path: output.to_path_buf(),
                source: e,
            })?;
            info!("Exported {} to {}", path.display(), output.display());
            println!("Exported: {}", output.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn open_controller(
    path: &Path,
    config: &EngineConfig,
) -> Result<EditController<InMemoryPersistence>> {
    let state = load_state(path)?;
    let service = InMemoryPersistence::with_records(
        state.scenes().cloned().collect(),
        state.placements().cloned().collect(),
    );
    let (controller, warnings) = EditController::with_state(service, config.clone(), state);
    for warning in warnings {
        warn!("{}", warning);
    }
    Ok(controller)
}

/// Append a layer and save.
pub fn add_layer(path: &Path, config: &EngineConfig, name: Option<&str>) -> Result<()> {
    let mut controller = open_controller(path, config)?;
    let id = controller.add_layer(name);
    save_state(path, &controller.snapshot())?;

    println!("Added layer {}", id);
    Ok(())
}

/// Set a clip's timing and save.
pub async fn timing(
    path: &Path,
    config: &EngineConfig,
    clip_id: Uuid,
    start: f64,
    duration: f64,
) -> Result<()> {
    let mut controller = open_controller(path, config)?;
    let clip = controller.set_clip_timing(clip_id, start, duration).await?;
    save_state(path, &controller.snapshot())?;

    println!(
        "Clip {} now {:.2}s +{:.2}s",
        clip.id(),
        clip.start_time(),
        clip.duration()
    );
    Ok(())
}

/// Split a clip and save.
pub async fn split(path: &Path, config: &EngineConfig, clip_id: Uuid, at: f64) -> Result<()> {
    let mut controller = open_controller(path, config)?;
    let (left, right) = controller.split_clip(clip_id, at).await?;
    save_state(path, &controller.snapshot())?;

    println!(
        "Split into {} ({:.2}s +{:.2}s) and {} ({:.2}s +{:.2}s)",
        left.id(),
        left.start_time(),
        left.duration(),
        right.id(),
        right.start_time(),
        right.duration()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Scene;
    use tempfile::TempDir;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("comp.json");

        init(&path, false).unwrap();
        assert!(init(&path, false).is_err());
        init(&path, true).unwrap();
        assert_eq!(load_state(&path).unwrap().layers.len(), 1);
    }

    #[test]
    fn test_check_fix_repairs_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("comp.json");
        let mut state = CompositionState::new();
        state.clips.push(Scene::new(9, 0.0, 4.0, Some("a.mp4".into())).into());
        save_state(&path, &state).unwrap();

        check(&path, true).unwrap();
        let repaired = load_state(&path).unwrap();
        assert_eq!(repaired.clips[0].layer_id(), 1);
    }

    #[tokio::test]
    async fn test_split_saves_both_halves() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("comp.json");
        let mut state = CompositionState::new();
        let scene = Scene::new(1, 0.0, 10.0, Some("a.mp4".into()));
        let id = scene.id;
        state.clips.push(scene.into());
        save_state(&path, &state).unwrap();

        split(&path, &EngineConfig::default(), id, 4.0).await.unwrap();
        let saved = load_state(&path).unwrap();
        assert_eq!(saved.clips.len(), 2);
        assert_eq!(saved.clip(id).unwrap().duration(), 4.0);
    }
}
