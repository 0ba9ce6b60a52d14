//! CLI Module
//!
//! Command-line interface for inspecting and editing composition files.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use crate::model::{LaneKind, LayerId};

/// Montage - timeline composition engine
#[derive(Parser, Debug)]
#[command(name = "montage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine config file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an empty composition file
    #[command(name = "init")]
    Init {
        /// Path for the composition file
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print a summary of a composition
    #[command(name = "print-state")]
    PrintState {
        /// Path to the composition file
        path: PathBuf,
    },

    /// Show how a layer's clips stack into tracks
    #[command(name = "stack")]
    Stack {
        /// Path to the composition file
        path: PathBuf,

        /// Layer to stack
        #[arg(short, long, default_value_t = 1)]
        layer: LayerId,

        /// Only stack one lane (video, overlays, voice, music, sfx)
        #[arg(long)]
        lane: Option<LaneKind>,
    },

    /// Snap a time against every clip edge
    #[command(name = "snap")]
    Snap {
        /// Path to the composition file
        path: PathBuf,

        /// Time to snap, in seconds
        #[arg(short, long)]
        time: f64,

        /// Playhead position, also a snap target
        #[arg(long, default_value_t = 0.0)]
        playhead: f64,
    },

    /// Check and optionally repair layer and selection references
    #[command(name = "check")]
    Check {
        /// Path to the composition file
        path: PathBuf,

        /// Write the repaired composition back
        #[arg(long)]
        fix: bool,
    },

    /// Write the export projection as JSON
    #[command(name = "export")]
    Export {
        /// Path to the composition file
        path: PathBuf,

        /// Episode id recorded in the export
        #[arg(short, long)]
        episode: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Append a layer
    #[command(name = "add-layer")]
    AddLayer {
        /// Path to the composition file
        path: PathBuf,

        /// Layer name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Set a clip's start and duration
    #[command(name = "timing")]
    Timing {
        /// Path to the composition file
        path: PathBuf,

        /// Clip id
        #[arg(long)]
        clip: Uuid,

        /// New start time, in seconds
        #[arg(short, long)]
        start: f64,

        /// New duration, in seconds
        #[arg(short, long)]
        duration: f64,
    },

    /// Split a clip in two
    #[command(name = "split")]
    Split {
        /// Path to the composition file
        path: PathBuf,

        /// Clip id
        #[arg(long)]
        clip: Uuid,

        /// Split point, in seconds
        #[arg(long)]
        at: f64,
    },
}
