//! CLI Module
//!
//! Command-line interface for the storyboard engine.

pub mod commands;
pub mod session;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::EngineConfig;
use crate::error::Result;

/// Storyboard Engine - build page-by-page storyboards with undo/redo
#[derive(Parser, Debug)]
#[command(name = "storyboard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding storyboard records and preferences
    #[arg(long, global = true, env = "STORYBOARD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Engine settings from `--config`, with `--data-dir` taking precedence.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List open storyboards
    #[command(name = "list")]
    List,

    /// Create a new empty storyboard
    #[command(name = "new")]
    New {
        /// Name of the storyboard
        name: String,
    },

    /// Import a storyboard from an exported JSON file
    #[command(name = "import")]
    Import {
        /// Path to the storyboard file
        file: PathBuf,
    },

    /// Export a storyboard to a JSON file
    #[command(name = "export")]
    Export {
        /// Tab number (1-based)
        tab: usize,

        /// Output file or directory (defaults to `<name>.json` here)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the pages of a storyboard
    #[command(name = "show")]
    Show {
        /// Tab number (1-based); defaults to the active tab
        tab: Option<usize>,
    },

    /// Print the playback plan of a storyboard
    #[command(name = "play")]
    Play {
        /// Tab number (1-based); defaults to the active tab
        tab: Option<usize>,

        /// Plan a slideshow of every page instead of the audio queue
        #[arg(long)]
        slideshow: bool,
    },

    /// Show or change preferences
    #[command(name = "prefs")]
    Prefs {
        /// Colour mode: `dark` or `light`
        #[arg(long)]
        mode: Option<String>,

        /// Display name used for the greeting
        #[arg(long)]
        name: Option<String>,
    },

    /// Interactive editing session with undo/redo
    #[command(name = "session")]
    Session,
}

/// Convert a 1-based number typed by a user into an index.
pub fn to_index(number: usize) -> Option<usize> {
    number.checked_sub(1)
}
