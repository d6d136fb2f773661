use crate::data::{Dataset, DatasetError};
use clap::Parser;
use std::path::PathBuf;

/// `semantic-space` - An interactive 3D map of words.
///
/// Each word is drawn as a colored sphere at its coordinates with its text
/// floating above it. Drag to orbit, right-drag or shift-drag to pan, scroll
/// to zoom.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// JSON file with an array of `{ "text", "x", "y", "z", "color"? }` points.
    ///
    /// When omitted, the built-in demo table is shown.
    #[arg(long, env = "SEMANTIC_SPACE_DATASET")]
    pub dataset: Option<PathBuf>,

    /// Initial window width in logical pixels.
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Initial window height in logical pixels.
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Disable multisampling of the 3D pass.
    #[arg(long)]
    pub no_antialias: bool,

    /// Start with the camera HUD hidden.
    #[arg(long)]
    pub hide_hud: bool,
}

impl Config {
    /// Loads the configured dataset, or the built-in one if none was given.
    pub fn load_dataset(&self) -> Result<Dataset, DatasetError> {
        match &self.dataset {
            Some(path) => Dataset::load(path),
            None => {
                log::info!("No dataset given; using the built-in word table");
                Ok(Dataset::builtin())
            }
        }
    }
}
