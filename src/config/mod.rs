//! Configuration module for Ferret
//!
//! Handles locating and loading settings from YAML files and environment variables.

mod settings;

pub use settings::*;

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Load settings from an explicit path, or search the default locations.
///
/// Order: `path`, `FERRET_SETTINGS_PATH`, `./ferret.yml`,
/// `./config/ferret.yml`, `/etc/ferret/ferret.yml`, the user config dir.
/// Falls back to defaults when nothing is found. Environment overrides are
/// applied last in every case.
pub fn load(path: Option<&Path>) -> Result<Settings> {
    let mut settings = match locate(path) {
        Some(path) => {
            info!("Loading settings from: {}", path.display());
            Settings::from_file(&path)?
        }
        None => {
            info!("No settings file found, using defaults");
            Settings::default()
        }
    };

    settings.merge_env();
    settings.validate()?;
    Ok(settings)
}

fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var("FERRET_SETTINGS_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let mut candidates = vec![
        PathBuf::from("ferret.yml"),
        PathBuf::from("config/ferret.yml"),
        PathBuf::from("/etc/ferret/ferret.yml"),
    ];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("ferret/ferret.yml"));
    }

    candidates.into_iter().find(|p| p.exists())
}
