//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/gridsync/gridsync.toml`
//! 3. Local config: file passed with `--config`
//! 4. Environment variables: `GRIDSYNC__GRID__<FIELD>`

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;

/// Display behavior of a grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GridSettings {
    /// Show the root object as a row of its own
    pub root_visible: bool,
    /// Expand the root when the grid is built
    pub expand_root: bool,
    /// Expand selected nodes, not only their ancestors
    pub expand_selected: bool,
    /// Move the selection to the collapsed node when it becomes hidden
    pub adjust_selection_when_collapsing: bool,
    pub multi_selection: bool,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            root_visible: false,
            expand_root: true,
            expand_selected: false,
            adjust_selection_when_collapsing: true,
            multi_selection: false,
        }
    }
}

/// Raw grid settings for intermediate parsing (`None` → not specified, inherit from base).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawGridSettings {
    pub root_visible: Option<bool>,
    pub expand_root: Option<bool>,
    pub expand_selected: Option<bool>,
    pub adjust_selection_when_collapsing: Option<bool>,
    pub multi_selection: Option<bool>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub grid: RawGridSettings,
}

impl GridSettings {
    /// Merge overlay config onto self (base): overlay wins if specified.
    pub fn merge(&self, overlay: &RawGridSettings) -> Self {
        Self {
            root_visible: overlay.root_visible.unwrap_or(self.root_visible),
            expand_root: overlay.expand_root.unwrap_or(self.expand_root),
            expand_selected: overlay.expand_selected.unwrap_or(self.expand_selected),
            adjust_selection_when_collapsing: overlay
                .adjust_selection_when_collapsing
                .unwrap_or(self.adjust_selection_when_collapsing),
            multi_selection: overlay.multi_selection.unwrap_or(self.multi_selection),
        }
    }
}

/// Unified configuration for gridsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub grid: GridSettings,
}

/// Get the XDG config directory for gridsync.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "gridsync").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("gridsync.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            grid: self.grid.merge(&overlay.grid),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// A `local` file that is given but missing is an error; a missing global file is not.
    pub fn load(local: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("loading global config {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(local_path) = local {
            debug!("loading local config {}", local_path.display());
            current = current.merge_with(&load_raw_settings(local_path)?);
        }

        Self::apply_env_overrides(current)
    }

    /// Apply GRIDSYNC__* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("GRIDSYNC").separator("__"))
            .build()
            .map_err(config_err)?;

        let grid = &mut settings.grid;
        let overrides: [(&str, &mut bool); 5] = [
            ("grid.root_visible", &mut grid.root_visible),
            ("grid.expand_root", &mut grid.expand_root),
            ("grid.expand_selected", &mut grid.expand_selected),
            (
                "grid.adjust_selection_when_collapsing",
                &mut grid.adjust_selection_when_collapsing,
            ),
            ("grid.multi_selection", &mut grid.multi_selection),
        ];
        for (key, target) in overrides {
            match config.get_bool(key) {
                Ok(value) => *target = value,
                Err(ConfigError::NotFound(_)) => {}
                Err(e) => return Err(config_err(e)),
            }
        }
        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
