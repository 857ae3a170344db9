use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("floe"))
}

/// User settings from `~/.config/floe/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Snapshot used when no `--state` is given
    pub state: Option<String>,
    /// Manifests planned in parallel
    pub jobs: usize,
    /// Apply without asking
    pub assume_yes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state: None,
            jobs: 4,
            assume_yes: false,
        }
    }
}

impl Config {
    /// Load the user config, or defaults if there is none
    pub fn load() -> Result<Self> {
        Self::load_from(&config_dir()?.join("config.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("Invalid config format in {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Snapshot path: the explicit one, else the configured one with `~`
    /// expanded.
    pub fn state_path(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        explicit.map(Path::to_path_buf).or_else(|| {
            self.state
                .as_deref()
                .map(|raw| PathBuf::from(shellexpand::tilde(raw).as_ref()))
        })
    }

    /// Parallel jobs, never zero
    pub fn jobs(&self, explicit: Option<usize>) -> usize {
        explicit.unwrap_or(self.jobs).max(1)
    }
}
