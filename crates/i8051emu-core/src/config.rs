//! Front-end configuration.
//!
//! Loaded from several sources, highest priority first:
//! 1. Command-line flags (applied by the binary via [`Config::merge`])
//! 2. Environment variables (`I8051EMU_CADENCE_MS`, `I8051EMU_KEY_RELEASE`)
//! 3. A file named with `--config`
//! 4. Project-local `./i8051emu.toml`
//! 5. Built-in defaults
//!
//! # Config File Format
//!
//! ```toml
//! # i8051emu.toml
//! cadence_ms = 500
//! key_release = "global"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::input::KeyReleaseMode;

pub const LOCAL_CONFIG: &str = "i8051emu.toml";
pub const DEFAULT_CADENCE_MS: u64 = 500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Period of the run and run-to-target timers, in milliseconds.
    pub cadence_ms: Option<u64>,

    /// Give up a run-to-target after this many ticks. Unbounded when unset.
    pub run_to_target_limit: Option<u64>,

    /// Whether a pointer-up anywhere releases held keys.
    pub key_release: Option<KeyReleaseMode>,

    /// Height of one memory row, in host units.
    pub memory_row_height: Option<u32>,

    /// Visible height of the memory table, in host units.
    pub memory_viewport_extent: Option<u32>,
}

impl Config {
    /// Load configuration from the local file, `explicit` (if given) and the
    /// environment. A broken local file is skipped with a warning; a broken
    /// explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(local) = Self::load_local_config() {
            config.merge(local);
        }

        if let Some(path) = explicit {
            config.merge(Self::from_file(path)?);
            info!("Loaded config from {}", path.display());
        }

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.cadence_ms.unwrap_or(DEFAULT_CADENCE_MS).max(1))
    }

    pub fn run_to_target_limit(&self) -> Option<u64> {
        self.run_to_target_limit
    }

    pub fn key_release(&self) -> KeyReleaseMode {
        self.key_release.unwrap_or_default()
    }

    pub fn memory_row_height(&self) -> u32 {
        self.memory_row_height.unwrap_or(1).max(1)
    }

    pub fn memory_viewport_extent(&self) -> u32 {
        self.memory_viewport_extent.unwrap_or(16)
    }

    fn load_local_config() -> Option<Self> {
        let path = Path::new(LOCAL_CONFIG);
        if !path.exists() {
            return None;
        }
        match Self::from_file(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                Some(config)
            }
            Err(e) => {
                warn!("{e}");
                None
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Merge another config into this one. Only fields set in `other` win.
    pub fn merge(&mut self, other: Self) {
        if other.cadence_ms.is_some() {
            self.cadence_ms = other.cadence_ms;
        }
        if other.run_to_target_limit.is_some() {
            self.run_to_target_limit = other.run_to_target_limit;
        }
        if other.key_release.is_some() {
            self.key_release = other.key_release;
        }
        if other.memory_row_height.is_some() {
            self.memory_row_height = other.memory_row_height;
        }
        if other.memory_viewport_extent.is_some() {
            self.memory_viewport_extent = other.memory_viewport_extent;
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_env(|name| std::env::var(name).ok());
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("I8051EMU_CADENCE_MS") {
            match value.trim().parse() {
                Ok(ms) => {
                    info!("Using I8051EMU_CADENCE_MS from environment: {ms}");
                    self.cadence_ms = Some(ms);
                }
                Err(e) => warn!("Ignoring I8051EMU_CADENCE_MS={value:?}: {e}"),
            }
        }
        if let Some(value) = lookup("I8051EMU_KEY_RELEASE") {
            match value.trim() {
                "global" => self.key_release = Some(KeyReleaseMode::Global),
                "per_key" => self.key_release = Some(KeyReleaseMode::PerKey),
                other => warn!("Ignoring I8051EMU_KEY_RELEASE={other:?}: expected global or per_key"),
            }
        }
    }

    /// Sample config file content.
    pub fn sample() -> String {
        r#"# i8051emu configuration
# Place this file at ./i8051emu.toml or pass it with --config

# Milliseconds between steps while running or running to a target
cadence_ms = 500

# Stop a run-to-target after this many steps (unbounded when absent)
# run_to_target_limit = 100000

# "global": a pointer-up anywhere releases held keys
# "per_key": only a pointer-up on the key itself does
key_release = "global"

# Memory table geometry, in terminal rows
memory_row_height = 1
memory_viewport_extent = 16
"#
        .to_string()
    }
}
