//! Configuration file support for nodebuild.
//!
//! nodebuild supports two configuration file locations:
//! - Global: `~/.nodebuild/config.toml` - User-wide defaults
//! - Project: `.nodebuild/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// nodebuild configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Windows toolchain settings
    pub windows: WindowsConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Default number of parallel jobs (None = auto-detect)
    pub jobs: Option<usize>,

    /// Python interpreter used for `configure` and the tool scripts
    pub python: Option<PathBuf>,

    /// GNU make binary
    pub make: Option<PathBuf>,

    /// ninja binary
    pub ninja: Option<PathBuf>,

    /// Always log verbosely and pass verbose flags to make/ninja
    #[serde(default)]
    pub verbose: bool,
}

/// Windows devkit configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WindowsConfig {
    /// Root of a Visual Studio devkit
    pub devkit_root: Option<PathBuf>,

    /// Visual Studio version string of the devkit (e.g. "2017")
    pub devkit_version: Option<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Build settings
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.python.is_some() {
            self.build.python = other.build.python;
        }
        if other.build.make.is_some() {
            self.build.make = other.build.make;
        }
        if other.build.ninja.is_some() {
            self.build.ninja = other.build.ninja;
        }
        if other.build.verbose {
            self.build.verbose = true;
        }

        // Windows settings
        if other.windows.devkit_root.is_some() {
            self.windows.devkit_root = other.windows.devkit_root;
        }
        if other.windows.devkit_version.is_some() {
            self.windows.devkit_version = other.windows.devkit_version;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.nodebuild/config.toml)
/// 2. Global config (~/.nodebuild/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        let global = Config::load_or_default(global_path);
        config.merge(global);
    }

    if project_path.exists() {
        let project = Config::load_or_default(project_path);
        config.merge(project);
    }

    config
}
