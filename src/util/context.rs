//! Global context for nodebuild operations.
//!
//! Provides centralized access to the working directory, the user's
//! configuration directory and manifest discovery.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::project::{find_manifest, ProjectError};
use crate::util::config::{load_config, Config};

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global nodebuild data (~/.nodebuild/)
    home: PathBuf,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let home = directories::BaseDirs::new()
            .map(|b| b.home_dir().join(".nodebuild"))
            .unwrap_or_else(|| PathBuf::from(".nodebuild"));

        Ok(GlobalContext { cwd, home })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Get the project configuration file path for a project root.
    pub fn project_config_path(&self, root: &Path) -> PathBuf {
        root.join(".nodebuild").join("config.toml")
    }

    /// Load the merged global + project configuration.
    pub fn load_config(&self, root: &Path) -> Config {
        load_config(&self.config_path(), &self.project_config_path(root))
    }

    /// Find the manifest by searching upward from the current directory.
    pub fn find_manifest(&self) -> Result<PathBuf, ProjectError> {
        find_manifest(&self.cwd)
    }
}
