//! Build context shared by the build tasks.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::builder::platform::Platform;
use crate::core::project::{BuildMode, Project};
use crate::util::config::Config;
use crate::util::process::{find_make, find_ninja, find_python};

/// External tools invoked during a build.
#[derive(Debug, Clone)]
pub struct Tools {
    pub python: PathBuf,
    pub make: PathBuf,
    pub ninja: PathBuf,
}

impl Tools {
    /// Resolve tools from config, falling back to a PATH search and then
    /// to the bare program name.
    pub fn from_config(config: &Config) -> Self {
        let python = config
            .build
            .python
            .clone()
            .or_else(find_python)
            .unwrap_or_else(|| PathBuf::from("python"));
        let make = config
            .build
            .make
            .clone()
            .or_else(find_make)
            .unwrap_or_else(|| PathBuf::from("make"));
        let ninja = config
            .build
            .ninja
            .clone()
            .or_else(find_ninja)
            .unwrap_or_else(|| PathBuf::from("ninja"));

        Tools {
            python,
            make,
            ninja,
        }
    }
}

/// A Visual Studio devkit used on Windows.
#[derive(Debug, Clone)]
pub struct Devkit {
    pub root: PathBuf,
    pub version: Option<String>,
}

/// Context for a single build invocation.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Project root
    pub root: PathBuf,

    /// Release or debug
    pub mode: BuildMode,

    /// Number of parallel jobs for make/ninja
    pub jobs: usize,

    /// Verbose tool output
    pub verbose: bool,

    /// Host platform
    pub platform: Platform,

    /// External tools
    pub tools: Tools,

    /// Java home, if one is configured
    pub java_home: Option<PathBuf>,

    /// Windows devkit, if configured
    pub devkit: Option<Devkit>,
}

impl BuildContext {
    /// Create a build context for `project`.
    ///
    /// `jobs` overrides the configured job count; without either, the
    /// available parallelism is used.
    pub fn new(
        project: &Project,
        config: &Config,
        mode: BuildMode,
        jobs: Option<usize>,
        verbose: bool,
    ) -> Self {
        let jobs = jobs
            .or(config.build.jobs)
            .filter(|&j| j > 0)
            .unwrap_or_else(default_jobs);

        let devkit = config.windows.devkit_root.clone().map(|root| Devkit {
            root,
            version: config.windows.devkit_version.clone(),
        });

        BuildContext {
            root: project.root().to_path_buf(),
            mode,
            jobs,
            verbose: verbose || config.build.verbose,
            platform: Platform::current(),
            tools: Tools::from_config(config),
            java_home: project.java_home().ok(),
            devkit,
        }
    }

    /// `out/<Mode>` under the root.
    pub fn build_dir(&self) -> PathBuf {
        self.root.join("out").join(self.mode.as_str())
    }

    /// The Java home, or an error explaining how to configure one.
    pub fn require_java_home(&self) -> Result<&Path> {
        match self.java_home {
            Some(ref home) => Ok(home.as_path()),
            None => bail!(
                "no Java home configured\n\
                 \n\
                 Set `home` in the [java] section of NodeBuild.toml or export JAVA_HOME."
            ),
        }
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
