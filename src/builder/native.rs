//! Native build of the Node.js tree.
//!
//! The build always runs `configure` followed by the platform build tool;
//! make/ninja do their own incremental work. Timestamps of the declared
//! results before and after tell us whether anything was actually rebuilt.

use std::path::Path;

use anyhow::{Context, Result};

use crate::builder::context::BuildContext;
use crate::builder::platform::PlatformStrategy;
use crate::builder::staleness::{
    lazy_generate, resolve_newest, Freshness, Generation, MissingPolicy, NewestFile, StaleReason,
};
use crate::core::project::Project;
use crate::util::env::BuildEnv;
use crate::util::fs::{relative_path, remove_path_if_exists};
use crate::util::process::ProcessBuilder;

/// Result of a native build.
#[derive(Debug, Clone)]
pub struct NativeBuildOutcome {
    /// Whether any result got newer.
    pub built: bool,
    /// Newest result before building.
    pub before: NewestFile,
    /// Newest result after building.
    pub after: NewestFile,
}

/// Configure-and-build task for the native tree.
pub struct NativeBuildTask<'a> {
    project: &'a Project,
    ctx: &'a BuildContext,
    strategy: Box<dyn PlatformStrategy>,
    shared_library: bool,
}

impl<'a> NativeBuildTask<'a> {
    pub fn new(project: &'a Project, ctx: &'a BuildContext) -> Self {
        NativeBuildTask {
            project,
            ctx,
            strategy: ctx.platform.strategy(),
            shared_library: false,
        }
    }

    /// Also build Node.js as a shared library.
    pub fn shared_library(mut self, shared_library: bool) -> Self {
        self.shared_library = shared_library;
        self
    }

    /// The native build is always attempted.
    pub fn needs_build(&self) -> Freshness {
        Freshness::stale(StaleReason::Forced)
    }

    /// Arguments for the `configure` script.
    pub fn configure_args(&self, java_home: &Path, generation: Generation) -> Vec<String> {
        let mut args: Vec<String> = [
            "--partly-static",
            "--without-dtrace",
            "--without-snapshot",
            "--without-node-snapshot",
            "--java-home",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(java_home.display().to_string());

        if self.ctx.mode.is_debug() {
            args.push("--debug".to_string());
        }
        if self.shared_library {
            args.push("--enable-shared-library".to_string());
        }
        // Without this, the Makefile sees config.gypi as out of date and
        // runs configure a second time.
        if generation.is_skip() {
            args.push("--lazy-generator".to_string());
        }
        args.extend(self.strategy.configure_flags());
        args.extend(self.project.configure_args().iter().cloned());
        args
    }

    /// Environment for configure and the build tool.
    pub fn build_env(&self) -> BuildEnv {
        let mut env = BuildEnv::inherit();
        if let Some(dir) = self
            .ctx
            .tools
            .python
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
        {
            env.prepend_path("PATH", dir);
        }
        self.strategy.prepare_env(self.ctx, &mut env);
        env
    }

    /// Configure, build and install headers.
    pub fn build(&self) -> Result<NativeBuildOutcome> {
        let results = self.project.results(self.ctx.mode);
        let before = resolve_newest(&results, MissingPolicy::Warn)?;

        let env = self.build_env();
        let java_home = self.ctx.require_java_home()?;

        let generation = lazy_generate(self.project.config_sources(), self.project.generated_config())
            .context("failed to check generated configuration")?;
        tracing::debug!("configuration: {}", generation);

        tracing::info!(
            "Configuring {} ({}, {})",
            self.project.name(),
            self.ctx.mode,
            self.strategy.name()
        );
        ProcessBuilder::new(&self.ctx.tools.python)
            .arg(self.project.configure_script())
            .args(self.configure_args(java_home, generation))
            .cwd(&self.ctx.root)
            .build_env(&env)
            .run()?;

        tracing::info!("Building {} with {} jobs", self.project.name(), self.ctx.jobs);
        self.strategy.build(self.ctx, &env)?;

        self.install_headers(&env)?;

        let after = resolve_newest(&results, MissingPolicy::Fatal)
            .context("build finished without producing its results")?;
        let built = after.is_newer_than(&before);
        tracing::debug!(
            "newest result before building: {}; after building: {}; built: {}",
            before,
            after,
            built
        );

        if built {
            self.strategy.post_build(self.ctx, &env)?;
        }

        Ok(NativeBuildOutcome {
            built,
            before,
            after,
        })
    }

    /// Put headers for native add-ons into the headers directory.
    fn install_headers(&self, env: &BuildEnv) -> Result<()> {
        let mut env = env.clone();
        env.set("HEADERS_ONLY", "1");

        let headers_dir = relative_path(&self.ctx.root, self.project.headers_dir());
        ProcessBuilder::new(&self.ctx.tools.python)
            .arg(self.project.install_script())
            .arg("install")
            .arg(headers_dir)
            .arg("/")
            .cwd(&self.ctx.root)
            .build_env(&env)
            .quiet(!self.ctx.verbose)
            .run()
            .context("failed to install headers")
    }

    /// Clean native outputs and generated configuration.
    ///
    /// Nothing is removed when cleaning ahead of a build.
    pub fn clean(&self, for_build: bool) -> Result<()> {
        if for_build {
            return Ok(());
        }
        self.strategy.clean(self.ctx)?;
        for generated in self.project.generated_config() {
            if remove_path_if_exists(generated)? {
                tracing::debug!("removed {}", generated.display());
            }
        }
        Ok(())
    }
}
