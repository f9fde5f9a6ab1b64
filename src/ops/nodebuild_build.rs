//! Implementation of `nodebuild build`.

use anyhow::{Context, Result};

use crate::builder::{
    resolve_newest, BuildContext, Freshness, MissingPolicy, NativeBuildOutcome, NativeBuildTask,
    SnapshotTask, StaleReason,
};
use crate::core::project::{BuildMode, Project};
use crate::util::config::Config;

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Release or debug build
    pub mode: BuildMode,

    /// Also build Node.js as a shared library
    pub shared_library: bool,

    /// Rebuild the snapshot even if it looks up to date
    pub force: bool,

    /// Number of parallel jobs
    pub jobs: Option<usize>,

    /// Verbose output
    pub verbose: bool,
}

/// What a build did.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Snapshot decision, if the project has a snapshot step
    pub snapshot: Option<Freshness>,

    /// Native build outcome
    pub native: NativeBuildOutcome,
}

/// Build the snapshot header (when stale) and then the native tree.
pub fn build(project: &Project, config: &Config, opts: &BuildOptions) -> Result<BuildReport> {
    let ctx = BuildContext::new(project, config, opts.mode, opts.jobs, opts.verbose);

    let snapshot = match project.snapshot() {
        Some(layout) => {
            let task = SnapshotTask::new(layout, &ctx);
            let freshness = if opts.force {
                Freshness::stale(StaleReason::Forced)
            } else {
                // The snapshot tool itself is an input.
                let upstream = resolve_newest(&layout.classpath, MissingPolicy::Warn)?;
                task.needs_build(&upstream)?
            };

            match freshness.reason() {
                Some(reason) => {
                    tracing::info!("Snapshotting {}: {}", project.name(), reason);
                    task.clean(true)?;
                    task.build().context("failed to build core-module snapshot")?;
                }
                None => tracing::debug!("{} is up to date", task.result().display()),
            }
            Some(freshness)
        }
        None => None,
    };

    let native_task = NativeBuildTask::new(project, &ctx).shared_library(opts.shared_library);
    if let Some(reason) = native_task.needs_build().reason() {
        tracing::debug!("native build: {}", reason);
    }
    native_task.clean(true)?;
    let native = native_task
        .build()
        .with_context(|| format!("failed to build {}", project.name()))?;

    Ok(BuildReport { snapshot, native })
}
