//! Implementation of `nodebuild clean`.

use anyhow::Result;

use crate::builder::{BuildContext, NativeBuildTask, SnapshotTask};
use crate::core::project::{BuildMode, Project};
use crate::util::config::Config;

/// Options for the clean command.
#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    /// Build mode whose output directory is cleaned
    pub mode: BuildMode,

    /// Clean only what a subsequent build needs cleaned
    pub for_build: bool,
}

/// Clean native outputs, generated configuration and snapshots.
pub fn clean(project: &Project, config: &Config, opts: &CleanOptions) -> Result<()> {
    let ctx = BuildContext::new(project, config, opts.mode, None, false);

    NativeBuildTask::new(project, &ctx).clean(opts.for_build)?;
    if let Some(layout) = project.snapshot() {
        SnapshotTask::new(layout, &ctx).clean(opts.for_build)?;
    }

    Ok(())
}
