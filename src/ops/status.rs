//! Implementation of `nodebuild status`: staleness diagnostics without
//! running anything.

use std::fmt::Write as _;

use anyhow::Result;
use serde::Serialize;

use crate::builder::{
    lazy_generate, needs_rebuild, resolve_newest, BuildContext, Freshness, Generation,
    MissingPolicy, NewestFile, Platform, SnapshotTask,
};
use crate::core::project::{BuildMode, Project};
use crate::util::config::Config;

/// Staleness of every build step.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub project: String,
    pub mode: BuildMode,
    pub platform: Platform,
    pub configure: ConfigureStatus,
    pub native: NativeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigureStatus {
    pub sources_newest: NewestFile,
    pub generated_newest: NewestFile,
    pub generation: Generation,
}

#[derive(Debug, Clone, Serialize)]
pub struct NativeStatus {
    pub results_newest: NewestFile,
    pub freshness: Freshness,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotStatus {
    pub input_newest: NewestFile,
    pub freshness: Freshness,
}

/// Compute the status report for `mode`.
///
/// Missing configure sources are fatal here as in a real build. Missing
/// results are reported once each.
pub fn status(project: &Project, config: &Config, mode: BuildMode) -> Result<StatusReport> {
    let ctx = BuildContext::new(project, config, mode, None, false);

    let sources_newest = resolve_newest(project.config_sources(), MissingPolicy::Fatal)?;
    let generated_newest = resolve_newest(project.generated_config(), MissingPolicy::Warn)?;
    let generation = lazy_generate(project.config_sources(), project.generated_config())?;

    let results = project.results(mode);
    let results_newest = resolve_newest(&results, MissingPolicy::Warn)?;
    let configured = sources_newest.clone().newer_of(generated_newest.clone());
    let native_freshness = needs_rebuild(&configured, &results)?;

    let snapshot = match project.snapshot() {
        Some(layout) => {
            let task = SnapshotTask::new(layout, &ctx);
            let upstream = resolve_newest(&layout.classpath, MissingPolicy::Warn)?;
            let input_newest = task.newest_input()?.newer_of(upstream);
            let freshness = needs_rebuild(&input_newest, &[task.result()])?;
            Some(SnapshotStatus {
                input_newest,
                freshness,
            })
        }
        None => None,
    };

    Ok(StatusReport {
        project: project.name().to_string(),
        mode,
        platform: ctx.platform,
        configure: ConfigureStatus {
            sources_newest,
            generated_newest,
            generation,
        },
        native: NativeStatus {
            results_newest,
            freshness: native_freshness,
        },
        snapshot,
    })
}

impl StatusReport {
    /// Human-readable rendering.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} ({}, {})", self.project, self.mode, self.platform);
        let _ = writeln!(out, "  configure: {}", self.configure.generation);
        let _ = writeln!(out, "    newest source:    {}", self.configure.sources_newest);
        let _ = writeln!(out, "    newest generated: {}", self.configure.generated_newest);
        let _ = writeln!(out, "  native: {}", self.native.freshness);
        let _ = writeln!(out, "    newest result: {}", self.native.results_newest);
        if let Some(ref snapshot) = self.snapshot {
            let _ = writeln!(out, "  snapshot: {}", snapshot.freshness);
            let _ = writeln!(out, "    newest input: {}", snapshot.input_newest);
        }
        out
    }
}
