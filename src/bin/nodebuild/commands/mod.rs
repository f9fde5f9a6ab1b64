//! Command implementations

pub mod build;
pub mod clean;
pub mod completions;
pub mod node;
pub mod status;

use anyhow::Result;

use nodebuild::util::{Config, GlobalContext};
use nodebuild::Project;

/// Locate and load the project around the current directory, with its
/// merged configuration.
pub fn load_project() -> Result<(Project, Config)> {
    let ctx = GlobalContext::new()?;
    let manifest_path = ctx.find_manifest()?;
    let project = Project::load(&manifest_path)?;
    let config = ctx.load_config(project.root());
    Ok((project, config))
}
