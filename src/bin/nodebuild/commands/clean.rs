//! `nodebuild clean` command

use anyhow::Result;

use crate::cli::CleanArgs;
use nodebuild::ops::{clean, CleanOptions};
use nodebuild::BuildMode;

pub fn execute(args: CleanArgs) -> Result<()> {
    let (project, config) = super::load_project()?;

    let opts = CleanOptions {
        mode: BuildMode::from_debug(args.debug),
        for_build: args.for_build,
    };
    clean(&project, &config, &opts)?;

    if !opts.for_build {
        eprintln!("     Cleaned {}", project.root().display());
    }

    Ok(())
}
