//! `nodebuild build` command

use anyhow::Result;

use crate::cli::BuildArgs;
use nodebuild::ops::{build, BuildOptions};
use nodebuild::BuildMode;

pub fn execute(args: BuildArgs, verbose: bool) -> Result<()> {
    let (project, config) = super::load_project()?;

    let opts = BuildOptions {
        mode: BuildMode::from_debug(args.debug),
        shared_library: args.shared_library,
        force: args.force,
        jobs: args.jobs,
        verbose,
    };

    let report = build(&project, &config, &opts)?;

    if let Some(ref snapshot) = report.snapshot {
        if snapshot.is_stale() {
            eprintln!("   Snapshot  rebuilt ({})", snapshot);
        }
    }
    let state = if report.native.built {
        "rebuilt"
    } else {
        "up to date"
    };
    eprintln!(
        "    Finished `{}` ({}) {}",
        project.name(),
        opts.mode,
        state
    );

    Ok(())
}
