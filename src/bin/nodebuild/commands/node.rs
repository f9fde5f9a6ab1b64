//! `nodebuild node`, `npm`, `node-gyp`, `test-node` and `make-in-env` commands

use anyhow::Result;

use crate::cli::LaunchArgs;
use nodebuild::ops::{launch_command, LaunchOptions, Launcher};
use nodebuild::BuildMode;

/// Run the program and return its exit code.
pub fn execute(launcher: Launcher, args: LaunchArgs) -> Result<i32> {
    let (project, config) = super::load_project()?;

    let opts = LaunchOptions {
        mode: BuildMode::from_debug(args.debug),
        vm_args: args.vm_args,
    };
    let cmd = launch_command(&project, &config, launcher, &opts, &args.args)?;

    tracing::debug!("running `{}`", cmd.display_command());
    let status = cmd.status()?;
    Ok(status.code().unwrap_or(1))
}
