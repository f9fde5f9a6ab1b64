//! `nodebuild status` command

use anyhow::Result;

use crate::cli::StatusArgs;
use nodebuild::ops::status;
use nodebuild::BuildMode;

pub fn execute(args: StatusArgs) -> Result<()> {
    let (project, config) = super::load_project()?;

    let report = status(&project, &config, BuildMode::from_debug(args.debug))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
    }

    Ok(())
}
