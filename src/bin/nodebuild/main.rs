//! nodebuild CLI - build orchestration for a JVM-hosted Node.js

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("nodebuild=debug")
    } else {
        EnvFilter::new("nodebuild=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let verbose = cli.verbose;

    // Execute command
    match cli.command {
        Commands::Build(args) => commands::build::execute(args, verbose).map(|_| 0),
        Commands::Clean(args) => commands::clean::execute(args).map(|_| 0),
        Commands::Status(args) => commands::status::execute(args).map(|_| 0),
        Commands::Node(args) => commands::node::execute(nodebuild::ops::Launcher::Node, args),
        Commands::Npm(args) => commands::node::execute(nodebuild::ops::Launcher::Npm, args),
        Commands::NodeGyp(args) => commands::node::execute(nodebuild::ops::Launcher::NodeGyp, args),
        Commands::TestNode(args) => {
            commands::node::execute(nodebuild::ops::Launcher::TestNode, args)
        }
        Commands::MakeInEnv(args) => {
            commands::node::execute(nodebuild::ops::Launcher::MakeInEnv, args)
        }
        Commands::Completions(args) => commands::completions::execute(args).map(|_| 0),
    }
}
