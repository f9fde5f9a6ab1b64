//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// nodebuild - build orchestration for a JVM-hosted Node.js
#[derive(Parser)]
#[command(name = "nodebuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configure and build Node.js, regenerating snapshots when stale
    Build(BuildArgs),

    /// Remove build outputs and generated configuration
    Clean(CleanArgs),

    /// Show which build steps are stale
    Status(StatusArgs),

    /// Run the built node
    Node(LaunchArgs),

    /// Run npm with the built node
    Npm(LaunchArgs),

    /// Run node-gyp with the built node
    NodeGyp(LaunchArgs),

    /// Run the Node.js test suite (tools/test.py) against the built node
    TestNode(LaunchArgs),

    /// Run make in the node environment (not supported on Windows)
    MakeInEnv(LaunchArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Build in debug mode
    #[arg(long)]
    pub debug: bool,

    /// Also build Node.js as a shared library
    #[arg(long)]
    pub shared_library: bool,

    /// Rebuild the core-module snapshot even if it is up to date
    #[arg(long)]
    pub force: bool,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Clean the debug build directory
    #[arg(long)]
    pub debug: bool,

    /// Only clean what a following build requires
    #[arg(long)]
    pub for_build: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Check the debug build
    #[arg(long)]
    pub debug: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct LaunchArgs {
    /// Run the debug build
    #[arg(long)]
    pub debug: bool,

    /// Option for the embedded JVM (repeatable)
    #[arg(long = "vm-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub vm_args: Vec<String>,

    /// Arguments passed to the program, test runner or make
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
