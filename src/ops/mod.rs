//! High-level operations.
//!
//! This module contains the implementation of nodebuild commands.

pub mod launch;
pub mod nodebuild_build;
pub mod nodebuild_clean;
pub mod status;

pub use launch::{launch_command, library_path, LaunchOptions, Launcher};
pub use nodebuild_build::{build, BuildOptions, BuildReport};
pub use nodebuild_clean::{clean, CleanOptions};
pub use status::{status, StatusReport};
