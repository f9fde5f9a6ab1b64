//! Core project types.

pub mod project;

pub use project::{BuildMode, Project, SnapshotLayout};
