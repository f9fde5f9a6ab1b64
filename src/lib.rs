//! nodebuild - build orchestration for a JVM-hosted Node.js distribution
//!
//! This crate drives `configure` and the platform build tool, produces the
//! core-module snapshot header, and decides with timestamp-based staleness
//! checks which of those steps actually need to run.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

pub use builder::staleness::{
    lazy_generate, needs_rebuild, resolve_newest, Freshness, Generation, MissingPolicy, NewestFile,
};
pub use crate::core::project::{BuildMode, Project};
pub use util::context::GlobalContext;
