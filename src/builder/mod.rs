//! Build tasks for the Node.js tree.
//!
//! This module holds the staleness oracle, the platform build strategies and
//! the two build tasks: the core-module snapshot and the native build.

pub mod context;
pub mod native;
pub mod platform;
pub mod snapshot;
pub mod staleness;

pub use context::BuildContext;
pub use native::{NativeBuildOutcome, NativeBuildTask};
pub use platform::{Platform, PlatformStrategy};
pub use snapshot::SnapshotTask;
pub use staleness::{
    lazy_generate, needs_rebuild, resolve_newest, Freshness, Generation, MissingPolicy, NewestFile,
    StaleReason, StalenessError, Timestamp,
};
