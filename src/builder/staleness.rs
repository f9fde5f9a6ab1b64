//! Timestamp-based staleness checks for incremental builds.
//!
//! Where content fingerprints are too expensive or the external build tool
//! owns the real dependency graph, we fall back to comparing modification
//! times: the newest file on the input side against the newest file on the
//! output side.
//!
//! Every query reads the filesystem afresh. Nothing is cached between calls,
//! so repeating a query without touching the filesystem always yields the
//! same answer.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};
use thiserror::Error;
use walkdir::WalkDir;

/// What to do when a path handed to [`resolve_newest`] does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Abort the query with [`StalenessError::MissingPath`].
    Fatal,
    /// Log a warning and leave the path out of the comparison.
    Warn,
}

/// Errors raised while resolving timestamps.
#[derive(Debug, Error)]
pub enum StalenessError {
    #[error("required path does not exist: {}", path.display())]
    MissingPath { path: PathBuf },

    #[error("failed to read modification time of {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A file modification time.
///
/// [`Timestamp::NEVER`] stands for "never built" and orders before every
/// real modification time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(Option<SystemTime>);

impl Timestamp {
    /// Sentinel for an empty candidate set.
    pub const NEVER: Timestamp = Timestamp(None);

    pub fn from_system_time(time: SystemTime) -> Self {
        Timestamp(Some(time))
    }

    pub fn is_never(&self) -> bool {
        self.0.is_none()
    }

    /// Strict comparison; equal timestamps are not newer.
    pub fn is_newer_than(&self, other: &Timestamp) -> bool {
        self > other
    }

    fn since_epoch_secs(&self) -> Option<f64> {
        self.0.map(|t| match t.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs_f64(),
            Err(e) => -e.duration().as_secs_f64(),
        })
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.since_epoch_secs() {
            Some(secs) => write!(f, "{:.3}", secs),
            None => f.write_str("never"),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.since_epoch_secs() {
            Some(secs) => serializer.serialize_some(&secs),
            None => serializer.serialize_none(),
        }
    }
}

/// The newest file of a resolved path set.
///
/// `path` is `None` when nothing resolved, in which case `modified` is
/// [`Timestamp::NEVER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewestFile {
    pub path: Option<PathBuf>,
    pub modified: Timestamp,
}

impl NewestFile {
    /// The "never built" result.
    pub fn never() -> Self {
        NewestFile {
            path: None,
            modified: Timestamp::NEVER,
        }
    }

    pub fn is_never(&self) -> bool {
        self.modified.is_never()
    }

    pub fn is_newer_than(&self, other: &NewestFile) -> bool {
        self.modified.is_newer_than(&other.modified)
    }

    /// Return whichever of the two is newer, preferring `self` on ties.
    pub fn newer_of(self, other: NewestFile) -> NewestFile {
        if other.is_newer_than(&self) {
            other
        } else {
            self
        }
    }

    fn offer(&mut self, path: &Path, modified: SystemTime) {
        let candidate = Timestamp::from_system_time(modified);
        if candidate.is_newer_than(&self.modified) {
            self.path = Some(path.to_path_buf());
            self.modified = candidate;
        }
    }
}

impl fmt::Display for NewestFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} ({})", path.display(), self.modified),
            None => f.write_str("never built"),
        }
    }
}

/// Why a build step has to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StaleReason {
    /// An expected output does not exist.
    MissingOutput { path: PathBuf },
    /// The newest input is strictly newer than the newest output.
    InputNewer { input: NewestFile, output: NewestFile },
    /// The caller asked for the step to run regardless of timestamps.
    Forced,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::MissingOutput { path } => write!(f, "{} does not exist", path.display()),
            StaleReason::InputNewer { input, output } => {
                write!(f, "{} is newer than {}", input, output)
            }
            StaleReason::Forced => f.write_str("rebuild forced"),
        }
    }
}

/// Outcome of [`needs_rebuild`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum Freshness {
    Fresh,
    Stale { reason: StaleReason },
}

impl Freshness {
    pub fn stale(reason: StaleReason) -> Self {
        Freshness::Stale { reason }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Freshness::Stale { .. })
    }

    pub fn reason(&self) -> Option<&StaleReason> {
        match self {
            Freshness::Fresh => None,
            Freshness::Stale { reason } => Some(reason),
        }
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Freshness::Fresh => f.write_str("up to date"),
            Freshness::Stale { reason } => write!(f, "stale: {}", reason),
        }
    }
}

/// Outcome of [`lazy_generate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Generation {
    /// Generated files are already newer than their sources.
    Skip,
    /// Generated files are missing or out of date.
    Regenerate,
}

impl Generation {
    pub fn is_skip(&self) -> bool {
        matches!(self, Generation::Skip)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generation::Skip => f.write_str("skip generation"),
            Generation::Regenerate => f.write_str("must regenerate"),
        }
    }
}

/// Find the most recently modified file among `paths`.
///
/// Directories contribute every file beneath them. Links to files inside a
/// directory count with their target's time; links to directories are not
/// descended into, and dangling links are ignored. Missing paths are handled per
/// `policy`; if nothing resolves, the result is [`NewestFile::never`].
pub fn resolve_newest<P: AsRef<Path>>(
    paths: &[P],
    policy: MissingPolicy,
) -> Result<NewestFile, StalenessError> {
    let mut newest = NewestFile::never();

    for path in paths {
        let path = path.as_ref();

        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => match policy {
                MissingPolicy::Fatal => {
                    return Err(StalenessError::MissingPath {
                        path: path.to_path_buf(),
                    })
                }
                MissingPolicy::Warn => {
                    tracing::warn!("{} does not exist, ignoring it", path.display());
                    continue;
                }
            },
            Err(source) => {
                return Err(StalenessError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if metadata.is_dir() {
            for entry in WalkDir::new(path).follow_links(false) {
                let entry = entry.map_err(|e| StalenessError::Io {
                    path: e.path().unwrap_or(path).to_path_buf(),
                    source: e.into(),
                })?;
                let metadata = if entry.file_type().is_file() {
                    entry.metadata().map_err(|e| StalenessError::Io {
                        path: entry.path().to_path_buf(),
                        source: e.into(),
                    })?
                } else if entry.path_is_symlink() {
                    // File links count with their target's time; directory
                    // links are never descended into.
                    match fs::metadata(entry.path()) {
                        Ok(target) if target.is_file() => target,
                        Ok(_) => continue,
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {
                            tracing::debug!("ignoring dangling link {}", entry.path().display());
                            continue;
                        }
                        Err(source) => {
                            return Err(StalenessError::Io {
                                path: entry.path().to_path_buf(),
                                source,
                            })
                        }
                    }
                } else {
                    continue;
                };
                let modified = metadata
                    .modified()
                    .map_err(|source| StalenessError::Io {
                        path: entry.path().to_path_buf(),
                        source,
                    })?;
                newest.offer(entry.path(), modified);
            }
        } else {
            let modified = metadata.modified().map_err(|source| StalenessError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            newest.offer(path, modified);
        }
    }

    tracing::debug!("newest of {} path(s): {}", paths.len(), newest);
    Ok(newest)
}

/// Decide whether a step producing `outputs` must run again.
///
/// Any missing output makes the step stale. Otherwise the step is stale only
/// if `input_newest` is strictly newer than the newest output.
pub fn needs_rebuild<P: AsRef<Path>>(
    input_newest: &NewestFile,
    outputs: &[P],
) -> Result<Freshness, StalenessError> {
    if let Some(missing) = outputs.iter().map(AsRef::as_ref).find(|p| !p.exists()) {
        return Ok(Freshness::stale(StaleReason::MissingOutput {
            path: missing.to_path_buf(),
        }));
    }

    let output_newest = resolve_newest(outputs, MissingPolicy::Fatal)?;
    if input_newest.is_newer_than(&output_newest) {
        return Ok(Freshness::stale(StaleReason::InputNewer {
            input: input_newest.clone(),
            output: output_newest,
        }));
    }

    Ok(Freshness::Fresh)
}

/// Decide whether a configuration-generation step can be skipped.
///
/// Generated files may legitimately be absent on a clean checkout, so they
/// are resolved with [`MissingPolicy::Warn`]. The sources are required.
pub fn lazy_generate<S: AsRef<Path>, G: AsRef<Path>>(
    sources: &[S],
    generated: &[G],
) -> Result<Generation, StalenessError> {
    let sources_newest = resolve_newest(sources, MissingPolicy::Fatal)?;

    if generated.iter().any(|p| !p.as_ref().exists()) {
        return Ok(Generation::Regenerate);
    }

    let generated_newest = resolve_newest(generated, MissingPolicy::Warn)?;
    if generated_newest.is_newer_than(&sources_newest) {
        Ok(Generation::Skip)
    } else {
        Ok(Generation::Regenerate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(path: &Path, secs: u64) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let file = File::create(path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn ts(secs: u64) -> Timestamp {
        Timestamp::from_system_time(UNIX_EPOCH + Duration::from_secs(secs))
    }

    #[test]
    fn test_never_is_older_than_any_timestamp() {
        assert!(ts(0).is_newer_than(&Timestamp::NEVER));
        assert!(!Timestamp::NEVER.is_newer_than(&Timestamp::NEVER));
        assert!(!ts(5).is_newer_than(&ts(5)));
    }

    #[test]
    fn test_resolve_newest_picks_max() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        let c = tmp.path().join("c");
        touch(&a, 100);
        touch(&b, 300);
        touch(&c, 200);

        let newest = resolve_newest(&[&a, &b, &c], MissingPolicy::Fatal).unwrap();
        assert_eq!(newest.path.as_deref(), Some(b.as_path()));
        assert_eq!(newest.modified, ts(300));
    }

    #[test]
    fn test_resolve_newest_walks_nested_directories() {
        let tmp = TempDir::new().unwrap();
        let tree = tmp.path().join("tree");
        touch(&tree.join("top.js"), 100);
        touch(&tree.join("internal/fs/deep.js"), 400);
        touch(&tree.join("internal/other.js"), 200);

        let newest = resolve_newest(&[&tree], MissingPolicy::Fatal).unwrap();
        assert_eq!(
            newest.path.as_deref(),
            Some(tree.join("internal/fs/deep.js").as_path())
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_newest_ignores_symlinked_directories() {
        let tmp = TempDir::new().unwrap();
        let tree = tmp.path().join("tree");
        let outside = tmp.path().join("outside");
        touch(&tree.join("a.txt"), 100);
        touch(&outside.join("newer.txt"), 500);
        std::os::unix::fs::symlink(&outside, tree.join("link")).unwrap();

        let newest = resolve_newest(&[&tree], MissingPolicy::Fatal).unwrap();
        assert_eq!(newest.path.as_deref(), Some(tree.join("a.txt").as_path()));
        assert_eq!(newest.modified, ts(100));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_newest_times_file_links_through_target() {
        let tmp = TempDir::new().unwrap();
        let tree = tmp.path().join("tree");
        let real = tmp.path().join("real.h");
        touch(&tree.join("a.txt"), 100);
        touch(&real, 500);
        std::os::unix::fs::symlink(&real, tree.join("link.h")).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("gone"), tree.join("dangling")).unwrap();

        let newest = resolve_newest(&[&tree], MissingPolicy::Fatal).unwrap();
        assert_eq!(newest.path.as_deref(), Some(tree.join("link.h").as_path()));
        assert_eq!(newest.modified, ts(500));
    }

    #[test]
    fn test_resolve_newest_missing_fatal() {
        let tmp = TempDir::new().unwrap();
        let present = tmp.path().join("present");
        let missing = tmp.path().join("missing");
        touch(&present, 10);

        let err = resolve_newest(&[&present, &missing], MissingPolicy::Fatal).unwrap_err();
        match err {
            StalenessError::MissingPath { path } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_newest_missing_warn_continues() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing");
        let later = tmp.path().join("later");
        touch(&later, 50);

        let newest = resolve_newest(&[&missing, &later], MissingPolicy::Warn).unwrap();
        assert_eq!(newest.path.as_deref(), Some(later.as_path()));
    }

    #[test]
    fn test_resolve_newest_empty_is_never() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing");
        let empty_dir = tmp.path().join("empty");
        fs::create_dir(&empty_dir).unwrap();

        let newest = resolve_newest(&[&missing, &empty_dir], MissingPolicy::Warn).unwrap();
        assert!(newest.is_never());
        assert_eq!(newest, NewestFile::never());

        let none: &[PathBuf] = &[];
        assert!(resolve_newest(none, MissingPolicy::Fatal).unwrap().is_never());
    }

    #[test]
    fn test_needs_rebuild_when_input_newer() {
        let tmp = TempDir::new().unwrap();
        let configure = tmp.path().join("configure");
        let configure_py = tmp.path().join("configure.py");
        let gypi = tmp.path().join("config.gypi");
        touch(&configure, 100);
        touch(&configure_py, 90);
        touch(&gypi, 95);

        let input = resolve_newest(&[&configure, &configure_py], MissingPolicy::Fatal).unwrap();
        let freshness = needs_rebuild(&input, &[&gypi]).unwrap();
        assert!(freshness.is_stale());
        assert!(matches!(
            freshness.reason(),
            Some(StaleReason::InputNewer { .. })
        ));
    }

    #[test]
    fn test_up_to_date_when_output_newer() {
        let tmp = TempDir::new().unwrap();
        let configure = tmp.path().join("configure");
        let gypi = tmp.path().join("config.gypi");
        touch(&configure, 80);
        touch(&gypi, 100);

        let input = resolve_newest(&[&configure], MissingPolicy::Fatal).unwrap();
        assert_eq!(needs_rebuild(&input, &[&gypi]).unwrap(), Freshness::Fresh);
    }

    #[test]
    fn test_equal_timestamps_are_fresh_and_repeatable() {
        let tmp = TempDir::new().unwrap();
        let input_path = tmp.path().join("in");
        let output_path = tmp.path().join("out");
        touch(&input_path, 100);
        touch(&output_path, 100);

        let input = resolve_newest(&[&input_path], MissingPolicy::Fatal).unwrap();
        for _ in 0..2 {
            assert_eq!(
                needs_rebuild(&input, &[&output_path]).unwrap(),
                Freshness::Fresh
            );
        }
    }

    #[test]
    fn test_missing_output_always_rebuilds() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("present");
        let missing = tmp.path().join("node_snapshots.h");
        touch(&output, 1_000);

        let freshness = needs_rebuild(&NewestFile::never(), &[&output, &missing]).unwrap();
        assert_eq!(
            freshness,
            Freshness::stale(StaleReason::MissingOutput { path: missing })
        );
    }

    #[test]
    fn test_lazy_generate_skips_when_outputs_newer() {
        let tmp = TempDir::new().unwrap();
        let sources = [tmp.path().join("configure"), tmp.path().join("configure.py")];
        let generated = [tmp.path().join("config.gypi"), tmp.path().join("config.mk")];
        touch(&sources[0], 100);
        touch(&sources[1], 110);
        touch(&generated[0], 120);
        touch(&generated[1], 105);

        assert_eq!(lazy_generate(&sources, &generated).unwrap(), Generation::Skip);
    }

    #[test]
    fn test_lazy_generate_regenerates_on_tie_or_older() {
        let tmp = TempDir::new().unwrap();
        let sources = [tmp.path().join("configure")];
        let generated = [tmp.path().join("config.gypi")];
        touch(&sources[0], 100);
        touch(&generated[0], 100);

        assert_eq!(
            lazy_generate(&sources, &generated).unwrap(),
            Generation::Regenerate
        );
    }

    #[test]
    fn test_lazy_generate_regenerates_when_output_absent() {
        let tmp = TempDir::new().unwrap();
        let sources = [tmp.path().join("configure")];
        let generated = [tmp.path().join("config.gypi"), tmp.path().join("config.status")];
        touch(&sources[0], 10);
        touch(&generated[0], 1_000);

        assert_eq!(
            lazy_generate(&sources, &generated).unwrap(),
            Generation::Regenerate
        );
    }

    #[test]
    fn test_lazy_generate_requires_sources() {
        let tmp = TempDir::new().unwrap();
        let sources = [tmp.path().join("configure")];
        let generated = [tmp.path().join("config.gypi")];
        touch(&generated[0], 10);

        assert!(matches!(
            lazy_generate(&sources, &generated),
            Err(StalenessError::MissingPath { .. })
        ));
    }
}
