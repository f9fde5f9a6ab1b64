//! Preparsed core-module snapshots.
//!
//! JavaScript core modules under `lib/` are expanded, preparsed into binary
//! snapshots by a Java tool and finally bundled into a single C header,
//! `node_snapshots.h`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

use crate::builder::context::BuildContext;
use crate::builder::staleness::{needs_rebuild, resolve_newest, Freshness, MissingPolicy, NewestFile};
use crate::core::project::SnapshotLayout;
use crate::util::fs::{ensure_dir, relative_path, remove_dir_all_if_exists};
use crate::util::process::ProcessBuilder;

/// Task producing the core-module snapshot header.
pub struct SnapshotTask<'a> {
    layout: &'a SnapshotLayout,
    ctx: &'a BuildContext,
}

impl<'a> SnapshotTask<'a> {
    pub fn new(layout: &'a SnapshotLayout, ctx: &'a BuildContext) -> Self {
        SnapshotTask { layout, ctx }
    }

    /// The header this task produces.
    pub fn result(&self) -> PathBuf {
        self.layout.header_path()
    }

    /// All `.js` modules under the lib directory, relative to it, minus the
    /// excluded ones. Sorted for stable command lines.
    pub fn modules_to_snapshot(&self) -> Result<Vec<PathBuf>> {
        let lib_dir = &self.layout.lib_dir;
        if !lib_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut modules = Vec::new();
        for entry in WalkDir::new(lib_dir).follow_links(false) {
            let entry = entry.with_context(|| format!("failed to walk {}", lib_dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|e| e.to_str()) != Some("js") {
                continue;
            }
            let module = relative_path(lib_dir, entry.path());
            if !self.layout.excluded.contains(&module) {
                modules.push(module);
            }
        }

        modules.sort();
        Ok(modules)
    }

    /// Newest of the snapshotted modules and the tools that process them.
    pub fn newest_input(&self) -> Result<NewestFile> {
        let mut inputs: Vec<PathBuf> = self
            .modules_to_snapshot()?
            .iter()
            .map(|m| self.layout.lib_dir.join(m))
            .collect();
        inputs.extend(self.layout.tool_inputs.iter().cloned());

        Ok(resolve_newest(&inputs, MissingPolicy::Warn)?)
    }

    /// Whether the header must be regenerated, given the newest input of
    /// everything upstream of this task.
    pub fn needs_build(&self, upstream: &NewestFile) -> Result<Freshness> {
        let newest = self.newest_input()?.newer_of(upstream.clone());
        Ok(needs_rebuild(&newest, &[self.result()])?)
    }

    /// Expand, preparse and bundle the core modules.
    pub fn build(&self) -> Result<()> {
        let main_class = match self.layout.main_class {
            Some(ref main_class) => main_class,
            None => bail!(
                "snapshot tool main class is not set\n\
                 \n\
                 Set `main-class` in the [snapshot] section of NodeBuild.toml."
            ),
        };

        let modules = self.modules_to_snapshot()?;
        let output_dir = &self.layout.output_dir;
        let output_lib = output_dir.join("lib");
        ensure_dir(&output_lib)?;

        let lib_rel = relative_path(&self.ctx.root, &self.layout.lib_dir);

        // ETW tracing stays on by default on Windows; everywhere else the
        // trace macros compile to nothing.
        let mut macro_files = vec![self.layout.check_macros.clone()];
        if !self.ctx.platform.is_windows() {
            macro_files.push(self.layout.notrace_macros.clone());
        }

        tracing::info!("Expanding {} core modules", modules.len());
        ProcessBuilder::new(&self.ctx.tools.python)
            .arg(&self.layout.expand_script)
            .arg(output_dir)
            .args(modules.iter().map(|m| lib_rel.join(m)))
            .args(&macro_files)
            .cwd(&self.ctx.root)
            .run()?;

        tracing::info!("Preparsing core modules");
        let classpath = std::env::join_paths(&self.layout.classpath)
            .context("invalid snapshot tool classpath")?;
        ProcessBuilder::new(java_binary(self.ctx.require_java_home()?))
            .arg("-cp")
            .arg(classpath)
            .arg(main_class)
            .arg("--binary")
            .arg(prefixed("--outdir=", &output_lib))
            .arg(prefixed("--indir=", &output_lib))
            .args(modules.iter().map(|m| prefixed("--file=", m)))
            .cwd(&output_lib)
            .run()?;

        tracing::info!("Writing {}", self.result().display());
        ProcessBuilder::new(&self.ctx.tools.python)
            .arg(&self.layout.snapshot2c_script)
            .arg("node_snapshots.h")
            .args(modules.iter().map(|m| binary_name(m)))
            .cwd(output_dir)
            .run()
    }

    /// Remove the snapshot output directory, unless cleaning ahead of a build.
    pub fn clean(&self, for_build: bool) -> Result<()> {
        if for_build {
            return Ok(());
        }
        remove_dir_all_if_exists(&self.layout.output_dir)
    }
}

fn java_binary(java_home: &Path) -> PathBuf {
    let name = if cfg!(windows) { "java.exe" } else { "java" };
    java_home.join("bin").join(name)
}

fn prefixed(prefix: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(prefix);
    arg.push(path);
    arg
}

/// `lib/<module>.bin`, relative to the output directory.
fn binary_name(module: &Path) -> PathBuf {
    let mut name = Path::new("lib").join(module).into_os_string();
    name.push(".bin");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::context::Tools;
    use crate::builder::platform::Platform;
    use crate::builder::staleness::{StaleReason, Timestamp};
    use crate::core::project::{BuildMode, Project};
    use std::fs::{self, File};
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    fn touch(path: &Path, secs: u64) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path)
            .unwrap()
            .set_modified(UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn fixture(root: &Path) -> (Project, BuildContext) {
        let manifest = root.join("NodeBuild.toml");
        fs::write(
            &manifest,
            "[project]\nname = \"nodejs\"\n[snapshot]\ntool-inputs = [\"tools/js2c.py\"]\n",
        )
        .unwrap();
        let project = Project::load(&manifest).unwrap();
        let ctx = BuildContext {
            root: root.to_path_buf(),
            mode: BuildMode::Release,
            jobs: 1,
            verbose: false,
            platform: Platform::Unix,
            tools: Tools {
                python: PathBuf::from("python3"),
                make: PathBuf::from("make"),
                ninja: PathBuf::from("ninja"),
            },
            java_home: Some(PathBuf::from("/jdk")),
            devkit: None,
        };
        (project, ctx)
    }

    #[test]
    fn test_modules_to_snapshot_skips_excluded_and_non_js() {
        let tmp = TempDir::new().unwrap();
        let (project, ctx) = fixture(tmp.path());
        let lib = tmp.path().join("lib");
        touch(&lib.join("fs.js"), 1);
        touch(&lib.join("vm.js"), 1);
        touch(&lib.join("README.md"), 1);
        touch(&lib.join("internal/fs/dir.js"), 1);
        touch(&lib.join("internal/fs/utils.js"), 1);

        let task = SnapshotTask::new(project.snapshot().unwrap(), &ctx);
        let modules = task.modules_to_snapshot().unwrap();
        assert_eq!(
            modules,
            vec![PathBuf::from("fs.js"), PathBuf::from("internal/fs/utils.js")]
        );
    }

    #[test]
    fn test_needs_build_when_header_missing() {
        let tmp = TempDir::new().unwrap();
        let (project, ctx) = fixture(tmp.path());
        touch(&tmp.path().join("lib/fs.js"), 100);

        let task = SnapshotTask::new(project.snapshot().unwrap(), &ctx);
        let freshness = task.needs_build(&NewestFile::never()).unwrap();
        assert!(matches!(
            freshness.reason(),
            Some(StaleReason::MissingOutput { .. })
        ));
    }

    #[test]
    fn test_needs_build_tracks_module_and_upstream_timestamps() {
        let tmp = TempDir::new().unwrap();
        let (project, ctx) = fixture(tmp.path());
        // The manifest itself is not a tool input in this fixture.
        touch(&tmp.path().join("lib/fs.js"), 100);
        touch(&tmp.path().join("tools/js2c.py"), 50);
        let header = tmp.path().join("out/snapshots/node_snapshots.h");
        touch(&header, 200);

        let task = SnapshotTask::new(project.snapshot().unwrap(), &ctx);
        assert_eq!(
            task.needs_build(&NewestFile::never()).unwrap(),
            Freshness::Fresh
        );

        let upstream = NewestFile {
            path: Some(tmp.path().join("upstream.jar")),
            modified: Timestamp::from_system_time(UNIX_EPOCH + Duration::from_secs(300)),
        };
        assert!(task.needs_build(&upstream).unwrap().is_stale());

        touch(&tmp.path().join("lib/fs.js"), 250);
        assert!(task.needs_build(&NewestFile::never()).unwrap().is_stale());
    }

    #[test]
    fn test_build_requires_main_class() {
        let tmp = TempDir::new().unwrap();
        let (project, ctx) = fixture(tmp.path());
        let task = SnapshotTask::new(project.snapshot().unwrap(), &ctx);

        let err = task.build().unwrap_err();
        assert!(err.to_string().contains("main class is not set"));
    }

    #[test]
    fn test_clean_removes_output_dir() {
        let tmp = TempDir::new().unwrap();
        let (project, ctx) = fixture(tmp.path());
        let header = tmp.path().join("out/snapshots/node_snapshots.h");
        touch(&header, 1);
        let task = SnapshotTask::new(project.snapshot().unwrap(), &ctx);

        task.clean(true).unwrap();
        assert!(header.exists());
        task.clean(false).unwrap();
        assert!(!tmp.path().join("out/snapshots").exists());
    }

    #[test]
    fn test_binary_name() {
        assert_eq!(
            binary_name(Path::new("internal/fs/utils.js")),
            PathBuf::from("lib/internal/fs/utils.js.bin")
        );
    }
}
