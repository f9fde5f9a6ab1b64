//! Project manifest (`NodeBuild.toml`) and resolved project layout.
//!
//! The manifest lives at the root of the Node.js source tree. Every path in
//! it is relative to that root.
//!
//! ```toml
//! [project]
//! name = "nodejs"
//!
//! [configure]
//! sources = ["configure", "configure.py"]
//!
//! [native]
//! results = ["out/{mode}/node"]
//!
//! [java]
//! classpath = ["dists/trufflenode.jar"]
//! truffle-node-jar = "dists/trufflenode.jar"
//!
//! [snapshot]
//! output-dir = "out/snapshots"
//! classpath = ["dists/snapshot-tool.jar"]
//! main-class = "org.example.SnapshotTool"
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Manifest file name.
pub const MANIFEST_NAME: &str = "NodeBuild.toml";

/// Placeholder in result paths replaced by the build mode directory.
const MODE_PLACEHOLDER: &str = "{mode}";

/// Errors locating a project.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("could not find NodeBuild.toml in {} or any parent directory", dir.display())]
    NotFound { dir: PathBuf },
}

/// Release or debug build of the native tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum BuildMode {
    #[default]
    Release,
    Debug,
}

impl BuildMode {
    pub fn from_debug(debug: bool) -> Self {
        if debug {
            BuildMode::Debug
        } else {
            BuildMode::Release
        }
    }

    /// Output directory name under `out/`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Release => "Release",
            BuildMode::Debug => "Debug",
        }
    }

    pub fn is_debug(&self) -> bool {
        matches!(self, BuildMode::Debug)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "release" => Ok(BuildMode::Release),
            "debug" => Ok(BuildMode::Debug),
            other => Err(format!("unknown build mode `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawManifest {
    project: ProjectSection,
    #[serde(default)]
    configure: ConfigureSection,
    #[serde(default)]
    native: NativeSection,
    snapshot: Option<SnapshotSection>,
    #[serde(default)]
    java: JavaSection,
}

#[derive(Debug, Clone, Deserialize)]
struct ProjectSection {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct ConfigureSection {
    script: String,
    sources: Vec<String>,
    generated: Vec<String>,
    extra_args: Vec<String>,
}

impl Default for ConfigureSection {
    fn default() -> Self {
        ConfigureSection {
            script: "configure".to_string(),
            sources: strings(&["configure", "configure.py"]),
            generated: strings(&[
                "config.gypi",
                "config.status",
                "configure.pyc",
                "config.mk",
                "icu_config.gypi",
            ]),
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct NativeSection {
    results: Vec<String>,
    headers_dir: String,
    install_script: String,
}

impl Default for NativeSection {
    fn default() -> Self {
        NativeSection {
            results: strings(&["out/{mode}/node"]),
            headers_dir: "out/headers".to_string(),
            install_script: "tools/install.py".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct SnapshotSection {
    lib_dir: String,
    output_dir: String,
    excluded: Vec<String>,
    tool_inputs: Vec<String>,
    expand_script: String,
    snapshot2c_script: String,
    check_macros: String,
    notrace_macros: String,
    classpath: Vec<String>,
    main_class: Option<String>,
}

impl Default for SnapshotSection {
    fn default() -> Self {
        SnapshotSection {
            lib_dir: "lib".to_string(),
            output_dir: "out/snapshots".to_string(),
            // Modules using top-level `await`/`yield` the snapshot tool cannot parse.
            excluded: strings(&[
                "_stream_readable.js",
                "assert.js",
                "internal/fs/dir.js",
                "internal/fs/promises.js",
                "internal/modules/cjs/loader.js",
                "internal/modules/esm/loader.js",
                "internal/modules/esm/module_job.js",
                "internal/modules/esm/translators.js",
                "internal/process/esm_loader.js",
                "internal/process/execution.js",
                "internal/readline/utils.js",
                "internal/streams/buffer_list.js",
                "internal/streams/from.js",
                "internal/vm/source_text_module.js",
                "repl.js",
                "vm.js",
            ]),
            tool_inputs: strings(&[
                MANIFEST_NAME,
                "tools/js2c.py",
                "tools/expand-js-modules.py",
                "tools/snapshot2c.py",
                "tools/js2c_macros/check_macros.py",
                "tools/js2c_macros/notrace_macros.py",
            ]),
            expand_script: "tools/expand-js-modules.py".to_string(),
            snapshot2c_script: "tools/snapshot2c.py".to_string(),
            check_macros: "tools/js2c_macros/check_macros.py".to_string(),
            notrace_macros: "tools/js2c_macros/notrace_macros.py".to_string(),
            classpath: Vec::new(),
            main_class: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct JavaSection {
    home: Option<String>,
    classpath: Vec<String>,
    truffle_node_jar: Option<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Resolved layout of the core-module snapshot step.
#[derive(Debug, Clone)]
pub struct SnapshotLayout {
    pub lib_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Module paths relative to `lib_dir` that must not be snapshotted.
    pub excluded: BTreeSet<PathBuf>,
    pub tool_inputs: Vec<PathBuf>,
    pub expand_script: PathBuf,
    pub snapshot2c_script: PathBuf,
    pub check_macros: PathBuf,
    pub notrace_macros: PathBuf,
    pub classpath: Vec<PathBuf>,
    pub main_class: Option<String>,
}

impl SnapshotLayout {
    /// The generated header, the single result of the snapshot step.
    pub fn header_path(&self) -> PathBuf {
        self.output_dir.join("node_snapshots.h")
    }
}

/// A loaded project.
#[derive(Debug, Clone)]
pub struct Project {
    name: String,
    root: PathBuf,
    configure_script: PathBuf,
    config_sources: Vec<PathBuf>,
    generated_config: Vec<PathBuf>,
    configure_args: Vec<String>,
    results: Vec<String>,
    headers_dir: PathBuf,
    install_script: PathBuf,
    snapshot: Option<SnapshotLayout>,
    java_home: Option<PathBuf>,
    java_classpath: Vec<PathBuf>,
    truffle_node_jar: Option<PathBuf>,
}

impl Project {
    /// Load a project from its manifest path.
    pub fn load(manifest_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(manifest_path)
            .with_context(|| format!("failed to read manifest: {}", manifest_path.display()))?;

        Self::parse(&content, manifest_path)
    }

    /// Parse manifest content.
    pub fn parse(content: &str, manifest_path: &Path) -> Result<Self> {
        let raw: RawManifest = toml::from_str(content)
            .with_context(|| format!("failed to parse {}", manifest_path.display()))?;

        if raw.project.name.trim().is_empty() {
            bail!("project name in {} must not be empty", manifest_path.display());
        }
        if raw.configure.sources.is_empty() {
            bail!(
                "[configure] sources in {} must list at least one file",
                manifest_path.display()
            );
        }

        let root = manifest_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        let join_all = |items: &[String]| -> Vec<PathBuf> {
            items.iter().map(|item| root.join(item)).collect()
        };

        let snapshot = raw.snapshot.map(|s| SnapshotLayout {
            lib_dir: root.join(&s.lib_dir),
            output_dir: root.join(&s.output_dir),
            excluded: s.excluded.iter().map(PathBuf::from).collect(),
            tool_inputs: join_all(&s.tool_inputs),
            expand_script: root.join(&s.expand_script),
            snapshot2c_script: root.join(&s.snapshot2c_script),
            check_macros: root.join(&s.check_macros),
            notrace_macros: root.join(&s.notrace_macros),
            classpath: join_all(&s.classpath),
            main_class: s.main_class,
        });

        Ok(Project {
            name: raw.project.name,
            configure_script: root.join(&raw.configure.script),
            config_sources: join_all(&raw.configure.sources),
            generated_config: join_all(&raw.configure.generated),
            configure_args: raw.configure.extra_args,
            results: raw.native.results,
            headers_dir: root.join(&raw.native.headers_dir),
            install_script: root.join(&raw.native.install_script),
            snapshot,
            java_home: raw.java.home.map(|home| root.join(home)),
            java_classpath: join_all(&raw.java.classpath),
            truffle_node_jar: raw.java.truffle_node_jar.map(|jar| root.join(jar)),
            root,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory containing the manifest.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `configure` script.
    pub fn configure_script(&self) -> &Path {
        &self.configure_script
    }

    /// Files that drive configuration generation.
    pub fn config_sources(&self) -> &[PathBuf] {
        &self.config_sources
    }

    /// Files produced by `configure`.
    pub fn generated_config(&self) -> &[PathBuf] {
        &self.generated_config
    }

    /// Additional arguments passed to `configure`.
    pub fn configure_args(&self) -> &[String] {
        &self.configure_args
    }

    /// Native build results for `mode`.
    pub fn results(&self, mode: BuildMode) -> Vec<PathBuf> {
        self.results
            .iter()
            .map(|r| self.root.join(r.replace(MODE_PLACEHOLDER, mode.as_str())))
            .collect()
    }

    /// `out/<Mode>` under the root.
    pub fn build_dir(&self, mode: BuildMode) -> PathBuf {
        self.root.join("out").join(mode.as_str())
    }

    pub fn node_binary(&self, mode: BuildMode) -> PathBuf {
        let name = if cfg!(windows) { "node.exe" } else { "node" };
        self.build_dir(mode).join(name)
    }

    /// Where headers for native add-ons are installed.
    pub fn headers_dir(&self) -> &Path {
        &self.headers_dir
    }

    pub fn install_script(&self) -> &Path {
        &self.install_script
    }

    pub fn snapshot(&self) -> Option<&SnapshotLayout> {
        self.snapshot.as_ref()
    }

    /// The Java home from the manifest, else from `JAVA_HOME`.
    pub fn java_home(&self) -> Result<PathBuf> {
        if let Some(ref home) = self.java_home {
            return Ok(home.clone());
        }
        match std::env::var_os("JAVA_HOME") {
            Some(home) if !home.is_empty() => Ok(PathBuf::from(home)),
            _ => bail!(
                "no Java home configured\n\
                 \n\
                 Set `home` in the [java] section of {} or export JAVA_HOME.",
                MANIFEST_NAME
            ),
        }
    }

    /// Classpath of the JS engine that the built `node` loads into its JVM.
    pub fn java_classpath(&self) -> &[PathBuf] {
        &self.java_classpath
    }

    pub fn truffle_node_jar(&self) -> Option<&Path> {
        self.truffle_node_jar.as_deref()
    }
}

/// Find the manifest in `start` or any parent directory.
pub fn find_manifest(start: &Path) -> Result<PathBuf, ProjectError> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(MANIFEST_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
        if !current.pop() {
            return Err(ProjectError::NotFound {
                dir: start.to_path_buf(),
            });
        }
    }
}
