//! Running programs in the node environment: the built `node`, `npm` and
//! `node-gyp`, the Node.js test runner, and `make`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::builder::context::Tools;
use crate::builder::Platform;
use crate::core::project::{BuildMode, Project};
use crate::util::config::Config;
use crate::util::env::{BuildEnv, PATH_SEPARATOR};
use crate::util::process::ProcessBuilder;

/// JVM options every test run starts with.
const TEST_JVM_OPTIONS: [&str; 4] = ["-ea", "-esa", "-Xrs", "-Xmx8g"];

/// Which program to run in the node environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launcher {
    Node,
    Npm,
    NodeGyp,
    /// `tools/test.py` against the built binary
    TestNode,
    /// `make` in the source root
    MakeInEnv,
}

impl Launcher {
    /// Script passed to `node` ahead of the user's arguments.
    fn script(&self, root: &Path) -> Option<PathBuf> {
        let npm = root.join("deps").join("npm");
        match self {
            Launcher::Npm => Some(npm.join("bin").join("npm-cli.js")),
            Launcher::NodeGyp => Some(
                npm.join("node_modules")
                    .join("node-gyp")
                    .join("bin")
                    .join("node-gyp.js"),
            ),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Launcher::Node => "node",
            Launcher::Npm => "npm",
            Launcher::NodeGyp => "node-gyp",
            Launcher::TestNode => "test-node",
            Launcher::MakeInEnv => "make-in-env",
        }
    }
}

/// Options for launching the built binary.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Which build of `node` to run
    pub mode: BuildMode,

    /// Options for the embedded JVM
    pub vm_args: Vec<String>,
}

/// Library search path for the JVM libraries under `java_home`.
pub fn library_path(java_home: &Path, platform: Platform) -> OsString {
    let jre_lib = java_home.join("jre").join("lib");
    let jre_lib = match platform {
        Platform::MacOs => jre_lib,
        _ => jre_lib.join(jvm_arch_dir(std::env::consts::ARCH)),
    };

    let mut path = OsString::from(jre_lib);
    path.push(":");
    path.push(java_home.join("lib"));
    path
}

/// Directory name the JRE uses for a Rust target architecture.
fn jvm_arch_dir(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "sparc64" => "sparcv9",
        "x86" => "i386",
        other => other,
    }
}

/// Environment shared by everything run in the node environment.
fn node_env(project: &Project, platform: Platform, mut env: BuildEnv) -> Result<BuildEnv> {
    let java_home = project.java_home()?;
    env.prepend_list("LD_LIBRARY_PATH", library_path(&java_home, platform), ":");
    env.set("JAVA_HOME", &java_home);
    env.set_opt("TRUFFLENODE_JAR_PATH", project.truffle_node_jar());

    for entry in project.java_classpath() {
        env.append_list("NODE_JVM_CLASSPATH", entry, PATH_SEPARATOR);
    }
    if !env.contains("NODE_JVM_CLASSPATH") {
        tracing::warn!(
            "no JVM classpath configured, set `classpath` in the [java] section of NodeBuild.toml"
        );
    }
    Ok(env)
}

/// Build the command that runs `launcher` with `args`.
pub fn launch_command(
    project: &Project,
    config: &Config,
    launcher: Launcher,
    opts: &LaunchOptions,
    args: &[String],
) -> Result<ProcessBuilder> {
    let tools = Tools::from_config(config);
    command_for(
        project,
        &tools,
        Platform::current(),
        BuildEnv::inherit(),
        launcher,
        opts,
        args,
    )
}

fn command_for(
    project: &Project,
    tools: &Tools,
    platform: Platform,
    env: BuildEnv,
    launcher: Launcher,
    opts: &LaunchOptions,
    args: &[String],
) -> Result<ProcessBuilder> {
    if launcher == Launcher::MakeInEnv && platform.is_windows() {
        bail!("`{}` is not supported on Windows", launcher.name());
    }

    let node = project.node_binary(opts.mode);
    if launcher != Launcher::MakeInEnv && !node.exists() {
        bail!(
            "{} does not exist\n\
             \n\
             Build it first with `nodebuild build{}`.",
            node.display(),
            if opts.mode.is_debug() { " --debug" } else { "" }
        );
    }

    let mut env = node_env(project, platform, env)?;
    let cmd = match launcher {
        Launcher::Node | Launcher::Npm | Launcher::NodeGyp => {
            env.set("NODE_JVM_OPTIONS", opts.vm_args.join(" "));
            let mut cmd = ProcessBuilder::new(node);
            if let Some(script) = launcher.script(project.root()) {
                cmd = cmd.arg(script);
            }
            cmd.args(args)
        }
        Launcher::TestNode => {
            let mut jvm_options: Vec<String> =
                TEST_JVM_OPTIONS.iter().map(|s| s.to_string()).collect();
            jvm_options.extend(opts.vm_args.iter().cloned());
            env.set("NODE_JVM_OPTIONS", jvm_options.join(" "));
            env.set("NODE_STACK_SIZE", "4000000");
            env.set("NODE_INTERNAL_ERROR_CHECK", "true");

            let mut cmd = ProcessBuilder::new(&tools.python)
                .arg(project.root().join("tools").join("test.py"))
                .args(args);
            if opts.mode.is_debug() {
                cmd = cmd.args(["-m", "debug"]);
            }
            cmd.cwd(project.root())
        }
        Launcher::MakeInEnv => {
            env.set("NODE_JVM_OPTIONS", opts.vm_args.join(" "));
            ProcessBuilder::new(&tools.make)
                .args(args)
                .cwd(project.root())
        }
    };
    Ok(cmd.build_env(&env))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::fs;
    use tempfile::TempDir;

    fn project(root: &Path) -> Project {
        let manifest = root.join("NodeBuild.toml");
        fs::write(
            &manifest,
            "[project]\nname = \"nodejs\"\n\
             [java]\nhome = \"jdk\"\nclasspath = [\"dists/trufflenode.jar\"]\n\
             truffle-node-jar = \"dists/trufflenode.jar\"\n",
        )
        .unwrap();
        Project::load(&manifest).unwrap()
    }

    fn built(project: &Project, mode: BuildMode) {
        let node = project.node_binary(mode);
        fs::create_dir_all(node.parent().unwrap()).unwrap();
        fs::write(&node, "").unwrap();
    }

    fn tools() -> Tools {
        Tools {
            python: PathBuf::from("/usr/bin/python3"),
            make: PathBuf::from("/usr/bin/gmake"),
            ninja: PathBuf::from("ninja"),
        }
    }

    fn var<'a>(cmd: &'a ProcessBuilder, name: &str) -> Option<&'a str> {
        cmd.get_env().unwrap().get(name).and_then(OsStr::to_str)
    }

    #[test]
    fn test_library_path() {
        let path = library_path(Path::new("/jdk"), Platform::MacOs);
        assert_eq!(path, "/jdk/jre/lib:/jdk/lib");

        let path = library_path(Path::new("/jdk"), Platform::Unix);
        let path = path.to_str().unwrap();
        assert!(path.starts_with("/jdk/jre/lib/"));
        assert!(path.ends_with(":/jdk/lib"));
    }

    #[test]
    fn test_arch_dir() {
        assert_eq!(jvm_arch_dir("x86_64"), "amd64");
        assert_eq!(jvm_arch_dir("aarch64"), "aarch64");
    }

    #[test]
    fn test_npm_command() {
        let tmp = TempDir::new().unwrap();
        let project = project(tmp.path());
        built(&project, BuildMode::Release);

        let mut inherited = BuildEnv::new();
        inherited.set("LD_LIBRARY_PATH", "/usr/local/lib");
        let opts = LaunchOptions {
            mode: BuildMode::Release,
            vm_args: vec!["-Xmx2g".to_string(), "-ea".to_string()],
        };
        let cmd = command_for(
            &project,
            &tools(),
            Platform::MacOs,
            inherited,
            Launcher::Npm,
            &opts,
            &["install".to_string()],
        )
        .unwrap();

        assert_eq!(cmd.get_program(), project.node_binary(BuildMode::Release));
        assert!(Path::new(&cmd.get_args()[0]).ends_with("deps/npm/bin/npm-cli.js"));
        assert_eq!(cmd.get_args()[1], "install");
        assert_eq!(var(&cmd, "NODE_JVM_OPTIONS"), Some("-Xmx2g -ea"));

        let jdk = tmp.path().join("jdk");
        assert_eq!(
            var(&cmd, "LD_LIBRARY_PATH").unwrap(),
            format!(
                "{}:{}:/usr/local/lib",
                jdk.join("jre/lib").display(),
                jdk.join("lib").display()
            )
        );
    }

    #[test]
    fn test_jvm_classpath_extends_inherited_value() {
        let tmp = TempDir::new().unwrap();
        let project = project(tmp.path());
        built(&project, BuildMode::Release);

        let mut inherited = BuildEnv::new();
        inherited.set("NODE_JVM_CLASSPATH", "/opt/extra.jar");
        let cmd = command_for(
            &project,
            &tools(),
            Platform::Unix,
            inherited,
            Launcher::Node,
            &LaunchOptions::default(),
            &[],
        )
        .unwrap();

        let jar = tmp.path().join("dists").join("trufflenode.jar");
        assert_eq!(
            var(&cmd, "NODE_JVM_CLASSPATH").unwrap(),
            format!("/opt/extra.jar{}{}", PATH_SEPARATOR, jar.display())
        );
        assert_eq!(
            var(&cmd, "TRUFFLENODE_JAR_PATH").unwrap(),
            jar.display().to_string()
        );
        assert!(cmd.get_args().is_empty());
    }

    #[test]
    fn test_test_node_command() {
        let tmp = TempDir::new().unwrap();
        let project = project(tmp.path());
        built(&project, BuildMode::Debug);

        let opts = LaunchOptions {
            mode: BuildMode::Debug,
            vm_args: vec!["-Dtruffle.js.Strict=true".to_string()],
        };
        let cmd = command_for(
            &project,
            &tools(),
            Platform::Unix,
            BuildEnv::new(),
            Launcher::TestNode,
            &opts,
            &["parallel".to_string()],
        )
        .unwrap();

        assert_eq!(cmd.get_program(), Path::new("/usr/bin/python3"));
        assert_eq!(
            cmd.get_args()[0],
            tmp.path().join("tools").join("test.py").into_os_string()
        );
        assert_eq!(cmd.get_args()[1..], ["parallel", "-m", "debug"]);
        assert_eq!(cmd.get_cwd(), Some(tmp.path()));
        assert_eq!(
            var(&cmd, "NODE_JVM_OPTIONS"),
            Some("-ea -esa -Xrs -Xmx8g -Dtruffle.js.Strict=true")
        );
        assert_eq!(var(&cmd, "NODE_STACK_SIZE"), Some("4000000"));
        assert_eq!(var(&cmd, "NODE_INTERNAL_ERROR_CHECK"), Some("true"));
    }

    #[test]
    fn test_make_in_env_command() {
        let tmp = TempDir::new().unwrap();
        let project = project(tmp.path());

        let opts = LaunchOptions {
            mode: BuildMode::Release,
            vm_args: vec!["-Xss2m".to_string()],
        };
        let cmd = command_for(
            &project,
            &tools(),
            Platform::Unix,
            BuildEnv::new(),
            Launcher::MakeInEnv,
            &opts,
            &["test-addons".to_string()],
        )
        .unwrap();

        assert_eq!(cmd.get_program(), Path::new("/usr/bin/gmake"));
        assert_eq!(cmd.get_args(), ["test-addons"]);
        assert_eq!(cmd.get_cwd(), Some(tmp.path()));
        assert_eq!(var(&cmd, "NODE_JVM_OPTIONS"), Some("-Xss2m"));
        assert!(var(&cmd, "NODE_JVM_CLASSPATH").is_some());
    }

    #[test]
    fn test_make_in_env_rejected_on_windows() {
        let tmp = TempDir::new().unwrap();
        let project = project(tmp.path());

        let err = command_for(
            &project,
            &tools(),
            Platform::Windows,
            BuildEnv::new(),
            Launcher::MakeInEnv,
            &LaunchOptions::default(),
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("not supported on Windows"));
    }

    #[test]
    fn test_missing_binary() {
        let tmp = TempDir::new().unwrap();
        let project = project(tmp.path());
        let opts = LaunchOptions {
            mode: BuildMode::Debug,
            vm_args: Vec::new(),
        };

        let err = command_for(
            &project,
            &tools(),
            Platform::Unix,
            BuildEnv::new(),
            Launcher::Node,
            &opts,
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("nodebuild build --debug"));
    }
}
