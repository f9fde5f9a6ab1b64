//! Platform build strategies.
//!
//! POSIX hosts build with GNU make; Windows builds with ninja against a
//! Visual Studio devkit. Each strategy provides the same capabilities:
//! extra configure flags, environment preparation, build, clean and an
//! optional post-build fixup.

use std::fmt;

use anyhow::Result;
use serde::Serialize;

use crate::builder::context::BuildContext;
use crate::util::env::BuildEnv;
use crate::util::process::{find_executable, ProcessBuilder};

/// Host platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Unix,
    MacOs,
    Windows,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Unix
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Platform::Windows)
    }

    /// Build strategy for this platform.
    pub fn strategy(&self) -> Box<dyn PlatformStrategy> {
        match self {
            Platform::Unix => Box::new(PosixStrategy { macos: false }),
            Platform::MacOs => Box::new(PosixStrategy { macos: true }),
            Platform::Windows => Box::new(WindowsStrategy),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Unix => "unix",
            Platform::MacOs => "macos",
            Platform::Windows => "windows",
        };
        f.write_str(name)
    }
}

/// Platform-specific parts of the native build.
pub trait PlatformStrategy {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Flags appended to the `configure` invocation.
    fn configure_flags(&self) -> Vec<String>;

    /// Adjust the build environment before `configure` runs.
    fn prepare_env(&self, ctx: &BuildContext, env: &mut BuildEnv);

    /// The command that compiles the configured tree.
    fn build_command(&self, ctx: &BuildContext, env: &BuildEnv) -> ProcessBuilder;

    /// The command that removes build outputs, if there is anything to clean.
    fn clean_command(&self, ctx: &BuildContext) -> Option<ProcessBuilder>;

    /// Run after a build that produced new results.
    fn post_build(&self, _ctx: &BuildContext, _env: &BuildEnv) -> Result<()> {
        Ok(())
    }

    fn build(&self, ctx: &BuildContext, env: &BuildEnv) -> Result<()> {
        self.build_command(ctx, env).run()
    }

    /// Clean build outputs. Failures are reported but never fatal.
    fn clean(&self, ctx: &BuildContext) -> Result<()> {
        let Some(cmd) = self.clean_command(ctx) else {
            return Ok(());
        };
        match cmd.status() {
            Ok(status) if status.success() => {}
            Ok(status) => {
                tracing::warn!(
                    "`{}` exited with {:?}",
                    cmd.display_command(),
                    status.code()
                );
            }
            Err(e) => tracing::warn!("{:#}", e),
        }
        Ok(())
    }
}

/// GNU make on Linux, macOS and other Unix hosts.
#[derive(Debug, Clone, Copy)]
pub struct PosixStrategy {
    macos: bool,
}

impl PlatformStrategy for PosixStrategy {
    fn name(&self) -> &'static str {
        if self.macos {
            "macos"
        } else {
            "posix"
        }
    }

    fn configure_flags(&self) -> Vec<String> {
        Vec::new()
    }

    fn prepare_env(&self, _ctx: &BuildContext, _env: &mut BuildEnv) {}

    fn build_command(&self, ctx: &BuildContext, env: &BuildEnv) -> ProcessBuilder {
        let verbose = format!("V={}", if ctx.verbose { "1" } else { "" });
        ProcessBuilder::new(&ctx.tools.make)
            .arg(format!("-j{}", ctx.jobs))
            .arg(verbose)
            .cwd(&ctx.root)
            .build_env(env)
    }

    fn clean_command(&self, ctx: &BuildContext) -> Option<ProcessBuilder> {
        Some(
            ProcessBuilder::new(&ctx.tools.make)
                .arg("clean")
                .cwd(&ctx.root),
        )
    }

    /// On macOS the launcher needs rpaths into the Java home.
    fn post_build(&self, ctx: &BuildContext, env: &BuildEnv) -> Result<()> {
        if !self.macos {
            return Ok(());
        }
        let java_home = ctx.require_java_home()?;
        ProcessBuilder::new("install_name_tool")
            .arg("-add_rpath")
            .arg(java_home.join("jre").join("lib"))
            .arg("-add_rpath")
            .arg(java_home.join("lib"))
            .arg(ctx.build_dir().join("node"))
            .cwd(&ctx.root)
            .build_env(env)
            .run()
    }
}

/// ninja with a Visual Studio devkit.
#[derive(Debug, Clone, Copy)]
pub struct WindowsStrategy;

impl PlatformStrategy for WindowsStrategy {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn configure_flags(&self) -> Vec<String> {
        ["--ninja", "--dest-cpu=x64", "--without-etw", "--without-snapshot"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn prepare_env(&self, ctx: &BuildContext, env: &mut BuildEnv) {
        if let Some(ref devkit) = ctx.devkit {
            let root = devkit.root.display().to_string();
            env.set("GYP_MSVS_OVERRIDE_PATH", root.as_str());
            env.set_opt("GYP_MSVS_VERSION", devkit.version.clone());
            env.prepend_path("PATH", devkit.root.join("VC").join("bin").join("x64"));
            env.set("WINDOWSSDKDIR", devkit.root.join("10"));

            let include = [
                r"VC\include",
                r"VC\atlmfc\include",
                r"10\include\shared",
                r"10\include\ucrt",
                r"10\include\um",
                r"10\include\winrt",
            ]
            .iter()
            .map(|dir| format!(r"{}\{}", root, dir))
            .collect::<Vec<_>>()
            .join(";");
            let lib = [r"VC\lib\x64", r"VC\atlmfc\lib\x64", r"10\lib\x64"]
                .iter()
                .map(|dir| format!(r"{}\{}", root, dir))
                .collect::<Vec<_>>()
                .join(";");

            env.prepend_list("INCLUDE", include, ";");
            env.prepend_list("LIB", lib, ";");
        }

        // ninja and nasm must be reachable from the generated build files.
        if let Some(dir) = ctx.tools.ninja.parent().filter(|d| !d.as_os_str().is_empty()) {
            env.append_path("PATH", dir);
        }
        if let Some(nasm) = find_executable("nasm") {
            if let Some(dir) = nasm.parent() {
                env.append_path("PATH", dir);
            }
        }
    }

    fn build_command(&self, ctx: &BuildContext, env: &BuildEnv) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(&ctx.tools.ninja);
        if ctx.verbose {
            cmd = cmd.arg("-v");
        }
        cmd.arg(format!("-j{}", ctx.jobs))
            .arg("-C")
            .arg(ctx.build_dir())
            .cwd(&ctx.root)
            .build_env(env)
    }

    fn clean_command(&self, ctx: &BuildContext) -> Option<ProcessBuilder> {
        let build_dir = ctx.build_dir();
        if !build_dir.exists() {
            return None;
        }
        Some(
            ProcessBuilder::new(&ctx.tools.ninja)
                .arg("-C")
                .arg(build_dir)
                .args(["-t", "clean"])
                .cwd(&ctx.root),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::context::{Devkit, Tools};
    use crate::core::project::BuildMode;
    use std::path::PathBuf;

    fn ctx(platform: Platform) -> BuildContext {
        BuildContext {
            root: PathBuf::from("/suite"),
            mode: BuildMode::Release,
            jobs: 8,
            verbose: false,
            platform,
            tools: Tools {
                python: PathBuf::from("python3"),
                make: PathBuf::from("gmake"),
                ninja: PathBuf::from("/tools/ninja/ninja.exe"),
            },
            java_home: Some(PathBuf::from("/jdk")),
            devkit: None,
        }
    }

    #[test]
    fn test_posix_build_command() {
        let ctx = ctx(Platform::Unix);
        let strategy = ctx.platform.strategy();
        let cmd = strategy.build_command(&ctx, &BuildEnv::new());

        assert_eq!(cmd.display_command(), "gmake -j8 V=");
        assert!(strategy.configure_flags().is_empty());
        assert_eq!(
            strategy.clean_command(&ctx).unwrap().display_command(),
            "gmake clean"
        );
    }

    #[test]
    fn test_posix_verbose_make() {
        let mut ctx = ctx(Platform::MacOs);
        ctx.verbose = true;
        let cmd = ctx.platform.strategy().build_command(&ctx, &BuildEnv::new());
        assert_eq!(cmd.get_args(), ["-j8", "V=1"]);
    }

    #[test]
    fn test_windows_flags_and_command() {
        let ctx = ctx(Platform::Windows);
        let strategy = ctx.platform.strategy();

        assert!(strategy.configure_flags().contains(&"--ninja".to_string()));
        let cmd = strategy.build_command(&ctx, &BuildEnv::new());
        assert_eq!(cmd.get_args()[0], "-j8");
        assert_eq!(cmd.get_args()[1], "-C");
        // no out/Release yet, nothing to clean
        assert!(strategy.clean_command(&ctx).is_none());
    }

    #[test]
    fn test_windows_devkit_env() {
        let mut ctx = ctx(Platform::Windows);
        ctx.devkit = Some(Devkit {
            root: PathBuf::from(r"C:\devkit"),
            version: Some("2017".to_string()),
        });
        let mut env = BuildEnv::new();
        env.set("INCLUDE", r"C:\prev\include");

        ctx.platform.strategy().prepare_env(&ctx, &mut env);

        let var = |name: &str| env.get(name).and_then(|v| v.to_str()).unwrap();
        assert_eq!(var("GYP_MSVS_VERSION"), "2017");
        assert!(env.contains("GYP_MSVS_OVERRIDE_PATH"));
        assert!(var("INCLUDE").contains(r"VC\atlmfc\include"));
        assert!(var("INCLUDE").ends_with(r";C:\prev\include"));
        assert!(var("LIB").contains(r"10\lib\x64"));
        assert!(var("PATH").contains("ninja"));
    }
}
