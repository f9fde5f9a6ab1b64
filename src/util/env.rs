//! Explicit environment for child processes.
//!
//! The build never mutates the process-global environment. Each step starts
//! from a [`BuildEnv`] (usually a snapshot of the parent environment), edits
//! it, and hands it to a [`ProcessBuilder`](crate::util::process::ProcessBuilder).

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

/// Separator for PATH-like variables on the host.
pub const PATH_SEPARATOR: &str = if cfg!(windows) { ";" } else { ":" };

/// An ordered set of environment variables for a child process.
///
/// Names and values are kept as OS strings, so variables that are not valid
/// Unicode pass through to children untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
    vars: BTreeMap<OsString, OsString>,
}

impl BuildEnv {
    /// An empty environment.
    pub fn new() -> Self {
        BuildEnv::default()
    }

    /// A snapshot of the current process environment.
    pub fn inherit() -> Self {
        BuildEnv {
            vars: std::env::vars_os().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&OsStr> {
        self.vars.get(OsStr::new(name)).map(OsString::as_os_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(OsStr::new(name))
    }

    /// Set `name` to `value`. Empty values are ignored.
    pub fn set(&mut self, name: impl Into<OsString>, value: impl Into<OsString>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        if value.is_empty() {
            return self;
        }
        tracing::debug!(
            "Setting environment variable {}={}",
            name.to_string_lossy(),
            value.to_string_lossy()
        );
        self.vars.insert(name, value);
        self
    }

    /// Set `name` only when `value` is present.
    pub fn set_opt(
        &mut self,
        name: impl Into<OsString>,
        value: Option<impl Into<OsString>>,
    ) -> &mut Self {
        if let Some(value) = value {
            self.set(name, value);
        }
        self
    }

    /// Put `entry` in front of the PATH-like variable `name`.
    pub fn prepend_path(&mut self, name: &str, entry: impl AsRef<OsStr>) -> &mut Self {
        self.prepend_list(name, entry, PATH_SEPARATOR)
    }

    /// Put `entry` at the end of the PATH-like variable `name`.
    pub fn append_path(&mut self, name: &str, entry: impl AsRef<OsStr>) -> &mut Self {
        self.append_list(name, entry, PATH_SEPARATOR)
    }

    /// Put `value` in front of the `sep`-separated list in `name`.
    pub fn prepend_list(&mut self, name: &str, value: impl AsRef<OsStr>, sep: &str) -> &mut Self {
        let mut joined = value.as_ref().to_os_string();
        if let Some(prev) = self.get(name).filter(|prev| !prev.is_empty()) {
            joined.push(sep);
            joined.push(prev);
        }
        self.set(name, joined)
    }

    /// Put `value` at the end of the `sep`-separated list in `name`.
    pub fn append_list(&mut self, name: &str, value: impl AsRef<OsStr>, sep: &str) -> &mut Self {
        let joined = match self.get(name).filter(|prev| !prev.is_empty()) {
            Some(prev) => {
                let mut joined = prev.to_os_string();
                joined.push(sep);
                joined.push(value);
                joined
            }
            None => value.as_ref().to_os_string(),
        };
        self.set(name, joined)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }
}
