//! Load-once key/value configuration backed by the process environment.
//!
//! A [`ConfigStore`] is built exactly once by [`ConfigLoader::load`]: the
//! `.env` file is located by upward search from the origin, parsed, and
//! layered over the process environment (file values win). The resulting
//! snapshot is read-only; editing the file afterwards has no effect on a
//! store that already exists.
//!
//! Exporting file entries into the process environment happens at most once
//! per process. Later exporting loads skip the file and snapshot the process
//! environment as the first load left it. Isolated loads
//! (`export_to_process(false)`) always read the file.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::{debug, info, warn};

use crate::error::{BootstrapError, Result};
use crate::paths::{self, ENV_FILE_NAME};

/// Env file exported by the first exporting load, if that load found one.
static PROCESS_EXPORT: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Builder for a [`ConfigStore`].
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    origin: Option<PathBuf>,
    env_file: Option<PathBuf>,
    export_to_process: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            origin: None,
            env_file: None,
            export_to_process: true,
        }
    }

    /// Directory the `.env` search starts from. Defaults to the working directory.
    pub fn origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Use this env file instead of searching for one.
    pub fn env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    /// Whether file entries are also written into the process environment.
    /// On by default so child processes and `RUST_LOG` readers see them.
    /// Only the first exporting load in a process writes anything.
    pub fn export_to_process(mut self, export: bool) -> Self {
        self.export_to_process = export;
        self
    }

    /// Resolve, parse and merge the env file. An env file that cannot be
    /// located is not an error; the store then reflects the process
    /// environment alone.
    pub fn load(self) -> Result<ConfigStore> {
        let origin = paths::resolve_origin(self.origin.as_deref())?;

        if let Some(exported) = PROCESS_EXPORT.get().filter(|_| self.export_to_process) {
            return Ok(Self::already_exported(origin, exported));
        }

        let env_file = match self.env_file {
            Some(path) => {
                let path = paths::expand_home(&path);
                if path.is_file() {
                    Some(path)
                } else {
                    warn!(path = %path.display(), "env file does not exist; using process environment only");
                    None
                }
            }
            None => match paths::find_file_in_project(ENV_FILE_NAME, Some(origin.as_path()), true) {
                Ok(path) => Some(path),
                Err(e) if e.is_not_found() => {
                    debug!(origin = %origin.display(), "no .env file found; using process environment only");
                    None
                }
                Err(e) => return Err(e),
            },
        };

        let entries = match &env_file {
            Some(path) => parse_env_file(path)?,
            None => Vec::new(),
        };

        if self.export_to_process {
            let mut exported_now = false;
            let exported = PROCESS_EXPORT.get_or_init(|| {
                for (key, value) in &entries {
                    // SAFETY: runs inside `get_or_init`, so at most once per
                    // process, and callers block until it finishes.
                    unsafe { env::set_var(key, value) };
                }
                exported_now = true;
                env_file.clone()
            });
            if !exported_now {
                return Ok(Self::already_exported(origin, exported));
            }
        }

        let mut vars = process_env();
        if let Some(path) = &env_file {
            info!(path = %path.display(), entries = entries.len(), "env file loaded");
        }
        vars.extend(entries);

        Ok(ConfigStore {
            origin,
            env_file,
            vars,
        })
    }

    fn already_exported(origin: PathBuf, exported: &Option<PathBuf>) -> ConfigStore {
        debug!(
            origin = %origin.display(),
            "process environment already loaded; skipping env file"
        );
        ConfigStore {
            origin,
            env_file: exported.clone(),
            vars: process_env(),
        }
    }
}

/// Read-only configuration snapshot.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    origin: PathBuf,
    env_file: Option<PathBuf>,
    vars: HashMap<String, String>,
}

impl ConfigStore {
    /// Load from the working directory with default settings.
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Build a store from explicit pairs, without touching the filesystem or
    /// the process environment.
    pub fn from_vars<I, K, V>(origin: impl Into<PathBuf>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            origin: origin.into(),
            env_file: None,
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Absolute directory the store was resolved from.
    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// The env file that was merged, if one was found.
    pub fn env_file(&self) -> Option<&Path> {
        self.env_file.as_deref()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Value of `key`; absent and empty values are both errors.
    pub fn get_required_env_var(&self, key: &str) -> Result<String> {
        match self.vars.get(key) {
            Some(value) if !value.is_empty() => Ok(value.clone()),
            _ => Err(BootstrapError::MissingConfig(key.to_string())),
        }
    }

    /// Value of `key` when present (empty included), else `default`.
    pub fn get_optional_env_var(&self, key: &str, default: Option<&str>) -> Option<String> {
        match self.vars.get(key) {
            Some(value) => Some(value.clone()),
            None => default.map(str::to_string),
        }
    }

    /// `true` only when the value equals `true` ignoring ASCII case.
    /// Absent or empty values yield `default`.
    pub fn get_optional_bool_env_var(&self, key: &str, default: bool) -> bool {
        match self.get_optional_env_var(key, None) {
            Some(value) if !value.is_empty() => value.eq_ignore_ascii_case("true"),
            _ => default,
        }
    }
}

/// Parse an env file with conventional `.env` syntax.
pub fn parse_env_file(path: &Path) -> Result<Vec<(String, String)>> {
    let iter = dotenvy::from_path_iter(path).map_err(|e| map_dotenv_error(path, e))?;
    iter.map(|item| item.map_err(|e| map_dotenv_error(path, e)))
        .collect()
}

fn map_dotenv_error(path: &Path, err: dotenvy::Error) -> BootstrapError {
    match err {
        dotenvy::Error::LineParse(_, index) => BootstrapError::EnvFile {
            path: path.to_path_buf(),
            index,
        },
        dotenvy::Error::Io(io_err) => BootstrapError::Io(io_err),
        _ => BootstrapError::EnvFile {
            path: path.to_path_buf(),
            index: 0,
        },
    }
}

/// Current process environment; non-UTF-8 entries are skipped.
fn process_env() -> HashMap<String, String> {
    env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}
