//! Project root and file discovery by upward directory search.
//!
//! Every lookup starts from an origin (the current working directory unless
//! given), resolves it to an absolute path, then walks parent-by-parent until
//! a match is found or the filesystem root has been tested.

use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{BootstrapError, Result};

/// Canonical name of the environment-definition file.
pub const ENV_FILE_NAME: &str = ".env";

/// Folder under the project root that holds log files by default.
pub const LOGS_FOLDER_NAME: &str = "logs";

/// Entries whose presence marks a directory as a project root.
pub const DEFAULT_MARKERS: &[&str] = &[
    ENV_FILE_NAME,
    ".git",
    "Cargo.toml",
    "pyproject.toml",
    "setup.py",
    "requirements.txt",
    "package.json",
];

/// Find the nearest ancestor of `origin` (the origin itself included) that
/// contains any of `markers`.
///
/// `markers` defaults to [`DEFAULT_MARKERS`] when `None` or empty.
pub fn find_project_root(origin: Option<&Path>, markers: Option<&[&str]>) -> Result<PathBuf> {
    let markers = match markers {
        Some(m) if !m.is_empty() => m,
        _ => DEFAULT_MARKERS,
    };
    let start = resolve_origin(origin)?;

    for dir in start.ancestors() {
        if markers.iter().any(|m| dir.join(m).exists()) {
            debug!(root = %dir.display(), "project root resolved");
            return Ok(dir.to_path_buf());
        }
    }

    Err(BootstrapError::NotFound {
        what: "project root",
        targets: markers.iter().map(|m| m.to_string()).collect(),
        start,
        searched_parents: true,
    })
}

/// Find `filename` under `origin`, or under its ancestors when `search_parents` is set.
pub fn find_file_in_project(
    filename: &str,
    origin: Option<&Path>,
    search_parents: bool,
) -> Result<PathBuf> {
    if filename.is_empty() {
        return Err(BootstrapError::InvalidArgument(
            "filename must not be empty".into(),
        ));
    }
    let start = resolve_origin(origin)?;

    let found = if search_parents {
        start
            .ancestors()
            .map(|dir| dir.join(filename))
            .find(|candidate| candidate.exists())
    } else {
        Some(start.join(filename)).filter(|candidate| candidate.exists())
    };

    found.ok_or_else(|| BootstrapError::NotFound {
        what: "file",
        targets: vec![filename.to_string()],
        start,
        searched_parents: search_parents,
    })
}

/// Locate the `.env` file from the current working directory upward.
pub fn find_env_file() -> Result<PathBuf> {
    find_file_in_project(ENV_FILE_NAME, None, true)
}

/// Join `folder_name` onto the project root resolved from the working directory.
/// The resulting path is not checked for existence.
pub fn find_root_folder(folder_name: &str) -> Result<PathBuf> {
    find_root_folder_from(None, folder_name)
}

/// [`find_root_folder`] with an explicit origin.
pub fn find_root_folder_from(origin: Option<&Path>, folder_name: &str) -> Result<PathBuf> {
    if folder_name.is_empty() {
        return Err(BootstrapError::InvalidArgument(
            "folder_name cannot be empty".into(),
        ));
    }
    Ok(find_project_root(origin, None)?.join(folder_name))
}

/// Resolve the search origin to an absolute path.
///
/// Existing paths are canonicalized so symlinks resolve the same way the
/// filesystem sees them; paths that do not exist are made absolute lexically
/// and the search simply finds nothing along them.
pub fn resolve_origin(origin: Option<&Path>) -> Result<PathBuf> {
    let path = match origin {
        Some(p) => expand_home(p),
        None => env::current_dir()?,
    };
    match path.canonicalize() {
        Ok(canonical) => Ok(canonical),
        Err(_) => Ok(std::path::absolute(&path)?),
    }
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
