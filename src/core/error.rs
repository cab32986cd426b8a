//! Crate-wide error types.

use std::path::PathBuf;

use thiserror::Error;

/// Every failure the bootstrap layer can surface to a caller.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Upward search exhausted the directory tree without a match.
    #[error("{what} not found: searched for {targets:?} starting from {}{}", .start.display(), parent_note(.searched_parents))]
    NotFound {
        what: &'static str,
        targets: Vec<String>,
        start: PathBuf,
        searched_parents: bool,
    },

    #[error("missing required configuration: environment variable '{0}' is not set or empty")]
    MissingConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed env file. Only the position is reported so secrets never reach logs.
    #[error("cannot parse env file {} at position {index}", .path.display())]
    EnvFile { path: PathBuf, index: usize },

    #[error("logger error: {0}")]
    Logger(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn parent_note(searched_parents: &bool) -> &'static str {
    if *searched_parents {
        " (including parent directories)"
    } else {
        ""
    }
}

pub type Result<T> = std::result::Result<T, BootstrapError>;

impl BootstrapError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BootstrapError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn not_found_names_targets_and_start() {
        let e = BootstrapError::NotFound {
            what: "project root",
            targets: vec![".git".into(), ".env".into()],
            start: PathBuf::from("/tmp/somewhere"),
            searched_parents: true,
        };
        let msg = e.to_string();
        assert!(msg.contains("project root not found"));
        assert!(msg.contains(".git"));
        assert!(msg.contains("/tmp/somewhere"));
        assert!(msg.contains("including parent directories"));
        assert!(e.is_not_found());
    }

    #[test]
    fn not_found_without_parent_search() {
        let e = BootstrapError::NotFound {
            what: "file",
            targets: vec!["app.toml".into()],
            start: PathBuf::from("/srv"),
            searched_parents: false,
        };
        assert!(!e.to_string().contains("parent"));
    }

    #[test]
    fn missing_config_names_key() {
        let e = BootstrapError::MissingConfig("LOGGER_NAME".into());
        assert!(e.to_string().contains("LOGGER_NAME"));
        assert!(!e.is_not_found());
    }

    #[test]
    fn env_file_error_hides_content() {
        let e = BootstrapError::EnvFile {
            path: PathBuf::from("/app/.env"),
            index: 7,
        };
        let msg = e.to_string();
        assert!(msg.contains("/app/.env"));
        assert!(msg.contains('7'));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let e: BootstrapError = io_err.into();
        assert!(e.to_string().contains("io error"));
        let _: &dyn Error = &e;
    }
}
