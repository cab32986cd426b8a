//! Name-keyed logger registry.
//!
//! [`LoggerRegistry::setup_logger`] is the only way to obtain a [`Logger`]:
//! the first request for a name builds it, every later request returns the
//! same `Arc`. The lookup and the insert happen under one lock, so two
//! threads asking for the same name can never attach a second pair of sinks.
//! Registries built on separate configurations still share loggers: a name
//! paired with a log file maps to one [`Logger`] for the whole process, and
//! each log file path to one [`RotatingFile`].
//!
//! Name resolution:
//! - `DEBUG_MODE` false (the default): the requested name is ignored and
//!   `LOGGER_NAME` is used.
//! - `DEBUG_MODE` true: the requested name is used; `LOGGER_NAME` only fills
//!   in when no name was requested.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use tracing::{debug, info};

use crate::config::ConfigStore;
use crate::error::{BootstrapError, Result};
use crate::logger::Logger;
use crate::paths::{self, LOGS_FOLDER_NAME};
use crate::rotating::{DEFAULT_BACKUP_COUNT, DEFAULT_MAX_BYTES, RotatingFile};

/// Config key holding the effective logger name.
pub const LOGGER_NAME_KEY: &str = "LOGGER_NAME";

/// Config key enabling caller-chosen logger names.
pub const DEBUG_MODE_KEY: &str = "DEBUG_MODE";

static PROCESS_LOGGERS: LazyLock<Mutex<HashMap<(String, PathBuf), Arc<Logger>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Arguments to [`LoggerRegistry::setup_logger`]. All fields are optional.
#[derive(Debug, Clone, Default)]
pub struct LoggerRequest {
    name: Option<String>,
    file_prefix: Option<String>,
    logs_dir: Option<PathBuf>,
}

impl LoggerRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Honoured only in debug mode.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Log file prefix; defaults to the effective logger name.
    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = Some(prefix.into());
        self
    }

    /// Log directory; defaults to `logs/` under the project root.
    pub fn logs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.logs_dir = Some(dir.into());
        self
    }
}

/// Owns every [`Logger`] created through it, keyed by name.
#[derive(Debug)]
pub struct LoggerRegistry {
    config: Arc<ConfigStore>,
    loggers: Mutex<HashMap<String, Arc<Logger>>>,
}

impl LoggerRegistry {
    pub fn new(config: Arc<ConfigStore>) -> Self {
        Self {
            config,
            loggers: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create the logger for the effective name of `request`.
    pub fn setup_logger(&self, request: LoggerRequest) -> Result<Arc<Logger>> {
        let name = self.effective_name(request.name)?;

        let mut loggers = self.loggers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = loggers.get(&name) {
            debug!(logger = %name, "reusing registered logger");
            return Ok(Arc::clone(existing));
        }

        let logs_dir = match request.logs_dir {
            Some(dir) => paths::expand_home(&dir),
            None => paths::find_root_folder_from(Some(self.config.origin()), LOGS_FOLDER_NAME)?,
        };
        fs::create_dir_all(&logs_dir)?;
        let logs_dir = fs::canonicalize(&logs_dir)?;

        let prefix = request.file_prefix.unwrap_or_else(|| name.clone());
        let log_file = logs_dir.join(log_file_name(&prefix));

        let logger = {
            let mut shared = PROCESS_LOGGERS.lock().unwrap_or_else(PoisonError::into_inner);
            let logger = shared
                .entry((name.clone(), log_file.clone()))
                .or_insert_with(|| {
                    let file =
                        RotatingFile::shared(&log_file, DEFAULT_MAX_BYTES, DEFAULT_BACKUP_COUNT);
                    info!(logger = %name, file = %log_file.display(), "logger created");
                    Arc::new(Logger::new(&name, file))
                });
            Arc::clone(logger)
        };
        loggers.insert(name.clone(), Arc::clone(&logger));
        debug!(logger = %name, file = %log_file.display(), "logger registered");

        Ok(logger)
    }

    /// A registered logger, without creating one.
    pub fn get(&self, name: &str) -> Option<Arc<Logger>> {
        self.loggers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .loggers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.loggers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    fn effective_name(&self, requested: Option<String>) -> Result<String> {
        let debug_mode = self.config.get_optional_bool_env_var(DEBUG_MODE_KEY, false);
        match requested {
            Some(name) if debug_mode => {
                if name.is_empty() {
                    return Err(BootstrapError::InvalidArgument(
                        "logger name must not be empty".into(),
                    ));
                }
                Ok(name)
            }
            _ => self.config.get_required_env_var(LOGGER_NAME_KEY),
        }
    }
}

/// `{prefix}_{YYYYMMDD}.log`, dated in local time.
pub fn log_file_name(prefix: &str) -> String {
    format!("{prefix}_{}.log", chrono::Local::now().format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry(tmp: &TempDir, pairs: &[(&str, &str)]) -> LoggerRegistry {
        let store = ConfigStore::from_vars(tmp.path(), pairs.iter().copied());
        LoggerRegistry::new(Arc::new(store))
    }

    #[test]
    fn log_file_name_has_date_stamp() {
        let name = log_file_name("svc");
        assert!(name.starts_with("svc_"));
        assert!(name.ends_with(".log"));
        let stamp = &name["svc_".len()..name.len() - ".log".len()];
        assert_eq!(stamp.len(), 8);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn non_debug_ignores_requested_name() {
        let tmp = TempDir::new().unwrap();
        let reg = registry(&tmp, &[("LOGGER_NAME", "configured")]);
        let logger = reg
            .setup_logger(LoggerRequest::new().name("custom").logs_dir(tmp.path()))
            .unwrap();
        assert_eq!(logger.name(), "configured");
    }

    #[test]
    fn debug_honours_requested_name() {
        let tmp = TempDir::new().unwrap();
        let reg = registry(&tmp, &[("DEBUG_MODE", "True")]);
        let logger = reg
            .setup_logger(LoggerRequest::new().name("custom").logs_dir(tmp.path()))
            .unwrap();
        assert_eq!(logger.name(), "custom");
    }

    #[test]
    fn debug_without_name_falls_back_to_config() {
        let tmp = TempDir::new().unwrap();
        let reg = registry(&tmp, &[("DEBUG_MODE", "true"), ("LOGGER_NAME", "configured")]);
        let logger = reg
            .setup_logger(LoggerRequest::new().logs_dir(tmp.path()))
            .unwrap();
        assert_eq!(logger.name(), "configured");
    }

    #[test]
    fn debug_rejects_empty_name() {
        let tmp = TempDir::new().unwrap();
        let reg = registry(&tmp, &[("DEBUG_MODE", "true")]);
        let err = reg
            .setup_logger(LoggerRequest::new().name("").logs_dir(tmp.path()))
            .unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidArgument(_)));
    }

    #[test]
    fn registry_loggers_use_default_rotation_limits() {
        let tmp = TempDir::new().unwrap();
        let reg = registry(&tmp, &[("LOGGER_NAME", "limits")]);
        let logger = reg
            .setup_logger(LoggerRequest::new().logs_dir(tmp.path()))
            .unwrap();
        assert_eq!(logger.file_sink().max_bytes(), DEFAULT_MAX_BYTES);
        assert_eq!(logger.file_sink().backup_count(), DEFAULT_BACKUP_COUNT);
        assert_eq!(logger.file_sink().path(), logger.log_file());
    }

    #[test]
    fn separate_registries_share_one_logger_per_name_and_file() {
        let tmp = TempDir::new().unwrap();
        let first = registry(&tmp, &[("LOGGER_NAME", "twice")]);
        let second = registry(&tmp, &[("LOGGER_NAME", "twice")]);

        let a = first
            .setup_logger(LoggerRequest::new().logs_dir(tmp.path()))
            .unwrap();
        let b = second
            .setup_logger(LoggerRequest::new().logs_dir(tmp.path()))
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.file_sink().same_file(b.file_sink()));
    }

    #[test]
    fn names_sharing_a_prefix_share_the_file() {
        let tmp = TempDir::new().unwrap();
        let reg = registry(&tmp, &[("DEBUG_MODE", "true")]);
        let request = |name: &str| {
            LoggerRequest::new()
                .name(name)
                .file_prefix("combined")
                .logs_dir(tmp.path())
        };

        let a = reg.setup_logger(request("reader")).unwrap();
        let b = reg.setup_logger(request("writer")).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert!(a.file_sink().same_file(b.file_sink()));
    }

    #[test]
    fn missing_logger_name_propagates() {
        let tmp = TempDir::new().unwrap();
        let reg = registry(&tmp, &[]);
        let err = reg
            .setup_logger(LoggerRequest::new().name("ignored").logs_dir(tmp.path()))
            .unwrap_err();
        assert!(matches!(err, BootstrapError::MissingConfig(ref k) if k == LOGGER_NAME_KEY));
        assert!(reg.is_empty());
    }
}
