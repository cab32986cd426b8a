//! Startup context tying configuration and loggers together.
//!
//! Build one [`Bootstrap`] at startup and pass it (or its parts) to the code
//! that needs configuration or loggers. [`Bootstrap::global`] offers a
//! process-wide instance for code that cannot be handed one.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::debug;

use crate::config::{ConfigLoader, ConfigStore};
use crate::error::Result;
use crate::logger::{self, LOG_LEVEL_KEY, Logger};
use crate::paths;
use crate::registry::{LoggerRegistry, LoggerRequest};

static GLOBAL: OnceLock<Bootstrap> = OnceLock::new();
static GLOBAL_INIT: Mutex<()> = Mutex::new(());

/// Loaded configuration plus the logger registry built on it.
#[derive(Debug)]
pub struct Bootstrap {
    config: Arc<ConfigStore>,
    loggers: LoggerRegistry,
}

impl Bootstrap {
    /// Load configuration from the working directory now and return a ready context.
    pub fn init() -> Result<Self> {
        Self::from_loader(ConfigLoader::new())
    }

    pub fn from_loader(loader: ConfigLoader) -> Result<Self> {
        Ok(Self::from_config(Arc::new(loader.load()?)))
    }

    pub fn from_config(config: Arc<ConfigStore>) -> Self {
        Self {
            loggers: LoggerRegistry::new(Arc::clone(&config)),
            config,
        }
    }

    /// Process-wide context, initialised from the working directory on the
    /// first call. A failed first call leaves it uninitialised so a later
    /// call can retry; a successful one is never repeated.
    pub fn global() -> Result<&'static Bootstrap> {
        if let Some(boot) = GLOBAL.get() {
            return Ok(boot);
        }
        let _guard = GLOBAL_INIT.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(boot) = GLOBAL.get() {
            return Ok(boot);
        }
        let boot = Self::init()?;
        debug!(origin = %boot.config.origin().display(), "global bootstrap initialised");
        Ok(GLOBAL.get_or_init(|| boot))
    }

    /// The process-wide context if [`Bootstrap::global`] has already succeeded.
    pub fn global_if_loaded() -> Option<&'static Bootstrap> {
        GLOBAL.get()
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn config_handle(&self) -> Arc<ConfigStore> {
        Arc::clone(&self.config)
    }

    pub fn loggers(&self) -> &LoggerRegistry {
        &self.loggers
    }

    /// Shorthand for [`LoggerRegistry::setup_logger`].
    pub fn setup_logger(&self, request: LoggerRequest) -> Result<Arc<Logger>> {
        self.loggers.setup_logger(request)
    }

    /// Install the global subscriber. A non-empty `LOG_LEVEL` sets the level
    /// outright; otherwise `RUST_LOG` applies over an `info` default.
    pub fn init_global_tracing(&self) -> Result<()> {
        match self.config.get_optional_env_var(LOG_LEVEL_KEY, None) {
            Some(level) if !level.is_empty() => logger::init_global_tracing(&level, true),
            _ => logger::init_global_tracing("info", false),
        }
    }

    /// Project root resolved from the configuration origin.
    pub fn project_root(&self) -> Result<PathBuf> {
        paths::find_project_root(Some(self.config.origin()), None)
    }
}
