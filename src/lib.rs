//! Process bootstrap: find the project root, load `.env` configuration once,
//! and hand out named loggers backed by the console and a rotating file.
//!
//! ```no_run
//! use project_bootstrap::{Bootstrap, LoggerRequest};
//!
//! # fn main() -> project_bootstrap::error::Result<()> {
//! let boot = Bootstrap::init()?;
//! let log = boot.setup_logger(LoggerRequest::new())?;
//! log.info("service started");
//! # Ok(())
//! # }
//! ```

mod bootstrap;
mod context;
mod core;

pub use bootstrap::{format, logger, registry, rotating};
pub use self::core::{config, error, paths};

pub use context::Bootstrap;
pub use self::core::config::{ConfigLoader, ConfigStore};
pub use self::core::error::{BootstrapError, Result};
pub use self::core::paths::{find_env_file, find_file_in_project, find_project_root, find_root_folder};
pub use bootstrap::logger::Logger;
pub use bootstrap::registry::{LoggerRegistry, LoggerRequest};
