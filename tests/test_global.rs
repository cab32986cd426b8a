//! Tests for the process-wide bootstrap instance.
//!
//! Kept in its own test binary: the global is initialised once per process.

use std::fs;
use std::path::{Path, PathBuf};

use project_bootstrap::{Bootstrap, BootstrapError, ConfigLoader, LoggerRequest};
use tempfile::TempDir;

struct CwdGuard {
    original_dir: PathBuf,
}

impl CwdGuard {
    fn enter(dir: &Path) -> Self {
        let original_dir = std::env::current_dir().expect("current dir");
        std::env::set_current_dir(dir).expect("set current dir");
        Self { original_dir }
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original_dir);
    }
}

#[test]
fn test_global_loads_once_per_process() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join(".git")).unwrap();
    fs::write(
        tmp.path().join(".env"),
        "PB_GLOBAL_KEY=first\nLOGGER_NAME=global_svc\nLOG_LEVEL=debug\n",
    )
    .unwrap();
    let _cwd = CwdGuard::enter(tmp.path());

    assert!(Bootstrap::global_if_loaded().is_none());
    let boot = Bootstrap::global().unwrap();
    assert_eq!(boot.config().get_required_env_var("PB_GLOBAL_KEY").unwrap(), "first");
    assert_eq!(std::env::var("PB_GLOBAL_KEY").unwrap(), "first");

    fs::write(tmp.path().join(".env"), "PB_GLOBAL_KEY=second\n").unwrap();

    let again = Bootstrap::global().unwrap();
    assert!(std::ptr::eq(boot, again));
    assert_eq!(again.config().get_required_env_var("PB_GLOBAL_KEY").unwrap(), "first");

    let logger = again.setup_logger(LoggerRequest::new()).unwrap();
    assert_eq!(logger.name(), "global_svc");
    assert!(tmp.path().join("logs").is_dir());

    // The environment was already exported, so another exporting context
    // sees the first values. Only an isolated load re-reads the file.
    let fresh = Bootstrap::init().unwrap();
    assert_eq!(fresh.config().get_required_env_var("PB_GLOBAL_KEY").unwrap(), "first");
    assert_eq!(std::env::var("PB_GLOBAL_KEY").unwrap(), "first");
    let isolated = Bootstrap::from_loader(ConfigLoader::new().export_to_process(false)).unwrap();
    assert_eq!(
        isolated.config().get_required_env_var("PB_GLOBAL_KEY").unwrap(),
        "second"
    );

    // Contexts share loggers per name and file.
    let fresh_logger = fresh.setup_logger(LoggerRequest::new()).unwrap();
    assert!(std::sync::Arc::ptr_eq(&logger, &fresh_logger));

    boot.init_global_tracing().unwrap();
    assert!(tracing::dispatcher::has_been_set());
    let err = fresh.init_global_tracing().unwrap_err();
    assert!(matches!(err, BootstrapError::Logger(_)));
}
