//! Named loggers and process-wide tracing initialisation.
//!
//! A [`Logger`] owns a private [`Dispatch`] with two sinks: a console sink
//! at INFO and a [`RotatingFile`] sink at TRACE. Loggers are created through
//! [`crate::registry::LoggerRegistry`], which guarantees one instance per name.
//!
//! [`init_global_tracing`] is separate: it installs the global subscriber
//! that receives the crate's own diagnostics and any `tracing` macro not
//! routed through a [`Logger`].

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::Dispatch;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;

use crate::error::{BootstrapError, Result};
use crate::format::LineFormat;
use crate::rotating::RotatingFile;

/// Config key read by [`crate::Bootstrap::init_global_tracing`].
pub const LOG_LEVEL_KEY: &str = "LOG_LEVEL";

/// Where a sink writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkKind {
    Console,
    File(PathBuf),
}

/// Description of one sink attached to a [`Logger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkInfo {
    pub kind: SinkKind,
    pub level: LevelFilter,
}

/// A configured, named logger.
pub struct Logger {
    name: String,
    dispatch: Dispatch,
    file: RotatingFile,
    sinks: Vec<SinkInfo>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("sinks", &self.sinks)
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Build a logger writing to stderr and to `file`.
    pub(crate) fn new(name: &str, file: RotatingFile) -> Self {
        Self::with_console(name, file, BoxMakeWriter::new(std::io::stderr))
    }

    pub(crate) fn with_console(name: &str, file: RotatingFile, console: BoxMakeWriter) -> Self {
        let console_level = LevelFilter::INFO;
        let file_level = LevelFilter::TRACE;

        let console = tracing_subscriber::fmt::layer()
            .event_format(LineFormat::new(name))
            .with_writer(console)
            .with_ansi(false)
            .with_filter(console_level);
        let persistent = tracing_subscriber::fmt::layer()
            .event_format(LineFormat::new(name))
            .with_writer(file.clone())
            .with_ansi(false)
            .with_filter(file_level);

        let subscriber = tracing_subscriber::registry().with(console).with(persistent);

        let sinks = vec![
            SinkInfo {
                kind: SinkKind::Console,
                level: console_level,
            },
            SinkInfo {
                kind: SinkKind::File(file.path().to_path_buf()),
                level: file_level,
            },
        ];

        Self {
            name: name.to_string(),
            dispatch: Dispatch::new(subscriber),
            file,
            sinks,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sinks(&self) -> &[SinkInfo] {
        &self.sinks
    }

    pub fn log_file(&self) -> &Path {
        self.file.path()
    }

    /// The rotating file behind the file sink.
    pub fn file_sink(&self) -> &RotatingFile {
        &self.file
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Run `f` with this logger as the default subscriber, so plain
    /// `tracing` macros inside it reach this logger's sinks.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    pub fn trace(&self, message: impl fmt::Display) {
        self.in_scope(|| tracing::trace!("{message}"));
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.in_scope(|| tracing::debug!("{message}"));
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.in_scope(|| tracing::info!("{message}"));
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.in_scope(|| tracing::warn!("{message}"));
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.in_scope(|| tracing::error!("{message}"));
    }

    /// Flush buffered file output.
    pub fn flush(&self) -> Result<()> {
        Ok(self.file.flush()?)
    }
}

/// Install the process-wide subscriber at `level`.
///
/// With `prefer_level` the filter is exactly `level`. Without it, `RUST_LOG`
/// directives are read and `level` only applies to targets they leave out.
/// Fails on an unknown level, a malformed `RUST_LOG`, or when a global
/// subscriber is already installed.
pub fn init_global_tracing(level: &str, prefer_level: bool) -> Result<()> {
    let level = parse_level(level)?;
    let filter = if prefer_level {
        EnvFilter::default().add_directive(level.into())
    } else {
        EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env()
            .map_err(|e| BootstrapError::Logger(format!("invalid RUST_LOG: {e}")))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init()
        .map_err(|e| BootstrapError::Logger(format!("global subscriber already set: {e}")))
}

/// `error`, `warn`, `info`, `debug`, `trace` or `off`, in any case.
pub fn parse_level(level: &str) -> Result<LevelFilter> {
    match level.trim() {
        "" => Err(BootstrapError::Logger("log level is empty".into())),
        trimmed => trimmed
            .parse::<LevelFilter>()
            .map_err(|_| BootstrapError::Logger(format!("unknown log level {trimmed:?}"))),
    }
}
