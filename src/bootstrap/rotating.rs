//! Size-capped log file with numbered backups.
//!
//! Layout for a file `svc_20261019.log` with three backups:
//! ```text
//! logs/
//! ├── svc_20261019.log      (current, written to)
//! ├── svc_20261019.log.1    (newest backup)
//! ├── svc_20261019.log.2
//! └── svc_20261019.log.3    (oldest, discarded on next rollover)
//! ```
//!
//! The file is opened lazily on the first write. Writes are serialized by an
//! internal mutex, and each formatted record arrives as one write so records
//! never straddle a rollover. A `max_bytes` or `backup_count` of zero disables
//! rollover and the file grows without bound.
//!
//! [`RotatingFile::shared`] hands out one handle per path for the whole
//! process, so two loggers pointed at the same file never rotate it out from
//! under each other.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use tracing_subscriber::fmt::MakeWriter;

/// Rollover threshold: 5 MiB.
pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Rotated backups kept beside the live file.
pub const DEFAULT_BACKUP_COUNT: usize = 10;

static SHARED_FILES: LazyLock<Mutex<HashMap<PathBuf, RotatingFile>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Handle to a rotating log file. Clones share the same underlying file.
#[derive(Debug, Clone)]
pub struct RotatingFile {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    max_bytes: u64,
    backup_count: usize,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    file: Option<File>,
    size: u64,
}

impl RotatingFile {
    /// Unshared handle. `max_bytes == 0` or `backup_count == 0` disables rollover.
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64, backup_count: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                max_bytes,
                backup_count,
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn with_defaults(path: impl Into<PathBuf>) -> Self {
        Self::new(path, DEFAULT_MAX_BYTES, DEFAULT_BACKUP_COUNT)
    }

    /// Process-wide handle for `path`. The first call fixes the limits; later
    /// calls for the same path return that handle and ignore their own limits.
    pub fn shared(path: impl Into<PathBuf>, max_bytes: u64, backup_count: usize) -> Self {
        let path = path.into();
        let mut files = SHARED_FILES.lock().unwrap_or_else(PoisonError::into_inner);
        files
            .entry(path.clone())
            .or_insert_with(|| Self::new(path, max_bytes, backup_count))
            .clone()
    }

    /// Whether two handles write through the same underlying file state.
    pub fn same_file(&self, other: &RotatingFile) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn max_bytes(&self) -> u64 {
        self.inner.max_bytes
    }

    pub fn backup_count(&self) -> usize {
        self.inner.backup_count
    }

    /// Path of backup number `index` (1 is the newest).
    pub fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = OsString::from(self.inner.path.as_os_str());
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    /// Append one record, rolling over first if it would cross the threshold.
    pub fn write_record(&self, buf: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        self.ensure_open(&mut state)?;
        if self.should_roll_over(&state, buf.len()) {
            self.roll_over(&mut state)?;
        }
        if let Some(file) = state.file.as_mut() {
            file.write_all(buf)?;
            state.size += buf.len() as u64;
        }
        Ok(())
    }

    pub fn flush(&self) -> io::Result<()> {
        match self.lock().file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self, state: &mut State) -> io::Result<()> {
        if state.file.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.inner.path)?;
            state.size = file.metadata()?.len();
            state.file = Some(file);
        }
        Ok(())
    }

    fn should_roll_over(&self, state: &State, incoming: usize) -> bool {
        self.inner.max_bytes > 0
            && self.inner.backup_count > 0
            && state.size > 0
            && state.size + incoming as u64 >= self.inner.max_bytes
    }

    fn roll_over(&self, state: &mut State) -> io::Result<()> {
        state.file = None;

        for index in (1..self.inner.backup_count).rev() {
            let src = self.backup_path(index);
            if src.exists() {
                let dst = self.backup_path(index + 1);
                remove_if_exists(&dst)?;
                fs::rename(&src, &dst)?;
            }
        }
        let first = self.backup_path(1);
        remove_if_exists(&first)?;
        if self.inner.path.exists() {
            fs::rename(&self.inner.path, &first)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.inner.path)?;
        state.file = Some(file);
        state.size = 0;
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Writer handed to `tracing_subscriber` for each event.
#[derive(Debug)]
pub struct RotatingFileWriter<'a> {
    file: &'a RotatingFile,
}

impl Write for RotatingFileWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_record(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RotatingFile {
    type Writer = RotatingFileWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingFileWriter { file: self }
    }
}
