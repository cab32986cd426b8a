//! Bootstrap layer: logging built on top of the resolved configuration.
//!
//! - **format**: `timestamp - name - severity - message` record layout.
//! - **rotating**: size-capped log file with numbered backups.
//! - **logger**: named logger handle and global tracing initialisation.
//! - **registry**: one logger per name, created on first request.

pub mod format;
pub mod logger;
pub mod registry;
pub mod rotating;
