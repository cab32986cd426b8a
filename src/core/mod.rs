//! Core infrastructure: shared foundation used across the whole crate.
//!
//! - **paths**: project root and file discovery.
//! - **config**: load-once environment configuration.
//! - **error**: crate-wide error enum.

pub mod config;
pub mod error;
pub mod paths;
