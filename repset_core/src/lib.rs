#![forbid(unsafe_code)]

//! Core domain model and business logic for the Repset workout system.
//!
//! This crate provides:
//! - Domain types (exercises, templates, workout logs)
//! - Exercise catalog
//! - Template composer (ordering, supersets, duration estimate)
//! - Session runner (set/rest state machine)
//! - Persistence (template store, log WAL, CSV archive)

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod store;
pub mod wal;
pub mod csv_rollup;
pub mod history;
pub mod composer;
pub mod timer;
pub mod runner;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog, Catalog, ExerciseFilter};
pub use config::Config;
pub use store::{JsonTemplateStore, TemplateStore};
pub use wal::{JsonlLogSink, LogSink};
pub use history::load_user_logs;
pub use composer::{MoveDirection, TemplateComposer};
pub use runner::{Phase, SessionRunner, SessionView};
