//! # visreg-core
//!
//! Core types for the visreg visual regression engine.
//!
//! This crate contains all fundamental types with **no internal dependencies**
//! on other visreg crates. It provides:
//!
//! - Subject, role and snapshot types
//! - Step key extraction and snapshot filename formatting
//! - Pixel geometry (Dimensions, Bounds)
//! - Configuration loading
//! - The injected logging interface
//! - Error types
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - all other crates depend on this one,
//! but this crate has no dependencies on other visreg crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod geometry;
pub mod log;
pub mod step_key;
pub mod subject;

// Re-export commonly used types
pub use config::{CompareSettings, LoggingSettings, StoreSettings, VisregConfig};
pub use error::{Error, Result};
pub use geometry::{Bounds, Dimensions};
pub use log::{LogEntry, LogLevel, LogSink, Logger, MemorySink, TracingSink};
pub use step_key::{snapshot_file_name, Extracted, ParsedName, StepKey};
pub use subject::{Role, Snapshot, Subject};
