//! # visreg-store
//!
//! On-disk snapshot sets for the visreg engine.
//!
//! This crate provides:
//! - `SubjectPaths`, the single place subject/role directories are derived
//! - `ScreenshotStore`, with put/list/clear on a (subject, role) set
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends on visreg-core only and
//! touches nothing but the filesystem.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod paths;
pub mod store;

// Re-export commonly used types
pub use paths::SubjectPaths;
pub use store::ScreenshotStore;
