//! # visreg
//!
//! Command-line front end for the visreg visual regression engine.
//!
//! ## Overview
//!
//! The `visreg` binary drives a [`RegressionEngine`](visreg_compare::RegressionEngine)
//! for one subject per invocation:
//! - `compare` prints a pass/fail report (text or JSON, optionally HTML)
//! - `set-base`, `clear-base` and `clear-cur` manage the snapshot sets
//! - `list` shows the step keys of one set
//! - `schema` prints the JSON schema of the report
//!
//! ## Architecture
//!
//! This is Layer 3 - the binary that ties together:
//! - visreg-core: Core types, config and logging
//! - visreg-store: Screenshot storage (through visreg-compare)
//! - visreg-compare: Comparison, baseline lifecycle and reports

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod commands;
pub mod schema;

pub use cli::{Cli, Command};
pub use commands::execute;
pub use schema::report_schema;
