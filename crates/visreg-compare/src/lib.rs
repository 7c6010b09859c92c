//! # visreg-compare
//!
//! Comparison, baseline lifecycle and reporting for the visreg engine.
//!
//! This crate provides:
//! - Pairwise comparison of baseline and current snapshot sets
//! - Guarded baseline promotion, clearing and first-run bootstrap
//! - Pass/fail reports as text, JSON and HTML
//! - `RegressionEngine`, the facade a test harness drives
//!
//! ## Architecture
//!
//! This is Layer 2 in the architecture - it depends on visreg-core and
//! visreg-store.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod comparator;
pub mod engine;
pub mod lifecycle;
pub mod report;

// Re-export commonly used types
pub use comparator::{
    compare_files, compare_images, ComparisonResult, ComparisonStatus, ComparisonSummary,
    NotComparableReason, PairwiseComparator, Verdict, VerdictCounts,
};
pub use engine::RegressionEngine;
pub use lifecycle::{AutoPromotion, BaselineManager, BaselineState, SkipReason};
pub use report::{Outcome, RegressionReport};
