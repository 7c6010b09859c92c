//! Facade the test harness drives.
//!
//! Maps one-to-one onto the harness operations (`compare`, `set_base`,
//! `clear_base`, `clear_current`) and adds the session hooks run at test
//! session start and teardown. Every operation returns a `Result`; none of
//! them panics on filesystem or image problems.

use std::collections::BTreeMap;
use std::path::PathBuf;

use visreg_core::{
    CompareSettings, Logger, Result, Role, Snapshot, StepKey, Subject, VisregConfig,
};
use visreg_store::{ScreenshotStore, SubjectPaths};

use crate::comparator::{ComparisonSummary, PairwiseComparator};
use crate::lifecycle::{AutoPromotion, BaselineManager, BaselineState, SkipReason};
use crate::report::RegressionReport;

/// Wires the store, comparator and lifecycle manager together.
#[derive(Debug, Clone)]
pub struct RegressionEngine {
    store: ScreenshotStore,
    comparator: PairwiseComparator,
    baseline: BaselineManager,
    settings: CompareSettings,
    logger: Logger,
}

impl RegressionEngine {
    /// Build an engine from configuration.
    pub fn new(config: &VisregConfig, logger: Logger) -> Self {
        let store = ScreenshotStore::new(config.store.clone(), logger.clone());
        Self {
            comparator: PairwiseComparator::new(store.clone(), logger.clone()),
            baseline: BaselineManager::new(store.clone(), logger.clone()),
            store,
            settings: config.compare.clone(),
            logger: logger.for_component("engine"),
        }
    }

    /// Directory layout for a subject.
    pub fn paths(&self, subject: &Subject) -> SubjectPaths {
        self.store.paths(subject)
    }

    /// Underlying store.
    pub fn store(&self) -> &ScreenshotStore {
        &self.store
    }

    /// Record a screenshot from the device driver into the current set.
    pub fn capture(
        &self,
        subject: &Subject,
        bytes: &[u8],
        step_label: &str,
        human_name: &str,
    ) -> Result<Snapshot> {
        let paths = self.paths(subject);
        self.store
            .put(&paths, Role::Current, bytes, step_label, human_name)
    }

    /// Step keys and files of one set.
    pub fn list(&self, subject: &Subject, role: Role) -> Result<BTreeMap<StepKey, PathBuf>> {
        self.store.list(&self.paths(subject), role)
    }

    /// Lifecycle state of a subject's baseline.
    pub fn baseline_state(&self, subject: &Subject) -> Result<BaselineState> {
        self.baseline.state(&self.paths(subject))
    }

    /// Compare the two sets and decide pass/fail.
    pub fn compare(&self, subject: &Subject) -> Result<RegressionReport> {
        let summary = self.comparator.compare(&self.paths(subject))?;
        Ok(RegressionReport::new(summary))
    }

    /// Raw comparison summary without a pass/fail decision.
    pub fn summarize(&self, subject: &Subject) -> Result<ComparisonSummary> {
        self.comparator.compare(&self.paths(subject))
    }

    /// Promote the current set into an empty baseline.
    pub fn set_base(&self, subject: &Subject) -> Result<usize> {
        self.baseline.promote(&self.paths(subject))
    }

    /// Delete the baseline.
    pub fn clear_base(&self, subject: &Subject) -> Result<()> {
        self.baseline.clear_baseline(&self.paths(subject))
    }

    /// Delete the current set.
    pub fn clear_current(&self, subject: &Subject) -> Result<()> {
        self.store.clear(&self.paths(subject), Role::Current)
    }

    /// Session start: empty the current set.
    ///
    /// Returns `false` instead of failing so the harness can carry on.
    pub fn begin_session(&self, subject: &Subject) -> bool {
        self.logger
            .info(format!("Setting up screenshot management for {subject}"));
        match self.clear_current(subject) {
            Ok(()) => true,
            Err(e) => {
                self.logger
                    .error(format!("Could not reset current set for {subject}: {e}"));
                false
            }
        }
    }

    /// Session teardown: compare once, bootstrap the baseline on a first
    /// run, and return the final report.
    pub fn finish_session(&self, subject: &Subject) -> Result<RegressionReport> {
        let paths = self.paths(subject);
        let summary = self.comparator.compare(&paths)?;

        let promotion = if self.settings.auto_promote {
            match self.baseline.auto_promote_if_all_passed(&paths, &summary) {
                Ok(promotion) => promotion,
                Err(e) => {
                    // The comparison result still stands; only the bootstrap failed.
                    self.logger
                        .error(format!("Auto-promotion failed for {subject}: {e}"));
                    return Ok(RegressionReport::new(summary));
                }
            }
        } else {
            AutoPromotion::Skipped {
                reason: SkipReason::Disabled,
            }
        };

        let report = RegressionReport::new(summary).with_promotion(promotion);
        if report.is_pass() {
            self.logger
                .info(format!("Visual regression passed for {subject}"));
        } else {
            self.logger.warn(format!(
                "Visual regression failed for {subject}: {}",
                report.failure_lines().join("; ")
            ));
        }
        Ok(report)
    }
}
